//! Reconciler facade over an [`IcingaClient`].
//!
//! Every operation is an existence check followed by a conditional write.
//! `NotFound` during the check is the normal trigger for creation. Any other
//! check failure is returned to the caller. Write failures (create/delete)
//! are best-effort: they are logged and the operation still reports success.

use crate::client::{ClientError, ClientResult, IcingaClient};
use crate::models::{
    BatchReport, CleanupReport, Definition, ObjectDefinition, ObjectKind, MANAGED_HOST_FILTER,
    MANAGED_SERVICE_FILTER,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Existence check failed with something other than `NotFound`.
    #[error("existence check for {kind} {name} failed: {source}")]
    Lookup {
        kind: ObjectKind,
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("listing managed {kind}s failed: {source}")]
    Listing {
        kind: ObjectKind,
        #[source]
        source: ClientError,
    },
}

#[derive(Debug, Clone, Copy)]
enum Write {
    Create,
    Delete,
}

/// Logs a write outcome and tells whether it went through.
fn report_write(write: Write, what: &str, outcome: ClientResult<Value>) -> bool {
    let (verb, done) = match write {
        Write::Create => ("create", "created"),
        Write::Delete => ("delete", "deleted"),
    };
    match outcome {
        Ok(result) => {
            info!(%result, "{what} was {done} successfully");
            true
        }
        Err(err) => {
            error!(error = %err, "failed {verb} {what}");
            false
        }
    }
}

fn tally(listed: usize, outcomes: &[bool]) -> BatchReport {
    let deleted = outcomes.iter().filter(|ok| **ok).count();
    BatchReport {
        listed,
        deleted,
        failed: listed - deleted,
    }
}

/// Apply/delete/cleanup of monitoring objects.
///
/// Cheap to clone; clones share the injected client.
#[derive(Clone)]
pub struct Icinga {
    client: Arc<dyn IcingaClient>,
}

impl Icinga {
    pub fn new(client: Arc<dyn IcingaClient>) -> Self {
        Self { client }
    }

    /// `true` if the check command exists, `false` on `NotFound`.
    pub async fn has_check_command(&self, command: &str) -> Result<bool, ReconcileError> {
        match self.client.get_check_command(command).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound) => Ok(false),
            Err(source) => Err(ReconcileError::Lookup {
                kind: ObjectKind::CheckCommand,
                name: command.to_string(),
                source,
            }),
        }
    }

    /// Creates the host group (one per namespace) when it is missing.
    pub async fn apply_host_group(&self, name: &str) -> Result<(), ReconcileError> {
        info!("apply host group {name} aka kubernetes namespace");

        match self.client.get_host_group(name).await {
            Ok(_) => Ok(()),
            Err(ClientError::NotFound) => {
                info!("host group {name} on monitoring was not found, create one");
                let outcome = self.client.create_host_group(name, name).await;
                report_write(Write::Create, &format!("host group {name}"), outcome);
                Ok(())
            }
            Err(source) => Err(ReconcileError::Lookup {
                kind: ObjectKind::HostGroup,
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Creates the service group when it is missing. Resolves `true` once settled.
    pub async fn apply_service_group(&self, name: &str) -> Result<bool, ReconcileError> {
        info!("apply service group {name} aka kubernetes namespace");

        match self.client.get_service_group(name).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound) => {
                info!("service group {name} on monitoring was not found, create one");
                let outcome = self.client.create_service_group(name, name).await;
                report_write(Write::Create, &format!("service group {name}"), outcome);
                Ok(true)
            }
            Err(source) => Err(ReconcileError::Lookup {
                kind: ObjectKind::ServiceGroup,
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Creates the host from `definition` and `templates` when it is missing.
    ///
    /// An existing host is left untouched. `definition` is sent as-is, so the
    /// caller is expected to have put `address` and the managed marker in it.
    pub async fn apply_host(
        &self,
        name: &str,
        address: &str,
        definition: Definition,
        templates: &[String],
    ) -> Result<bool, ReconcileError> {
        let host = ObjectDefinition::new(definition, templates.to_vec());
        info!(address, host = ?host, "apply new host {name}");

        match self.client.get_host(name).await {
            Ok(_) => {
                info!("host {name} already exists on monitoring, leave it untouched");
                Ok(true)
            }
            Err(ClientError::NotFound) => {
                info!("host {name} on monitoring was not found, create one");
                let outcome = self.client.create_host(name, &host).await;
                report_write(Write::Create, &format!("host {name}"), outcome);
                Ok(true)
            }
            Err(source) => Err(ReconcileError::Lookup {
                kind: ObjectKind::Host,
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Best-effort creation of a service on `host`. Never fails: every
    /// outcome, including a failed existence check, only shows up in the logs.
    pub async fn apply_service(
        &self,
        host: &str,
        name: &str,
        definition: Definition,
        templates: &[String],
    ) {
        let service = ObjectDefinition::new(definition, templates.to_vec());
        info!(service = ?service.attrs, "apply service {name} to host {host}");

        match self.client.get_service(host, name).await {
            Ok(_) => {}
            Err(ClientError::NotFound) => {
                info!("service {name} on host {host} was not found, create one");
                let outcome = self.client.create_service(host, name, &service).await;
                report_write(
                    Write::Create,
                    &format!("service {name} on host {host}"),
                    outcome,
                );
            }
            Err(err) => {
                error!(error = %err, "existence check for service {name} on host {host} failed, skipping");
            }
        }
    }

    /// Runs [`Icinga::apply_service`] as a detached task on the current runtime.
    pub fn spawn_apply_service(
        &self,
        host: impl Into<String>,
        name: impl Into<String>,
        definition: Definition,
        templates: Vec<String>,
    ) -> JoinHandle<()> {
        let icinga = self.clone();
        let host = host.into();
        let name = name.into();
        tokio::spawn(async move {
            icinga
                .apply_service(&host, &name, definition, &templates)
                .await
        })
    }

    /// Deletes a service. Always resolves `true`; failures are logged only.
    pub async fn delete_service(&self, host: &str, name: &str) -> bool {
        self.remove_service(host, name).await;
        true
    }

    /// Deletes a host. Always resolves `true`; failures are logged only.
    pub async fn delete_host(&self, name: &str) -> bool {
        self.remove_host(name).await;
        true
    }

    async fn remove_service(&self, host: &str, name: &str) -> bool {
        info!("delete service {name} from host {host}");
        let outcome = self.client.delete_service(host, name).await;
        report_write(
            Write::Delete,
            &format!("service {name} from host {host}"),
            outcome,
        )
    }

    async fn remove_host(&self, name: &str) -> bool {
        info!("delete host {name}");
        let outcome = self.client.delete_host(name).await;
        report_write(Write::Delete, &format!("host {name}"), outcome)
    }

    /// Removes every managed service and host.
    ///
    /// Both listings are issued together and all deletes of a listing run
    /// concurrently. Returns once both branches have settled; a listing
    /// failure is reported only after the other branch is done.
    pub async fn cleanup(&self) -> Result<CleanupReport, ReconcileError> {
        info!("start cleanup, removing all kubernetes objects from icinga");

        let (services, hosts) = tokio::join!(self.cleanup_services(), self.cleanup_hosts());
        let report = CleanupReport {
            services: services?,
            hosts: hosts?,
        };

        info!(
            services_deleted = report.services.deleted,
            services_failed = report.services.failed,
            hosts_deleted = report.hosts.deleted,
            hosts_failed = report.hosts.failed,
            "cleanup finished"
        );
        Ok(report)
    }

    async fn cleanup_services(&self) -> Result<BatchReport, ReconcileError> {
        let services = self
            .client
            .list_services(MANAGED_SERVICE_FILTER)
            .await
            .map_err(|source| {
                error!(error = %source, "failed to list managed services");
                ReconcileError::Listing {
                    kind: ObjectKind::Service,
                    source,
                }
            })?;

        let deletes = services.iter().map(|service| async move {
            match service.host_name() {
                Some(host) => self.remove_service(host, service.short_name()).await,
                None => {
                    error!("service {} has no host, cannot delete it", service.name);
                    false
                }
            }
        });
        let outcomes = join_all(deletes).await;
        Ok(tally(services.len(), &outcomes))
    }

    async fn cleanup_hosts(&self) -> Result<BatchReport, ReconcileError> {
        let hosts = self
            .client
            .list_hosts(MANAGED_HOST_FILTER)
            .await
            .map_err(|source| {
                error!(error = %source, "failed to list managed hosts");
                ReconcileError::Listing {
                    kind: ObjectKind::Host,
                    source,
                }
            })?;

        let deletes = hosts.iter().map(|host| self.remove_host(host.short_name()));
        let outcomes = join_all(deletes).await;
        Ok(tally(hosts.len(), &outcomes))
    }
}
