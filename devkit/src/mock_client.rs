/*!
In-memory Icinga for tests without a monitoring server.

Implements `IcingaClient` over a shared object store, records every call,
and lets tests inject failures per operation and slow calls down.
*/

use async_trait::async_trait;
use kube_icinga::client::{ClientError, ClientResult, IcingaClient};
use kube_icinga::models::{
    is_managed, Definition, IcingaObject, ObjectDefinition, MANAGED_HOST_FILTER,
    MANAGED_SERVICE_FILTER,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// A call received by the mock, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GetCheckCommand(String),
    GetHostGroup(String),
    CreateHostGroup(String),
    GetServiceGroup(String),
    CreateServiceGroup(String),
    GetHost(String),
    CreateHost { name: String, definition: ObjectDefinition },
    DeleteHost(String),
    GetService { host: String, name: String },
    CreateService { host: String, name: String, definition: ObjectDefinition },
    DeleteService { host: String, name: String },
    ListHosts(String),
    ListServices(String),
}

/// Operation kind of a [`MockCall`], used for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    GetCheckCommand,
    GetHostGroup,
    CreateHostGroup,
    GetServiceGroup,
    CreateServiceGroup,
    GetHost,
    CreateHost,
    DeleteHost,
    GetService,
    CreateService,
    DeleteService,
    ListHosts,
    ListServices,
}

impl MockCall {
    pub fn op(&self) -> MockOp {
        match self {
            MockCall::GetCheckCommand(_) => MockOp::GetCheckCommand,
            MockCall::GetHostGroup(_) => MockOp::GetHostGroup,
            MockCall::CreateHostGroup(_) => MockOp::CreateHostGroup,
            MockCall::GetServiceGroup(_) => MockOp::GetServiceGroup,
            MockCall::CreateServiceGroup(_) => MockOp::CreateServiceGroup,
            MockCall::GetHost(_) => MockOp::GetHost,
            MockCall::CreateHost { .. } => MockOp::CreateHost,
            MockCall::DeleteHost(_) => MockOp::DeleteHost,
            MockCall::GetService { .. } => MockOp::GetService,
            MockCall::CreateService { .. } => MockOp::CreateService,
            MockCall::DeleteService { .. } => MockOp::DeleteService,
            MockCall::ListHosts(_) => MockOp::ListHosts,
            MockCall::ListServices(_) => MockOp::ListServices,
        }
    }
}

#[derive(Default)]
struct MockState {
    check_commands: BTreeSet<String>,
    host_groups: BTreeMap<String, String>,
    service_groups: BTreeMap<String, String>,
    hosts: BTreeMap<String, ObjectDefinition>,
    services: BTreeMap<(String, String), ObjectDefinition>,
    failures: HashMap<MockOp, u16>,
    calls: Vec<MockCall>,
    settled: Vec<MockCall>,
}

/// Mock Icinga client. Clones share the same store and call log.
#[derive(Clone, Default)]
pub struct MockIcingaClient {
    state: Arc<Mutex<MockState>>,
    latency: Option<Duration>,
}

fn already_exists(what: String) -> ClientError {
    ClientError::Status {
        status: 500,
        body: format!("Object '{what}' already exists."),
    }
}

fn host_object(name: &str, definition: &ObjectDefinition) -> IcingaObject {
    let mut attrs = definition.attrs.clone();
    attrs.insert("name".into(), Value::String(name.to_string()));
    IcingaObject {
        name: name.to_string(),
        object_type: "Host".into(),
        attrs,
    }
}

fn service_object(host: &str, name: &str, definition: &ObjectDefinition) -> IcingaObject {
    let mut attrs = definition.attrs.clone();
    attrs.insert("name".into(), Value::String(name.to_string()));
    attrs.insert("host_name".into(), Value::String(host.to_string()));
    IcingaObject {
        name: format!("{host}!{name}"),
        object_type: "Service".into(),
        attrs,
    }
}

fn group_object(name: &str, display_name: &str, object_type: &str) -> IcingaObject {
    IcingaObject {
        name: name.to_string(),
        object_type: object_type.to_string(),
        attrs: json!({ "name": name, "display_name": display_name })
            .as_object()
            .cloned()
            .unwrap_or_default(),
    }
}

/// Only the managed-object filters (or no filter) are understood.
fn filter_matches(filter: &str, managed_filter: &str, attrs: &Definition) -> ClientResult<bool> {
    if filter.trim().is_empty() {
        Ok(true)
    } else if filter == managed_filter {
        Ok(is_managed(attrs))
    } else {
        Err(ClientError::Status {
            status: 400,
            body: format!("unsupported filter in mock: {filter}"),
        })
    }
}

impl MockIcingaClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps `latency` before touching the store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn add_check_command(&self, name: &str) {
        self.state.lock().check_commands.insert(name.to_string());
    }

    pub fn seed_host_group(&self, name: &str) {
        self.state
            .lock()
            .host_groups
            .insert(name.to_string(), name.to_string());
    }

    pub fn seed_service_group(&self, name: &str) {
        self.state
            .lock()
            .service_groups
            .insert(name.to_string(), name.to_string());
    }

    pub fn seed_host(&self, name: &str, attrs: Definition) {
        self.state
            .lock()
            .hosts
            .insert(name.to_string(), ObjectDefinition::new(attrs, Vec::new()));
    }

    pub fn seed_service(&self, host: &str, name: &str, attrs: Definition) {
        self.state.lock().services.insert(
            (host.to_string(), name.to_string()),
            ObjectDefinition::new(attrs, Vec::new()),
        );
    }

    /// Every subsequent `op` fails with `status` (404 becomes `NotFound`).
    pub fn fail(&self, op: MockOp, status: u16) {
        self.state.lock().failures.insert(op, status);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Calls in the order they were received.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, op: MockOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    /// Calls of `op` that have completed (after latency and store update).
    pub fn settled(&self, op: MockOp) -> usize {
        self.state
            .lock()
            .settled
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.settled.clear();
    }

    pub fn host(&self, name: &str) -> Option<ObjectDefinition> {
        self.state.lock().hosts.get(name).cloned()
    }

    pub fn host_names(&self) -> Vec<String> {
        self.state.lock().hosts.keys().cloned().collect()
    }

    pub fn service(&self, host: &str, name: &str) -> Option<ObjectDefinition> {
        self.state
            .lock()
            .services
            .get(&(host.to_string(), name.to_string()))
            .cloned()
    }

    pub fn service_count(&self) -> usize {
        self.state.lock().services.len()
    }

    pub fn has_host_group(&self, name: &str) -> bool {
        self.state.lock().host_groups.contains_key(name)
    }

    pub fn has_service_group(&self, name: &str) -> bool {
        self.state.lock().service_groups.contains_key(name)
    }

    /// Records `call`, waits for the configured latency, then runs `apply`
    /// against the store unless a failure is injected for the operation.
    async fn handle<T, F>(&self, call: MockCall, apply: F) -> ClientResult<T>
    where
        F: FnOnce(&mut MockState) -> ClientResult<T> + Send,
    {
        let op = call.op();
        self.state.lock().calls.push(call.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let injected = state.failures.get(&op).copied();
        let result = match injected {
            Some(404) => Err(ClientError::NotFound),
            Some(status) => Err(ClientError::Status {
                status,
                body: format!("injected failure for {op:?}"),
            }),
            None => apply(&mut *state),
        };
        state.settled.push(call);
        result
    }
}

#[async_trait]
impl IcingaClient for MockIcingaClient {
    async fn get_check_command(&self, name: &str) -> ClientResult<IcingaObject> {
        self.handle(MockCall::GetCheckCommand(name.into()), |state| {
            if state.check_commands.contains(name) {
                Ok(group_object(name, name, "CheckCommand"))
            } else {
                Err(ClientError::NotFound)
            }
        })
        .await
    }

    async fn get_host_group(&self, name: &str) -> ClientResult<IcingaObject> {
        self.handle(MockCall::GetHostGroup(name.into()), |state| {
            state
                .host_groups
                .get(name)
                .map(|display| group_object(name, display, "HostGroup"))
                .ok_or(ClientError::NotFound)
        })
        .await
    }

    async fn create_host_group(&self, name: &str, display_name: &str) -> ClientResult<Value> {
        self.handle(MockCall::CreateHostGroup(name.into()), |state| {
            if state.host_groups.contains_key(name) {
                return Err(already_exists(name.to_string()));
            }
            state
                .host_groups
                .insert(name.to_string(), display_name.to_string());
            Ok(json!({"results": [{"code": 200, "status": "Object was created"}]}))
        })
        .await
    }

    async fn get_service_group(&self, name: &str) -> ClientResult<IcingaObject> {
        self.handle(MockCall::GetServiceGroup(name.into()), |state| {
            state
                .service_groups
                .get(name)
                .map(|display| group_object(name, display, "ServiceGroup"))
                .ok_or(ClientError::NotFound)
        })
        .await
    }

    async fn create_service_group(&self, name: &str, display_name: &str) -> ClientResult<Value> {
        self.handle(MockCall::CreateServiceGroup(name.into()), |state| {
            if state.service_groups.contains_key(name) {
                return Err(already_exists(name.to_string()));
            }
            state
                .service_groups
                .insert(name.to_string(), display_name.to_string());
            Ok(json!({"results": [{"code": 200, "status": "Object was created"}]}))
        })
        .await
    }

    async fn get_host(&self, name: &str) -> ClientResult<IcingaObject> {
        self.handle(MockCall::GetHost(name.into()), |state| {
            state
                .hosts
                .get(name)
                .map(|definition| host_object(name, definition))
                .ok_or(ClientError::NotFound)
        })
        .await
    }

    async fn create_host(&self, name: &str, definition: &ObjectDefinition) -> ClientResult<Value> {
        let call = MockCall::CreateHost {
            name: name.into(),
            definition: definition.clone(),
        };
        self.handle(call, |state| {
            if state.hosts.contains_key(name) {
                return Err(already_exists(name.to_string()));
            }
            state.hosts.insert(name.to_string(), definition.clone());
            Ok(json!({"results": [{"code": 200, "status": "Object was created"}]}))
        })
        .await
    }

    async fn delete_host(&self, name: &str) -> ClientResult<Value> {
        self.handle(MockCall::DeleteHost(name.into()), |state| {
            if state.hosts.remove(name).is_none() {
                return Err(ClientError::NotFound);
            }
            // cascade=1 also drops the host's services
            state.services.retain(|(host, _), _| host != name);
            Ok(json!({"results": [{"code": 200, "status": "Object was deleted."}]}))
        })
        .await
    }

    async fn get_service(&self, host: &str, name: &str) -> ClientResult<IcingaObject> {
        let call = MockCall::GetService {
            host: host.into(),
            name: name.into(),
        };
        self.handle(call, |state| {
            state
                .services
                .get(&(host.to_string(), name.to_string()))
                .map(|definition| service_object(host, name, definition))
                .ok_or(ClientError::NotFound)
        })
        .await
    }

    async fn create_service(
        &self,
        host: &str,
        name: &str,
        definition: &ObjectDefinition,
    ) -> ClientResult<Value> {
        let call = MockCall::CreateService {
            host: host.into(),
            name: name.into(),
            definition: definition.clone(),
        };
        self.handle(call, |state| {
            let key = (host.to_string(), name.to_string());
            if state.services.contains_key(&key) {
                return Err(already_exists(format!("{host}!{name}")));
            }
            state.services.insert(key, definition.clone());
            Ok(json!({"results": [{"code": 200, "status": "Object was created"}]}))
        })
        .await
    }

    async fn delete_service(&self, host: &str, name: &str) -> ClientResult<Value> {
        let call = MockCall::DeleteService {
            host: host.into(),
            name: name.into(),
        };
        self.handle(call, |state| {
            state
                .services
                .remove(&(host.to_string(), name.to_string()))
                .map(|_| json!({"results": [{"code": 200, "status": "Object was deleted."}]}))
                .ok_or(ClientError::NotFound)
        })
        .await
    }

    async fn list_hosts(&self, filter: &str) -> ClientResult<Vec<IcingaObject>> {
        self.handle(MockCall::ListHosts(filter.into()), |state| {
            let mut found = Vec::new();
            for (name, definition) in &state.hosts {
                if filter_matches(filter, MANAGED_HOST_FILTER, &definition.attrs)? {
                    found.push(host_object(name, definition));
                }
            }
            Ok(found)
        })
        .await
    }

    async fn list_services(&self, filter: &str) -> ClientResult<Vec<IcingaObject>> {
        self.handle(MockCall::ListServices(filter.into()), |state| {
            let mut found = Vec::new();
            for ((host, name), definition) in &state.services {
                if filter_matches(filter, MANAGED_SERVICE_FILTER, &definition.attrs)? {
                    found.push(service_object(host, name, definition));
                }
            }
            Ok(found)
        })
        .await
    }
}
