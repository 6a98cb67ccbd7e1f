//! Boundary to the Icinga management API.
//!
//! The reconciler only talks to an [`IcingaClient`]; [`HttpIcingaClient`]
//! speaks the Icinga 2 REST API, tests substitute an in-memory fake.

mod http;

pub use http::HttpIcingaClient;

use crate::models::{IcingaObject, ObjectDefinition};
use async_trait::async_trait;
use serde_json::Value;

/// Errors surfaced by an [`IcingaClient`] call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The object does not exist. Drives create-on-absent, never a failure by itself.
    #[error("object not found")]
    NotFound,
    #[error("icinga API responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Request/response calls the reconciler consumes, one per concept.
///
/// Lookups return the object or [`ClientError::NotFound`]; writes return the
/// raw API result so it can be logged.
#[async_trait]
pub trait IcingaClient: Send + Sync {
    async fn get_check_command(&self, name: &str) -> ClientResult<IcingaObject>;

    async fn get_host_group(&self, name: &str) -> ClientResult<IcingaObject>;
    async fn create_host_group(&self, name: &str, display_name: &str) -> ClientResult<Value>;

    async fn get_service_group(&self, name: &str) -> ClientResult<IcingaObject>;
    async fn create_service_group(&self, name: &str, display_name: &str) -> ClientResult<Value>;

    async fn get_host(&self, name: &str) -> ClientResult<IcingaObject>;
    async fn create_host(&self, name: &str, definition: &ObjectDefinition) -> ClientResult<Value>;
    async fn delete_host(&self, name: &str) -> ClientResult<Value>;

    async fn get_service(&self, host: &str, name: &str) -> ClientResult<IcingaObject>;
    async fn create_service(
        &self,
        host: &str,
        name: &str,
        definition: &ObjectDefinition,
    ) -> ClientResult<Value>;
    async fn delete_service(&self, host: &str, name: &str) -> ClientResult<Value>;

    /// Hosts matching an Icinga filter expression.
    async fn list_hosts(&self, filter: &str) -> ClientResult<Vec<IcingaObject>>;

    /// Services matching an Icinga filter expression.
    async fn list_services(&self, filter: &str) -> ClientResult<Vec<IcingaObject>>;
}
