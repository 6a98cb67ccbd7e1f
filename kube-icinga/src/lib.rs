//! kube-icinga - keeps Icinga 2 monitoring objects in step with the
//! orchestration topology.
//!
//! - [`Icinga`] : idempotent apply / delete / bulk cleanup of hosts, host groups,
//!   service groups and services
//! - [`client`] : the monitoring API boundary and its REST implementation
//! - [`config`] : YAML + environment configuration

pub mod client;
pub mod config;
pub mod icinga;
pub mod logging;
pub mod models;

pub use client::{ClientError, HttpIcingaClient, IcingaClient};
pub use config::{load_config, AppConfig, IcingaConfig};
pub use icinga::{Icinga, ReconcileError};
pub use models::{CleanupReport, Definition, IcingaObject, ObjectDefinition, ObjectKind};
