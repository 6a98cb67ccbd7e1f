//! Icinga object model shared by the client boundary and the reconciler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Custom variable tagging every host/service this reconciler owns.
pub const MANAGED_VAR: &str = "_kubernetes";

/// Listing filter selecting managed hosts.
pub const MANAGED_HOST_FILTER: &str = "host.vars._kubernetes == true";

/// Listing filter selecting managed services.
pub const MANAGED_SERVICE_FILTER: &str = "service.vars._kubernetes == true";

/// Free-form attribute payload of an object (`check_command`, `vars`, `groups`...).
pub type Definition = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    CheckCommand,
    Host,
    HostGroup,
    Service,
    ServiceGroup,
}

impl ObjectKind {
    /// Collection segment under `/v1/objects/`.
    pub fn collection(self) -> &'static str {
        match self {
            ObjectKind::CheckCommand => "checkcommands",
            ObjectKind::Host => "hosts",
            ObjectKind::HostGroup => "hostgroups",
            ObjectKind::Service => "services",
            ObjectKind::ServiceGroup => "servicegroups",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectKind::CheckCommand => "check command",
            ObjectKind::Host => "host",
            ObjectKind::HostGroup => "host group",
            ObjectKind::Service => "service",
            ObjectKind::ServiceGroup => "service group",
        };
        f.write_str(label)
    }
}

/// Create payload for hosts and services: `{"attrs": {...}, "templates": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub attrs: Definition,
    #[serde(default)]
    pub templates: Vec<String>,
}

impl ObjectDefinition {
    pub fn new(attrs: Definition, templates: Vec<String>) -> Self {
        Self { attrs, templates }
    }
}

/// An object as returned by the Icinga API (`results[]` entries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcingaObject {
    pub name: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub attrs: Definition,
}

impl IcingaObject {
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Owning host of a service object, from `attrs.host_name` or the `host!service` name.
    pub fn host_name(&self) -> Option<&str> {
        self.attr_str("host_name")
            .or_else(|| self.name.split_once('!').map(|(host, _)| host))
    }

    /// `attrs.name`, which for services is the name without the `host!` prefix.
    pub fn short_name(&self) -> &str {
        self.attr_str("name").unwrap_or_else(|| {
            self.name
                .split_once('!')
                .map_or(self.name.as_str(), |(_, name)| name)
        })
    }
}

/// Tags a definition as owned by this reconciler, keeping any other vars.
pub fn mark_managed(definition: &mut Definition) {
    let vars = definition
        .entry("vars")
        .or_insert_with(|| Value::Object(Map::new()));
    if !vars.is_object() {
        *vars = Value::Object(Map::new());
    }
    if let Value::Object(vars) = vars {
        vars.insert(MANAGED_VAR.to_string(), Value::Bool(true));
    }
}

pub fn is_managed(definition: &Definition) -> bool {
    definition
        .get("vars")
        .and_then(|vars| vars.get(MANAGED_VAR))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Outcome of deleting one listing's worth of objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub listed: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Joined result of both cleanup branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub services: BatchReport,
    pub hosts: BatchReport,
}

impl CleanupReport {
    pub fn total_listed(&self) -> usize {
        self.services.listed + self.hosts.listed
    }

    pub fn total_deleted(&self) -> usize {
        self.services.deleted + self.hosts.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mark_managed_keeps_existing_vars() {
        let mut def = json!({"check_command": "ping", "vars": {"namespace": "default"}})
            .as_object()
            .cloned()
            .unwrap();
        assert!(!is_managed(&def));

        mark_managed(&mut def);

        assert!(is_managed(&def));
        assert_eq!(def["vars"]["namespace"], "default");
        assert_eq!(def["check_command"], "ping");
    }

    #[test]
    fn test_mark_managed_replaces_non_object_vars() {
        let mut def = json!({"vars": "broken"}).as_object().cloned().unwrap();
        mark_managed(&mut def);
        assert_eq!(def["vars"], json!({"_kubernetes": true}));
    }

    #[test]
    fn test_object_definition_payload_shape() {
        let attrs = json!({"check_command": "ping"}).as_object().cloned().unwrap();
        let payload = serde_json::to_value(ObjectDefinition::new(attrs, vec![])).unwrap();
        assert_eq!(payload, json!({"attrs": {"check_command": "ping"}, "templates": []}));
    }

    #[test]
    fn test_service_object_names() {
        let obj: IcingaObject = serde_json::from_value(json!({
            "name": "node1!kubelet",
            "type": "Service",
            "attrs": {"name": "kubelet", "host_name": "node1"}
        }))
        .unwrap();
        assert_eq!(obj.host_name(), Some("node1"));
        assert_eq!(obj.short_name(), "kubelet");

        let bare: IcingaObject = serde_json::from_value(json!({"name": "node2"})).unwrap();
        assert_eq!(bare.short_name(), "node2");
        assert_eq!(bare.host_name(), None);

        let composite: IcingaObject =
            serde_json::from_value(json!({"name": "node3!disk"})).unwrap();
        assert_eq!(composite.host_name(), Some("node3"));
        assert_eq!(composite.short_name(), "disk");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ObjectKind::HostGroup.to_string(), "host group");
        assert_eq!(ObjectKind::ServiceGroup.collection(), "servicegroups");
    }

    #[test]
    fn test_cleanup_totals() {
        let report = CleanupReport {
            services: BatchReport { listed: 3, deleted: 2, failed: 1 },
            hosts: BatchReport { listed: 2, deleted: 2, failed: 0 },
        };
        assert_eq!(report.total_listed(), 5);
        assert_eq!(report.total_deleted(), 4);
    }
}
