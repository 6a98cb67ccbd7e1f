/*!
Attribute builders for hosts and services, shaped like the payloads the
orchestration handlers produce.
*/

use kube_icinga::models::{mark_managed, Definition};
use serde_json::{json, Value};

/// Turns a JSON object literal into a [`Definition`]. Non-objects give an empty map.
pub fn definition(value: Value) -> Definition {
    match value {
        Value::Object(map) => map,
        _ => Definition::new(),
    }
}

/// Host attributes tagged with the managed-object marker.
pub fn managed_host(check_command: &str, address: &str) -> Definition {
    let mut attrs = definition(json!({
        "check_command": check_command,
        "address": address,
    }));
    mark_managed(&mut attrs);
    attrs
}

/// Service attributes tagged with the managed-object marker, grouped by namespace.
pub fn managed_service(check_command: &str, namespace: &str) -> Definition {
    let mut attrs = definition(json!({
        "check_command": check_command,
        "groups": [namespace],
        "vars": {"kubernetes": {"namespace": namespace}},
    }));
    mark_managed(&mut attrs);
    attrs
}
