//! Resource handlers
//!
//! A handler describes one resource type: its ID shape, its schema, and how
//! configuration maps to API bodies (expand) and back (flatten). The generic
//! lifecycle in [`crate::provider`] drives the API calls.

use std::collections::HashMap;

use nimbus_core::provider::ProviderResult;
use nimbus_core::resource::{Resource, State, Value};
use nimbus_core::resource_id::{IdShape, ParsedId};
use nimbus_core::schema::ResourceSchema;
use serde_json::Value as JsonValue;

pub mod container_registry_task_schedule;
pub mod mssql_security_alert_policy;
pub mod network_group;
pub mod network_manager;
pub mod redhat_openshift_cluster;

/// API call a lifecycle step maps to
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// PUT the full body to the resource ID
    Put(JsonValue),
    /// PATCH the resource with a merge patch
    Patch(JsonValue),
    /// POST an action on another resource
    Post {
        target: String,
        action: &'static str,
        body: JsonValue,
    },
    /// DELETE the resource
    Delete,
    /// Nothing to send
    Skip,
}

pub trait ResourceHandler: Send + Sync {
    /// Resource type name (e.g., "network_manager")
    fn resource_type(&self) -> &'static str;

    fn api_version(&self) -> &'static str;

    fn id_shape(&self) -> &'static IdShape;

    fn schema(&self) -> ResourceSchema;

    /// ID of the resource a configuration describes
    fn build_id(&self, subscription_id: &str, resource: &Resource) -> ProviderResult<ParsedId>;

    fn create_request(&self, id: &ParsedId, resource: &Resource) -> ProviderResult<Request>;

    /// Request applying `changed` attributes of `to`
    fn update_request(
        &self,
        id: &ParsedId,
        from: &State,
        to: &Resource,
        changed: &[String],
    ) -> ProviderResult<Request>;

    fn delete_request(&self, _id: &ParsedId) -> Request {
        Request::Delete
    }

    /// Resource fetched to read this one
    fn read_target(&self, id: &ParsedId) -> ProviderResult<String> {
        Ok(id.id())
    }

    /// Attributes from an API body; `config` supplies values the API never returns
    fn flatten(
        &self,
        id: &ParsedId,
        body: &JsonValue,
        config: &Resource,
    ) -> ProviderResult<HashMap<String, Value>>;

    /// Whether create must fail when the resource already exists
    fn requires_import_check(&self) -> bool {
        true
    }
}

/// Every handler this provider ships
pub fn handlers() -> Vec<Box<dyn ResourceHandler>> {
    vec![
        Box::new(network_manager::NetworkManagerHandler),
        Box::new(network_group::NetworkGroupHandler),
        Box::new(mssql_security_alert_policy::SecurityAlertPolicyHandler),
        Box::new(container_registry_task_schedule::TaskScheduleRunNowHandler),
        Box::new(redhat_openshift_cluster::OpenShiftClusterHandler::default()),
    ]
}

/// Value of a required string attribute
pub(crate) fn required_str<'a>(resource: &'a Resource, key: &str) -> ProviderResult<&'a str> {
    resource.get_str(key).ok_or_else(|| {
        nimbus_core::provider::ProviderError::new(format!("`{}` must be set", key))
            .for_resource(resource.address.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn handler_names_are_unique() {
        let handlers = handlers();
        let names: HashSet<_> = handlers.iter().map(|h| h.resource_type()).collect();
        assert_eq!(names.len(), handlers.len());
    }

    #[test]
    fn schemas_are_named_after_handlers() {
        for handler in handlers() {
            assert_eq!(handler.schema().resource_type, handler.resource_type());
        }
    }
}
