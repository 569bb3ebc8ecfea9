//! mssql_managed_instance_security_alert_policy - Microsoft.Sql/managedInstances/securityAlertPolicies
//!
//! Every managed instance has exactly one policy, named `Default`. Creating
//! the resource configures it; deleting it resets the policy to disabled.

use std::collections::HashMap;

use nimbus_core::provider::ProviderResult;
use nimbus_core::resource::{Resource, State, Value};
use nimbus_core::resource_id::{IdShape, ParsedId, ResourceIdentifier};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde_json::{Value as JsonValue, json};

use super::{Request, ResourceHandler, required_str};
use crate::ids::ManagedInstancesSecurityAlertPolicyId;
use crate::utils::{flatten_string_list, json_str, string_list};

pub const POLICY_NAME: &str = "Default";

pub const ALERT_TYPES: [&str; 5] = [
    "Sql_Injection",
    "Sql_Injection_Vulnerability",
    "Access_Anomaly",
    "Data_Exfiltration",
    "Unsafe_Action",
];

pub struct SecurityAlertPolicyHandler;

impl ResourceHandler for SecurityAlertPolicyHandler {
    fn resource_type(&self) -> &'static str {
        "mssql_managed_instance_security_alert_policy"
    }

    fn api_version(&self) -> &'static str {
        "2020-11-01-preview"
    }

    fn id_shape(&self) -> &'static IdShape {
        ManagedInstancesSecurityAlertPolicyId::SHAPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.resource_type())
            .attribute(
                AttributeSchema::new("resource_group_name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("managed_instance_name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(AttributeSchema::new(
                "disabled_alerts",
                AttributeType::List(Box::new(AttributeType::Enum(
                    ALERT_TYPES.iter().map(|s| s.to_string()).collect(),
                ))),
            ))
            .attribute(
                AttributeSchema::new("email_account_admins_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(AttributeSchema::new(
                "email_addresses",
                AttributeType::List(Box::new(types::non_empty_string())),
            ))
            .attribute(
                AttributeSchema::new("retention_days", AttributeType::Int)
                    .with_default(Value::Int(0)),
            )
            .attribute(AttributeSchema::new("storage_endpoint", AttributeType::String))
            .attribute(
                AttributeSchema::new("storage_account_access_key", types::non_empty_string())
                    .sensitive(),
            )
    }

    fn build_id(&self, subscription_id: &str, resource: &Resource) -> ProviderResult<ParsedId> {
        let id = ManagedInstancesSecurityAlertPolicyId::new(
            subscription_id,
            required_str(resource, "resource_group_name")?,
            required_str(resource, "managed_instance_name")?,
            POLICY_NAME,
        )?;
        Ok(id.to_parsed())
    }

    fn create_request(&self, _id: &ParsedId, resource: &Resource) -> ProviderResult<Request> {
        Ok(Request::Put(expand(resource)))
    }

    fn update_request(
        &self,
        _id: &ParsedId,
        _from: &State,
        to: &Resource,
        _changed: &[String],
    ) -> ProviderResult<Request> {
        Ok(Request::Put(expand(to)))
    }

    fn delete_request(&self, _id: &ParsedId) -> Request {
        Request::Put(json!({
            "properties": {
                "state": "Disabled",
                "disabledAlerts": [],
                "emailAccountAdmins": false,
                "emailAddresses": [],
                "retentionDays": 0,
            },
        }))
    }

    fn flatten(
        &self,
        id: &ParsedId,
        body: &JsonValue,
        config: &Resource,
    ) -> ProviderResult<HashMap<String, Value>> {
        let id = ManagedInstancesSecurityAlertPolicyId::from_parsed(id.clone())?;
        let props = &body["properties"];

        let mut attributes = HashMap::from([
            ("resource_group_name".to_string(), Value::string(id.resource_group())),
            (
                "managed_instance_name".to_string(),
                Value::string(id.managed_instance_name()),
            ),
            (
                "enabled".to_string(),
                Value::Bool(json_str(props, "state") == "Enabled"),
            ),
            (
                "disabled_alerts".to_string(),
                flatten_disabled_alerts(props.get("disabledAlerts")),
            ),
            (
                "email_account_admins_enabled".to_string(),
                Value::Bool(props["emailAccountAdmins"].as_bool().unwrap_or(false)),
            ),
            (
                "email_addresses".to_string(),
                flatten_string_list(props.get("emailAddresses")),
            ),
            (
                "retention_days".to_string(),
                Value::Int(props["retentionDays"].as_i64().unwrap_or(0)),
            ),
            (
                "storage_endpoint".to_string(),
                Value::string(json_str(props, "storageEndpoint")),
            ),
        ]);

        // The API never returns the access key
        if let Some(key) = config.get("storage_account_access_key") {
            attributes.insert("storage_account_access_key".to_string(), key.clone());
        }

        Ok(attributes)
    }

    fn requires_import_check(&self) -> bool {
        false
    }
}

fn expand(resource: &Resource) -> JsonValue {
    let enabled = resource
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut props = json!({
        "state": if enabled { "Enabled" } else { "Disabled" },
        "disabledAlerts": string_list(resource.get("disabled_alerts")),
        "emailAccountAdmins": resource
            .get("email_account_admins_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        "emailAddresses": string_list(resource.get("email_addresses")),
        "retentionDays": resource.get("retention_days").and_then(Value::as_int).unwrap_or(0),
    });
    if let Some(endpoint) = resource.get_str("storage_endpoint") {
        props["storageEndpoint"] = json!(endpoint);
    }
    if let Some(key) = resource.get_str("storage_account_access_key") {
        props["storageAccountAccessKey"] = json!(key);
    }

    json!({ "properties": props })
}

/// The API reports "no disabled alerts" as `[""]`
fn flatten_disabled_alerts(value: Option<&JsonValue>) -> Value {
    match flatten_string_list(value) {
        Value::List(items) => Value::List(
            items
                .into_iter()
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .collect(),
        ),
        other => other,
    }
}
