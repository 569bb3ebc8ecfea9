//! network_manager - Microsoft.Network/networkManagers

use std::collections::HashMap;

use nimbus_core::provider::ProviderResult;
use nimbus_core::resource::{Resource, State, Value};
use nimbus_core::resource_id::{IdShape, ParsedId, ResourceIdentifier};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde_json::{Value as JsonValue, json};

use super::{Request, ResourceHandler, required_str};
use crate::ids::{NetworkManagerId, SubscriptionId};
use crate::utils::{
    expand_tags, flatten_string_list, flatten_tags, json_str, location_value, normalize_location,
    string_list,
};

pub const SCOPE_ACCESSES: [&str; 2] = ["Connectivity", "SecurityAdmin"];

pub struct NetworkManagerHandler;

impl ResourceHandler for NetworkManagerHandler {
    fn resource_type(&self) -> &'static str {
        "network_manager"
    }

    fn api_version(&self) -> &'static str {
        "2022-09-01"
    }

    fn id_shape(&self) -> &'static IdShape {
        NetworkManagerId::SHAPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.resource_type())
            .with_description("Azure Virtual Network Manager")
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("location", AttributeType::String)
                    .required()
                    .force_new()
                    .with_normalizer(location_value),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::block(
                    "scope",
                    1,
                    vec![
                        AttributeSchema::new(
                            "management_group_ids",
                            AttributeType::List(Box::new(types::non_empty_string())),
                        ),
                        AttributeSchema::new(
                            "subscription_ids",
                            AttributeType::List(Box::new(types::resource_id_of::<SubscriptionId>())),
                        ),
                    ],
                )
                .required()
                .with_normalizer(scope_value),
            )
            .attribute(
                AttributeSchema::new(
                    "scope_accesses",
                    AttributeType::List(Box::new(AttributeType::Enum(
                        SCOPE_ACCESSES.iter().map(|s| s.to_string()).collect(),
                    ))),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new(
                "tags",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
    }

    fn build_id(&self, subscription_id: &str, resource: &Resource) -> ProviderResult<ParsedId> {
        let id = NetworkManagerId::new(
            subscription_id,
            required_str(resource, "resource_group_name")?,
            required_str(resource, "name")?,
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

    fn flatten(
        &self,
        id: &ParsedId,
        body: &JsonValue,
        _config: &Resource,
    ) -> ProviderResult<HashMap<String, Value>> {
        let id = NetworkManagerId::from_parsed(id.clone())?;
        let props = &body["properties"];

        let mut attributes = HashMap::from([
            ("name".to_string(), Value::string(id.name())),
            ("resource_group_name".to_string(), Value::string(id.resource_group())),
            (
                "location".to_string(),
                Value::string(normalize_location(&json_str(body, "location"))),
            ),
            (
                "scope_accesses".to_string(),
                flatten_string_list(props.get("networkManagerScopeAccesses")),
            ),
            (
                "description".to_string(),
                Value::string(json_str(props, "description")),
            ),
            ("tags".to_string(), flatten_tags(body.get("tags"))),
        ]);

        if let Some(scope) = props.get("networkManagerScopes") {
            attributes.insert(
                "scope".to_string(),
                Value::block(HashMap::from([
                    (
                        "management_group_ids".to_string(),
                        flatten_string_list(scope.get("managementGroups")),
                    ),
                    (
                        "subscription_ids".to_string(),
                        flatten_string_list(scope.get("subscriptions")),
                    ),
                ])),
            );
        }

        Ok(attributes)
    }
}

/// The service always reports both scope lists
fn scope_value(value: &Value) -> Value {
    let Some(scope) = value.first_block() else {
        return value.clone();
    };
    let mut scope = scope.clone();
    for key in ["management_group_ids", "subscription_ids"] {
        scope
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()));
    }
    Value::block(scope)
}

fn expand(resource: &Resource) -> JsonValue {
    let scope = resource.block("scope");
    let scope_list = |key: &str| string_list(scope.and_then(|s| s.get(key)));

    json!({
        "location": normalize_location(resource.get_str("location").unwrap_or_default()),
        "tags": expand_tags(resource.get("tags")),
        "properties": {
            "description": resource.get_str("description").unwrap_or_default(),
            "networkManagerScopes": {
                "managementGroups": scope_list("management_group_ids"),
                "subscriptions": scope_list("subscription_ids"),
            },
            "networkManagerScopeAccesses": string_list(resource.get("scope_accesses")),
        },
    })
}
