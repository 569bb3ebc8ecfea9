//! network_manager_network_group - Microsoft.Network/networkManagers/networkGroups

use std::collections::HashMap;

use nimbus_core::provider::ProviderResult;
use nimbus_core::resource::{Resource, State, Value};
use nimbus_core::resource_id::{IdShape, ParsedId, ResourceIdentifier};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde_json::{Value as JsonValue, json};

use super::{Request, ResourceHandler, required_str};
use crate::ids::{NetworkManagerId, NetworkManagerNetworkGroupId};
use crate::utils::json_str;

pub struct NetworkGroupHandler;

impl ResourceHandler for NetworkGroupHandler {
    fn resource_type(&self) -> &'static str {
        "network_manager_network_group"
    }

    fn api_version(&self) -> &'static str {
        "2022-09-01"
    }

    fn id_shape(&self) -> &'static IdShape {
        NetworkManagerNetworkGroupId::SHAPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.resource_type())
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("network_manager_id", types::resource_id_of::<NetworkManagerId>())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
    }

    fn build_id(&self, _subscription_id: &str, resource: &Resource) -> ProviderResult<ParsedId> {
        let manager = NetworkManagerId::parse(required_str(resource, "network_manager_id")?)?;
        let id = NetworkManagerNetworkGroupId::new(
            manager.subscription_id(),
            manager.resource_group(),
            manager.name(),
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
        let id = NetworkManagerNetworkGroupId::from_parsed(id.clone())?;
        Ok(HashMap::from([
            ("name".to_string(), Value::string(id.network_group_name())),
            (
                "network_manager_id".to_string(),
                Value::string(id.network_manager_id().id()),
            ),
            (
                "description".to_string(),
                Value::string(json_str(&body["properties"], "description")),
            ),
        ]))
    }
}

fn expand(resource: &Resource) -> JsonValue {
    json!({
        "properties": {
            "description": resource.get_str("description").unwrap_or_default(),
        },
    })
}
