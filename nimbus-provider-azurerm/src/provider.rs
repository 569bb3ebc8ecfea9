//! Azure Resource Manager Provider implementation
//!
//! This module drives the lifecycle shared by every resource type: build or
//! parse the resource ID, send the request a handler describes, poll the
//! long-running operation and read the resource back.

use std::sync::Arc;
use std::time::Duration;

use nimbus_core::differ::{self, Diff};
use nimbus_core::provider::{ProviderError, ProviderResult};
use nimbus_core::resource::{Resource, ResourceAddress, State};
use nimbus_core::resource_id::ParsedId;
use serde_json::Value as JsonValue;

use crate::client::{ClientError, ClientResult, ManagementClient, OperationHandle};
use crate::config::ProviderConfig;
use crate::poller::wait_for_completion;
use crate::services::{self, Request, ResourceHandler};

/// Azure Resource Manager Provider
pub struct AzureRmProvider {
    client: Arc<dyn ManagementClient>,
    config: ProviderConfig,
    handlers: Vec<Box<dyn ResourceHandler>>,
}

impl AzureRmProvider {
    /// Create a provider sending requests through `client`
    pub fn new(client: Arc<dyn ManagementClient>, config: ProviderConfig) -> Self {
        Self {
            client,
            config,
            handlers: services::handlers(),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Handler of a resource type
    pub fn handler(&self, resource_type: &str) -> Option<&dyn ResourceHandler> {
        self.handlers
            .iter()
            .find(|h| h.resource_type() == resource_type)
            .map(|h| h.as_ref())
    }

    fn handler_for(&self, address: &ResourceAddress) -> ProviderResult<&dyn ResourceHandler> {
        self.handler(&address.resource_type).ok_or_else(|| {
            ProviderError::new(format!(
                "Unknown resource type: {}",
                address.resource_type
            ))
            .for_resource(address.clone())
        })
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Create a resource, failing when it already exists remotely
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let handler = self.handler_for(&resource.address)?;
        validate(handler, &resource)?;

        let id = handler
            .build_id(&self.config.subscription_id, &resource)
            .map_err(|e| with_address(e, &resource.address))?;
        let resource_id = id.id();

        if handler.requires_import_check()
            && self
                .fetch(handler, &resource_id, &resource.address)
                .await?
                .is_some()
        {
            return Err(ProviderError::new(format!(
                "A resource with the ID \"{}\" already exists - to be managed via nimbus this resource needs to be imported into the state",
                resource_id
            ))
            .for_resource(resource.address.clone()));
        }

        let request = handler.create_request(&id, &resource)?;
        self.execute(handler, &id, request, self.config.timeouts.create())
            .await
            .map_err(|e| with_address(e, &resource.address))?;
        log::info!("Created {} {}", resource.address, resource_id);

        let state = self.read_resource(&resource, Some(&resource_id)).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "{} was not found after it was created",
                resource_id
            ))
            .for_resource(resource.address));
        }
        Ok(state)
    }

    /// Read the current state behind a stored resource ID
    pub async fn read_resource(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let address = &resource.address;
        let handler = self.handler_for(address)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(address.clone()));
        };
        let id = parse_identifier(handler, identifier, address)?;

        let target = handler.read_target(&id).map_err(|e| with_address(e, address))?;
        let Some(body) = self.fetch(handler, &target, address).await? else {
            log::warn!(
                "{} ({}) was not found - removing from state",
                address,
                identifier
            );
            return Ok(State::not_found(address.clone()));
        };

        let attributes = handler
            .flatten(&id, &body, resource)
            .map_err(|e| with_address(e, address))?;
        Ok(State::existing(address.clone(), attributes).with_identifier(id.id()))
    }

    /// Update the attributes that differ between `from` and `to`
    pub async fn update_resource(
        &self,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let handler = self.handler_for(&to.address)?;
        validate(handler, &to)?;
        let id = parse_identifier(handler, identifier, &to.address)?;

        let schema = handler.schema();
        let changed =
            differ::changed_attributes(&schema.normalize(&to.attributes), &from.attributes);
        let replaced = schema.replaced_by(&changed);
        if !replaced.is_empty() {
            return Err(ProviderError::new(format!(
                "Changing {} requires replacing {} - it cannot be updated in place",
                replaced.join(", "),
                identifier
            ))
            .for_resource(to.address.clone()));
        }
        log::debug!("Updating {}: changed {:?}", to.address, changed);
        let request = handler.update_request(&id, from, &to, &changed)?;
        self.execute(handler, &id, request, self.config.timeouts.update())
            .await
            .map_err(|e| with_address(e, &to.address))?;

        self.read_resource(&to, Some(identifier)).await
    }

    /// Delete a resource; one that is already gone counts as deleted
    pub async fn delete_resource(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> ProviderResult<()> {
        let handler = self.handler_for(address)?;
        let id = parse_identifier(handler, identifier, address)?;
        let request = handler.delete_request(&id);

        match self.start(handler, &id, request).await {
            Ok(Some(handle)) => {
                self.wait(&handle, self.config.timeouts.delete())
                    .await
                    .map_err(|e| with_address(e, address))?;
            }
            Ok(None) => {}
            Err(ClientError::NotFound(_)) => {
                log::warn!("{} ({}) was already deleted", address, identifier);
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::new(format!(
                    "Failed to delete {}: {}",
                    identifier, e
                ))
                .with_cause(e)
                .for_resource(address.clone()));
            }
        }
        log::info!("Deleted {} {}", address, identifier);
        Ok(())
    }

    /// Whether the resource behind a stored ID still exists
    pub async fn resource_exists(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> ProviderResult<bool> {
        let handler = self.handler_for(address)?;
        let id = parse_identifier(handler, identifier, address)?;
        let target = handler.read_target(&id).map_err(|e| with_address(e, address))?;
        Ok(self.fetch(handler, &target, address).await?.is_some())
    }

    /// Bring a resource to its desired configuration, creating it when
    /// there is no stored ID or the remote side lost it
    pub async fn apply(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let handler = self.handler_for(&resource.address)?;
        let current = self.read_resource(resource, identifier).await?;
        let desired = Resource {
            address: resource.address.clone(),
            attributes: handler.schema().normalize(&resource.attributes),
        };
        match differ::diff(&desired, &current) {
            Diff::Create(_) => self.create_resource(resource.clone()).await,
            Diff::Update { from, .. } => match from.identifier.clone() {
                Some(identifier) => self.update_resource(&identifier, &from, resource.clone()).await,
                None => Err(ProviderError::new("Current state has no resource ID")
                    .for_resource(resource.address.clone())),
            },
            Diff::NoChange(_) => Ok(current),
        }
    }

    // =========================================================================
    // Management API Calls
    // =========================================================================

    /// GET a resource body; `None` when it does not exist
    async fn fetch(
        &self,
        handler: &dyn ResourceHandler,
        resource_id: &str,
        address: &ResourceAddress,
    ) -> ProviderResult<Option<JsonValue>> {
        log::debug!("GET {} (api-version {})", resource_id, handler.api_version());
        let timeout = self.config.timeouts.read();
        let result = tokio::time::timeout(
            timeout,
            self.client.get(resource_id, handler.api_version()),
        )
        .await
        .map_err(|_| {
            ProviderError::new(format!(
                "timed out after {:?} reading {}",
                timeout, resource_id
            ))
            .for_resource(address.clone())
        })?;

        match result {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(ProviderError::new(format!(
                "Failed to read {}: {}",
                resource_id, e
            ))
            .with_cause(e)
            .for_resource(address.clone())),
        }
    }

    /// Send a request and wait for its operation
    async fn execute(
        &self,
        handler: &dyn ResourceHandler,
        id: &ParsedId,
        request: Request,
        timeout: Duration,
    ) -> ProviderResult<()> {
        match self.start(handler, id, request).await {
            Ok(Some(handle)) => self.wait(&handle, timeout).await,
            Ok(None) => Ok(()),
            Err(e) => Err(ProviderError::new(format!("Request on {} failed: {}", id.id(), e))
                .with_cause(e)),
        }
    }

    /// Send a request, returning the handle of the operation it started
    async fn start(
        &self,
        handler: &dyn ResourceHandler,
        id: &ParsedId,
        request: Request,
    ) -> ClientResult<Option<OperationHandle>> {
        let resource_id = id.id();
        let api_version = handler.api_version();
        let handle = match request {
            Request::Put(body) => {
                log::debug!("PUT {} (api-version {})", resource_id, api_version);
                self.client
                    .begin_create_or_update(&resource_id, api_version, body)
                    .await?
            }
            Request::Patch(patch) => {
                log::debug!("PATCH {} (api-version {})", resource_id, api_version);
                self.client
                    .begin_update(&resource_id, api_version, patch)
                    .await?
            }
            Request::Post {
                target,
                action,
                body,
            } => {
                log::debug!("POST {}/{} (api-version {})", target, action, api_version);
                self.client
                    .begin_post(&target, action, api_version, body)
                    .await?
            }
            Request::Delete => {
                log::debug!("DELETE {} (api-version {})", resource_id, api_version);
                self.client.begin_delete(&resource_id, api_version).await?
            }
            Request::Skip => return Ok(None),
        };
        Ok(Some(handle))
    }

    async fn wait(&self, handle: &OperationHandle, timeout: Duration) -> ProviderResult<()> {
        wait_for_completion(
            self.client.as_ref(),
            handle,
            self.config.poll_interval(),
            timeout,
        )
        .await
    }
}

fn validate(handler: &dyn ResourceHandler, resource: &Resource) -> ProviderResult<()> {
    handler
        .schema()
        .validate(&resource.attributes)
        .map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ProviderError::new(format!("Invalid configuration: {}", messages.join("; ")))
                .for_resource(resource.address.clone())
        })
}

/// Stored IDs were formatted by this provider and are parsed strictly
fn parse_identifier(
    handler: &dyn ResourceHandler,
    identifier: &str,
    address: &ResourceAddress,
) -> ProviderResult<ParsedId> {
    handler
        .id_shape()
        .parse(identifier)
        .map_err(|e| ProviderError::from(e).for_resource(address.clone()))
}

fn with_address(error: ProviderError, address: &ResourceAddress) -> ProviderError {
    if error.address.is_some() {
        error
    } else {
        error.for_resource(address.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use nimbus_core::resource::Value;
    use serde_json::json;

    use crate::client::InMemoryClient;

    const SUBSCRIPTION: &str = "12345678-1234-9876-4563-123456789012";
    const MANAGER_ID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/rg1/providers/Microsoft.Network/networkManagers/nm1";
    const TASK_ID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/rg1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1";

    fn setup(client: InMemoryClient) -> (Arc<InMemoryClient>, AzureRmProvider) {
        let client = Arc::new(client);
        let config = ProviderConfig::new(SUBSCRIPTION).with_poll_interval(Duration::from_millis(1));
        let provider = AzureRmProvider::new(client.clone(), config);
        (client, provider)
    }

    fn network_manager() -> Resource {
        Resource::new("network_manager", "main")
            .with_attribute("name", Value::string("nm1"))
            .with_attribute("location", Value::string("West Europe"))
            .with_attribute("resource_group_name", Value::string("rg1"))
            .with_attribute(
                "scope",
                Value::block(HashMap::from([(
                    "subscription_ids".to_string(),
                    Value::List(vec![Value::string(format!("/subscriptions/{}", SUBSCRIPTION))]),
                )])),
            )
            .with_attribute(
                "scope_accesses",
                Value::List(vec![Value::string("Connectivity")]),
            )
    }

    #[tokio::test]
    async fn create_puts_and_reads_back() {
        let (client, provider) = setup(InMemoryClient::new().with_pending_polls(2));

        let state = provider.create_resource(network_manager()).await.unwrap();

        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some(MANAGER_ID));
        assert_eq!(state.attributes["location"], Value::string("westeurope"));
        assert_eq!(state.attributes["name"], Value::string("nm1"));
        let methods: Vec<&str> = client.calls().await.iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["GET", "PUT", "GET"]);
    }

    #[tokio::test]
    async fn create_requires_import_of_existing_resource() {
        let (client, provider) = setup(InMemoryClient::new());
        client.insert(MANAGER_ID, json!({"location": "westeurope"})).await;

        let err = provider.create_resource(network_manager()).await.unwrap_err();
        assert!(err.message.contains("needs to be imported"));
        assert!(err.message.contains(MANAGER_ID));
        assert!(client.calls().await.iter().all(|c| c.method == "GET"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_configuration() {
        let (client, provider) = setup(InMemoryClient::new());
        let resource = network_manager().with_attribute(
            "scope_accesses",
            Value::List(vec![Value::string("Routing")]),
        );

        let err = provider.create_resource(resource).await.unwrap_err();
        assert!(err.message.starts_with("Invalid configuration"));
        assert!(client.calls().await.is_empty());
    }

    #[tokio::test]
    async fn create_reports_failed_operation() {
        let (client, provider) = setup(InMemoryClient::new());
        client.fail_operations_on(MANAGER_ID, "quota exceeded").await;

        let err = provider.create_resource(network_manager()).await.unwrap_err();
        assert_eq!(err.message, "Operation failed: quota exceeded");
        assert_eq!(err.address, Some(ResourceAddress::new("network_manager", "main")));
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let (client, provider) = setup(InMemoryClient::new());
        let state = provider.read_resource(&network_manager(), None).await.unwrap();
        assert!(!state.exists);
        assert!(client.calls().await.is_empty());
    }

    #[tokio::test]
    async fn read_after_remote_deletion_is_not_found() {
        let (client, provider) = setup(InMemoryClient::new());
        let state = provider.create_resource(network_manager()).await.unwrap();
        client.begin_delete(MANAGER_ID, "2022-09-01").await.unwrap();

        let state = provider
            .read_resource(&network_manager(), state.identifier.as_deref())
            .await
            .unwrap();
        assert!(!state.exists);
        assert_eq!(state.identifier, None);
    }

    #[tokio::test]
    async fn read_rejects_identifier_of_another_shape() {
        let (_, provider) = setup(InMemoryClient::new());
        let err = provider
            .read_resource(
                &network_manager(),
                Some("/subscriptions/sub1/resourceGroups/rg1"),
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("NetworkManager"));
    }

    #[tokio::test]
    async fn update_sends_desired_body() {
        let (client, provider) = setup(InMemoryClient::new());
        let from = provider.create_resource(network_manager()).await.unwrap();
        let to = network_manager().with_attribute("description", Value::string("updated"));

        let state = provider
            .update_resource(MANAGER_ID, &from, to)
            .await
            .unwrap();

        assert_eq!(state.attributes["description"], Value::string("updated"));
        let calls = client.calls().await;
        let put = calls.iter().rev().find(|c| c.method == "PUT").unwrap();
        assert_eq!(put.body.as_ref().unwrap()["properties"]["description"], "updated");
    }

    #[tokio::test]
    async fn delete_tolerates_missing_resource() {
        let (client, provider) = setup(InMemoryClient::new());
        let address = ResourceAddress::new("network_manager", "main");
        let state = provider.create_resource(network_manager()).await.unwrap();

        provider.delete_resource(&address, MANAGER_ID).await.unwrap();
        assert!(!client.contains(MANAGER_ID).await);
        assert!(!provider.resource_exists(&address, MANAGER_ID).await.unwrap());

        provider.delete_resource(&address, MANAGER_ID).await.unwrap();
        assert!(state.exists);
    }

    #[tokio::test]
    async fn schedule_run_posts_to_registry_and_reads_task() {
        let (client, provider) = setup(InMemoryClient::new());
        let registry = TASK_ID.split("/tasks/").next().unwrap();
        client.insert(registry, json!({})).await;
        client.insert(TASK_ID, json!({})).await;
        let resource = Resource::new("container_registry_task_schedule_run_now", "run")
            .with_attribute("container_registry_task_id", Value::string(TASK_ID));

        let state = provider.create_resource(resource.clone()).await.unwrap();

        let schedule_id = format!("{}/schedule/schedule", TASK_ID);
        assert_eq!(state.identifier.as_deref(), Some(schedule_id.as_str()));
        let post = client
            .calls()
            .await
            .into_iter()
            .find(|c| c.method == "POST")
            .unwrap();
        assert_eq!(post.id, format!("{}/scheduleRun", registry));

        // Deleting the run is local only
        provider
            .delete_resource(&resource.address, &schedule_id)
            .await
            .unwrap();
        assert!(client.contains(TASK_ID).await);
        assert!(provider.resource_exists(&resource.address, &schedule_id).await.unwrap());
    }

    #[tokio::test]
    async fn apply_creates_then_converges() {
        let (client, provider) = setup(InMemoryClient::new());
        // "West Europe" and the partial scope are reported back normalized
        let resource = network_manager();

        let created = provider.apply(&resource, None).await.unwrap();
        for _ in 0..3 {
            let again = provider
                .apply(&resource, created.identifier.as_deref())
                .await
                .unwrap();
            assert_eq!(created.identifier, again.identifier);
        }

        let puts = client
            .calls()
            .await
            .iter()
            .filter(|c| c.method == "PUT")
            .count();
        assert_eq!(puts, 1);
    }

    #[tokio::test]
    async fn apply_sends_changed_description_once() {
        let (client, provider) = setup(InMemoryClient::new());
        let created = provider.apply(&network_manager(), None).await.unwrap();
        let resource = network_manager().with_attribute("description", Value::string("v2"));

        provider
            .apply(&resource, created.identifier.as_deref())
            .await
            .unwrap();
        let state = provider
            .apply(&resource, created.identifier.as_deref())
            .await
            .unwrap();

        assert_eq!(state.attributes["description"], Value::string("v2"));
        let puts = client
            .calls()
            .await
            .iter()
            .filter(|c| c.method == "PUT")
            .count();
        assert_eq!(puts, 2);
    }

    #[tokio::test]
    async fn update_refuses_force_new_change() {
        let (client, provider) = setup(InMemoryClient::new());
        let created = provider.apply(&network_manager(), None).await.unwrap();
        let renamed = network_manager().with_attribute("name", Value::string("nm2"));

        let err = provider
            .apply(&renamed, created.identifier.as_deref())
            .await
            .unwrap_err();

        assert!(err.message.contains("Changing name requires replacing"));
        assert!(err.message.contains(MANAGER_ID));
        assert_eq!(err.address, Some(ResourceAddress::new("network_manager", "main")));
        let puts = client
            .calls()
            .await
            .iter()
            .filter(|c| c.method == "PUT")
            .count();
        assert_eq!(puts, 1);

        let err = provider
            .update_resource(
                MANAGER_ID,
                &created,
                network_manager().with_attribute("location", Value::string("North Europe")),
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("Changing location"));
    }

    #[tokio::test]
    async fn unknown_resource_type() {
        let (_, provider) = setup(InMemoryClient::new());
        let err = provider
            .create_resource(Resource::new("storage_account", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unknown resource type: storage_account");
    }
}
