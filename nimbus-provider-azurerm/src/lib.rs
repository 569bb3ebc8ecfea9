//! Nimbus Azure Resource Manager Provider
//!
//! ## Module Structure
//!
//! - `ids` - Resource ID shapes of the managed resources
//! - `client` - Management API interface and an in-memory implementation
//! - `poller` - Long-running operation polling
//! - `config` - Provider configuration (subscription, timeouts)
//! - `services` - Per resource type schema and request mapping
//! - `resources` - Resource type definitions
//! - `provider` - AzureRmProvider implementation
//! - `utils` - Helper functions for value normalization

pub mod client;
pub mod config;
pub mod ids;
pub mod poller;
pub mod provider;
pub mod resources;
pub mod services;
pub mod utils;

// Re-export main types
pub use client::{ClientError, InMemoryClient, ManagementClient};
pub use config::ProviderConfig;
pub use ids::builtin_registry;
pub use provider::AzureRmProvider;

use nimbus_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use nimbus_core::resource::{Resource, ResourceAddress, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AzureRmProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move {
            self.read_resource(&resource, identifier.as_deref())
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&identifier, &from, to).await })
    }

    fn delete(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let address = address.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&address, &identifier).await })
    }

    fn exists(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<bool>> {
        let address = address.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.resource_exists(&address, &identifier).await })
    }
}
