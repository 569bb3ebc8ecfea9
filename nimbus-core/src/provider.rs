//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific remote service.
//! It turns configuration into API calls and keys every managed resource
//! by the resource ID the service assigns.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceAddress, State};
use crate::resource_id::{IdShape, ParsedId, ResourceIdError};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub address: Option<ResourceAddress>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref address) = self.address {
            write!(f, "[{}] {}", address, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            address: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, address: ResourceAddress) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<ResourceIdError> for ProviderError {
    fn from(e: ResourceIdError) -> Self {
        ProviderError::new(e.to_string()).with_cause(e)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "network_manager")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;

    /// Shape of the resource IDs of this type
    fn id_shape(&self) -> &'static IdShape;
}

/// Main Provider trait
///
/// All remote operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "azurerm")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// `resource` carries the configuration, used for values the service
    /// never returns (secrets). Without an identifier nothing can be looked up
    /// and `State::not_found()` is returned, as it is when the resource is gone.
    fn read(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the new resource ID
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Check whether the resource behind `identifier` still exists
    fn exists(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<bool>>;

    /// Check that an externally supplied ID is valid for the resource type
    fn validate_import(&self, resource_type: &str, identifier: &str) -> ProviderResult<()> {
        parse_import_id(&self.resource_types(), resource_type, identifier)?;
        Ok(())
    }
}

/// Parse an externally supplied ID with the shape of `resource_type`
pub fn parse_import_id(
    resource_types: &[Box<dyn ResourceType>],
    resource_type: &str,
    identifier: &str,
) -> ProviderResult<ParsedId> {
    let rt = resource_types
        .iter()
        .find(|rt| rt.name() == resource_type)
        .ok_or_else(|| ProviderError::new(format!("Unknown resource type: {}", resource_type)))?;
    Ok(rt.id_shape().parse(identifier)?)
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(resource, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(identifier, from, to)
    }

    fn delete(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(address, identifier)
    }

    fn exists(
        &self,
        address: &ResourceAddress,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<bool>> {
        (**self).exists(address, identifier)
    }

    fn validate_import(&self, resource_type: &str, identifier: &str) -> ProviderResult<()> {
        (**self).validate_import(resource_type, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_id::ResourceIdentifier;

    crate::define_resource_id! {
        pub struct MockId {
            subscription_id,
            name,
        }
        shape = "Mock", "Mock Resource";
        path = "subscriptions" / {subscription_id} / "providers" / "Mock.Service" / "things" / {name};
    }

    struct MockType;

    impl ResourceType for MockType {
        fn name(&self) -> &'static str {
            "mock_thing"
        }

        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new("mock_thing")
        }

        fn id_shape(&self) -> &'static IdShape {
            MockId::SHAPE
        }
    }

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![Box::new(MockType)]
        }

        fn read(
            &self,
            resource: &Resource,
            _identifier: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let address = resource.address.clone();
            Box::pin(async move { Ok(State::not_found(address)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let address = resource.address.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move {
                let id = MockId::new("sub1", address.name.clone())?;
                Ok(State::existing(address, attrs).with_identifier(id.id()))
            })
        }

        fn update(
            &self,
            identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let address = to.address.clone();
            let attrs = to.attributes.clone();
            let parsed: Result<ParsedId, _> = MockId::SHAPE.parse(identifier);
            Box::pin(async move {
                let parsed = parsed?;
                Ok(State::existing(address, attrs).with_identifier(parsed.id()))
            })
        }

        fn delete(
            &self,
            _address: &ResourceAddress,
            _identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn exists(
            &self,
            _address: &ResourceAddress,
            _identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<bool>> {
            Box::pin(async { Ok(false) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_returns_not_found() {
        let provider = MockProvider;
        let resource = Resource::new("mock_thing", "example");
        let state = provider.read(&resource, None).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn mock_provider_create_returns_identifier() {
        let provider = MockProvider;
        let resource = Resource::new("mock_thing", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(
            state.identifier.as_deref(),
            Some("/subscriptions/sub1/providers/Mock.Service/things/example")
        );
    }

    #[tokio::test]
    async fn mock_provider_create_rejects_empty_name() {
        let provider = MockProvider;
        let resource = Resource::new("mock_thing", "");
        let err = provider.create(&resource).await.unwrap_err();
        assert!(err.message.contains("empty value for 'name'"));
    }

    #[tokio::test]
    async fn mock_provider_update_propagates_malformed_id() {
        let provider = MockProvider;
        let from = State::not_found(ResourceAddress::new("mock_thing", "example"));
        let to = Resource::new("mock_thing", "example");
        assert!(provider.update("/things/example", &from, &to).await.is_err());
    }

    #[test]
    fn validate_import_uses_resource_type_shape() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        assert!(
            provider
                .validate_import(
                    "mock_thing",
                    "/subscriptions/sub1/providers/Mock.Service/things/example"
                )
                .is_ok()
        );
        assert!(
            provider
                .validate_import("mock_thing", "/subscriptions/sub1")
                .is_err()
        );
        assert!(provider.validate_import("other", "/subscriptions/sub1").is_err());
    }

    #[test]
    fn parse_import_id_returns_fields() {
        let types: Vec<Box<dyn ResourceType>> = vec![Box::new(MockType)];
        let parsed = parse_import_id(
            &types,
            "mock_thing",
            "/subscriptions/sub1/providers/Mock.Service/things/example",
        )
        .unwrap();
        assert_eq!(parsed.get("name"), Some("example"));

        let err = parse_import_id(&types, "other", "/subscriptions/sub1").unwrap_err();
        assert_eq!(err.message, "Unknown resource type: other");
    }

    #[test]
    fn error_display_includes_address() {
        let err = ProviderError::new("boom").for_resource(ResourceAddress::new("mock_thing", "a"));
        assert_eq!(err.to_string(), "[mock_thing.a] boom");
    }
}
