//! State file structures for persisting managed resources

use std::collections::HashMap;

use nimbus_core::resource::{ResourceAddress, State, Value};
use serde::{Deserialize, Serialize};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Nimbus that last modified this state
    pub nimbus_version: String,
    /// All managed resources, at most one per resource ID
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            nimbus_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Bump the serial before writing a modified state
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.nimbus_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Find a resource by its resource ID
    ///
    /// IDs are compared ignoring ASCII case, as the remote service does.
    pub fn find_by_id(&self, id: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.id.eq_ignore_ascii_case(id))
    }

    /// Find a resource by its configuration address
    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    /// Add or replace a resource
    ///
    /// An entry with the same resource ID or the same address is replaced,
    /// so neither an ID nor an address is ever tracked twice.
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        self.resources.retain(|r| {
            !r.id.eq_ignore_ascii_case(&resource.id)
                && !(r.resource_type == resource.resource_type && r.name == resource.name)
        });
        self.resources.push(resource);
    }

    /// Remove the resource tracked under `id`
    pub fn remove_resource(&mut self, id: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.id.eq_ignore_ascii_case(id))?;
        Some(self.resources.remove(pos))
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource ID assigned by the remote service
    pub id: String,
    /// Resource type (e.g., "network_manager")
    pub resource_type: String,
    /// Resource name in configuration
    pub name: String,
    /// Provider name (e.g., "azurerm")
    pub provider: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Whether this resource is protected from deletion
    #[serde(default)]
    pub protected: bool,
}

impl ResourceState {
    pub fn new(
        id: impl Into<String>,
        address: &ResourceAddress,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: address.resource_type.clone(),
            name: address.name.clone(),
            provider: provider.into(),
            attributes: HashMap::new(),
            protected: false,
        }
    }

    /// Entry for a state read from a provider; `None` when it has no resource ID
    pub fn from_state(state: &State, provider: impl Into<String>) -> Option<Self> {
        let id = state.identifier.as_ref()?;
        let mut resource = Self::new(id.clone(), &state.address, provider);
        resource.attributes = state
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Some(resource)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::new(&self.resource_type, &self.name)
    }

    /// Convert back to the state model providers work with
    pub fn to_state(&self) -> State {
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        State::existing(self.address(), attributes).with_identifier(&self.id)
    }
}
