//! Generic Azure Resource Manager IDs
//!
//! Accepts any `/subscriptions/{id}[/resourceGroups/{name}][/providers/{namespace}/...]`
//! path without knowing its shape in advance. Used for attributes that may
//! reference a resource of any type.

use super::{MalformedReason, ResourceIdError};

const SHAPE_NAME: &str = "ResourceId";

/// An ARM resource ID split into its well-known parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    /// Resource provider namespace (e.g. "Microsoft.Network")
    pub provider: Option<String>,
    /// Remaining type/name pairs below the provider
    pub path: Vec<(String, String)>,
}

impl ArmResourceId {
    /// Parse an ID; a trailing slash is tolerated
    pub fn parse(input: &str) -> Result<Self, ResourceIdError> {
        let malformed = |reason| ResourceIdError::new(SHAPE_NAME, input, reason);

        if input.is_empty() {
            return Err(malformed(MalformedReason::Empty));
        }
        let Some(path) = input.strip_prefix('/') else {
            return Err(malformed(MalformedReason::MissingLeadingSlash));
        };
        let path = path.strip_suffix('/').unwrap_or(path);

        let components: Vec<&str> = path.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(malformed(MalformedReason::UnbalancedPairs));
        }

        let mut pairs = components.chunks(2).map(|pair| (pair[0], pair[1]));

        let subscription_id = match pairs.next() {
            Some(("subscriptions", "")) => {
                return Err(malformed(MalformedReason::EmptyValue("subscriptions")));
            }
            Some(("subscriptions", value)) => value.to_string(),
            Some((found, _)) => {
                return Err(malformed(MalformedReason::UnexpectedSegment {
                    expected: "subscriptions",
                    found: found.to_string(),
                }));
            }
            None => return Err(malformed(MalformedReason::MissingSegment("subscriptions"))),
        };

        let mut resource_group = None;
        let mut provider = None;
        let mut rest = Vec::new();

        for (key, value) in pairs {
            if key.is_empty() {
                return Err(malformed(MalformedReason::EmptyValue("key")));
            }
            if value.is_empty() {
                return Err(malformed(MalformedReason::EmptyValue("value")));
            }
            match key {
                // ARM returns both casings for resource groups
                "resourceGroups" | "resourcegroups" if resource_group.is_none() && provider.is_none() => {
                    resource_group = Some(value.to_string());
                }
                "providers" if provider.is_none() => provider = Some(value.to_string()),
                _ => rest.push((key.to_string(), value.to_string())),
            }
        }

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path: rest,
        })
    }

    /// Value of the first path pair with the given key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
