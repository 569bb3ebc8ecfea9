//! redhat_openshift_cluster - Microsoft.RedHatOpenShift/openShiftClusters

use std::collections::HashMap;

use nimbus_core::provider::ProviderResult;
use nimbus_core::resource::{Resource, State, Value};
use nimbus_core::resource_id::{IdShape, ParsedId, ResourceIdentifier};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde_json::{Value as JsonValue, json};

use super::{Request, ResourceHandler, required_str};
use crate::ids::{RedhatOpenShiftClusterId, ResourceGroupId, SubnetId};
use crate::utils::{
    block_bool, block_int, block_str, expand_tags, flatten_tags, generate_random_domain_name,
    json_str, location_value, normalize_location,
};

pub const DEFAULT_POD_CIDR: &str = "10.128.0.0/14";
pub const DEFAULT_SERVICE_CIDR: &str = "172.30.0.0/16";
pub const WORKER_PROFILE_NAME: &str = "worker";
pub const INGRESS_PROFILE_NAME: &str = "default";
pub const VISIBILITIES: [&str; 2] = ["Public", "Private"];
pub const MIN_DISK_SIZE_GB: i64 = 128;

type Block = HashMap<String, Value>;

pub struct OpenShiftClusterHandler {
    domain_name: fn() -> String,
}

impl Default for OpenShiftClusterHandler {
    fn default() -> Self {
        Self {
            domain_name: generate_random_domain_name,
        }
    }
}

impl OpenShiftClusterHandler {
    /// Use `domain_name` for clusters configured without a domain
    pub fn with_domain_generator(domain_name: fn() -> String) -> Self {
        Self { domain_name }
    }

    fn expand_cluster_profile(
        &self,
        subscription_id: &str,
        profile: Option<&Block>,
        current_domain: Option<&str>,
    ) -> ProviderResult<JsonValue> {
        let domain = profile
            .map(|p| block_str(p, "domain"))
            .filter(|d| !d.is_empty())
            .or(current_domain.filter(|d| !d.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| (self.domain_name)());
        let resource_group_id =
            ResourceGroupId::new(subscription_id, format!("aro-{}", domain))?.id();
        let fips_enabled = profile.is_some_and(|p| block_bool(p, "fips_enabled"));

        let mut out = json!({
            "resourceGroupId": resource_group_id,
            "domain": domain,
            "fipsValidatedModules": enabled_flag(fips_enabled),
        });
        if let Some(pull_secret) = profile.map(|p| block_str(p, "pull_secret")) {
            out["pullSecret"] = json!(pull_secret);
        }
        Ok(out)
    }
}

impl ResourceHandler for OpenShiftClusterHandler {
    fn resource_type(&self) -> &'static str {
        "redhat_openshift_cluster"
    }

    fn api_version(&self) -> &'static str {
        "2022-04-01"
    }

    fn id_shape(&self) -> &'static IdShape {
        RedhatOpenShiftClusterId::SHAPE
    }

    fn schema(&self) -> ResourceSchema {
        let visibility = || {
            AttributeSchema::new(
                "visibility",
                AttributeType::Enum(VISIBILITIES.iter().map(|s| s.to_string()).collect()),
            )
            .computed()
        };
        let encryption_at_host =
            || AttributeSchema::new("encryption_at_host_enabled", AttributeType::Bool).with_default(Value::Bool(false));
        let disk_encryption_set_id =
            || AttributeSchema::new("disk_encryption_set_id", types::arm_resource_id());
        let subnet_id = || {
            AttributeSchema::new("subnet_id", types::resource_id_of::<SubnetId>()).required()
        };
        let vm_size = || AttributeSchema::new("vm_size", types::non_empty_string()).required();

        ResourceSchema::new(self.resource_type())
            .with_description("Azure Red Hat OpenShift cluster")
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
                    "service_principal",
                    1,
                    vec![
                        AttributeSchema::new("client_id", types::uuid()).required(),
                        AttributeSchema::new("client_secret", types::non_empty_string())
                            .required()
                            .sensitive(),
                    ],
                )
                .required(),
            )
            .attribute(
                AttributeSchema::block(
                    "cluster_profile",
                    1,
                    vec![
                        AttributeSchema::new("pull_secret", types::non_empty_string()),
                        AttributeSchema::new("domain", types::non_empty_string())
                            .computed()
                            .force_new(),
                        AttributeSchema::new("fips_enabled", AttributeType::Bool)
                            .with_default(Value::Bool(false)),
                    ],
                )
                .computed(),
            )
            .attribute(
                AttributeSchema::block(
                    "network_profile",
                    1,
                    vec![
                        AttributeSchema::new("pod_cidr", types::cidr())
                            .computed()
                            .force_new(),
                        AttributeSchema::new("service_cidr", types::cidr())
                            .computed()
                            .force_new(),
                    ],
                )
                .computed()
                .force_new(),
            )
            .attribute(
                AttributeSchema::block(
                    "main_profile",
                    1,
                    vec![
                        subnet_id(),
                        vm_size(),
                        encryption_at_host(),
                        disk_encryption_set_id(),
                    ],
                )
                .required(),
            )
            .attribute(
                AttributeSchema::block(
                    "worker_profile",
                    1,
                    vec![
                        vm_size(),
                        AttributeSchema::new("disk_size_gb", disk_size_gb()).required(),
                        AttributeSchema::new("node_count", AttributeType::Int).required(),
                        subnet_id(),
                        encryption_at_host(),
                        disk_encryption_set_id(),
                    ],
                )
                .required(),
            )
            .attribute(AttributeSchema::block("api_server_profile", 1, vec![visibility()]).computed())
            .attribute(
                AttributeSchema::block("ingress_profile", 1, vec![visibility()])
                    .computed()
                    .force_new(),
            )
            .attribute(AttributeSchema::new(
                "tags",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
            .attribute(AttributeSchema::new("version", AttributeType::String).read_only())
            .attribute(AttributeSchema::new("console_url", AttributeType::String).read_only())
    }

    fn build_id(&self, subscription_id: &str, resource: &Resource) -> ProviderResult<ParsedId> {
        let id = RedhatOpenShiftClusterId::new(
            subscription_id,
            required_str(resource, "resource_group_name")?,
            required_str(resource, "name")?,
        )?;
        Ok(id.to_parsed())
    }

    fn create_request(&self, id: &ParsedId, resource: &Resource) -> ProviderResult<Request> {
        let id = RedhatOpenShiftClusterId::from_parsed(id.clone())?;
        let cluster_profile = self.expand_cluster_profile(
            id.subscription_id(),
            resource.block("cluster_profile"),
            None,
        )?;

        Ok(Request::Put(json!({
            "name": id.open_shift_cluster_name(),
            "location": normalize_location(resource.get_str("location").unwrap_or_default()),
            "tags": expand_tags(resource.get("tags")),
            "properties": {
                "clusterProfile": cluster_profile,
                "consoleProfile": {},
                "servicePrincipalProfile": expand_service_principal(resource.block("service_principal")),
                "networkProfile": expand_network_profile(resource.block("network_profile")),
                "masterProfile": expand_main_profile(resource.block("main_profile")),
                "workerProfiles": expand_worker_profiles(resource.block("worker_profile")),
                "apiserverProfile": {
                    "visibility": visibility_of(resource.block("api_server_profile")),
                },
                "ingressProfiles": [{
                    "name": INGRESS_PROFILE_NAME,
                    "visibility": visibility_of(resource.block("ingress_profile")),
                }],
            },
        })))
    }

    fn update_request(
        &self,
        id: &ParsedId,
        from: &State,
        to: &Resource,
        changed: &[String],
    ) -> ProviderResult<Request> {
        let id = RedhatOpenShiftClusterId::from_parsed(id.clone())?;
        let has_change = |key: &str| changed.iter().any(|c| c == key);
        let mut properties = serde_json::Map::new();

        if has_change("cluster_profile") {
            let current_domain = from
                .attributes
                .get("cluster_profile")
                .and_then(Value::first_block)
                .map(|p| block_str(p, "domain"));
            properties.insert(
                "clusterProfile".to_string(),
                self.expand_cluster_profile(
                    id.subscription_id(),
                    to.block("cluster_profile"),
                    current_domain,
                )?,
            );
        }
        if has_change("main_profile") {
            properties.insert(
                "masterProfile".to_string(),
                expand_main_profile(to.block("main_profile")),
            );
        }
        if has_change("worker_profile") {
            properties.insert(
                "workerProfiles".to_string(),
                expand_worker_profiles(to.block("worker_profile")),
            );
        }

        let mut patch = json!({ "tags": expand_tags(to.get("tags")) });
        if !properties.is_empty() {
            patch["properties"] = JsonValue::Object(properties);
        }
        Ok(Request::Patch(patch))
    }

    fn flatten(
        &self,
        id: &ParsedId,
        body: &JsonValue,
        config: &Resource,
    ) -> ProviderResult<HashMap<String, Value>> {
        let id = RedhatOpenShiftClusterId::from_parsed(id.clone())?;
        let mut attributes = HashMap::from([
            ("name".to_string(), Value::string(id.open_shift_cluster_name())),
            ("resource_group_name".to_string(), Value::string(id.resource_group())),
            ("tags".to_string(), flatten_tags(body.get("tags"))),
        ]);
        if let Some(location) = body.get("location").and_then(JsonValue::as_str) {
            attributes.insert(
                "location".to_string(),
                Value::string(normalize_location(location)),
            );
        }

        let props = &body["properties"];
        if !props.is_object() {
            return Ok(attributes);
        }

        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                attributes.insert(key.to_string(), value);
            }
        };

        let cluster = props.get("clusterProfile");
        set("cluster_profile", cluster.map(flatten_cluster_profile));
        set(
            "service_principal",
            props
                .get("servicePrincipalProfile")
                .map(|p| flatten_service_principal(p, config)),
        );
        set(
            "network_profile",
            props.get("networkProfile").map(flatten_network_profile),
        );
        set("main_profile", props.get("masterProfile").map(flatten_main_profile));
        set(
            "worker_profile",
            props
                .get("workerProfiles")
                .and_then(JsonValue::as_array)
                .map(|profiles| Value::List(profiles.iter().map(flatten_worker_profile).collect())),
        );
        set(
            "api_server_profile",
            props.get("apiserverProfile").map(|p| {
                Value::block(HashMap::from([(
                    "visibility".to_string(),
                    Value::string(json_str(p, "visibility")),
                )]))
            }),
        );
        set(
            "ingress_profile",
            props
                .get("ingressProfiles")
                .and_then(JsonValue::as_array)
                .map(|profiles| {
                    Value::List(
                        profiles
                            .iter()
                            .map(|p| {
                                Value::Map(HashMap::from([(
                                    "visibility".to_string(),
                                    Value::string(json_str(p, "visibility")),
                                )]))
                            })
                            .collect(),
                    )
                }),
        );
        set(
            "version",
            cluster
                .and_then(|c| c.get("version"))
                .and_then(JsonValue::as_str)
                .map(Value::string),
        );
        set(
            "console_url",
            props
                .get("consoleProfile")
                .and_then(|c| c.get("url"))
                .and_then(JsonValue::as_str)
                .map(Value::string),
        );

        Ok(attributes)
    }
}

fn disk_size_gb() -> AttributeType {
    AttributeType::Custom {
        name: "DiskSizeGB".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if *n >= MIN_DISK_SIZE_GB => Ok(()),
            Value::Int(_) => Err(format!(
                "The `disk_size_gb` must be {} or greater",
                MIN_DISK_SIZE_GB
            )),
            _ => Err("Expected integer".to_string()),
        },
    }
}

fn enabled_flag(enabled: bool) -> &'static str {
    if enabled { "Enabled" } else { "Disabled" }
}

fn visibility_of(profile: Option<&Block>) -> String {
    profile
        .map(|p| block_str(p, "visibility"))
        .filter(|v| !v.is_empty())
        .unwrap_or("Public")
        .to_string()
}

fn expand_service_principal(profile: Option<&Block>) -> JsonValue {
    match profile {
        Some(p) => json!({
            "clientId": block_str(p, "client_id"),
            "clientSecret": block_str(p, "client_secret"),
        }),
        None => JsonValue::Null,
    }
}

fn expand_network_profile(profile: Option<&Block>) -> JsonValue {
    let cidr = |key: &str, default: &str| {
        profile
            .map(|p| block_str(p, key))
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    json!({
        "podCidr": cidr("pod_cidr", DEFAULT_POD_CIDR),
        "serviceCidr": cidr("service_cidr", DEFAULT_SERVICE_CIDR),
    })
}

fn expand_main_profile(profile: Option<&Block>) -> JsonValue {
    let Some(p) = profile else {
        return JsonValue::Null;
    };
    let mut out = json!({
        "vmSize": block_str(p, "vm_size"),
        "subnetId": block_str(p, "subnet_id"),
        "encryptionAtHost": enabled_flag(block_bool(p, "encryption_at_host_enabled")),
    });
    insert_disk_encryption_set(&mut out, p);
    out
}

fn expand_worker_profiles(profile: Option<&Block>) -> JsonValue {
    let Some(p) = profile else {
        return JsonValue::Null;
    };
    let mut out = json!({
        "name": WORKER_PROFILE_NAME,
        "vmSize": block_str(p, "vm_size"),
        "diskSizeGB": block_int(p, "disk_size_gb").unwrap_or(MIN_DISK_SIZE_GB),
        "subnetId": block_str(p, "subnet_id"),
        "count": block_int(p, "node_count").unwrap_or_default(),
        "encryptionAtHost": enabled_flag(block_bool(p, "encryption_at_host_enabled")),
    });
    insert_disk_encryption_set(&mut out, p);
    json!([out])
}

fn insert_disk_encryption_set(out: &mut JsonValue, profile: &Block) {
    let id = block_str(profile, "disk_encryption_set_id");
    if !id.is_empty() {
        out["diskEncryptionSetId"] = json!(id);
    }
}

fn flatten_cluster_profile(profile: &JsonValue) -> Value {
    Value::block(HashMap::from([
        (
            "pull_secret".to_string(),
            Value::string(json_str(profile, "pullSecret")),
        ),
        ("domain".to_string(), Value::string(json_str(profile, "domain"))),
        (
            "fips_enabled".to_string(),
            Value::Bool(json_str(profile, "fipsValidatedModules") == "Enabled"),
        ),
    ]))
}

/// The client secret is never returned and is kept from configuration
fn flatten_service_principal(profile: &JsonValue, config: &Resource) -> Value {
    let client_secret = config
        .block("service_principal")
        .map(|p| block_str(p, "client_secret"))
        .unwrap_or_default();
    Value::block(HashMap::from([
        (
            "client_id".to_string(),
            Value::string(json_str(profile, "clientId")),
        ),
        ("client_secret".to_string(), Value::string(client_secret)),
    ]))
}

fn flatten_network_profile(profile: &JsonValue) -> Value {
    Value::block(HashMap::from([
        ("pod_cidr".to_string(), Value::string(json_str(profile, "podCidr"))),
        (
            "service_cidr".to_string(),
            Value::string(json_str(profile, "serviceCidr")),
        ),
    ]))
}

fn flatten_main_profile(profile: &JsonValue) -> Value {
    let mut block = HashMap::from([
        ("vm_size".to_string(), Value::string(json_str(profile, "vmSize"))),
        ("subnet_id".to_string(), Value::string(json_str(profile, "subnetId"))),
        (
            "encryption_at_host_enabled".to_string(),
            Value::Bool(json_str(profile, "encryptionAtHost") == "Enabled"),
        ),
    ]);
    flatten_disk_encryption_set(&mut block, profile);
    Value::block(block)
}

fn flatten_worker_profile(profile: &JsonValue) -> Value {
    let mut block = HashMap::from([
        ("vm_size".to_string(), Value::string(json_str(profile, "vmSize"))),
        (
            "disk_size_gb".to_string(),
            Value::Int(profile["diskSizeGB"].as_i64().unwrap_or_default()),
        ),
        (
            "node_count".to_string(),
            Value::Int(profile["count"].as_i64().unwrap_or_default()),
        ),
        ("subnet_id".to_string(), Value::string(json_str(profile, "subnetId"))),
        (
            "encryption_at_host_enabled".to_string(),
            Value::Bool(json_str(profile, "encryptionAtHost") == "Enabled"),
        ),
    ]);
    flatten_disk_encryption_set(&mut block, profile);
    Value::Map(block)
}

fn flatten_disk_encryption_set(block: &mut Block, profile: &JsonValue) {
    let id = json_str(profile, "diskEncryptionSetId");
    if !id.is_empty() {
        block.insert("disk_encryption_set_id".to_string(), Value::string(id));
    }
}
