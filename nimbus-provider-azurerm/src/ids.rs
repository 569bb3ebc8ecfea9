//! Resource ID shapes of the Azure Resource Manager resources this provider manages

use nimbus_core::define_resource_id;
use nimbus_core::resource_id::{RegistryError, ResourceIdentifier, ShapeRegistry};

define_resource_id! {
    pub struct SubscriptionId {
        subscription_id,
    }
    shape = "Subscription", "Subscription";
    path = "subscriptions" / {subscription_id};
}

define_resource_id! {
    pub struct ResourceGroupId {
        subscription_id,
        resource_group,
    }
    shape = "ResourceGroup", "Resource Group";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group};
}

define_resource_id! {
    pub struct NetworkManagerId {
        subscription_id,
        resource_group,
        name,
    }
    shape = "NetworkManager", "Network Manager";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.Network" / "networkManagers" / {name};
}

define_resource_id! {
    pub struct NetworkManagerNetworkGroupId {
        subscription_id,
        resource_group,
        network_manager_name,
        network_group_name,
    }
    shape = "NetworkManagerNetworkGroup", "Network Manager Network Group";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.Network" / "networkManagers" / {network_manager_name}
        / "networkGroups" / {network_group_name};
}

define_resource_id! {
    pub struct SubnetId {
        subscription_id,
        resource_group,
        virtual_network_name,
        name,
    }
    shape = "Subnet", "Subnet";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.Network" / "virtualNetworks" / {virtual_network_name}
        / "subnets" / {name};
}

define_resource_id! {
    pub struct ManagedInstanceId {
        subscription_id,
        resource_group,
        name,
    }
    shape = "ManagedInstance", "Managed Instance";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.Sql" / "managedInstances" / {name};
}

define_resource_id! {
    pub struct ManagedInstancesSecurityAlertPolicyId {
        subscription_id,
        resource_group,
        managed_instance_name,
        security_alert_policy_name,
    }
    shape = "ManagedInstancesSecurityAlertPolicy", "Managed Instances Security Alert Policy";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.Sql" / "managedInstances" / {managed_instance_name}
        / "securityAlertPolicies" / {security_alert_policy_name};
}

define_resource_id! {
    pub struct ContainerRegistryId {
        subscription_id,
        resource_group,
        name,
    }
    shape = "ContainerRegistry", "Container Registry";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.ContainerRegistry" / "registries" / {name};
}

define_resource_id! {
    pub struct ContainerRegistryTaskId {
        subscription_id,
        resource_group,
        registry_name,
        task_name,
    }
    shape = "ContainerRegistryTask", "Container Registry Task";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.ContainerRegistry" / "registries" / {registry_name}
        / "tasks" / {task_name};
}

define_resource_id! {
    pub struct ContainerRegistryTaskScheduleId {
        subscription_id,
        resource_group,
        registry_name,
        task_name,
        schedule_name,
    }
    shape = "ContainerRegistryTaskSchedule", "Container Registry Task Schedule";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.ContainerRegistry" / "registries" / {registry_name}
        / "tasks" / {task_name} / "schedule" / {schedule_name};
}

define_resource_id! {
    pub struct RedhatOpenShiftClusterId {
        subscription_id,
        resource_group,
        open_shift_cluster_name,
    }
    shape = "RedhatOpenShiftCluster", "Redhat Open Shift Cluster";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.RedHatOpenShift" / "openShiftClusters" / {open_shift_cluster_name};
}

define_resource_id! {
    pub struct DiskEncryptionSetId {
        subscription_id,
        resource_group,
        name,
    }
    shape = "DiskEncryptionSet", "Disk Encryption Set";
    path = "subscriptions" / {subscription_id} / "resourceGroups" / {resource_group}
        / "providers" / "Microsoft.Compute" / "diskEncryptionSets" / {name};
}

impl NetworkManagerNetworkGroupId {
    pub fn network_manager_id(&self) -> NetworkManagerId {
        NetworkManagerId {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            name: self.network_manager_name.clone(),
        }
    }
}

impl ManagedInstancesSecurityAlertPolicyId {
    pub fn managed_instance_id(&self) -> ManagedInstanceId {
        ManagedInstanceId {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            name: self.managed_instance_name.clone(),
        }
    }
}

impl ContainerRegistryTaskId {
    pub fn registry_id(&self) -> ContainerRegistryId {
        ContainerRegistryId {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            name: self.registry_name.clone(),
        }
    }
}

/// Schedule name used for run-now schedules of a task
pub const RUN_NOW_SCHEDULE_NAME: &str = "schedule";

impl ContainerRegistryTaskScheduleId {
    /// The single run-now schedule of a task
    pub fn run_now(task: &ContainerRegistryTaskId) -> Self {
        Self {
            subscription_id: task.subscription_id.clone(),
            resource_group: task.resource_group.clone(),
            registry_name: task.registry_name.clone(),
            task_name: task.task_name.clone(),
            schedule_name: RUN_NOW_SCHEDULE_NAME.to_string(),
        }
    }

    pub fn task_id(&self) -> ContainerRegistryTaskId {
        ContainerRegistryTaskId {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            registry_name: self.registry_name.clone(),
            task_name: self.task_name.clone(),
        }
    }
}

/// Registry of every shape declared in this module
pub fn builtin_registry() -> Result<ShapeRegistry, RegistryError> {
    ShapeRegistry::builder()
        .register(SubscriptionId::SHAPE)
        .register(ResourceGroupId::SHAPE)
        .register(NetworkManagerId::SHAPE)
        .register(NetworkManagerNetworkGroupId::SHAPE)
        .register(SubnetId::SHAPE)
        .register(ManagedInstanceId::SHAPE)
        .register(ManagedInstancesSecurityAlertPolicyId::SHAPE)
        .register(ContainerRegistryId::SHAPE)
        .register(ContainerRegistryTaskId::SHAPE)
        .register(ContainerRegistryTaskScheduleId::SHAPE)
        .register(RedhatOpenShiftClusterId::SHAPE)
        .register(DiskEncryptionSetId::SHAPE)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Case<T> {
        input: &'static str,
        expected: Option<T>,
    }

    fn error<T>(input: &'static str) -> Case<T> {
        Case {
            input,
            expected: None,
        }
    }

    fn run<T: ResourceIdentifier + PartialEq + std::fmt::Debug>(cases: Vec<Case<T>>) {
        for case in cases {
            match (T::parse(case.input), case.expected) {
                (Ok(actual), Some(expected)) => assert_eq!(actual, expected, "{}", case.input),
                (Err(_), None) => {}
                (Ok(actual), None) => panic!("Expected an error for {:?}, got {:?}", case.input, actual),
                (Err(e), Some(_)) => panic!("Expected a value for {:?}, got {}", case.input, e),
            }
        }
    }

    #[test]
    fn container_registry_task_schedule_id_formatter() {
        let actual = ContainerRegistryTaskScheduleId::new(
            "12345678-1234-9876-4563-123456789012",
            "group1",
            "registry1",
            "task1",
            "schedule1",
        )
        .unwrap()
        .id();
        let expected = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/schedule/schedule1";
        assert_eq!(actual, expected);
    }

    #[test]
    fn container_registry_task_schedule_id() {
        run(vec![
            // empty
            error(""),
            // missing SubscriptionId
            error("/"),
            // missing value for SubscriptionId
            error("/subscriptions/"),
            // missing ResourceGroup
            error("/subscriptions/12345678-1234-9876-4563-123456789012/"),
            // missing value for ResourceGroup
            error("/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/"),
            // missing RegistryName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/",
            ),
            // missing value for RegistryName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/",
            ),
            // missing TaskName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/",
            ),
            // missing value for TaskName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/",
            ),
            // missing ScheduleName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/",
            ),
            // missing value for ScheduleName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/schedule/",
            ),
            Case {
                input: "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/schedule/schedule1",
                expected: Some(ContainerRegistryTaskScheduleId {
                    subscription_id: "12345678-1234-9876-4563-123456789012".to_string(),
                    resource_group: "group1".to_string(),
                    registry_name: "registry1".to_string(),
                    task_name: "task1".to_string(),
                    schedule_name: "schedule1".to_string(),
                }),
            },
            // upper-cased
            error(
                "/SUBSCRIPTIONS/12345678-1234-9876-4563-123456789012/RESOURCEGROUPS/GROUP1/PROVIDERS/MICROSOFT.CONTAINERREGISTRY/REGISTRIES/REGISTRY1/TASKS/TASK1/SCHEDULE/SCHEDULE1",
            ),
        ]);
    }

    #[test]
    fn managed_instances_security_alert_policy_id_formatter() {
        let actual = ManagedInstancesSecurityAlertPolicyId::new(
            "12345678-1234-9876-4563-123456789012",
            "group1",
            "instance1",
            "Default",
        )
        .unwrap()
        .id();
        let expected = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.Sql/managedInstances/instance1/securityAlertPolicies/Default";
        assert_eq!(actual, expected);
    }

    #[test]
    fn managed_instances_security_alert_policy_id() {
        run(vec![
            // empty
            error(""),
            // missing SubscriptionId
            error("/"),
            // missing value for SubscriptionId
            error("/subscriptions/"),
            // missing ResourceGroup
            error("/subscriptions/12345678-1234-9876-4563-123456789012/"),
            // missing value for ResourceGroup
            error("/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/"),
            // missing ManagedInstanceName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.Sql/",
            ),
            // missing value for ManagedInstanceName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.Sql/managedInstances/",
            ),
            // missing SecurityAlertPolicyName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.Sql/managedInstances/instance1/",
            ),
            // missing value for SecurityAlertPolicyName
            error(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.Sql/managedInstances/instance1/securityAlertPolicies/",
            ),
            Case {
                input: "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.Sql/managedInstances/instance1/securityAlertPolicies/Default",
                expected: Some(ManagedInstancesSecurityAlertPolicyId {
                    subscription_id: "12345678-1234-9876-4563-123456789012".to_string(),
                    resource_group: "group1".to_string(),
                    managed_instance_name: "instance1".to_string(),
                    security_alert_policy_name: "Default".to_string(),
                }),
            },
            // upper-cased
            error(
                "/SUBSCRIPTIONS/12345678-1234-9876-4563-123456789012/RESOURCEGROUPS/GROUP1/PROVIDERS/MICROSOFT.SQL/MANAGEDINSTANCES/INSTANCE1/SECURITYALERTPOLICIES/DEFAULT",
            ),
        ]);
    }

    #[test]
    fn network_manager_id_round_trip() {
        let id = NetworkManagerId::new("sub1", "rg1", "nm1").unwrap();
        assert_eq!(
            id.id(),
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/networkManagers/nm1"
        );
        assert_eq!(NetworkManagerId::parse(&id.id()).unwrap(), id);
        assert_eq!(
            id.to_string(),
            "Network Manager: (Name \"nm1\" / Resource Group \"rg1\" / Subscription Id \"sub1\")"
        );
    }

    #[test]
    fn parent_ids() {
        let group = NetworkManagerNetworkGroupId::new("sub1", "rg1", "nm1", "ng1").unwrap();
        assert_eq!(
            group.network_manager_id(),
            NetworkManagerId::new("sub1", "rg1", "nm1").unwrap()
        );

        let task = ContainerRegistryTaskId::new("sub1", "rg1", "reg1", "task1").unwrap();
        assert_eq!(
            task.registry_id().id(),
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.ContainerRegistry/registries/reg1"
        );

        let schedule = ContainerRegistryTaskScheduleId::run_now(&task);
        assert_eq!(schedule.id(), format!("{}/schedule/schedule", task.id()));
        assert_eq!(schedule.task_id(), task);

        let policy =
            ManagedInstancesSecurityAlertPolicyId::new("sub1", "rg1", "mi1", "Default").unwrap();
        assert_eq!(policy.managed_instance_id().name(), "mi1");
    }

    #[test]
    fn parent_ids_parse_back() {
        let schedule = ContainerRegistryTaskScheduleId::run_now(
            &ContainerRegistryTaskId::new("sub1", "rg1", "reg1", "task1").unwrap(),
        );
        let task = schedule.task_id();
        let group = NetworkManagerNetworkGroupId::new("sub1", "rg1", "nm1", "ng1").unwrap();
        let policy =
            ManagedInstancesSecurityAlertPolicyId::new("sub1", "rg1", "mi1", "Default").unwrap();

        assert_eq!(ContainerRegistryTaskScheduleId::parse(&schedule.id()).unwrap(), schedule);
        assert_eq!(ContainerRegistryTaskId::parse(&task.id()).unwrap(), task);
        assert_eq!(
            ContainerRegistryId::parse(&task.registry_id().id()).unwrap(),
            task.registry_id()
        );
        assert_eq!(
            NetworkManagerId::parse(&group.network_manager_id().id()).unwrap(),
            group.network_manager_id()
        );
        assert_eq!(
            ManagedInstanceId::parse(&policy.managed_instance_id().id()).unwrap(),
            policy.managed_instance_id()
        );
    }

    #[test]
    fn every_builtin_shape_follows_the_codec_laws() {
        let registry = builtin_registry().unwrap();
        for shape in registry.iter() {
            assert!(shape.parse("").is_err(), "{} accepted an empty ID", shape.name);

            let values: Vec<String> = shape
                .field_names()
                .enumerate()
                .map(|(i, field)| format!("{}{}", field.replace('_', "-"), i))
                .collect();
            let input = shape.format(values.as_slice()).unwrap();

            let parsed = shape.parse(&input).unwrap();
            let round_trip: Vec<&str> = parsed.fields().map(|(_, value)| value).collect();
            assert_eq!(round_trip, values, "{}", shape.name);
            assert_eq!(parsed.id(), input);

            assert!(
                shape.parse(&input.to_uppercase()).is_err(),
                "{} accepted {}",
                shape.name,
                input.to_uppercase()
            );
            assert!(shape.parse(&format!("{}/", input)).is_err());
            assert!(shape.build(vec![String::new(); values.len()].as_slice()).is_err());
        }
    }

    #[test]
    fn builtin_registry_identifies_shapes() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.len(), 12);

        let matches = registry.identify(
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/default",
        );
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].shape().name, "Subnet");
        assert_eq!(matches[0].get("virtual_network_name"), Some("vnet1"));

        assert!(registry.identify("/subscriptions").is_empty());
    }
}
