//! Resource type definitions
//!
//! Each resource type is backed by the handler of the same name in
//! [`crate::services`].

use nimbus_core::provider::ResourceType;
use nimbus_core::resource_id::IdShape;
use nimbus_core::schema::ResourceSchema;

use crate::services::ResourceHandler;
use crate::services::container_registry_task_schedule::TaskScheduleRunNowHandler;
use crate::services::mssql_security_alert_policy::SecurityAlertPolicyHandler;
use crate::services::network_group::NetworkGroupHandler;
use crate::services::network_manager::NetworkManagerHandler;
use crate::services::redhat_openshift_cluster::OpenShiftClusterHandler;

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $handler:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $handler.resource_type()
            }
            fn schema(&self) -> ResourceSchema {
                $handler.schema()
            }
            fn id_shape(&self) -> &'static IdShape {
                $handler.id_shape()
            }
        }
    };
}

define_resource_type!(NetworkManagerType, NetworkManagerHandler);
define_resource_type!(NetworkManagerNetworkGroupType, NetworkGroupHandler);
define_resource_type!(
    ManagedInstanceSecurityAlertPolicyType,
    SecurityAlertPolicyHandler
);
define_resource_type!(ContainerRegistryTaskScheduleRunNowType, TaskScheduleRunNowHandler);
define_resource_type!(
    RedhatOpenShiftClusterType,
    OpenShiftClusterHandler::default()
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(NetworkManagerType),
        Box::new(NetworkManagerNetworkGroupType),
        Box::new(ManagedInstanceSecurityAlertPolicyType),
        Box::new(ContainerRegistryTaskScheduleRunNowType),
        Box::new(RedhatOpenShiftClusterType),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::handlers;

    #[test]
    fn one_type_per_handler() {
        let types = resource_types();
        let handlers = handlers();
        assert_eq!(types.len(), handlers.len());
        for (rt, handler) in types.iter().zip(handlers.iter()) {
            assert_eq!(rt.name(), handler.resource_type());
            assert_eq!(rt.id_shape().name, handler.id_shape().name);
        }
    }

    #[test]
    fn redhat_openshift_cluster_shape() {
        assert_eq!(
            RedhatOpenShiftClusterType.id_shape().template(),
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroup}/providers/Microsoft.RedHatOpenShift/openShiftClusters/{openShiftClusterName}"
        );
    }
}
