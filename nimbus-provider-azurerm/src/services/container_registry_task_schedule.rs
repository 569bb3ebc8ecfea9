//! container_registry_task_schedule_run_now - Schedule a run of a container registry task
//!
//! There is no schedule resource on the remote side: creating schedules one
//! run of the task, and the resource lives as long as the task does.

use std::collections::HashMap;

use nimbus_core::provider::{ProviderError, ProviderResult};
use nimbus_core::resource::{Resource, State, Value};
use nimbus_core::resource_id::{IdShape, ParsedId, ResourceIdentifier};
use nimbus_core::schema::{AttributeSchema, ResourceSchema, types};
use serde_json::{Value as JsonValue, json};

use super::{Request, ResourceHandler, required_str};
use crate::ids::{ContainerRegistryTaskId, ContainerRegistryTaskScheduleId};

pub struct TaskScheduleRunNowHandler;

impl ResourceHandler for TaskScheduleRunNowHandler {
    fn resource_type(&self) -> &'static str {
        "container_registry_task_schedule_run_now"
    }

    fn api_version(&self) -> &'static str {
        "2019-06-01-preview"
    }

    fn id_shape(&self) -> &'static IdShape {
        ContainerRegistryTaskScheduleId::SHAPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.resource_type()).attribute(
            AttributeSchema::new(
                "container_registry_task_id",
                types::resource_id_of::<ContainerRegistryTaskId>(),
            )
            .required()
            .force_new(),
        )
    }

    fn build_id(&self, _subscription_id: &str, resource: &Resource) -> ProviderResult<ParsedId> {
        let task = ContainerRegistryTaskId::parse(required_str(resource, "container_registry_task_id")?)?;
        Ok(ContainerRegistryTaskScheduleId::run_now(&task).to_parsed())
    }

    fn create_request(&self, id: &ParsedId, _resource: &Resource) -> ProviderResult<Request> {
        let task = ContainerRegistryTaskScheduleId::from_parsed(id.clone())?.task_id();
        Ok(Request::Post {
            target: task.registry_id().id(),
            action: "scheduleRun",
            body: json!({
                "type": "TaskRunRequest",
                "taskId": task.id(),
            }),
        })
    }

    fn update_request(
        &self,
        _id: &ParsedId,
        _from: &State,
        to: &Resource,
        changed: &[String],
    ) -> ProviderResult<Request> {
        if changed.is_empty() {
            return Ok(Request::Skip);
        }
        Err(ProviderError::new(format!(
            "{} cannot be updated in place, recreate it",
            self.resource_type()
        ))
        .for_resource(to.address.clone()))
    }

    fn delete_request(&self, _id: &ParsedId) -> Request {
        Request::Skip
    }

    fn read_target(&self, id: &ParsedId) -> ProviderResult<String> {
        Ok(ContainerRegistryTaskScheduleId::from_parsed(id.clone())?
            .task_id()
            .id())
    }

    fn flatten(
        &self,
        id: &ParsedId,
        _body: &JsonValue,
        _config: &Resource,
    ) -> ProviderResult<HashMap<String, Value>> {
        let task = ContainerRegistryTaskScheduleId::from_parsed(id.clone())?.task_id();
        Ok(HashMap::from([(
            "container_registry_task_id".to_string(),
            Value::string(task.id()),
        )]))
    }

    fn requires_import_check(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1";

    fn config() -> Resource {
        Resource::new("container_registry_task_schedule_run_now", "test")
            .with_attribute("container_registry_task_id", Value::string(TASK))
    }

    #[test]
    fn id_appends_fixed_schedule() {
        let id = TaskScheduleRunNowHandler.build_id("ignored", &config()).unwrap();
        assert_eq!(id.id(), format!("{}/schedule/schedule", TASK));
        assert_eq!(TaskScheduleRunNowHandler.read_target(&id).unwrap(), TASK);
    }

    #[test]
    fn create_posts_schedule_run_on_registry() {
        let id = TaskScheduleRunNowHandler.build_id("ignored", &config()).unwrap();
        let request = TaskScheduleRunNowHandler.create_request(&id, &config()).unwrap();
        assert_eq!(
            request,
            Request::Post {
                target: "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1".to_string(),
                action: "scheduleRun",
                body: json!({"type": "TaskRunRequest", "taskId": TASK}),
            }
        );
    }

    #[test]
    fn rejects_task_id_of_another_shape() {
        let resource = config().with_attribute(
            "container_registry_task_id",
            Value::string("/subscriptions/sub1/resourceGroups/group1"),
        );
        assert!(TaskScheduleRunNowHandler.build_id("sub1", &resource).is_err());
        assert!(
            TaskScheduleRunNowHandler
                .schema()
                .validate(&resource.attributes)
                .is_err()
        );
    }

    #[test]
    fn update_is_refused() {
        let id = TaskScheduleRunNowHandler.build_id("sub1", &config()).unwrap();
        let from = State::not_found(config().address);
        assert_eq!(
            TaskScheduleRunNowHandler
                .update_request(&id, &from, &config(), &[])
                .unwrap(),
            Request::Skip
        );
        assert!(
            TaskScheduleRunNowHandler
                .update_request(&id, &from, &config(), &["container_registry_task_id".to_string()])
                .is_err()
        );
    }
}
