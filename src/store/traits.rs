use crate::model::{InstancetypeTemplate, PreferenceTemplate, VirtualMachine};
use anyhow::Result;

#[async_trait::async_trait]
pub trait VirtualMachineStore: Send + Sync {
    async fn get_virtual_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>>;
    async fn list_virtual_machines(&self, namespace: &str) -> Result<Vec<VirtualMachine>>;
    /// Insert or replace; the stored copy (uid and creation timestamp
    /// assigned) is returned.
    async fn upsert_virtual_machine(&self, vm: VirtualMachine) -> Result<VirtualMachine>;
    async fn delete_virtual_machine(&self, namespace: &str, name: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait InstancetypeStore: Send + Sync {
    async fn get_instancetype(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<InstancetypeTemplate>>;
    async fn list_instancetypes(&self, namespace: &str) -> Result<Vec<InstancetypeTemplate>>;
    async fn upsert_instancetype(
        &self,
        template: InstancetypeTemplate,
    ) -> Result<InstancetypeTemplate>;
    async fn delete_instancetype(&self, namespace: &str, name: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preference(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PreferenceTemplate>>;
    async fn list_preferences(&self, namespace: &str) -> Result<Vec<PreferenceTemplate>>;
    async fn upsert_preference(&self, template: PreferenceTemplate) -> Result<PreferenceTemplate>;
    async fn delete_preference(&self, namespace: &str, name: &str) -> Result<bool>;
}

pub trait Store: VirtualMachineStore + InstancetypeStore + PreferenceStore + Send + Sync {}
