use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::model::{
    generate_uid, InstancetypeTemplate, Metadata, PreferenceTemplate, VirtualMachine,
};
use crate::store::traits::{InstancetypeStore, PreferenceStore, Store, VirtualMachineStore};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// In-memory store keyed by (namespace, name). Each resource family sits
/// behind its own lock; readers hand out clones, so no caller ever holds a
/// reference into the maps.
#[derive(Default)]
pub struct MemoryStore {
    virtual_machines: RwLock<HashMap<Key, VirtualMachine>>,
    instancetypes: RwLock<HashMap<Key, InstancetypeTemplate>>,
    preferences: RwLock<HashMap<Key, PreferenceTemplate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(metadata: &mut Metadata) {
        if metadata.uid.is_none() {
            metadata.uid = Some(generate_uid());
        }
        if metadata.creation_timestamp.is_none() {
            metadata.creation_timestamp = Some(Utc::now());
        }
    }
}

#[async_trait::async_trait]
impl VirtualMachineStore for MemoryStore {
    async fn get_virtual_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>> {
        Ok(self
            .virtual_machines
            .read()
            .get(&key(namespace, name))
            .cloned())
    }

    async fn list_virtual_machines(&self, namespace: &str) -> Result<Vec<VirtualMachine>> {
        let mut items: Vec<VirtualMachine> = self
            .virtual_machines
            .read()
            .values()
            .filter(|vm| vm.metadata.namespace == namespace)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    async fn upsert_virtual_machine(&self, mut vm: VirtualMachine) -> Result<VirtualMachine> {
        Self::stamp(&mut vm.metadata);
        let key = key(&vm.metadata.namespace, &vm.metadata.name);
        self.virtual_machines.write().insert(key, vm.clone());
        Ok(vm)
    }

    async fn delete_virtual_machine(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .virtual_machines
            .write()
            .remove(&key(namespace, name))
            .is_some())
    }
}

#[async_trait::async_trait]
impl InstancetypeStore for MemoryStore {
    async fn get_instancetype(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<InstancetypeTemplate>> {
        Ok(self
            .instancetypes
            .read()
            .get(&key(namespace, name))
            .cloned())
    }

    async fn list_instancetypes(&self, namespace: &str) -> Result<Vec<InstancetypeTemplate>> {
        let mut items: Vec<InstancetypeTemplate> = self
            .instancetypes
            .read()
            .values()
            .filter(|template| template.metadata.namespace == namespace)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    async fn upsert_instancetype(
        &self,
        mut template: InstancetypeTemplate,
    ) -> Result<InstancetypeTemplate> {
        Self::stamp(&mut template.metadata);
        let key = key(&template.metadata.namespace, &template.metadata.name);
        self.instancetypes.write().insert(key, template.clone());
        Ok(template)
    }

    async fn delete_instancetype(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .instancetypes
            .write()
            .remove(&key(namespace, name))
            .is_some())
    }
}

#[async_trait::async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_preference(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PreferenceTemplate>> {
        Ok(self.preferences.read().get(&key(namespace, name)).cloned())
    }

    async fn list_preferences(&self, namespace: &str) -> Result<Vec<PreferenceTemplate>> {
        let mut items: Vec<PreferenceTemplate> = self
            .preferences
            .read()
            .values()
            .filter(|template| template.metadata.namespace == namespace)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    async fn upsert_preference(
        &self,
        mut template: PreferenceTemplate,
    ) -> Result<PreferenceTemplate> {
        Self::stamp(&mut template.metadata);
        let key = key(&template.metadata.namespace, &template.metadata.name);
        self.preferences.write().insert(key, template.clone());
        Ok(template)
    }

    async fn delete_preference(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .preferences
            .write()
            .remove(&key(namespace, name))
            .is_some())
    }
}

impl Store for MemoryStore {}
