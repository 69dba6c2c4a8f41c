use anyhow::Result;
use std::collections::HashMap;

use crate::model::{
    ContainerDisk, Cpu, DevicePreferences, InstanceSpec, InstanceTemplate, InstancetypeMatcher,
    InstancetypeSpec, InstancetypeTemplate, MachinePreference, Memory, Metadata,
    PreferenceMatcher, PreferenceSpec, PreferenceTemplate, VirtualMachine, VirtualMachineSpec,
    Volume,
};
use crate::store::traits::Store;

fn seed_metadata(namespace: &str, name: &str) -> Metadata {
    Metadata {
        name: name.to_string(),
        namespace: namespace.to_string(),
        ..Default::default()
    }
}

/// Loads a small demo inventory: two instancetypes, one preference, and a
/// virtual machine referencing both.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    store
        .upsert_instancetype(InstancetypeTemplate {
            metadata: seed_metadata("default", "u1.small"),
            spec: InstancetypeSpec {
                cpu: Some(Cpu {
                    cores: Some(1),
                    ..Default::default()
                }),
                memory: Some(Memory {
                    guest: Some("2Gi".to_string()),
                    hugepages: None,
                }),
                annotations: HashMap::from([(
                    "vmplane.io/instancetype-class".to_string(),
                    "general-purpose".to_string(),
                )]),
            },
        })
        .await?;

    store
        .upsert_instancetype(InstancetypeTemplate {
            metadata: seed_metadata("default", "u1.large"),
            spec: InstancetypeSpec {
                cpu: Some(Cpu {
                    cores: Some(4),
                    threads: Some(2),
                    dedicated_cpu_placement: Some(true),
                    ..Default::default()
                }),
                memory: Some(Memory {
                    guest: Some("8Gi".to_string()),
                    hugepages: Some("2Mi".to_string()),
                }),
                annotations: HashMap::new(),
            },
        })
        .await?;

    store
        .upsert_preference(PreferenceTemplate {
            metadata: seed_metadata("default", "linux.virtio"),
            spec: PreferenceSpec {
                machine: Some(MachinePreference {
                    preferred_machine_type: Some("q35".to_string()),
                }),
                cpu: None,
                devices: Some(DevicePreferences {
                    preferred_disk_bus: Some("virtio".to_string()),
                    preferred_interface_model: Some("virtio".to_string()),
                }),
                annotations: HashMap::new(),
            },
        })
        .await?;

    store
        .upsert_virtual_machine(VirtualMachine {
            metadata: seed_metadata("default", "demo-vm"),
            spec: VirtualMachineSpec {
                instancetype: Some(InstancetypeMatcher {
                    name: "u1.small".to_string(),
                }),
                preference: Some(PreferenceMatcher {
                    name: "linux.virtio".to_string(),
                }),
                template: InstanceTemplate {
                    spec: InstanceSpec {
                        volumes: vec![Volume {
                            name: "rootdisk".to_string(),
                            container_disk: Some(ContainerDisk {
                                image: "quay.io/containerdisks/fedora:40".to_string(),
                            }),
                            cloud_init: None,
                        }],
                        ..Default::default()
                    },
                    ..Default::default()
                },
            },
        })
        .await?;

    log::info!("seed data loaded: 2 instancetypes, 1 preference, 1 virtual machine");
    Ok(())
}
