use itertools::Itertools;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::logic::expand::WorkingSpec;
use crate::model::{
    ConflictSet, Cpu, FieldPath, InstancetypeSpec, Machine, Memory, PreferenceSpec,
};

fn template_spec_path() -> FieldPath {
    FieldPath::new(&["spec", "template", "spec"])
}

fn annotations_path() -> FieldPath {
    FieldPath::new(&["spec", "template", "metadata", "annotations"])
}

/// Unset-vs-conflict rule for one leaf: an unset field takes the template
/// value, a matching value stays, a differing value is recorded.
fn overlay_leaf<T: PartialEq + Clone>(
    target: &mut Option<T>,
    template: Option<&T>,
    path: FieldPath,
    conflicts: &mut ConflictSet,
) {
    let value = match template {
        Some(value) => value,
        None => return,
    };
    match target {
        None => *target = Some(value.clone()),
        Some(current) if current != value => conflicts.record(path),
        Some(_) => {}
    }
}

/// Preference variant of the leaf rule. A field the instancetype already
/// claimed is skipped silently; only a differing value present in
/// `user` (the defaulted spec before any overlay) conflicts.
fn prefer_leaf<T: PartialEq + Clone>(
    target: &mut Option<T>,
    user: Option<&T>,
    preferred: &T,
    path: FieldPath,
    conflicts: &mut ConflictSet,
) {
    match target {
        None => *target = Some(preferred.clone()),
        Some(current) if current != preferred => {
            if user.map_or(false, |value| value != preferred) {
                conflicts.record(path);
            }
        }
        Some(_) => {}
    }
}

/// Additive annotation merge. Keys are visited in sorted order so conflict
/// detection order is deterministic; a key already present with a differing
/// user-authored value conflicts, an equal value is left as is.
fn merge_annotations(
    target: &mut HashMap<String, String>,
    user: &HashMap<String, String>,
    template: &HashMap<String, String>,
    conflicts: &mut ConflictSet,
) {
    let base = annotations_path();
    for (key, value) in template.iter().sorted() {
        match target.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
            }
            Entry::Occupied(entry) => {
                if entry.get() != value
                    && user.get(key).map_or(false, |existing| existing != value)
                {
                    conflicts.record(base.child(key));
                }
            }
        }
    }
}

/// Applies the hardware-shape overlay. Pure: consumes the working copy and
/// returns it together with every conflict found.
pub struct InstancetypeOverlay;

impl InstancetypeOverlay {
    pub fn apply(
        mut working: WorkingSpec,
        instancetype: &InstancetypeSpec,
    ) -> (WorkingSpec, ConflictSet) {
        let mut conflicts = ConflictSet::new();
        let domain = template_spec_path().child("domain");

        if let Some(cpu) = &instancetype.cpu {
            let path = domain.child("cpu");
            let target = working.spec.domain.cpu.get_or_insert_with(Cpu::default);
            overlay_leaf(
                &mut target.cores,
                cpu.cores.as_ref(),
                path.child("cores"),
                &mut conflicts,
            );
            overlay_leaf(
                &mut target.threads,
                cpu.threads.as_ref(),
                path.child("threads"),
                &mut conflicts,
            );
            overlay_leaf(
                &mut target.sockets,
                cpu.sockets.as_ref(),
                path.child("sockets"),
                &mut conflicts,
            );
            overlay_leaf(
                &mut target.model,
                cpu.model.as_ref(),
                path.child("model"),
                &mut conflicts,
            );
            overlay_leaf(
                &mut target.dedicated_cpu_placement,
                cpu.dedicated_cpu_placement.as_ref(),
                path.child("dedicated_cpu_placement"),
                &mut conflicts,
            );
        }

        if let Some(memory) = &instancetype.memory {
            let path = domain.child("memory");
            let target = working.spec.domain.memory.get_or_insert_with(Memory::default);
            overlay_leaf(
                &mut target.guest,
                memory.guest.as_ref(),
                path.child("guest"),
                &mut conflicts,
            );
            overlay_leaf(
                &mut target.hugepages,
                memory.hugepages.as_ref(),
                path.child("hugepages"),
                &mut conflicts,
            );
        }

        let user_annotations = working.metadata.annotations.clone();
        merge_annotations(
            &mut working.metadata.annotations,
            &user_annotations,
            &instancetype.annotations,
            &mut conflicts,
        );

        (working, conflicts)
    }
}

/// Applies the soft-default overlay after the instancetype overlay.
/// `user_view` is the defaulted spec before any overlay ran: it decides
/// whether an occupied field was user intent (conflict) or instancetype
/// intent (instancetype wins silently).
pub struct PreferenceOverlay;

impl PreferenceOverlay {
    pub fn apply(
        mut working: WorkingSpec,
        user_view: &WorkingSpec,
        preference: &PreferenceSpec,
    ) -> (WorkingSpec, ConflictSet) {
        let mut conflicts = ConflictSet::new();
        let domain = template_spec_path().child("domain");

        if let Some(preferred) = preference
            .machine
            .as_ref()
            .and_then(|machine| machine.preferred_machine_type.as_ref())
        {
            let user_type = user_view
                .spec
                .domain
                .machine
                .as_ref()
                .map(|machine| &machine.machine_type);
            let slot = &mut working.spec.domain.machine;
            match slot {
                None => *slot = Some(Machine::new(preferred)),
                Some(current) if current.machine_type != *preferred => {
                    if user_type.map_or(false, |value| value != preferred) {
                        conflicts.record(domain.child("machine").child("type"));
                    }
                }
                Some(_) => {}
            }
        }

        if let Some(preferred) = preference
            .cpu
            .as_ref()
            .and_then(|cpu| cpu.preferred_model.as_ref())
        {
            let user_model = user_view
                .spec
                .domain
                .cpu
                .as_ref()
                .and_then(|cpu| cpu.model.as_ref());
            let target = working.spec.domain.cpu.get_or_insert_with(Cpu::default);
            prefer_leaf(
                &mut target.model,
                user_model,
                preferred,
                domain.child("cpu").child("model"),
                &mut conflicts,
            );
        }

        if let Some(devices) = &preference.devices {
            let devices_path = domain.child("devices");

            if let Some(bus) = &devices.preferred_disk_bus {
                let disks_path = devices_path.child("disks");
                for (i, disk) in working.spec.domain.devices.disks.iter_mut().enumerate() {
                    let user_bus = user_view
                        .spec
                        .domain
                        .devices
                        .disks
                        .iter()
                        .find(|candidate| candidate.name == disk.name)
                        .and_then(|candidate| candidate.bus.as_ref());
                    prefer_leaf(
                        &mut disk.bus,
                        user_bus,
                        bus,
                        disks_path.index(i).child("bus"),
                        &mut conflicts,
                    );
                }
            }

            if let Some(model) = &devices.preferred_interface_model {
                let interfaces_path = devices_path.child("interfaces");
                for (i, interface) in working
                    .spec
                    .domain
                    .devices
                    .interfaces
                    .iter_mut()
                    .enumerate()
                {
                    let user_model = user_view
                        .spec
                        .domain
                        .devices
                        .interfaces
                        .iter()
                        .find(|candidate| candidate.name == interface.name)
                        .and_then(|candidate| candidate.model.as_ref());
                    prefer_leaf(
                        &mut interface.model,
                        user_model,
                        model,
                        interfaces_path.index(i).child("model"),
                        &mut conflicts,
                    );
                }
            }
        }

        merge_annotations(
            &mut working.metadata.annotations,
            &user_view.metadata.annotations,
            &preference.annotations,
            &mut conflicts,
        );

        (working, conflicts)
    }
}
