use thiserror::Error;

use crate::logic::defaults::Defaulter;
use crate::logic::overlay::{InstancetypeOverlay, PreferenceOverlay};
use crate::logic::resolve::TemplateResolver;
use crate::model::{ConflictSet, InstanceSpec, InstanceTemplate, TemplateMetadata, VirtualMachine};

/// Mutable scratch copy of the instance template, exclusively owned by one
/// expansion call. It either becomes the template of the returned entity or
/// is dropped; it never aliases the caller's entity or a template.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingSpec {
    pub metadata: TemplateMetadata,
    pub spec: InstanceSpec,
}

impl WorkingSpec {
    /// Full structural copy. The only point where caller data enters
    /// scratch space.
    pub fn copy_of(template: &InstanceTemplate) -> Self {
        Self {
            metadata: template.metadata.clone(),
            spec: template.spec.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("instancetype \"{0}\" not found")]
    InstancetypeNotFound(String),
    #[error("preference \"{0}\" not found")]
    PreferenceNotFound(String),
    #[error("cannot expand instancetype to VM: conflicts at {0}")]
    Conflict(ConflictSet),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Drives one spec expansion: resolve referenced templates, default a fresh
/// working copy, overlay instancetype then preference, and either fail with
/// the collected conflicts or assemble the result. Holds no state; concurrent
/// calls share nothing.
pub struct Expander;

impl Expander {
    pub async fn expand<R: TemplateResolver + ?Sized>(
        resolver: &R,
        vm: &VirtualMachine,
    ) -> Result<VirtualMachine, ExpandError> {
        // No references means nothing to expand: the entity is returned as
        // is, without defaulting or resolver traffic.
        if vm.spec.instancetype.is_none() && vm.spec.preference.is_none() {
            return Ok(vm.clone());
        }

        // Resolver errors abort before any overlay work, verbatim. Retry
        // policy belongs to the caller.
        let instancetype = if vm.spec.instancetype.is_some() {
            resolver.resolve_instancetype(vm).await?
        } else {
            None
        };
        let preference = if vm.spec.preference.is_some() {
            resolver.resolve_preference(vm).await?
        } else {
            None
        };

        let working = Defaulter::apply(WorkingSpec::copy_of(&vm.spec.template));
        // What the user (plus defaulting) set, before any overlay: the
        // preference overlay uses it to tell user intent from instancetype
        // intent.
        let user_view = working.clone();

        let mut conflicts = ConflictSet::new();
        let working = match &instancetype {
            Some(spec) => {
                let (working, found) = InstancetypeOverlay::apply(working, spec);
                conflicts.merge(found);
                working
            }
            None => working,
        };
        let working = match &preference {
            Some(spec) => {
                let (working, found) = PreferenceOverlay::apply(working, &user_view, spec);
                conflicts.merge(found);
                working
            }
            None => working,
        };

        if !conflicts.is_empty() {
            return Err(ExpandError::Conflict(conflicts));
        }

        Ok(Self::assemble(vm, working))
    }

    /// Result assembly: a new entity whose template is the finished working
    /// copy. Every other field of the input is carried over untouched.
    fn assemble(vm: &VirtualMachine, working: WorkingSpec) -> VirtualMachine {
        let mut expanded = vm.clone();
        expanded.spec.template = InstanceTemplate {
            metadata: working.metadata,
            spec: working.spec,
        };
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Cpu, InstancetypeMatcher, InstancetypeSpec, Memory, Metadata, PreferenceMatcher,
        PreferenceSpec, VirtualMachineSpec, Volume,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeResolver {
        instancetype: Option<InstancetypeSpec>,
        preference: Option<PreferenceSpec>,
        missing_instancetype: bool,
        missing_preference: bool,
        transient_failure: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TemplateResolver for FakeResolver {
        async fn resolve_instancetype(
            &self,
            vm: &VirtualMachine,
        ) -> Result<Option<InstancetypeSpec>, ExpandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.transient_failure {
                return Err(ExpandError::Internal(anyhow::anyhow!(
                    "instancetype lookup timed out"
                )));
            }
            if self.missing_instancetype {
                let name = vm
                    .spec
                    .instancetype
                    .as_ref()
                    .map(|matcher| matcher.name.clone())
                    .unwrap_or_default();
                return Err(ExpandError::InstancetypeNotFound(name));
            }
            Ok(self.instancetype.clone())
        }

        async fn resolve_preference(
            &self,
            vm: &VirtualMachine,
        ) -> Result<Option<PreferenceSpec>, ExpandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.missing_preference {
                let name = vm
                    .spec
                    .preference
                    .as_ref()
                    .map(|matcher| matcher.name.clone())
                    .unwrap_or_default();
                return Err(ExpandError::PreferenceNotFound(name));
            }
            Ok(self.preference.clone())
        }
    }

    fn vm_with_volume(name: &str) -> VirtualMachine {
        let mut vm = VirtualMachine {
            metadata: Metadata {
                name: "test-vm".to_string(),
                namespace: "test-namespace".to_string(),
                ..Default::default()
            },
            spec: VirtualMachineSpec::default(),
        };
        vm.spec.template.spec.volumes.push(Volume {
            name: name.to_string(),
            container_disk: None,
            cloud_init: None,
        });
        vm
    }

    #[tokio::test]
    async fn vm_without_references_is_returned_unchanged() {
        let vm = vm_with_volume("v1");
        let resolver = FakeResolver::default();

        let expanded = Expander::expand(&resolver, &vm).await.unwrap();

        assert_eq!(expanded, vm);
        // Not even defaulting runs: no disks were synthesized.
        assert!(expanded.spec.template.spec.domain.devices.disks.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn instancetype_cpu_lands_in_defaulted_spec() {
        let mut vm = vm_with_volume("v1");
        vm.spec.instancetype = Some(InstancetypeMatcher {
            name: "u1.small".to_string(),
        });
        let resolver = FakeResolver {
            instancetype: Some(InstancetypeSpec {
                cpu: Some(Cpu {
                    cores: Some(2),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let expanded = Expander::expand(&resolver, &vm).await.unwrap();

        let template = &expanded.spec.template.spec;
        assert_eq!(template.domain.cpu.as_ref().unwrap().cores, Some(2));
        assert_eq!(template.domain.devices.disks.len(), 1);
        assert_eq!(template.domain.devices.disks[0].name, "v1");
        assert_eq!(template.networks.len(), 1);
        assert_eq!(template.networks[0].name, "default");
        // The input is never touched, success or not.
        assert!(vm.spec.template.spec.domain.cpu.is_none());
        assert!(vm.spec.template.spec.domain.devices.disks.is_empty());
    }

    #[tokio::test]
    async fn instancetype_wins_over_preference_without_conflict() {
        let mut vm = vm_with_volume("v1");
        vm.spec.instancetype = Some(InstancetypeMatcher {
            name: "u1.small".to_string(),
        });
        vm.spec.preference = Some(PreferenceMatcher {
            name: "linux".to_string(),
        });
        let resolver = FakeResolver {
            instancetype: Some(InstancetypeSpec {
                cpu: Some(Cpu {
                    model: Some("host-passthrough".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            preference: Some(PreferenceSpec {
                cpu: Some(crate::model::CpuPreference {
                    preferred_model: Some("qemu64".to_string()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let expanded = Expander::expand(&resolver, &vm).await.unwrap();

        assert_eq!(
            expanded
                .spec
                .template
                .spec
                .domain
                .cpu
                .as_ref()
                .unwrap()
                .model
                .as_deref(),
            Some("host-passthrough")
        );
    }

    #[tokio::test]
    async fn conflict_discards_working_copy_and_reports_paths() {
        let mut vm = vm_with_volume("v1");
        vm.spec.template.spec.domain.cpu = Some(Cpu {
            cores: Some(4),
            ..Default::default()
        });
        vm.spec.instancetype = Some(InstancetypeMatcher {
            name: "u1.small".to_string(),
        });
        let resolver = FakeResolver {
            instancetype: Some(InstancetypeSpec {
                cpu: Some(Cpu {
                    cores: Some(2),
                    ..Default::default()
                }),
                memory: Some(Memory {
                    guest: Some("2Gi".to_string()),
                    hugepages: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let snapshot = vm.clone();
        let err = Expander::expand(&resolver, &vm).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("cannot expand instancetype to VM"));
        assert!(message.contains("spec.template.spec.domain.cpu.cores"));
        match err {
            ExpandError::Conflict(conflicts) => {
                let paths: Vec<String> = conflicts.iter().map(|p| p.to_string()).collect();
                assert_eq!(paths, vec!["spec.template.spec.domain.cpu.cores"]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        // Atomicity: nothing of the aborted expansion is observable.
        assert_eq!(vm, snapshot);
    }

    #[tokio::test]
    async fn missing_instancetype_aborts_with_resolver_error() {
        let mut vm = vm_with_volume("v1");
        vm.spec.instancetype = Some(InstancetypeMatcher {
            name: "nonexistent-instancetype".to_string(),
        });
        let resolver = FakeResolver {
            missing_instancetype: true,
            ..Default::default()
        };

        let snapshot = vm.clone();
        let err = Expander::expand(&resolver, &vm).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "instancetype \"nonexistent-instancetype\" not found"
        );
        assert_eq!(vm, snapshot);
        // Only the failing lookup ran; no preference resolution, no overlay.
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_preference_aborts_with_resolver_error() {
        let mut vm = vm_with_volume("v1");
        vm.spec.preference = Some(PreferenceMatcher {
            name: "nonexistent-preference".to_string(),
        });
        let resolver = FakeResolver {
            missing_preference: true,
            ..Default::default()
        };

        let err = Expander::expand(&resolver, &vm).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "preference \"nonexistent-preference\" not found"
        );
    }

    #[tokio::test]
    async fn transient_resolver_failure_propagates_verbatim() {
        let mut vm = vm_with_volume("v1");
        vm.spec.instancetype = Some(InstancetypeMatcher {
            name: "u1.small".to_string(),
        });
        let resolver = FakeResolver {
            transient_failure: true,
            ..Default::default()
        };

        let err = Expander::expand(&resolver, &vm).await.unwrap_err();
        match err {
            ExpandError::Internal(inner) => {
                assert_eq!(inner.to_string(), "instancetype lookup timed out")
            }
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn template_annotations_merge_into_result_metadata() {
        let mut vm = vm_with_volume("v1");
        vm.spec
            .template
            .metadata
            .annotations
            .insert("owner".to_string(), "alice".to_string());
        vm.spec.instancetype = Some(InstancetypeMatcher {
            name: "u1.small".to_string(),
        });
        let resolver = FakeResolver {
            instancetype: Some(InstancetypeSpec {
                annotations: std::collections::HashMap::from([(
                    "tier".to_string(),
                    "small".to_string(),
                )]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let expanded = Expander::expand(&resolver, &vm).await.unwrap();

        let annotations = &expanded.spec.template.metadata.annotations;
        assert_eq!(annotations["owner"], "alice");
        assert_eq!(annotations["tier"], "small");
        // Outer identity metadata is not the template metadata.
        assert!(expanded.metadata.annotations.is_empty());
        assert_eq!(expanded.metadata, vm.metadata);
    }
}
