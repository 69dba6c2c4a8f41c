use crate::logic::expand::WorkingSpec;
use crate::model::{Disk, Interface, InterfaceBinding, Network};

/// Architecture assumed when the spec does not pin one.
pub const DEFAULT_ARCH: &str = "x86_64";
/// Name shared by the synthesized default network and its interface.
pub const DEFAULT_NETWORK_NAME: &str = "default";
/// Binding mode of the synthesized default interface.
pub const DEFAULT_INTERFACE_BINDING: InterfaceBinding = InterfaceBinding::Bridge;

pub struct Defaulter;

impl Defaulter {
    /// Fills structurally required but unset fields on a working copy.
    /// Idempotent: a second application changes nothing. Machine type is
    /// never defaulted here; it stays open for a preference overlay.
    pub fn apply(mut working: WorkingSpec) -> WorkingSpec {
        let spec = &mut working.spec;

        if spec.domain.arch.is_none() {
            spec.domain.arch = Some(DEFAULT_ARCH.to_string());
        }

        // Every declared volume gets a disk binding named after it.
        for volume in &spec.volumes {
            let bound = spec
                .domain
                .devices
                .disks
                .iter()
                .any(|disk| disk.name == volume.name);
            if !bound {
                spec.domain.devices.disks.push(Disk::for_volume(&volume.name));
            }
        }

        // A spec that declares neither networks nor interfaces gets exactly
        // one default pod network with a matching interface.
        if spec.networks.is_empty() && spec.domain.devices.interfaces.is_empty() {
            spec.networks.push(Network::pod(DEFAULT_NETWORK_NAME));
            spec.domain.devices.interfaces.push(Interface {
                name: DEFAULT_NETWORK_NAME.to_string(),
                binding: Some(DEFAULT_INTERFACE_BINDING),
                model: None,
            });
        }

        working
    }
}
