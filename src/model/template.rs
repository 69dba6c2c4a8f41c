use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Cpu, Memory, Metadata};

/// Reference from a virtual machine to a named instancetype in the same
/// namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancetypeMatcher {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceMatcher {
    pub name: String,
}

/// Reusable hardware-shape overlay. Treated as immutable input to spec
/// expansion: every `Some` leaf is a value the template defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancetypeTemplate {
    pub metadata: Metadata,
    pub spec: InstancetypeSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstancetypeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Cpu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Memory>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

/// Reusable soft-default overlay. Lower precedence than an instancetype
/// value for the same field, but a differing user-set value still conflicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceTemplate {
    pub metadata: Metadata,
    pub spec: PreferenceSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferenceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachinePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuPreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<DevicePreferences>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MachinePreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_machine_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DevicePreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_disk_bus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_interface_model: Option<String>,
}
