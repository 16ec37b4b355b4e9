//! Decoded DSP records
//!
//! In-memory forms of the records found in a compiled package. Everything
//! here is plain owned data; a `DspIndex` owns all of it and never mutates
//! it after the parse completes.

use serde::Serialize;
use std::fmt;

use crate::constants::dsp::PARAMS_PER_ACTION;
use crate::data::{DataType, PrimitiveOpcode};

// ============================================================================
// Primitive Tuple
// ============================================================================

/// Pack a two-character domain qualifier ("D0") into its 16-bit code.
///
/// The first character lands in the low byte, matching the in-memory layout
/// of the qualifier string on little-endian targets.
pub fn domain_code(qualifier: &str) -> u16 {
    let bytes = qualifier.as_bytes();
    let lo = bytes.first().copied().unwrap_or(0) as u16;
    let hi = bytes.get(1).copied().unwrap_or(0) as u16;
    lo | (hi << 8)
}

/// Inverse of [`domain_code`]
pub fn domain_str(code: u16) -> String {
    code.to_le_bytes()
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Identity key of a primitive: (id, domain, instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PrimitiveTuple {
    pub id: u16,
    pub domain: u16,
    pub instance: u8,
}

impl PrimitiveTuple {
    pub fn new(id: u16, domain: u16, instance: u8) -> Self {
        Self { id, domain, instance }
    }

    /// Build a tuple from a textual domain qualifier
    pub fn with_qualifier(id: u16, qualifier: &str, instance: u8) -> Self {
        Self::new(id, domain_code(qualifier), instance)
    }

    pub fn domain_str(&self) -> String {
        domain_str(self.domain)
    }
}

impl fmt::Display for PrimitiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:03} {} {:03}>", self.id, self.domain_str(), self.instance)
    }
}

// ============================================================================
// Package Identity
// ============================================================================

/// Bus enumeration kind declared by a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BusEnum {
    Acpi,
    Pci,
    Platform,
    Other(u32),
}

impl BusEnum {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => BusEnum::Acpi,
            1 => BusEnum::Pci,
            2 => BusEnum::Platform,
            other => BusEnum::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            BusEnum::Acpi => 0,
            BusEnum::Pci => 1,
            BusEnum::Platform => 2,
            BusEnum::Other(v) => v,
        }
    }
}

/// Identity descriptor from the package header, used for selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DspDescriptor {
    pub code: String,
    pub ver_major: u8,
    pub ver_minor: u8,
    pub name: String,
    pub description: String,
    pub dsp_type: String,
    pub acpi_device: String,
    pub acpi_uid: String,
    pub acpi_type: String,
    pub acpi_scope: String,
    pub pci_vendor_id: String,
    pub pci_device_id: String,
    pub bus_enum: BusEnum,
    pub pci_bus: String,
    pub pci_device: String,
    pub pci_function: String,
    pub pci_revision: String,
    pub pci_class: String,
    pub pci_sub_class: String,
    pub pci_prog_if: String,
}

impl Default for DspDescriptor {
    fn default() -> Self {
        Self {
            code: String::new(),
            ver_major: 0,
            ver_minor: 0,
            name: String::new(),
            description: String::new(),
            dsp_type: String::new(),
            acpi_device: String::new(),
            acpi_uid: String::new(),
            acpi_type: String::new(),
            acpi_scope: String::new(),
            pci_vendor_id: String::new(),
            pci_device_id: String::new(),
            bus_enum: BusEnum::Acpi,
            pci_bus: String::new(),
            pci_device: String::new(),
            pci_function: String::new(),
            pci_revision: String::new(),
            pci_class: String::new(),
            pci_sub_class: String::new(),
            pci_prog_if: String::new(),
        }
    }
}

// ============================================================================
// Domain
// ============================================================================

/// Capability bitmask plus per-flag detail bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCapability {
    pub flags: u32,
    pub count: u8,
    pub mask: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub size: u32,
    pub name: String,
    pub description: String,
    /// Packed two-character qualifier ("D0", "D1", ...)
    pub qualifier: u16,
    pub guid: [u8; 16],
    pub priority: u32,
    pub domain_type: u32,
    pub number_of_primitives: u32,
    pub capability: DomainCapability,
}

impl Domain {
    pub fn qualifier_str(&self) -> String {
        domain_str(self.qualifier)
    }

    /// Whether capability bit `bit` is set in the flags word
    pub fn supports_capability(&self, bit: u32) -> bool {
        bit < 32 && self.capability.flags & (1 << bit) != 0
    }

    /// Detail byte for the `index`-th declared capability flag
    pub fn capability_detail(&self, index: usize) -> Option<u8> {
        if index >= self.capability.count as usize {
            return None;
        }
        self.capability.mask.get(index).copied()
    }
}

// ============================================================================
// Primitive / Action
// ============================================================================

/// Typed action parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionParam {
    Str(String),
    U32(u32),
}

/// Positional parameters of one action; absent slots are `None`
pub type ActionParams = [Option<ActionParam>; PARAMS_PER_ACTION];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub size: u32,
    pub action_type: u32,
    pub priority: u32,
    pub is_kernel: bool,
    pub params: ActionParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Primitive {
    pub tuple: PrimitiveTuple,
    pub size: u32,
    pub operation: u32,
    pub request_type: u32,
    pub request_schema: String,
    pub result_type: u32,
    pub result_schema: String,
    /// Alternatives, in declared (chain) order
    pub actions: Vec<Action>,
}

impl Primitive {
    /// Anything that is not GET executes as SET
    pub fn opcode(&self) -> PrimitiveOpcode {
        match PrimitiveOpcode::from_raw(self.operation) {
            Some(PrimitiveOpcode::Get) => PrimitiveOpcode::Get,
            _ => PrimitiveOpcode::Set,
        }
    }

    pub fn request_data_type(&self) -> Option<DataType> {
        DataType::from_raw(self.request_type)
    }

    pub fn result_data_type(&self) -> Option<DataType> {
        DataType::from_raw(self.result_type)
    }
}

// ============================================================================
// Algorithm / Event
// ============================================================================

/// Unit conversion descriptor for one action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Algorithm {
    pub action_type: u32,
    pub temp_xform: u32,
    pub temp_c1: u32,
    pub temp_c2: u32,
    pub power_xform: u32,
    pub time_xform: u32,
    pub size: u32,
}

/// Event group a package event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventGroup {
    Dptf,
    Power,
    Sensor,
    Acpi,
    Code,
    Other(u32),
}

impl EventGroup {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => EventGroup::Dptf,
            1 => EventGroup::Power,
            2 => EventGroup::Sensor,
            3 => EventGroup::Acpi,
            4 => EventGroup::Code,
            other => EventGroup::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            EventGroup::Dptf => 0,
            EventGroup::Power => 1,
            EventGroup::Sensor => 2,
            EventGroup::Acpi => 3,
            EventGroup::Code => 4,
            EventGroup::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub name: String,
    pub event_key: [u8; 16],
    pub event_type: u32,
    pub event_guid: [u8; 16],
    pub group: EventGroup,
    pub data_type: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_code_packing() {
        assert_eq!(domain_code("D0"), 0x3044);
        assert_eq!(domain_str(0x3044), "D0");
        assert_eq!(domain_code(""), 0);
        assert_eq!(domain_str(0), "");
    }

    #[test]
    fn test_tuple_display() {
        let t = PrimitiveTuple::with_qualifier(14, "D0", 255);
        assert_eq!(t.to_string(), "<014 D0 255>");
    }

    #[test]
    fn test_opcode_defaults_to_set() {
        let p = Primitive {
            tuple: PrimitiveTuple::new(1, 0, 0),
            size: 284,
            operation: 7,
            request_type: 0,
            request_schema: String::new(),
            result_type: 3,
            result_schema: String::new(),
            actions: Vec::new(),
        };
        assert_eq!(p.opcode(), PrimitiveOpcode::Set);
        assert_eq!(p.result_data_type(), Some(DataType::Uint32));
    }

    #[test]
    fn test_capability_queries() {
        let mut mask = [0u8; 32];
        mask[1] = 0x5;
        let d = Domain {
            size: 236,
            name: "CPU".into(),
            description: String::new(),
            qualifier: domain_code("D0"),
            guid: [0; 16],
            priority: 0,
            domain_type: 0,
            number_of_primitives: 0,
            capability: DomainCapability { flags: 0b101, count: 2, mask },
        };
        assert!(d.supports_capability(0));
        assert!(!d.supports_capability(1));
        assert!(!d.supports_capability(40));
        assert_eq!(d.capability_detail(1), Some(5));
        assert_eq!(d.capability_detail(2), None);
    }
}
