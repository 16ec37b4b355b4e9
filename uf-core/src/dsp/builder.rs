//! Package Builder
//!
//! Writes compiled package images in the exact layout [`super::package::parse`]
//! reads. Used to produce fixtures and the demo package; not a package
//! compiler.

use super::package::layout;
use super::records::{domain_code, BusEnum, DspDescriptor, EventGroup};
use crate::constants::dsp::PARAMS_PER_ACTION;

fn put_u8(buf: &mut [u8], at: usize, v: u8) {
    buf[at] = v;
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// Copy `s` into a fixed field, keeping room for the terminating NUL
fn put_str(buf: &mut [u8], (at, len): (usize, usize), s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len.saturating_sub(1));
    buf[at..at + n].copy_from_slice(&bytes[..n]);
}

// ============================================================================
// Record Specs
// ============================================================================

#[derive(Debug, Clone)]
enum ParamSpec {
    Str(String),
    U32(u32),
}

/// One action alternative of a primitive
#[derive(Debug, Clone)]
pub struct ActionSpec {
    action_type: u32,
    priority: u32,
    is_kernel: bool,
    params: [Option<ParamSpec>; PARAMS_PER_ACTION],
    padding: usize,
}

impl ActionSpec {
    fn new(action_type: u32, is_kernel: bool) -> Self {
        Self {
            action_type,
            priority: 0,
            is_kernel,
            params: Default::default(),
            padding: 0,
        }
    }

    pub fn kernel(action_type: u32) -> Self {
        Self::new(action_type, true)
    }

    pub fn user(action_type: u32) -> Self {
        Self::new(action_type, false)
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn string_param(mut self, slot: usize, value: &str) -> Self {
        if let Some(p) = self.params.get_mut(slot) {
            *p = Some(ParamSpec::Str(value.to_string()));
        }
        self
    }

    pub fn u32_param(mut self, slot: usize, value: u32) -> Self {
        if let Some(p) = self.params.get_mut(slot) {
            *p = Some(ParamSpec::U32(value));
        }
        self
    }

    /// Trailing bytes beyond the encoded parameters
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    fn encode(&self) -> Vec<u8> {
        use layout::action as a;

        let mut out = vec![0u8; a::HEADER_SIZE];
        put_u32(&mut out, a::TYPE, self.action_type);
        put_u32(&mut out, a::PRIORITY, self.priority);
        put_u32(&mut out, a::IS_KERNEL, self.is_kernel as u32);

        for (slot, param) in self.params.iter().enumerate() {
            let Some(param) = param else { continue };
            let offset = out.len();
            put_u8(&mut out, a::PARAM_VALID + slot, 1);
            put_u32(&mut out, a::PARAM_OFFSET + slot * 4, offset as u32);

            let (item_type, data) = match param {
                ParamSpec::Str(s) => {
                    let mut d = s.as_bytes().to_vec();
                    d.push(0);
                    (a::ITEM_STRING, d)
                }
                ParamSpec::U32(v) => (a::ITEM_U32, v.to_le_bytes().to_vec()),
            };
            let mut item = vec![0u8; a::ITEM_HEADER];
            put_u8(&mut item, 0, item_type);
            put_u16(&mut item, 2, data.len() as u16);
            out.extend_from_slice(&item);
            out.extend_from_slice(&data);
        }

        out.resize(out.len() + self.padding, 0);
        let size = out.len() as u32;
        put_u32(&mut out, 0, size);
        out
    }
}

/// One primitive record with its action chain
#[derive(Debug, Clone)]
pub struct PrimitiveSpec {
    id: u16,
    domain: u16,
    instance: u8,
    operation: u32,
    request_type: u32,
    result_type: u32,
    actions: Vec<ActionSpec>,
    padding: usize,
}

impl PrimitiveSpec {
    fn new(id: u16, qualifier: &str, instance: u8, operation: u32, request_type: u32, result_type: u32) -> Self {
        Self {
            id,
            domain: domain_code(qualifier),
            instance,
            operation,
            request_type,
            result_type,
            actions: Vec::new(),
            padding: 0,
        }
    }

    pub fn get(id: u16, qualifier: &str, instance: u8, request_type: u32, result_type: u32) -> Self {
        Self::new(id, qualifier, instance, 1, request_type, result_type)
    }

    pub fn set(id: u16, qualifier: &str, instance: u8, request_type: u32, result_type: u32) -> Self {
        Self::new(id, qualifier, instance, 2, request_type, result_type)
    }

    pub fn action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    fn encode(&self) -> Vec<u8> {
        use layout::primitive as p;

        let mut out = vec![0u8; p::HEADER_SIZE];
        put_u16(&mut out, p::ID, self.id);
        put_u16(&mut out, p::DOMAIN, self.domain);
        put_u16(&mut out, p::INSTANCE, self.instance as u16);
        put_u32(&mut out, p::OPERATION, self.operation);
        put_u32(&mut out, p::REQUEST_TYPE, self.request_type);
        put_u32(&mut out, p::RESULT_TYPE, self.result_type);
        put_u32(&mut out, p::NUM_ACTIONS, self.actions.len() as u32);

        for action in &self.actions {
            out.extend_from_slice(&action.encode());
        }
        out.resize(out.len() + self.padding, 0);
        let size = out.len() as u32;
        put_u32(&mut out, 0, size);
        out
    }
}

/// One domain record with its primitives
#[derive(Debug, Clone)]
pub struct DomainSpec {
    name: String,
    qualifier: String,
    priority: u32,
    domain_type: u32,
    guid: [u8; 16],
    capability_flags: u32,
    capability_mask: Vec<u8>,
    primitives: Vec<PrimitiveSpec>,
    padding: usize,
}

impl DomainSpec {
    pub fn new(name: &str, qualifier: &str) -> Self {
        Self {
            name: name.to_string(),
            qualifier: qualifier.to_string(),
            priority: 0,
            domain_type: 0,
            guid: [0; 16],
            capability_flags: 0,
            capability_mask: Vec::new(),
            primitives: Vec::new(),
            padding: 0,
        }
    }

    pub fn domain_type(mut self, domain_type: u32) -> Self {
        self.domain_type = domain_type;
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn guid(mut self, guid: [u8; 16]) -> Self {
        self.guid = guid;
        self
    }

    /// Capability flags word plus per-flag detail bytes (at most 32)
    pub fn capability(mut self, flags: u32, detail: &[u8]) -> Self {
        self.capability_flags = flags;
        self.capability_mask = detail.iter().copied().take(32).collect();
        self
    }

    pub fn primitive(mut self, primitive: PrimitiveSpec) -> Self {
        self.primitives.push(primitive);
        self
    }

    /// Trailing bytes after the last primitive
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    fn encode(&self) -> Vec<u8> {
        use layout::domain as d;

        let mut out = vec![0u8; d::HEADER_SIZE];
        put_str(&mut out, d::NAME, &self.name);
        put_u16(&mut out, d::QUALIFIER, domain_code(&self.qualifier));
        out[d::GUID..d::GUID + 16].copy_from_slice(&self.guid);
        put_u32(&mut out, d::PRIORITY, self.priority);
        put_u32(&mut out, d::DOMAIN_TYPE, self.domain_type);
        put_u32(&mut out, d::NUMBER_OF_PRIMITIVES, self.primitives.len() as u32);
        put_u32(&mut out, d::CAPABILITY_FLAGS, self.capability_flags);
        put_u8(&mut out, d::NUMBER_OF_CAPABILITY_FLAGS, self.capability_mask.len() as u8);
        let mask_at = d::CAPABILITY_MASK;
        out[mask_at..mask_at + self.capability_mask.len()].copy_from_slice(&self.capability_mask);

        // Primitives start right after the header; padding goes at the end
        for primitive in &self.primitives {
            out.extend_from_slice(&primitive.encode());
        }
        out.resize(out.len() + self.padding, 0);
        let size = out.len() as u32;
        put_u32(&mut out, 0, size);
        out
    }
}

/// Unit conversion entry
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmSpec {
    pub action_type: u32,
    pub temp_xform: u32,
    pub temp_c1: u32,
    pub temp_c2: u32,
    pub power_xform: u32,
    pub time_xform: u32,
}

impl AlgorithmSpec {
    /// Temperature conversion only; power and time left untransformed
    pub fn temperature(action_type: u32, temp_xform: u32, temp_c1: u32, temp_c2: u32) -> Self {
        use crate::xform::AlgorithmKind;
        Self {
            action_type,
            temp_xform,
            temp_c1,
            temp_c2,
            power_xform: AlgorithmKind::PowerNone.raw(),
            time_xform: AlgorithmKind::TimeNone.raw(),
        }
    }

    pub fn power(mut self, power_xform: u32) -> Self {
        self.power_xform = power_xform;
        self
    }

    pub fn time(mut self, time_xform: u32) -> Self {
        self.time_xform = time_xform;
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; layout::ALGORITHM_SIZE];
        put_u32(&mut out, 0, self.action_type);
        put_u32(&mut out, 4, self.temp_xform);
        put_u32(&mut out, 8, self.temp_c1);
        put_u32(&mut out, 12, self.temp_c2);
        put_u32(&mut out, 16, self.power_xform);
        put_u32(&mut out, 20, self.time_xform);
        put_u32(&mut out, 24, layout::ALGORITHM_SIZE as u32);
        out
    }
}

/// Event declared by a package
#[derive(Debug, Clone)]
pub struct EventSpec {
    name: String,
    event_key: [u8; 16],
    event_type: u32,
    event_guid: [u8; 16],
    group: u32,
    data_type: u32,
}

impl EventSpec {
    pub fn new(name: &str, event_type: u32, event_guid: [u8; 16], group: u32) -> Self {
        Self {
            name: name.to_string(),
            event_key: [0; 16],
            event_type,
            event_guid,
            group,
            data_type: 24,
        }
    }

    pub fn key(mut self, key: &str) -> Self {
        let mut k = [0u8; 16];
        put_str(&mut k, (0, 16), key);
        self.event_key = k;
        self
    }

    pub fn group(mut self, group: EventGroup) -> Self {
        self.group = group.raw();
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; layout::EVENT_SIZE];
        put_str(&mut out, (0, 32), &self.name);
        out[32..48].copy_from_slice(&self.event_key);
        put_u32(&mut out, 48, self.event_type);
        out[52..68].copy_from_slice(&self.event_guid);
        put_u32(&mut out, 68, self.group);
        put_u32(&mut out, 72, self.data_type);
        out
    }
}

// ============================================================================
// Package Builder
// ============================================================================

/// Builder for a complete package image
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    descriptor: DspDescriptor,
    domains: Vec<DomainSpec>,
    algorithms: Vec<AlgorithmSpec>,
    events: Vec<EventSpec>,
}

impl PackageBuilder {
    pub fn new(code: &str) -> Self {
        Self {
            descriptor: DspDescriptor {
                code: code.to_string(),
                name: code.to_string(),
                ver_major: 1,
                ..DspDescriptor::default()
            },
            domains: Vec::new(),
            algorithms: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.descriptor.ver_major = major;
        self.descriptor.ver_minor = minor;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.descriptor.description = description.to_string();
        self
    }

    /// ACPI-enumerated package identity
    pub fn acpi(mut self, device: &str, acpi_type: &str, uid: &str) -> Self {
        self.descriptor.bus_enum = BusEnum::Acpi;
        self.descriptor.acpi_device = device.to_string();
        self.descriptor.acpi_type = acpi_type.to_string();
        self.descriptor.acpi_uid = uid.to_string();
        self
    }

    pub fn acpi_scope(mut self, scope: &str) -> Self {
        self.descriptor.acpi_scope = scope.to_string();
        self
    }

    /// PCI-enumerated package identity
    pub fn pci(mut self, vendor: &str, device: &str, bus: &str, function: &str) -> Self {
        self.descriptor.bus_enum = BusEnum::Pci;
        self.descriptor.pci_vendor_id = vendor.to_string();
        self.descriptor.pci_device_id = device.to_string();
        self.descriptor.pci_bus = bus.to_string();
        self.descriptor.pci_function = function.to_string();
        self
    }

    /// Platform-enumerated package identity, matched on type and name
    pub fn platform(mut self, dsp_type: &str, name: &str) -> Self {
        self.descriptor.bus_enum = BusEnum::Platform;
        self.descriptor.dsp_type = dsp_type.to_string();
        self.descriptor.name = name.to_string();
        self
    }

    pub fn domain(mut self, domain: DomainSpec) -> Self {
        self.domains.push(domain);
        self
    }

    pub fn algorithm(mut self, algorithm: AlgorithmSpec) -> Self {
        self.algorithms.push(algorithm);
        self
    }

    pub fn event(mut self, event: EventSpec) -> Self {
        self.events.push(event);
        self
    }

    fn encode_descriptor(&self, out: &mut [u8]) {
        use layout::descriptor as d;

        let base = layout::DESCRIPTOR_OFFSET;
        let desc = &self.descriptor;
        let mut s = |(at, len): (usize, usize), v: &str| put_str(out, (base + at, len), v);
        s(d::CODE, &desc.code);
        s(d::NAME, &desc.name);
        s(d::DESCRIPTION, &desc.description);
        s(d::TYPE, &desc.dsp_type);
        s(d::ACPI_DEVICE, &desc.acpi_device);
        s(d::ACPI_UID, &desc.acpi_uid);
        s(d::ACPI_TYPE, &desc.acpi_type);
        s(d::ACPI_SCOPE, &desc.acpi_scope);
        s(d::PCI_VENDOR_ID, &desc.pci_vendor_id);
        s(d::PCI_DEVICE_ID, &desc.pci_device_id);
        s(d::PCI_BUS, &desc.pci_bus);
        s(d::PCI_DEVICE, &desc.pci_device);
        s(d::PCI_FUNCTION, &desc.pci_function);
        s(d::PCI_REVISION, &desc.pci_revision);
        s(d::PCI_CLASS, &desc.pci_class);
        s(d::PCI_SUB_CLASS, &desc.pci_sub_class);
        s(d::PCI_PROG_IF, &desc.pci_prog_if);

        put_u8(out, base + d::VER_MAJOR, desc.ver_major);
        put_u8(out, base + d::VER_MINOR, desc.ver_minor);
        put_u32(out, base + d::BUS_ENUM, desc.bus_enum.raw());
    }

    /// Serialize the package image
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; layout::HEADER_SIZE];
        self.encode_descriptor(&mut out);
        put_u32(&mut out, layout::NUMBER_OF_DOMAINS, self.domains.len() as u32);
        put_u32(&mut out, layout::NUMBER_OF_ALGORITHMS, self.algorithms.len() as u32);
        put_u32(&mut out, layout::NUMBER_OF_EVENTS, self.events.len() as u32);

        for domain in &self.domains {
            out.extend_from_slice(&domain.encode());
        }
        for algorithm in &self.algorithms {
            out.extend_from_slice(&algorithm.encode());
        }
        for event in &self.events {
            out.extend_from_slice(&event.encode());
        }

        let size = out.len() as u32;
        put_u32(&mut out, 0, size);
        out
    }

    /// Wrap the package image in an EDP container
    pub fn build_edp(&self) -> Vec<u8> {
        let fpc = self.build();
        let mut out = Vec::with_capacity(layout::EDP_DIR_SIZE + fpc.len());
        out.extend_from_slice(&layout::EDP_SIGNATURE);
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&(layout::EDP_DIR_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&(layout::EDP_DIR_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&fpc);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let bytes = PackageBuilder::new("dpf_fan")
            .version(2, 3)
            .domain(DomainSpec::new("FAN", "D0"))
            .build();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(&bytes[4..11], b"dpf_fan");
        assert_eq!(bytes[4 + 13], 2);
        assert_eq!(bytes[4 + 14], 3);
        assert_eq!(bytes[layout::NUMBER_OF_DOMAINS], 1);
        assert_eq!(bytes.len(), layout::HEADER_SIZE + layout::domain::HEADER_SIZE);
    }

    #[test]
    fn test_action_param_offsets_are_action_relative() {
        let action = ActionSpec::user(9).string_param(2, "abc").encode();
        let offset = u32::from_le_bytes(action[24 + 8..24 + 12].try_into().unwrap()) as usize;
        assert_eq!(offset, layout::action::HEADER_SIZE);
        assert_eq!(action[offset], layout::action::ITEM_STRING);
        assert_eq!(&action[offset + 4..offset + 8], b"abc\0");
        assert_eq!(action.len(), layout::action::HEADER_SIZE + 8);
    }

    #[test]
    fn test_string_truncated_to_field() {
        let long = "x".repeat(80);
        let bytes = PackageBuilder::new(&long).domain(DomainSpec::new("A", "D0")).build();
        // 13-byte code field keeps 12 characters and the NUL
        assert_eq!(bytes[4 + 12], 0);
    }
}
