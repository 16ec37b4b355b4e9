//! Binary Package Parser
//!
//! Decodes a compiled DSP package (FPC image) into a [`DspIndex`].
//!
//! The image is a fixed header followed by a chain of self-sized records:
//! each domain is immediately followed by its primitives, each primitive by
//! its actions. Algorithms and events follow the last domain with a fixed
//! stride. Chained records are walked by their declared `size`, never by
//! structure size, so the chain must be decoded in order.

use tracing::{debug, trace};

use super::cursor::{ByteCursor, Record};
use super::index::DspIndex;
use super::records::{
    Action, ActionParam, ActionParams, Algorithm, BusEnum, Domain, DomainCapability,
    DspDescriptor, Event, EventGroup, Primitive, PrimitiveTuple,
};
use crate::constants::dsp::PARAMS_PER_ACTION;
use crate::constants::limits;
use crate::error::{Result, UfError};

/// Byte layout of the compiled package. Little-endian, C natural alignment.
pub mod layout {
    pub const HEADER_SIZE: usize = 540;
    pub const DESCRIPTOR_OFFSET: usize = 4;
    pub const DESCRIPTOR_SIZE: usize = 524;
    pub const NUMBER_OF_DOMAINS: usize = 528;
    pub const NUMBER_OF_ALGORITHMS: usize = 532;
    pub const NUMBER_OF_EVENTS: usize = 536;

    /// Descriptor fields, relative to the descriptor start: (offset, length)
    pub mod descriptor {
        pub const CODE: (usize, usize) = (0, 13);
        pub const VER_MAJOR: usize = 13;
        pub const VER_MINOR: usize = 14;
        pub const NAME: (usize, usize) = (15, 32);
        pub const DESCRIPTION: (usize, usize) = (47, 128);
        pub const TYPE: (usize, usize) = (175, 64);
        pub const ACPI_DEVICE: (usize, usize) = (239, 32);
        pub const ACPI_UID: (usize, usize) = (271, 32);
        pub const ACPI_TYPE: (usize, usize) = (303, 32);
        pub const ACPI_SCOPE: (usize, usize) = (335, 32);
        pub const PCI_VENDOR_ID: (usize, usize) = (367, 32);
        pub const PCI_DEVICE_ID: (usize, usize) = (399, 32);
        pub const BUS_ENUM: usize = 432;
        pub const PCI_BUS: (usize, usize) = (436, 8);
        pub const PCI_DEVICE: (usize, usize) = (444, 8);
        pub const PCI_FUNCTION: (usize, usize) = (452, 8);
        pub const PCI_REVISION: (usize, usize) = (460, 16);
        pub const PCI_CLASS: (usize, usize) = (476, 16);
        pub const PCI_SUB_CLASS: (usize, usize) = (492, 16);
        pub const PCI_PROG_IF: (usize, usize) = (508, 16);
    }

    pub mod domain {
        pub const HEADER_SIZE: usize = 236;
        pub const NAME: (usize, usize) = (4, 32);
        pub const DESCRIPTION: (usize, usize) = (36, 128);
        pub const QUALIFIER: usize = 164;
        pub const GUID: usize = 166;
        pub const PRIORITY: usize = 184;
        pub const DOMAIN_TYPE: usize = 188;
        pub const NUMBER_OF_PRIMITIVES: usize = 192;
        pub const CAPABILITY_FLAGS: usize = 196;
        pub const NUMBER_OF_CAPABILITY_FLAGS: usize = 200;
        pub const CAPABILITY_MASK: usize = 204;
    }

    pub mod primitive {
        pub const HEADER_SIZE: usize = 284;
        pub const ID: usize = 4;
        pub const DOMAIN: usize = 6;
        pub const INSTANCE: usize = 8;
        pub const OPERATION: usize = 12;
        pub const REQUEST_TYPE: usize = 16;
        pub const REQUEST_SCHEMA: (usize, usize) = (20, 128);
        pub const RESULT_TYPE: usize = 148;
        pub const RESULT_SCHEMA: (usize, usize) = (152, 128);
        pub const NUM_ACTIONS: usize = 280;
    }

    pub mod action {
        pub const HEADER_SIZE: usize = 44;
        pub const TYPE: usize = 4;
        pub const PRIORITY: usize = 8;
        pub const IS_KERNEL: usize = 12;
        pub const PARAM_VALID: usize = 16;
        pub const PARAM_OFFSET: usize = 24;
        /// Data item header: type u8 @0, length u16 @2, data @4
        pub const ITEM_HEADER: usize = 4;
        pub const ITEM_STRING: u8 = 1;
        pub const ITEM_U32: u8 = 4;
    }

    pub const ALGORITHM_SIZE: usize = 28;

    pub const EVENT_SIZE: usize = 76;

    /// EDP container directory: signature, version, cpc_offset, fpc_offset
    pub const EDP_DIR_SIZE: usize = 16;
    pub const EDP_SIGNATURE: [u8; 4] = *b"@EDP";
}

// ============================================================================
// Entry Points
// ============================================================================

/// Parse a raw FPC image into a DSP index
pub fn parse(bytes: &[u8]) -> Result<DspIndex> {
    let mut cursor = ByteCursor::new(bytes);
    let header = cursor.fixed("header", layout::HEADER_SIZE)?;

    let declared_size = header.u32(0)?;
    let number_of_domains = header.u32(layout::NUMBER_OF_DOMAINS)?;
    let number_of_algorithms = header.u32(layout::NUMBER_OF_ALGORITHMS)?;
    let number_of_events = header.u32(layout::NUMBER_OF_EVENTS)?;

    if number_of_domains < 1 {
        return Err(UfError::MissingDomain);
    }
    check_ceiling("domain", number_of_domains, limits::MAX_DOMAINS)?;
    check_ceiling("algorithm", number_of_algorithms, limits::MAX_ALGORITHMS)?;
    check_ceiling("event", number_of_events, limits::MAX_EVENTS)?;

    let descriptor = parse_descriptor(&header)?;
    debug!(
        code = %descriptor.code,
        version = %format!("{}.{}", descriptor.ver_major, descriptor.ver_minor),
        size = declared_size,
        domains = number_of_domains,
        algorithms = number_of_algorithms,
        events = number_of_events,
        "Decoding DSP package"
    );

    let mut index = DspIndex::new(descriptor, declared_size);

    for i in 0..number_of_domains {
        let record = cursor.chained("domain", layout::domain::HEADER_SIZE)?;
        let domain = parse_domain(&record)?;
        trace!(
            offset = record.offset(),
            domain = i,
            name = %domain.name,
            primitives = domain.number_of_primitives,
            "Domain record"
        );

        // Primitives are laid out inside the domain record, after its header
        let mut body = record.body(layout::domain::HEADER_SIZE)?;
        for _ in 0..domain.number_of_primitives {
            let prim_record = body.chained("primitive", layout::primitive::HEADER_SIZE)?;
            let primitive = parse_primitive(&prim_record)?;
            trace!(
                offset = prim_record.offset(),
                tuple = %primitive.tuple,
                actions = primitive.actions.len(),
                "Primitive record"
            );
            index.insert_primitive(primitive);
        }
        index.insert_domain(domain);
    }

    for _ in 0..number_of_algorithms {
        let record = cursor.fixed("algorithm", layout::ALGORITHM_SIZE)?;
        index.insert_algorithm(parse_algorithm(&record)?);
    }

    for _ in 0..number_of_events {
        let record = cursor.fixed("event", layout::EVENT_SIZE)?;
        index.insert_event(parse_event(&record)?);
    }

    debug!(
        code = %index.code(),
        domains = index.domain_count(),
        primitives = index.primitive_count(),
        algorithms = index.algorithms().len(),
        events = index.events().len(),
        duplicates = index.duplicates().len(),
        "DSP package decoded"
    );

    Ok(index)
}

/// Extract the FPC image from an EDP container
pub fn fpc_from_edp(bytes: &[u8]) -> Result<&[u8]> {
    let mut cursor = ByteCursor::new(bytes);
    let dir = cursor.fixed("edp directory", layout::EDP_DIR_SIZE)?;

    let signature: [u8; 4] = dir.array(0)?;
    if signature != layout::EDP_SIGNATURE {
        return Err(UfError::parse(format!(
            "bad EDP signature {:02x?}",
            signature
        )));
    }
    let fpc_offset = dir.u32(12)? as usize;
    if fpc_offset < layout::EDP_DIR_SIZE || fpc_offset >= bytes.len() {
        return Err(UfError::parse(format!(
            "EDP fpc_offset {} outside container of {} bytes",
            fpc_offset,
            bytes.len()
        )));
    }
    Ok(&bytes[fpc_offset..])
}

/// Parse an EDP container
pub fn parse_edp(bytes: &[u8]) -> Result<DspIndex> {
    parse(fpc_from_edp(bytes)?)
}

// ============================================================================
// Record Decoders
// ============================================================================

fn check_ceiling(what: &'static str, count: u32, max: u32) -> Result<()> {
    if count > max {
        return Err(UfError::ResourceExhausted { what, count, max });
    }
    Ok(())
}

fn parse_descriptor(header: &Record<'_>) -> Result<DspDescriptor> {
    use layout::descriptor as d;
    let base = layout::DESCRIPTOR_OFFSET;
    let s = |(at, len): (usize, usize)| header.cstr(base + at, len);

    Ok(DspDescriptor {
        code: s(d::CODE)?,
        ver_major: header.u8(base + d::VER_MAJOR)?,
        ver_minor: header.u8(base + d::VER_MINOR)?,
        name: s(d::NAME)?,
        description: s(d::DESCRIPTION)?,
        dsp_type: s(d::TYPE)?,
        acpi_device: s(d::ACPI_DEVICE)?,
        acpi_uid: s(d::ACPI_UID)?,
        acpi_type: s(d::ACPI_TYPE)?,
        acpi_scope: s(d::ACPI_SCOPE)?,
        pci_vendor_id: s(d::PCI_VENDOR_ID)?,
        pci_device_id: s(d::PCI_DEVICE_ID)?,
        bus_enum: BusEnum::from_raw(header.u32(base + d::BUS_ENUM)?),
        pci_bus: s(d::PCI_BUS)?,
        pci_device: s(d::PCI_DEVICE)?,
        pci_function: s(d::PCI_FUNCTION)?,
        pci_revision: s(d::PCI_REVISION)?,
        pci_class: s(d::PCI_CLASS)?,
        pci_sub_class: s(d::PCI_SUB_CLASS)?,
        pci_prog_if: s(d::PCI_PROG_IF)?,
    })
}

fn parse_domain(record: &Record<'_>) -> Result<Domain> {
    use layout::domain as d;

    let number_of_primitives = record.u32(d::NUMBER_OF_PRIMITIVES)?;
    check_ceiling("primitive", number_of_primitives, limits::MAX_PRIMITIVES_PER_DOMAIN)?;

    Ok(Domain {
        size: record.u32(0)?,
        name: record.cstr(d::NAME.0, d::NAME.1)?,
        description: record.cstr(d::DESCRIPTION.0, d::DESCRIPTION.1)?,
        qualifier: record.u16(d::QUALIFIER)?,
        guid: record.array(d::GUID)?,
        priority: record.u32(d::PRIORITY)?,
        domain_type: record.u32(d::DOMAIN_TYPE)?,
        number_of_primitives,
        capability: DomainCapability {
            flags: record.u32(d::CAPABILITY_FLAGS)?,
            count: record.u8(d::NUMBER_OF_CAPABILITY_FLAGS)?,
            mask: record.array(d::CAPABILITY_MASK)?,
        },
    })
}

fn parse_primitive(record: &Record<'_>) -> Result<Primitive> {
    use layout::primitive as p;

    let num_actions = record.u32(p::NUM_ACTIONS)?;
    check_ceiling("action", num_actions, limits::MAX_ACTIONS_PER_PRIMITIVE)?;

    let tuple = PrimitiveTuple {
        id: record.u16(p::ID)?,
        domain: record.u16(p::DOMAIN)?,
        instance: record.u16(p::INSTANCE)? as u8,
    };

    // Actions follow the primitive header, each advancing by its own size
    let mut body = record.body(p::HEADER_SIZE)?;
    let mut actions = Vec::with_capacity(num_actions as usize);
    for _ in 0..num_actions {
        let action_record = body.chained("action", layout::action::HEADER_SIZE)?;
        actions.push(parse_action(&action_record)?);
    }

    Ok(Primitive {
        tuple,
        size: record.u32(0)?,
        operation: record.u32(p::OPERATION)?,
        request_type: record.u32(p::REQUEST_TYPE)?,
        request_schema: record.cstr(p::REQUEST_SCHEMA.0, p::REQUEST_SCHEMA.1)?,
        result_type: record.u32(p::RESULT_TYPE)?,
        result_schema: record.cstr(p::RESULT_SCHEMA.0, p::RESULT_SCHEMA.1)?,
        actions,
    })
}

fn parse_action(record: &Record<'_>) -> Result<Action> {
    use layout::action as a;

    let mut params: ActionParams = Default::default();
    for (slot, param) in params.iter_mut().enumerate().take(PARAMS_PER_ACTION) {
        if record.u8(a::PARAM_VALID + slot)? == 0 {
            continue;
        }
        let offset = record.u32(a::PARAM_OFFSET + slot * 4)? as usize;
        *param = parse_param(record, offset)?;
    }

    Ok(Action {
        size: record.u32(0)?,
        action_type: record.u32(a::TYPE)?,
        priority: record.u32(a::PRIORITY)?,
        is_kernel: record.i32(a::IS_KERNEL)? > 0,
        params,
    })
}

/// Decode one data item at `offset` from the action start
fn parse_param(record: &Record<'_>, offset: usize) -> Result<Option<ActionParam>> {
    use layout::action as a;

    let item_type = record.u8(offset)?;
    let len = record.u16(offset + 2)? as usize;
    let data = offset + a::ITEM_HEADER;

    match item_type {
        a::ITEM_STRING => Ok(Some(ActionParam::Str(record.cstr(data, len)?))),
        a::ITEM_U32 => Ok(Some(ActionParam::U32(record.u32(data)?))),
        other => {
            trace!(item_type = other, offset, "Ignoring action parameter of unknown type");
            Ok(None)
        }
    }
}

fn parse_algorithm(record: &Record<'_>) -> Result<Algorithm> {
    Ok(Algorithm {
        action_type: record.u32(0)?,
        temp_xform: record.u32(4)?,
        temp_c1: record.u32(8)?,
        temp_c2: record.u32(12)?,
        power_xform: record.u32(16)?,
        time_xform: record.u32(20)?,
        size: record.u32(24)?,
    })
}

fn parse_event(record: &Record<'_>) -> Result<Event> {
    Ok(Event {
        name: record.cstr(0, 32)?,
        event_key: record.array(32)?,
        event_type: record.u32(48)?,
        event_guid: record.array(52)?,
        group: EventGroup::from_raw(record.u32(68)?),
        data_type: record.u32(72)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::builder::{ActionSpec, AlgorithmSpec, DomainSpec, EventSpec, PackageBuilder, PrimitiveSpec};
    use crate::dsp::records::domain_code;

    fn small_package() -> PackageBuilder {
        PackageBuilder::new("tst_pkg")
            .acpi("INT3400", "", "")
            .domain(
                DomainSpec::new("CPU", "D0")
                    .capability(0x3, &[1, 2])
                    .primitive(
                        PrimitiveSpec::get(14, "D0", 255, 36, 6)
                            .action(ActionSpec::kernel(4))
                            .action(ActionSpec::user(9).string_param(0, "%nm%.temp").u32_param(1, 7)),
                    ),
            )
            .algorithm(AlgorithmSpec::temperature(4, 5, 0, 0))
            .event(EventSpec::new("ART", 2, [7; 16], 3))
    }

    #[test]
    fn test_parse_small_package() {
        let bytes = small_package().build();
        let idx = parse(&bytes).unwrap();

        assert_eq!(idx.code(), "tst_pkg");
        assert_eq!(idx.descriptor().acpi_device, "INT3400");
        assert_eq!(idx.descriptor().bus_enum, BusEnum::Acpi);
        assert_eq!(idx.domain_count(), 1);

        let d = idx.get_domain(1).unwrap();
        assert_eq!(d.name, "CPU");
        assert_eq!(d.qualifier, domain_code("D0"));
        assert_eq!(d.capability_detail(1), Some(2));

        let p = idx.get_primitive(&PrimitiveTuple::with_qualifier(14, "D0", 255)).unwrap();
        assert_eq!(p.actions.len(), 2);
        assert!(p.actions[0].is_kernel);
        assert!(!p.actions[1].is_kernel);
        assert_eq!(p.actions[1].params[0], Some(ActionParam::Str("%nm%.temp".into())));
        assert_eq!(p.actions[1].params[1], Some(ActionParam::U32(7)));
        assert_eq!(p.actions[1].params[2], None);

        assert_eq!(idx.get_algorithm(4).map(|a| a.temp_xform), Some(5));
        assert_eq!(idx.get_event_by_type(2).map(|e| e.group), Some(EventGroup::Acpi));
    }

    #[test]
    fn test_offset_chaining_n_by_m() {
        let (n, m) = (5usize, 7usize);
        let quals = ["D0", "D1", "D2", "D3", "D4"];
        let mut builder = PackageBuilder::new("chain");
        for (d, q) in quals.iter().enumerate().take(n) {
            let mut dom = DomainSpec::new(&format!("dom{}", d), q);
            for p in 0..m {
                dom = dom.primitive(PrimitiveSpec::get(100 + p as u16, q, d as u8, 24, 3));
            }
            builder = builder.domain(dom);
        }
        let idx = parse(&builder.build()).unwrap();

        assert_eq!(idx.domain_count(), n);
        assert_eq!(idx.primitive_count(), n * m);
        assert!(idx.duplicates().is_empty());
        for (d, q) in quals.iter().enumerate() {
            assert_eq!(idx.get_domain(d + 1).unwrap().name, format!("dom{}", d));
            for p in 0..m {
                let t = PrimitiveTuple::with_qualifier(100 + p as u16, q, d as u8);
                let prim = idx.get_primitive(&t).unwrap();
                assert_eq!(prim.tuple, t);
            }
        }
    }

    #[test]
    fn test_padded_records_follow_declared_size() {
        let bytes = PackageBuilder::new("pad")
            .domain(
                DomainSpec::new("A", "D0")
                    .padding(12)
                    .primitive(PrimitiveSpec::get(1, "D0", 0, 24, 3).padding(20).action(ActionSpec::kernel(4).padding(8)))
                    .primitive(PrimitiveSpec::get(2, "D0", 0, 24, 3)),
            )
            .domain(DomainSpec::new("B", "D1").primitive(PrimitiveSpec::get(3, "D1", 0, 24, 3)))
            .build();
        let idx = parse(&bytes).unwrap();
        assert_eq!(idx.primitive_count(), 3);
        assert!(idx.get_primitive(&PrimitiveTuple::with_qualifier(2, "D0", 0)).is_some());
        assert!(idx.get_primitive(&PrimitiveTuple::with_qualifier(3, "D1", 0)).is_some());
    }

    #[test]
    fn test_duplicate_tuples_are_surfaced() {
        let bytes = PackageBuilder::new("dup")
            .domain(
                DomainSpec::new("A", "D0")
                    .primitive(PrimitiveSpec::get(14, "D0", 255, 36, 6).action(ActionSpec::kernel(4)))
                    .primitive(PrimitiveSpec::set(14, "D0", 255, 6, 24).action(ActionSpec::kernel(5))),
            )
            .build();
        let idx = parse(&bytes).unwrap();
        let t = PrimitiveTuple::with_qualifier(14, "D0", 255);

        assert_eq!(idx.duplicates().len(), 1);
        assert_eq!(idx.duplicates()[0].tuple, t);
        // Lookup keeps the first record
        assert_eq!(idx.get_primitive(&t).unwrap().actions[0].action_type, 4);
        assert_eq!(idx.primitive_chain(&t).len(), 2);
    }

    #[test]
    fn test_missing_domain_is_fatal() {
        let bytes = PackageBuilder::new("empty").build();
        assert!(matches!(parse(&bytes), Err(UfError::MissingDomain)));
    }

    #[test]
    fn test_count_ceiling() {
        let mut bytes = PackageBuilder::new("big")
            .domain(DomainSpec::new("A", "D0"))
            .build();
        bytes[layout::NUMBER_OF_ALGORITHMS..layout::NUMBER_OF_ALGORITHMS + 4]
            .copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            parse(&bytes),
            Err(UfError::ResourceExhausted { what: "algorithm", .. })
        ));
    }

    #[test]
    fn test_truncated_package() {
        let bytes = small_package().build();
        assert!(matches!(parse(&bytes[..100]), Err(UfError::PackageShort { .. })));
        let cut = bytes.len() - 10;
        assert!(parse(&bytes[..cut]).is_err());
    }

    #[test]
    fn test_undersized_primitive_record() {
        let mut bytes = PackageBuilder::new("bad")
            .domain(DomainSpec::new("A", "D0").primitive(PrimitiveSpec::get(1, "D0", 0, 24, 3)))
            .build();
        let prim_at = layout::HEADER_SIZE + layout::domain::HEADER_SIZE;
        bytes[prim_at..prim_at + 4].copy_from_slice(&8u32.to_le_bytes());
        assert!(matches!(
            parse(&bytes),
            Err(UfError::RecordSizeInvalid { record: "primitive", size: 8, .. })
        ));
    }

    #[test]
    fn test_edp_container() {
        let fpc = small_package().build();
        let mut edp = Vec::new();
        edp.extend_from_slice(&layout::EDP_SIGNATURE);
        edp.extend_from_slice(&1u32.to_le_bytes());
        edp.extend_from_slice(&16u32.to_le_bytes());
        edp.extend_from_slice(&24u32.to_le_bytes());
        edp.extend_from_slice(&[0xEE; 8]);
        edp.extend_from_slice(&fpc);

        let idx = parse_edp(&edp).unwrap();
        assert_eq!(idx.code(), "tst_pkg");

        edp[0] = b'X';
        assert!(parse_edp(&edp).is_err());
    }
}
