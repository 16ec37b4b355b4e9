//! Weighted DSP Selection
//!
//! Picks the hardware profile that best describes an enumerated participant.
//! Every identity field of a candidate is compared against the query:
//!
//! - blank or `*` on either side scores nothing and eliminates nothing
//! - a mismatch eliminates the candidate
//! - a match adds the field weight
//!
//! Only candidates enumerated on the same bus are considered. The highest
//! score wins; on a tie the first-loaded profile is kept.

use serde::Serialize;
use tracing::{debug, trace};

use super::records::{BusEnum, DspDescriptor};
use super::registry::{DspId, DspRegistry};
use crate::constants::dsp::{DEFAULT_DSP_CODE, WILDCARD};

// ============================================================================
// Criteria
// ============================================================================

/// Identity reported by an enumerator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectCriteria {
    Acpi {
        device: String,
        acpi_type: String,
        uid: String,
        scope: String,
    },
    Pci {
        vendor: String,
        device: String,
        bus: String,
        function: String,
    },
    Platform {
        dsp_type: String,
        name: String,
    },
}

impl SelectCriteria {
    pub fn acpi(device: &str, acpi_type: &str, uid: &str, scope: &str) -> Self {
        SelectCriteria::Acpi {
            device: device.to_string(),
            acpi_type: acpi_type.to_string(),
            uid: uid.to_string(),
            scope: scope.to_string(),
        }
    }

    /// PCI enumerators only report vendor and device
    pub fn pci(vendor: &str, device: &str) -> Self {
        SelectCriteria::Pci {
            vendor: vendor.to_string(),
            device: device.to_string(),
            bus: String::new(),
            function: String::new(),
        }
    }

    pub fn platform(dsp_type: &str, name: &str) -> Self {
        SelectCriteria::Platform {
            dsp_type: dsp_type.to_string(),
            name: name.to_string(),
        }
    }

    pub fn bus(&self) -> BusEnum {
        match self {
            SelectCriteria::Acpi { .. } => BusEnum::Acpi,
            SelectCriteria::Pci { .. } => BusEnum::Pci,
            SelectCriteria::Platform { .. } => BusEnum::Platform,
        }
    }

    /// (candidate field, query field, weight) triples for this bus
    fn fields<'a>(&'a self, d: &'a DspDescriptor) -> Vec<(&'a str, &'a str, u32)> {
        match self {
            SelectCriteria::Acpi { device, acpi_type, uid, scope } => vec![
                (d.acpi_device.as_str(), device.as_str(), 8),
                (d.acpi_type.as_str(), acpi_type.as_str(), 4),
                (d.acpi_uid.as_str(), uid.as_str(), 2),
                (d.acpi_scope.as_str(), scope.as_str(), 1),
            ],
            SelectCriteria::Pci { vendor, device, bus, function } => vec![
                (d.pci_device_id.as_str(), device.as_str(), 8),
                (d.pci_vendor_id.as_str(), vendor.as_str(), 4),
                (d.pci_bus.as_str(), bus.as_str(), 2),
                (d.pci_function.as_str(), function.as_str(), 1),
            ],
            SelectCriteria::Platform { dsp_type, name } => vec![
                (d.dsp_type.as_str(), dsp_type.as_str(), 2),
                (d.name.as_str(), name.as_str(), 1),
            ],
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

fn is_blank(s: &str) -> bool {
    s.is_empty() || s == WILDCARD
}

/// Score one descriptor; `None` when it is not a candidate
pub fn score(descriptor: &DspDescriptor, criteria: &SelectCriteria) -> Option<u32> {
    if descriptor.bus_enum != criteria.bus() {
        return None;
    }
    let mut total = 0;
    for (have, want, weight) in criteria.fields(descriptor) {
        if is_blank(have) || is_blank(want) {
            continue;
        }
        if have != want {
            return None;
        }
        total += weight;
    }
    Some(total)
}

/// Best match and its score
pub fn select_scored(registry: &DspRegistry, criteria: &SelectCriteria) -> Option<(DspId, u32)> {
    let mut best: Option<(DspId, u32)> = None;

    for (id, index) in registry.snapshot() {
        let Some(s) = score(index.descriptor(), criteria) else {
            trace!(id = %id, code = %index.code(), "DSP eliminated");
            continue;
        };
        trace!(id = %id, code = %index.code(), score = s, "DSP candidate");
        // Strictly greater: ties keep the earlier profile
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((id, s));
        }
    }

    if let Some((id, s)) = best {
        debug!(id = %id, score = s, bus = ?criteria.bus(), "Selected DSP");
    }
    best
}

/// Best matching profile for `criteria`
pub fn select(registry: &DspRegistry, criteria: &SelectCriteria) -> Option<DspId> {
    select_scored(registry, criteria).map(|(id, _)| id)
}

// ============================================================================
// Name Table
// ============================================================================

/// Package code conventionally used for a participant name
pub fn default_dsp_for_participant(name: &str) -> &'static str {
    match name {
        "TFN1" | "TFN2" => "dpf_fan",
        "TMEM" => "dpf_cmem",
        "TAMB" | "TEFN" | "TSKN" | "T_VR" | "FGEN" | "TINL" | "GEN1" | "TCHG" | "GEN2" => "dpf_fgen",
        "DPLY" => "dpf_disp",
        "TPWR" => "dpf_pwr",
        "WIFI" => "dpf_wifi",
        "WGIG" => "dpf_wgig",
        "WWAN" => "dpf_wwan",
        "TCPU" => "shb_proc",
        "B0DB" | "B0D4" => "dpf_proc",
        "TPCH" => "shb_pch",
        "IETM" | "DPTFZ" => "dpf_dptf",
        "WPKG" => "dpf_wpkg",
        "VTS1" | "VTS2" => "dpf_virt",
        _ => DEFAULT_DSP_CODE,
    }
}

/// Profile registered under the conventional code for `name`
pub fn select_by_participant_name(registry: &DspRegistry, name: &str) -> Option<DspId> {
    let code = default_dsp_for_participant(name);
    let found = registry.get_by_code(code).map(|(id, _)| id);
    debug!(participant = name, code, found = found.is_some(), "DSP by name");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::index::DspIndex;

    fn acpi(code: &str, device: &str, acpi_type: &str, uid: &str, scope: &str) -> DspIndex {
        DspIndex::new(
            DspDescriptor {
                code: code.into(),
                bus_enum: BusEnum::Acpi,
                acpi_device: device.into(),
                acpi_type: acpi_type.into(),
                acpi_uid: uid.into(),
                acpi_scope: scope.into(),
                ..DspDescriptor::default()
            },
            0,
        )
    }

    #[test]
    fn test_weights_and_elimination() {
        let reg = DspRegistry::new();
        let generic = reg.register(acpi("generic", "INT3403", "", "", ""));
        let typed = reg.register(acpi("typed", "INT3403", "0x02", "", ""));
        let _wrong = reg.register(acpi("wrong", "INT3404", "0x02", "", ""));

        let q = SelectCriteria::acpi("INT3403", "0x02", "1", "");
        assert_eq!(select_scored(&reg, &q), Some((typed, 12)));

        let q = SelectCriteria::acpi("INT3403", "0x09", "", "");
        assert_eq!(select(&reg, &q), Some(generic));
    }

    #[test]
    fn test_tie_keeps_first_loaded() {
        let reg = DspRegistry::new();
        let first = reg.register(acpi("a", "INT3400", "", "", ""));
        reg.register(acpi("b", "INT3400", "", "", ""));
        let q = SelectCriteria::acpi("INT3400", "", "", "");
        for _ in 0..3 {
            assert_eq!(select(&reg, &q), Some(first));
        }
    }

    #[test]
    fn test_wildcard_never_eliminates() {
        let d = acpi("w", "*", "", "*", "");
        for q in [
            SelectCriteria::acpi("INT3400", "0x1", "7", "\\_SB_"),
            SelectCriteria::acpi("", "", "", ""),
            SelectCriteria::acpi("*", "*", "*", "*"),
        ] {
            assert_eq!(score(d.descriptor(), &q), Some(0));
        }
        // Query-side wildcard against populated candidate
        let d = acpi("p", "INT3400", "0x1", "7", "\\_SB_");
        assert_eq!(score(d.descriptor(), &SelectCriteria::acpi("*", "", "*", "")), Some(0));
    }

    #[test]
    fn test_bus_kind_filters_candidates() {
        let reg = DspRegistry::new();
        reg.register(acpi("a", "", "", "", ""));
        let pci = reg.register(DspIndex::new(
            DspDescriptor {
                code: "p".into(),
                bus_enum: BusEnum::Pci,
                pci_vendor_id: "0x8086".into(),
                pci_device_id: "0x1903".into(),
                ..DspDescriptor::default()
            },
            0,
        ));
        assert_eq!(select_scored(&reg, &SelectCriteria::pci("0x8086", "0x1903")), Some((pci, 12)));
        assert_eq!(select(&reg, &SelectCriteria::pci("0x8086", "0xFFFF")), None);
        assert_eq!(select(&reg, &SelectCriteria::platform("x", "y")), None);
    }

    #[test]
    fn test_platform_weights() {
        let d = DspDescriptor {
            bus_enum: BusEnum::Platform,
            dsp_type: "battery".into(),
            name: "BAT0".into(),
            ..DspDescriptor::default()
        };
        assert_eq!(score(&d, &SelectCriteria::platform("battery", "BAT0")), Some(3));
        assert_eq!(score(&d, &SelectCriteria::platform("battery", "")), Some(2));
        assert_eq!(score(&d, &SelectCriteria::platform("battery", "BAT1")), None);
    }

    #[test]
    fn test_default_table() {
        assert_eq!(default_dsp_for_participant("TCPU"), "shb_proc");
        assert_eq!(default_dsp_for_participant("TFN2"), "dpf_fan");
        assert_eq!(default_dsp_for_participant("IETM"), "dpf_dptf");
        assert_eq!(default_dsp_for_participant("XYZ1"), "dpf_fgen");

        let reg = DspRegistry::new();
        let fan = reg.register(acpi("dpf_fan", "", "", "", ""));
        assert_eq!(select_by_participant_name(&reg, "TFN1"), Some(fan));
        assert_eq!(select_by_participant_name(&reg, "TCPU"), None);
    }
}
