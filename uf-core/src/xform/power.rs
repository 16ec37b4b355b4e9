//! Power conversion

use serde::Serialize;
use tracing::trace;

use super::AlgorithmKind;
use crate::constants::units::{POWER_UNIT_ATOM, POWER_UNIT_CORE};
use crate::data::PrimitiveOpcode;
use crate::dsp::Algorithm;
use crate::error::{Result, UfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum PowerUnit {
    Watts = 0,
    DeciWatts = 1,
    CentiWatts = 2,
    MilliWatts = 3,
    /// 1/32 W
    UnitAtom = 4,
    /// 1/8 W
    UnitCore = 5,
}

pub const NORMALIZED_POWER_UNIT: PowerUnit = PowerUnit::MilliWatts;

impl PowerUnit {
    /// Units per watt
    fn per_watt(self) -> u64 {
        match self {
            PowerUnit::Watts => 1,
            PowerUnit::DeciWatts => 10,
            PowerUnit::CentiWatts => 100,
            PowerUnit::MilliWatts => 1000,
            PowerUnit::UnitAtom => POWER_UNIT_ATOM,
            PowerUnit::UnitCore => POWER_UNIT_CORE,
        }
    }
}

/// Multiply by the output factor, then divide by the input factor.
/// Results beyond 32 bits saturate.
pub fn convert_power(input: PowerUnit, output: PowerUnit, value: u32) -> u32 {
    if value == 0 || input == output {
        return value;
    }
    let out = value as u64 * output.per_watt() / input.per_watt();
    u32::try_from(out).unwrap_or(u32::MAX)
}

/// Apply the power conversion declared for `action_type`
pub fn transform_power(
    normalized: PowerUnit,
    value: u32,
    action_type: u32,
    algorithm: Option<&Algorithm>,
    opcode: PrimitiveOpcode,
) -> Result<u32> {
    let algorithm = algorithm.ok_or(UfError::NeedAlgorithm(action_type))?;
    let kind = AlgorithmKind::from_raw(algorithm.power_xform)
        .ok_or(UfError::UnsupportedAlgorithm(algorithm.power_xform))?;

    let hw = match kind {
        AlgorithmKind::PowerNone => return Ok(value),
        AlgorithmKind::PowerDeciW => PowerUnit::DeciWatts,
        AlgorithmKind::PowerMilliW => PowerUnit::MilliWatts,
        AlgorithmKind::PowerUnitAtom => PowerUnit::UnitAtom,
        AlgorithmKind::PowerUnitCore => PowerUnit::UnitCore,
        other => return Err(UfError::UnsupportedAlgorithm(other.raw())),
    };

    let out = match opcode {
        PrimitiveOpcode::Get => convert_power(hw, normalized, value),
        PrimitiveOpcode::Set => convert_power(normalized, hw, value),
    };
    trace!(kind = ?kind, opcode = ?opcode, input = value, output = out, "Power transform");
    Ok(out)
}
