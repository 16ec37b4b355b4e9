//! Time conversion

use serde::Serialize;
use tracing::trace;

use super::AlgorithmKind;
use crate::data::PrimitiveOpcode;
use crate::dsp::Algorithm;
use crate::error::{Result, UfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum TimeUnit {
    Seconds = 0,
    DeciSeconds = 1,
    CentiSeconds = 2,
    MilliSeconds = 3,
    MicroSeconds = 4,
}

pub const NORMALIZED_TIME_UNIT: TimeUnit = TimeUnit::MilliSeconds;

impl TimeUnit {
    fn micros(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1_000_000,
            TimeUnit::DeciSeconds => 100_000,
            TimeUnit::CentiSeconds => 10_000,
            TimeUnit::MilliSeconds => 1_000,
            TimeUnit::MicroSeconds => 1,
        }
    }
}

/// Convert through microseconds; results that do not fit 32 bits fail
pub fn convert_time(input: TimeUnit, output: TimeUnit, value: u32) -> Result<u32> {
    if value == 0 || input == output {
        return Ok(value);
    }
    let out = value as u64 * input.micros() / output.micros();
    u32::try_from(out).map_err(|_| {
        UfError::ParameterOutOfBounds(format!(
            "{} {:?} does not fit in {:?}",
            value, input, output
        ))
    })
}

/// Apply the time conversion declared for `action_type`
pub fn transform_time(
    normalized: TimeUnit,
    value: u32,
    action_type: u32,
    algorithm: Option<&Algorithm>,
    opcode: PrimitiveOpcode,
) -> Result<u32> {
    let algorithm = algorithm.ok_or(UfError::NeedAlgorithm(action_type))?;
    let kind = AlgorithmKind::from_raw(algorithm.time_xform)
        .ok_or(UfError::UnsupportedAlgorithm(algorithm.time_xform))?;

    let hw = match kind {
        AlgorithmKind::TimeNone => return Ok(value),
        AlgorithmKind::TimeDeciS => TimeUnit::DeciSeconds,
        AlgorithmKind::TimeMilliS => TimeUnit::MilliSeconds,
        other => return Err(UfError::UnsupportedAlgorithm(other.raw())),
    };

    let out = match opcode {
        PrimitiveOpcode::Get => convert_time(hw, normalized, value)?,
        PrimitiveOpcode::Set => convert_time(normalized, hw, value)?,
    };
    trace!(kind = ?kind, opcode = ?opcode, input = value, output = out, "Time transform");
    Ok(out)
}
