//! Temperature conversion
//!
//! Values travel through the dispatcher as raw 32-bit words; they are
//! reinterpreted as signed so sub-zero readings survive the round trip.

use serde::Serialize;
use tracing::trace;

use super::AlgorithmKind;
use crate::constants::units::KELVIN_BASE_MILLI;
use crate::data::PrimitiveOpcode;
use crate::dsp::Algorithm;
use crate::error::{Result, UfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum TempUnit {
    Kelvin = 0,
    DeciKelvin = 1,
    CentiKelvin = 2,
    MilliKelvin = 3,
    Celsius = 4,
    DeciCelsius = 5,
    CentiCelsius = 6,
    MilliCelsius = 7,
}

/// Unit exposed to callers
pub const NORMALIZED_TEMP_UNIT: TempUnit = TempUnit::Celsius;

impl TempUnit {
    fn is_kelvin(self) -> bool {
        matches!(
            self,
            TempUnit::Kelvin | TempUnit::DeciKelvin | TempUnit::CentiKelvin | TempUnit::MilliKelvin
        )
    }

    /// Multiplier to milli-units
    fn to_milli(self) -> i64 {
        match self {
            TempUnit::Kelvin | TempUnit::Celsius => 1000,
            TempUnit::DeciKelvin | TempUnit::DeciCelsius => 100,
            TempUnit::CentiKelvin | TempUnit::CentiCelsius => 10,
            TempUnit::MilliKelvin | TempUnit::MilliCelsius => 1,
        }
    }
}

/// Convert between temperature units, rounding half up.
///
/// Zero and same-unit conversions return the input untouched. Zero is never
/// offset by the Kelvin base, so 0 C written through a deci-Kelvin action
/// reaches hardware as 0 dK. Keep it that way: the legacy converter does
/// the same and profiles are written against it.
pub fn convert_temperature(input: TempUnit, output: TempUnit, value: i64) -> i64 {
    if value == 0 || input == output {
        return value;
    }

    let mut milli = value * input.to_milli();
    match (input.is_kelvin(), output.is_kelvin()) {
        (true, false) => milli -= KELVIN_BASE_MILLI,
        (false, true) => milli += KELVIN_BASE_MILLI,
        _ => {}
    }

    let div = output.to_milli();
    (milli + div / 2).div_euclid(div)
}

fn to_raw(value: i64) -> u32 {
    value as i32 as u32
}

fn from_raw(value: u32) -> i64 {
    value as i32 as i64
}

/// Apply the temperature conversion declared for `action_type`.
///
/// GET takes a hardware reading to `normalized`; SET takes a `normalized`
/// value to the hardware encoding.
pub fn transform_temperature(
    normalized: TempUnit,
    value: u32,
    action_type: u32,
    algorithm: Option<&Algorithm>,
    opcode: PrimitiveOpcode,
) -> Result<u32> {
    let algorithm = algorithm.ok_or(UfError::NeedAlgorithm(action_type))?;
    let kind = AlgorithmKind::from_raw(algorithm.temp_xform)
        .ok_or(UfError::UnsupportedAlgorithm(algorithm.temp_xform))?;
    let v = from_raw(value);
    let get = opcode == PrimitiveOpcode::Get;

    let out = match kind {
        AlgorithmKind::TempMilliC | AlgorithmKind::TempDeciK | AlgorithmKind::TempNone => {
            let hw = match kind {
                AlgorithmKind::TempMilliC => TempUnit::MilliCelsius,
                AlgorithmKind::TempDeciK => TempUnit::DeciKelvin,
                _ => TempUnit::Celsius,
            };
            if get {
                convert_temperature(hw, normalized, v)
            } else {
                convert_temperature(normalized, hw, v)
            }
        }
        // Reading is the distance below junction max. Readings past tc1 go
        // negative instead of clamping to 0 so SET(GET(x)) returns x.
        AlgorithmKind::TempTjmaxCore => {
            let tc1 = from_raw(algorithm.temp_c1);
            if get {
                convert_temperature(TempUnit::Celsius, normalized, tc1 - v)
            } else {
                tc1 - convert_temperature(normalized, TempUnit::Celsius, v)
            }
        }
        // Half-degree steps offset by 50 C
        AlgorithmKind::TempPchCore => {
            if get {
                convert_temperature(TempUnit::Celsius, normalized, v / 2 - 50)
            } else {
                convert_temperature(normalized, TempUnit::Celsius, v) * 2 + 100
            }
        }
        other => return Err(UfError::UnsupportedAlgorithm(other.raw())),
    };

    trace!(kind = ?kind, opcode = ?opcode, input = v, output = out, "Temperature transform");
    Ok(to_raw(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn algo(temp_xform: AlgorithmKind, tc1: u32) -> Algorithm {
        Algorithm {
            action_type: 4,
            temp_xform: temp_xform.raw(),
            temp_c1: tc1,
            temp_c2: 0,
            power_xform: AlgorithmKind::PowerNone.raw(),
            time_xform: AlgorithmKind::TimeNone.raw(),
            size: 28,
        }
    }

    fn get(kind: AlgorithmKind, tc1: u32, v: i64) -> i64 {
        let a = algo(kind, tc1);
        from_raw(transform_temperature(TempUnit::Celsius, to_raw(v), 4, Some(&a), PrimitiveOpcode::Get).unwrap())
    }

    fn set(kind: AlgorithmKind, tc1: u32, v: i64) -> i64 {
        let a = algo(kind, tc1);
        from_raw(transform_temperature(TempUnit::Celsius, to_raw(v), 4, Some(&a), PrimitiveOpcode::Set).unwrap())
    }

    #[test]
    fn test_convert_basics() {
        assert_eq!(convert_temperature(TempUnit::DeciKelvin, TempUnit::Celsius, 2931), 20);
        assert_eq!(convert_temperature(TempUnit::Celsius, TempUnit::DeciKelvin, 20), 2932);
        assert_eq!(convert_temperature(TempUnit::MilliCelsius, TempUnit::Celsius, 45_600), 46);
        assert_eq!(convert_temperature(TempUnit::Celsius, TempUnit::MilliCelsius, 46), 46_000);
        assert_eq!(convert_temperature(TempUnit::Kelvin, TempUnit::Celsius, 0), 0);
        assert_eq!(convert_temperature(TempUnit::Celsius, TempUnit::Celsius, 77), 77);
    }

    #[test]
    fn test_zero_is_not_offset() {
        assert_eq!(set(AlgorithmKind::TempDeciK, 0, 0), 0);
        assert_eq!(get(AlgorithmKind::TempDeciK, 0, 0), 0);
        assert_eq!(convert_temperature(TempUnit::Celsius, TempUnit::MilliKelvin, 0), 0);
    }

    #[test]
    fn test_decik_scenario() {
        assert_eq!(get(AlgorithmKind::TempDeciK, 0, 2931), 20);
        let hw = set(AlgorithmKind::TempDeciK, 0, 20);
        assert!((hw - 2931).abs() <= 5);
    }

    #[test]
    fn test_round_trip_in_normalized_unit() {
        for kind in [AlgorithmKind::TempMilliC, AlgorithmKind::TempDeciK, AlgorithmKind::TempNone] {
            for c in [1i64, 20, 45, 100, 125, -10] {
                assert_eq!(get(kind, 0, set(kind, 0, c)), c, "{:?} {}", kind, c);
            }
        }
    }

    #[test]
    fn test_round_trip_from_hardware() {
        // MilliC readings come back within half a degree
        for raw in [1i64, 999, 45_600, 100_000, 2_000_000] {
            let back = set(AlgorithmKind::TempMilliC, 0, get(AlgorithmKind::TempMilliC, 0, raw));
            assert!((back - raw).abs() <= 500, "{} -> {}", raw, back);
        }
    }

    #[test]
    fn test_tjmax_relative() {
        let tc1 = 100;
        assert_eq!(get(AlgorithmKind::TempTjmaxCore, tc1, 30), 70);
        assert_eq!(set(AlgorithmKind::TempTjmaxCore, tc1, 70), 30);
        // At and above tc1
        assert_eq!(get(AlgorithmKind::TempTjmaxCore, tc1, 100), 0);
        assert_eq!(get(AlgorithmKind::TempTjmaxCore, tc1, 110), -10);
        for raw in [0i64, 1, 50, 99, 100, 120] {
            let c = get(AlgorithmKind::TempTjmaxCore, tc1, raw);
            assert_eq!(set(AlgorithmKind::TempTjmaxCore, tc1, c), raw);
        }
    }

    #[test]
    fn test_pch_core() {
        assert_eq!(get(AlgorithmKind::TempPchCore, 0, 180), 40);
        assert_eq!(set(AlgorithmKind::TempPchCore, 0, 40), 180);
        for c in [1i64, 25, 60, 105] {
            assert_eq!(get(AlgorithmKind::TempPchCore, 0, set(AlgorithmKind::TempPchCore, 0, c)), c);
        }
    }

    #[test]
    fn test_missing_and_unknown_algorithm() {
        let err = transform_temperature(TempUnit::Celsius, 1, 9, None, PrimitiveOpcode::Get).unwrap_err();
        assert!(matches!(err, UfError::NeedAlgorithm(9)));

        let mut a = algo(AlgorithmKind::TempNone, 0);
        a.temp_xform = AlgorithmKind::PowerMilliW.raw();
        let err = transform_temperature(TempUnit::Celsius, 1, 4, Some(&a), PrimitiveOpcode::Get).unwrap_err();
        assert!(matches!(err, UfError::UnsupportedAlgorithm(1)));

        a.temp_xform = 99;
        assert!(transform_temperature(TempUnit::Celsius, 1, 4, Some(&a), PrimitiveOpcode::Get).is_err());
    }
}
