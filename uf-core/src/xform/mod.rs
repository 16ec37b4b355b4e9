//! Unit Transforms
//!
//! Converts temperature, power and time values between the raw unit a
//! hardware action speaks and the normalized unit callers see. Each action
//! type selects its conversion through the algorithm record of its package.
//!
//! GET converts hardware to normalized; SET converts normalized to hardware.

mod power;
mod temp;
mod time;

pub use power::{convert_power, transform_power, PowerUnit, NORMALIZED_POWER_UNIT};
pub use temp::{convert_temperature, transform_temperature, TempUnit, NORMALIZED_TEMP_UNIT};
pub use time::{convert_time, transform_time, TimeUnit, NORMALIZED_TIME_UNIT};

use serde::Serialize;

/// Conversion kinds referenced by algorithm records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum AlgorithmKind {
    PowerDeciW = 0,
    PowerMilliW = 1,
    PowerNone = 2,
    PowerUnitCore = 3,
    TempPchCore = 4,
    TempDeciK = 5,
    TempNone = 6,
    TempTjmaxCore = 7,
    TimeNone = 8,
    TempMilliC = 9,
    PowerUnitAtom = 10,
    TimeDeciS = 11,
    TimeMilliS = 12,
}

impl AlgorithmKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        use AlgorithmKind::*;
        Some(match raw {
            0 => PowerDeciW,
            1 => PowerMilliW,
            2 => PowerNone,
            3 => PowerUnitCore,
            4 => TempPchCore,
            5 => TempDeciK,
            6 => TempNone,
            7 => TempTjmaxCore,
            8 => TimeNone,
            9 => TempMilliC,
            10 => PowerUnitAtom,
            11 => TimeDeciS,
            12 => TimeMilliS,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_raw_values_are_stable() {
        for raw in 0..=12 {
            let kind = AlgorithmKind::from_raw(raw).unwrap();
            assert_eq!(kind.raw(), raw);
        }
        assert_eq!(AlgorithmKind::from_raw(13), None);
        assert_eq!(AlgorithmKind::TempDeciK.raw(), 5);
    }
}
