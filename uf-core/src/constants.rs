//! Constants and configuration values for ufdsp
//!
//! Centralizes magic numbers, paths, and configuration defaults.
//! Package layout offsets live next to the parser in `dsp::package`.

/// File system paths
pub mod paths {
    use std::path::PathBuf;

    /// System-wide DSP directory
    pub const SYSTEM_DSP_DIR: &str = "/usr/share/ufdsp/dsp";

    /// Name of the per-user configuration directory
    pub const APP_DIR_NAME: &str = "ufdsp";

    /// Settings file name inside the configuration directory
    pub const SETTINGS_FILE: &str = "settings.json";

    /// User configuration directory, honouring XDG_CONFIG_HOME through `dirs`
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR_NAME))
    }
}

/// Sanity ceilings applied while decoding packages.
///
/// Counts above these are treated as corruption, never as a legitimate size.
pub mod limits {
    /// Largest package file accepted by the loader
    pub const MAX_PACKAGE_SIZE: u64 = 4 * 1024 * 1024;

    pub const MAX_DOMAINS: u32 = 64;

    pub const MAX_PRIMITIVES_PER_DOMAIN: u32 = 4096;

    pub const MAX_ACTIONS_PER_PRIMITIVE: u32 = 16;

    pub const MAX_ALGORITHMS: u32 = 256;

    pub const MAX_EVENTS: u32 = 512;

    /// Upper bound on an expanded string action parameter
    pub const MAX_PARAM_LEN: usize = 65536;
}

/// DSP engine defaults
pub mod dsp {
    /// Bucket count used by the package compiler for the primitive table
    pub const HASH_BUCKETS: usize = 31;

    /// Parameters carried by each action record
    pub const PARAMS_PER_ACTION: usize = 5;

    /// File extensions the loader picks up
    pub const PACKAGE_EXTENSIONS: &[&str] = &["fpc", "edp"];

    /// Fallback package code when no participant name matches
    pub const DEFAULT_DSP_CODE: &str = "dpf_fgen";

    /// Placeholder in string action parameters, replaced by `<participant>.<domain>`
    pub const NAME_TOKEN: &str = "%nm%";

    /// DSP-side and query-side wildcard
    pub const WILDCARD: &str = "*";
}

/// Unit conversion constants
pub mod units {
    /// Zero Celsius in deci-Kelvin
    pub const KELVIN_BASE_DECI: i64 = 2732;

    /// Zero Celsius in milli-Kelvin
    pub const KELVIN_BASE_MILLI: i64 = KELVIN_BASE_DECI * 100;

    /// Raw atom power unit: 1 / 2^5 W
    pub const POWER_UNIT_ATOM: u64 = 32;

    /// Raw core power unit: 1 / 2^3 W
    pub const POWER_UNIT_CORE: u64 = 8;

    /// Divisor applied to LAL hysteresis readings (milli-degrees to degrees)
    pub const LAL_HYSTERESIS_DIVISOR: u32 = 1000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_base() {
        assert_eq!(units::KELVIN_BASE_MILLI, 273_200);
    }

    #[test]
    fn test_user_config_dir_is_namespaced() {
        if let Some(dir) = paths::user_config_dir() {
            assert!(dir.ends_with(paths::APP_DIR_NAME));
        }
    }
}
