/*
 * This file is part of ufdsp.
 *
 * Copyright (C) 2025 ufdsp contributors
 *
 * ufdsp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * ufdsp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ufdsp. If not, see <https://www.gnu.org/licenses/>.
 */

use tracing_subscriber::EnvFilter;

/// Pick the filter directive: explicit flag, then RUST_LOG, then settings
pub fn resolve_filter(flag: Option<&str>, env: Option<&str>, configured: &str) -> String {
    flag.or(env)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(configured)
        .to_string()
}

/// Install the stderr subscriber. Safe to call more than once.
pub fn init_logging(flag: Option<&str>, configured: &str) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = resolve_filter(flag, env.as_deref(), configured);

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}, using 'info'", directive, e);
        EnvFilter::new("info")
    });

    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        assert_eq!(resolve_filter(Some("trace"), Some("debug"), "info"), "trace");
        assert_eq!(resolve_filter(None, Some("debug"), "info"), "debug");
        assert_eq!(resolve_filter(None, None, "warn"), "warn");
        assert_eq!(resolve_filter(Some(""), None, "warn"), "warn");
    }
}
