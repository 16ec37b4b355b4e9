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

use clap::Parser;
use std::process::ExitCode;

use ufdsp::cli::{run_cli, Cli};
use ufdsp::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken settings file should not block inspection tools
    let (settings, settings_error) = match uf_core::load_settings() {
        Ok(s) => (s, None),
        Err(e) => (uf_core::AppSettings::default(), Some(e)),
    };

    init_logging(cli.log_level.as_deref(), &settings.logging.level);
    if let Some(e) = settings_error {
        tracing::warn!(error = %e, "Using default settings");
    }

    match run_cli(&cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
