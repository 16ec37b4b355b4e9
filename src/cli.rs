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

//! Command Line Interface

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::debug;

use uf_core::dsp::selector::{score, select_scored};
use uf_core::{AppSettings, DspIndex, DspLoader, DspRegistry, SelectCriteria};

use crate::demo;

#[derive(Parser)]
#[command(name = "ufdsp")]
#[command(version)]
#[command(about = "Device Support Package tooling")]
#[command(long_about = "Device Support Package tooling

Parses compiled DSP packages (.fpc, .edp), selects the best profile for a
device identity, and runs primitives through the dispatcher.

EXAMPLES:
    ufdsp inspect /usr/share/ufdsp/dsp/dpf_fan.fpc
    ufdsp inspect dpf_fan.fpc --json
    ufdsp select --kind acpi --device INT3404
    ufdsp select --dir ./dsp --kind pci --vendor 0x8086 --device 0x1903
    ufdsp demo
    ufdsp settings show

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Enable debug logging

FILES:
    ~/.config/ufdsp/settings.json      Application settings")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter directive (overrides RUST_LOG and settings)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse one package and print its contents
    Inspect(InspectArgs),

    /// Load packages and print the profile that best matches an identity
    Select(SelectArgs),

    /// Run GET_TEMPERATURE through an in-memory package and loopback kernel
    Demo(DemoArgs),

    #[command(subcommand, about = "View application settings")]
    Settings(SettingsCommands),
}

#[derive(Args)]
pub struct InspectArgs {
    /// Package file (.fpc or .edp)
    pub file: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BusKind {
    Acpi,
    Pci,
    Platform,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Package directory; repeatable. Defaults to the configured search paths
    #[arg(long)]
    pub dir: Vec<PathBuf>,

    #[arg(long, value_enum, default_value = "acpi")]
    pub kind: BusKind,

    /// ACPI HID or PCI device id
    #[arg(long, default_value = "")]
    pub device: String,

    /// ACPI type or platform DSP type
    #[arg(long = "type", default_value = "")]
    pub dsp_type: String,

    #[arg(long, default_value = "")]
    pub uid: String,

    #[arg(long, default_value = "")]
    pub scope: String,

    #[arg(long, default_value = "")]
    pub vendor: String,

    /// Platform name
    #[arg(long, default_value = "")]
    pub name: String,
}

impl SelectArgs {
    pub fn criteria(&self) -> SelectCriteria {
        match self.kind {
            BusKind::Acpi => SelectCriteria::acpi(&self.device, &self.dsp_type, &self.uid, &self.scope),
            BusKind::Pci => SelectCriteria::pci(&self.vendor, &self.device),
            BusKind::Platform => SelectCriteria::platform(&self.dsp_type, &self.name),
        }
    }
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show all settings as JSON
    Show,
    /// Print the settings file path
    Path,
}

pub fn run_cli(cli: &Cli, settings: &AppSettings) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Inspect(args) => cmd_inspect(args, settings),
        Commands::Select(args) => cmd_select(args, settings),
        Commands::Demo(args) => cmd_demo(args),
        Commands::Settings(sub) => cmd_settings(sub, settings),
    }
}

// ============================================================================
// Inspect Command
// ============================================================================

fn cmd_inspect(args: &InspectArgs, settings: &AppSettings) -> anyhow::Result<()> {
    let loader = DspLoader::from_settings(&settings.dsp);
    let index = loader
        .load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&index_json(&index))?);
    } else {
        print_index(&index);
    }
    Ok(())
}

pub fn index_json(index: &DspIndex) -> serde_json::Value {
    json!({
        "descriptor": index.descriptor(),
        "declared_size": index.declared_size(),
        "domains": index.domains(),
        "primitives": index.primitives(),
        "algorithms": index.algorithms(),
        "events": index.events(),
        "duplicates": index.duplicates(),
    })
}

fn print_index(index: &DspIndex) {
    let d = index.descriptor();
    println!("DSP {} v{}.{}", d.code, d.ver_major, d.ver_minor);
    println!("===============");
    if !d.description.is_empty() {
        println!("Description: {}", d.description);
    }
    println!("Bus:         {:?}", d.bus_enum);
    println!(
        "ACPI:        device={} type={} uid={} scope={}",
        d.acpi_device, d.acpi_type, d.acpi_uid, d.acpi_scope
    );
    println!(
        "PCI:         vendor={} device={} bus={} function={}",
        d.pci_vendor_id, d.pci_device_id, d.pci_bus, d.pci_function
    );
    println!();

    println!("Domains ({}):", index.domain_count());
    for domain in index.domains() {
        println!(
            "  {:<4} {:<16} type={} priority={} primitives={}",
            domain.qualifier_str(),
            domain.name,
            domain.domain_type,
            domain.priority,
            domain.number_of_primitives
        );
    }
    println!();

    println!("Primitives ({}):", index.primitive_count());
    for p in index.primitives() {
        let actions: Vec<String> = p
            .actions
            .iter()
            .map(|a| format!("{}{}", if a.is_kernel { "k:" } else { "u:" }, a.action_type))
            .collect();
        println!("  {} {:?} [{}]", p.tuple, p.opcode(), actions.join(", "));
    }
    println!();

    println!("Algorithms ({}):", index.algorithms().len());
    for a in index.algorithms() {
        println!(
            "  action_type={} temp={} power={} time={} tc1={} tc2={}",
            a.action_type, a.temp_xform, a.power_xform, a.time_xform, a.temp_c1, a.temp_c2
        );
    }
    println!();

    println!("Events ({}):", index.events().len());
    for e in index.events() {
        println!("  {:<32} type={} group={:?}", e.name, e.event_type, e.group);
    }

    if !index.duplicates().is_empty() {
        println!();
        println!("Duplicate tuples ({}):", index.duplicates().len());
        for dup in index.duplicates() {
            println!("  {} (record {} shadowed)", dup.tuple, dup.position);
        }
    }
}

// ============================================================================
// Select Command
// ============================================================================

fn cmd_select(args: &SelectArgs, settings: &AppSettings) -> anyhow::Result<()> {
    let dirs = if args.dir.is_empty() {
        settings.dsp.search_paths.clone()
    } else {
        args.dir.clone()
    };

    let registry = DspRegistry::new();
    let loader = DspLoader::from_settings(&settings.dsp);
    let report = loader.load_paths(&registry, &dirs)?;
    for (path, err) in &report.failed {
        eprintln!("Skipped {}: {}", path.display(), err);
    }
    if registry.is_empty() {
        bail!("No DSP packages found in {:?}", dirs);
    }

    let criteria = args.criteria();
    debug!(?criteria, candidates = registry.len(), "Selecting");

    for (id, index) in registry.snapshot() {
        match score(index.descriptor(), &criteria) {
            Some(s) => println!("  {:<8} {:<16} score={}", id.to_string(), index.code(), s),
            None => println!("  {:<8} {:<16} eliminated", id.to_string(), index.code()),
        }
    }

    match select_scored(&registry, &criteria) {
        Some((id, s)) => {
            let code = registry.get(id).map(|i| i.code().to_string()).unwrap_or_default();
            println!("Selected: {} ({}) score={}", code, id, s);
            Ok(())
        }
        None => bail!("No DSP matches {:?}", criteria),
    }
}

// ============================================================================
// Demo / Settings
// ============================================================================

fn cmd_demo(args: &DemoArgs) -> anyhow::Result<()> {
    let report = demo::run_demo()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("DSP:                {}", report.dsp_code);
    println!("Participant:        {}", report.participant_id);
    println!("Raw reading:        {} dK", report.raw_deci_kelvin);
    println!("GET_TEMPERATURE:    {} C", report.temperature_c);
    println!("Passive trip (set): {} C", report.passive_trip_c);
    Ok(())
}

fn cmd_settings(cmd: &SettingsCommands, settings: &AppSettings) -> anyhow::Result<()> {
    match cmd {
        SettingsCommands::Show => println!("{}", serde_json::to_string_pretty(settings)?),
        SettingsCommands::Path => println!("{}", uf_core::get_settings_path()?.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_args() {
        let cli = Cli::try_parse_from([
            "ufdsp", "select", "--dir", "/tmp/dsp", "--kind", "pci", "--vendor", "0x8086", "--device", "0x1903",
        ])
        .unwrap();
        let Commands::Select(args) = cli.command else {
            panic!("expected select");
        };
        assert_eq!(args.criteria(), SelectCriteria::pci("0x8086", "0x1903"));
        assert_eq!(args.dir, vec![PathBuf::from("/tmp/dsp")]);
    }

    #[test]
    fn test_parse_acpi_type_flag() {
        let cli = Cli::try_parse_from(["ufdsp", "select", "--device", "INT3403", "--type", "14", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Commands::Select(args) = cli.command else {
            panic!("expected select");
        };
        assert_eq!(args.criteria(), SelectCriteria::acpi("INT3403", "14", "", ""));
    }

    #[test]
    fn test_index_json_has_sections() {
        let index = uf_core::parse(&demo::demo_package().build()).unwrap();
        let v = index_json(&index);
        assert_eq!(v["descriptor"]["code"], "shb_proc");
        assert_eq!(v["primitives"].as_array().map(|a| a.len()), Some(2));
        assert!(v["duplicates"].as_array().unwrap().is_empty());
    }
}
