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

//! In-memory walkthrough of the dispatcher
//!
//! Builds a processor profile, binds it to a `TCPU` participant and runs a
//! GET_TEMPERATURE against a loopback kernel that reports deci-Kelvin, then
//! writes a passive trip point through the CONFIG action type.

use serde::Serialize;
use std::sync::Arc;

use tracing::info;
use uf_core::dsp::builder::{ActionSpec, AlgorithmSpec, DomainSpec, PackageBuilder, PrimitiveSpec};
use uf_core::dsp::{domain_code, ActionParam, ActionParams};
use uf_core::primitive::primitive_id;
use uf_core::{
    parse, ActionType, AlgorithmKind, DataBuffer, DataType, LogEventSink, LoopbackTransport, ParticipantInfo,
    PrimitiveOpcode, Result, SelectCriteria, UfContext, UfError,
};

pub const DEMO_DSP_CODE: &str = "shb_proc";
pub const DEMO_HID: &str = "INT3401";

/// Raw kernel reading served by the loopback: 293.1 K
pub const DEMO_RAW_DECI_K: u32 = 2931;

pub const DEMO_PASSIVE_TRIP_C: u32 = 95;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoReport {
    pub dsp_code: String,
    pub participant_id: u8,
    pub raw_deci_kelvin: u32,
    pub temperature_c: u32,
    pub passive_trip_c: u32,
}

/// Processor profile used by the demo and the integration tests
pub fn demo_package() -> PackageBuilder {
    let msr = ActionType::MSR.raw();
    let config = ActionType::CONFIG.raw();
    let void = DataType::Void.raw();
    let temp = DataType::Temperature.raw();

    PackageBuilder::new(DEMO_DSP_CODE)
        .version(1, 0)
        .description("Processor participant")
        .acpi(DEMO_HID, "", "")
        .domain(
            DomainSpec::new("CPU", "D0")
                .primitive(PrimitiveSpec::get(primitive_id::GET_TEMPERATURE, "D0", 255, void, temp).action(ActionSpec::kernel(msr)))
                .primitive(
                    PrimitiveSpec::set(primitive_id::SET_TRIP_POINT_PASSIVE, "D0", 255, temp, void)
                        .action(ActionSpec::user(config).string_param(0, "%nm%/_PSV")),
                ),
        )
        .algorithm(AlgorithmSpec::temperature(msr, AlgorithmKind::TempDeciK.raw(), 0, 0))
        .algorithm(AlgorithmSpec::temperature(config, AlgorithmKind::TempNone.raw(), 0, 0))
}

pub fn run_demo() -> Result<DemoReport> {
    let ipc = Arc::new(LoopbackTransport::new());
    ipc.preload(
        primitive_id::GET_TEMPERATURE,
        domain_code("D0"),
        255,
        0,
        &DEMO_RAW_DECI_K.to_le_bytes(),
    );

    let ctx = UfContext::new(ipc, Arc::new(LogEventSink));
    ctx.registry().register(parse(&demo_package().build())?);

    let participant = ctx.create_participant(ParticipantInfo {
        name: "TCPU".into(),
        device_path: "\\_SB_.PCI0.TCPU".into(),
        criteria: SelectCriteria::acpi(DEMO_HID, "", "", ""),
    })?;
    let pid = participant.id();
    let dsp_code = participant.dsp().map(|d| d.code().to_string()).unwrap_or_default();

    let mut rsp = DataBuffer::allocate(DataType::Auto);
    ctx.execute_primitive(pid, primitive_id::GET_TEMPERATURE, "D0", 255, &mut DataBuffer::void(), &mut rsp)?;
    let temperature_c = rsp.u32_value().unwrap_or_default();
    info!(participant = pid, temperature_c, "GET_TEMPERATURE");

    let mut req = DataBuffer::from_u32(DataType::Temperature, DEMO_PASSIVE_TRIP_C);
    ctx.execute_primitive(pid, primitive_id::SET_TRIP_POINT_PASSIVE, "D0", 255, &mut req, &mut DataBuffer::void())?;

    // Read the stored value back under the expanded key
    let unsupported = || UfError::UnsupportedActionType(ActionType::CONFIG.raw());
    let entry = ctx.actions().get(ActionType::CONFIG).ok_or_else(unsupported)?;
    let handler = entry.handler_for(PrimitiveOpcode::Get).ok_or_else(unsupported)?;
    let key: ActionParams = [Some(ActionParam::Str("TCPU.D0/_PSV".into())), None, None, None, None];
    let mut stored = DataBuffer::new(DataType::Temperature, 4);
    handler.get(participant.device_path(), &key, &DataBuffer::void(), &mut stored)?;
    let passive_trip_c = stored.u32_value().unwrap_or_default();

    Ok(DemoReport {
        dsp_code,
        participant_id: pid,
        raw_deci_kelvin: DEMO_RAW_DECI_K,
        temperature_c,
        passive_trip_c,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scenario() {
        let report = run_demo().unwrap();
        assert_eq!(report.dsp_code, DEMO_DSP_CODE);
        assert_eq!(report.participant_id, 1);
        assert_eq!(report.temperature_c, 20);
        assert_eq!(report.passive_trip_c, DEMO_PASSIVE_TRIP_C);
    }
}
