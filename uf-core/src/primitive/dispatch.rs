//! Primitive Dispatcher
//!
//! Executes one primitive for one participant:
//!
//! 1. resolve the participant, its bound profile and the primitive tuple
//! 2. resolve AUTO types and allocate the response when asked to
//! 3. try each action in declared order until one succeeds
//!
//! Temperature and power values cross the action boundary as raw `u32` in
//! the hardware unit; the caller sees normalized units on both sides. A
//! failed action falls through to the next alternative. A user action that
//! asks for a larger buffer on an AUTO response is retried once with the
//! size it reported.

use tracing::{debug, trace, warn};

use uf_protocol::PrimitiveRequest;

use super::action::ActionRegistry;
use super::events::EventSink;
use super::ids::{change_event_for, primitive_id, ActionType};
use super::ipc::IpcTransport;
use crate::constants::dsp::NAME_TOKEN;
use crate::constants::limits::MAX_PARAM_LEN;
use crate::constants::units::LAL_HYSTERESIS_DIVISOR;
use crate::data::{DataBuffer, DataType, PrimitiveOpcode};
use crate::dsp::{Action, ActionParam, ActionParams, Algorithm, DspIndex, Primitive, PrimitiveTuple};
use crate::error::{Result, Status, UfError};
use crate::participant::{Participant, ParticipantTable};
use crate::xform::{transform_power, transform_temperature, NORMALIZED_POWER_UNIT, NORMALIZED_TEMP_UNIT};

// ============================================================================
// Helpers
// ============================================================================

/// Logical types carried as a converted `u32`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    Temperature,
    Power,
}

impl Measure {
    fn of(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Temperature => Some(Measure::Temperature),
            DataType::Power => Some(Measure::Power),
            _ => None,
        }
    }

    fn convert(self, value: u32, action_type: u32, algorithm: Option<&Algorithm>, opcode: PrimitiveOpcode) -> Result<u32> {
        match self {
            Measure::Temperature => transform_temperature(NORMALIZED_TEMP_UNIT, value, action_type, algorithm, opcode),
            Measure::Power => transform_power(NORMALIZED_POWER_UNIT, value, action_type, algorithm, opcode),
        }
    }
}

/// Narrow AUTO results are handed back as `u32`
fn widen(data_type: DataType) -> DataType {
    match data_type {
        DataType::Bit | DataType::Time | DataType::Uint8 | DataType::Uint16 => DataType::Uint32,
        DataType::Unicode => DataType::String,
        other => other,
    }
}

/// Replace `%nm%` in string parameters with `<participant>.<domain>`
pub fn expand_params(params: &ActionParams, participant: &str, domain: &str) -> Result<ActionParams> {
    let name = format!("{}.{}", participant, domain);
    let mut out: ActionParams = Default::default();
    for (slot, param) in params.iter().enumerate() {
        out[slot] = match param {
            Some(ActionParam::Str(s)) => {
                let expanded = s.replace(NAME_TOKEN, &name);
                if expanded.len() > MAX_PARAM_LEN {
                    return Err(UfError::ParameterOutOfBounds(format!(
                        "parameter {} expands to {} bytes",
                        slot + 1,
                        expanded.len()
                    )));
                }
                Some(ActionParam::Str(expanded))
            }
            other => other.clone(),
        };
    }
    Ok(out)
}

/// State shared by the action attempts of one call
struct Call<'c> {
    participant: &'c Participant,
    dsp: &'c DspIndex,
    primitive: &'c Primitive,
    opcode: PrimitiveOpcode,
    domain: String,
    rsp_auto: bool,
    request_measure: Option<Measure>,
    response_measure: Option<Measure>,
    /// Caller's normalized request value, reapplied before every attempt
    saved_request: Option<u32>,
}

/// Where one action executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionBackend {
    /// Forwarded over IPC; the index counts kernel actions only
    Kernel(u16),
    /// Looked up in the action-type registry
    User,
}

impl Call<'_> {
    fn tuple(&self) -> PrimitiveTuple {
        self.primitive.tuple
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

pub struct Dispatcher<'a> {
    participants: &'a ParticipantTable,
    actions: &'a ActionRegistry,
    ipc: &'a dyn IpcTransport,
    events: &'a dyn EventSink,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        participants: &'a ParticipantTable,
        actions: &'a ActionRegistry,
        ipc: &'a dyn IpcTransport,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            participants,
            actions,
            ipc,
            events,
        }
    }

    /// Execute primitive `(primitive_id, domain, instance)` on a participant.
    ///
    /// AUTO request/response types are resolved from the primitive and stay
    /// resolved on return. On error the response is zeroed.
    pub fn execute_primitive(
        &self,
        participant_id: u8,
        primitive_id: u16,
        domain: &str,
        instance: u8,
        request: &mut DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()> {
        let result = self.execute(participant_id, primitive_id, domain, instance, request, response);
        if let Err(e) = &result {
            response.clear();
            debug!(
                participant = participant_id,
                primitive = primitive_id,
                domain,
                instance,
                status = e.status_code(),
                error = %e,
                "Primitive failed"
            );
        }
        result
    }

    fn execute(
        &self,
        participant_id: u8,
        primitive_id: u16,
        domain: &str,
        instance: u8,
        request: &mut DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()> {
        let participant = self
            .participants
            .get(participant_id)
            .ok_or(UfError::ParticipantNotFound(participant_id))?;
        let dsp = participant.dsp().ok_or(UfError::NeedDsp(participant_id))?;

        let tuple = PrimitiveTuple::with_qualifier(primitive_id, domain, instance);
        let primitive = dsp.get_primitive(&tuple).ok_or_else(|| UfError::PrimitiveNotFoundInDsp {
            dsp: dsp.code().to_string(),
            id: primitive_id,
            domain: domain.to_string(),
            instance,
        })?;

        // AUTO typing
        if request.data_type == DataType::Auto {
            request.data_type = primitive.request_data_type().unwrap_or(DataType::Void);
        }
        let rsp_auto = response.data_type == DataType::Auto;
        if rsp_auto {
            response.data_type = widen(primitive.result_data_type().unwrap_or(DataType::Void));
        }
        // A caller-sized buffer is used as given; handlers report NeedLargerBuffer
        if response.needs_allocation() {
            response.reallocate(response.data_type.default_buffer_size());
        }

        let (req_type, rsp_type) = (request.data_type, response.data_type);
        let request_measure = Measure::of(req_type);
        let response_measure = Measure::of(rsp_type);

        let saved_request = match request_measure {
            Some(_) => Some(
                request
                    .u32_value()
                    .ok_or_else(|| UfError::ParameterIsNull(format!("{} request value", req_type)))?,
            ),
            None => None,
        };
        if request_measure.is_some() {
            request.data_type = DataType::Uint32;
        }
        if response_measure.is_some() {
            response.data_type = DataType::Uint32;
        }

        trace!(
            participant = participant.name(),
            dsp = %dsp.code(),
            tuple = %tuple,
            opcode = ?primitive.opcode(),
            request = %req_type,
            response = %rsp_type,
            actions = primitive.actions.len(),
            "Executing primitive"
        );

        let call = Call {
            participant: &participant,
            dsp: &dsp,
            primitive,
            opcode: primitive.opcode(),
            domain: tuple.domain_str(),
            rsp_auto,
            request_measure,
            response_measure,
            saved_request,
        };
        let result = self.run_actions(&call, request, response);

        // Logical types and the caller's request value survive the call
        request.data_type = req_type;
        response.data_type = rsp_type;
        if let Some(value) = saved_request {
            request.set_u32(value)?;
        }
        result
    }

    fn run_actions(&self, call: &Call<'_>, request: &mut DataBuffer, response: &mut DataBuffer) -> Result<()> {
        if call.primitive.actions.is_empty() {
            return Err(UfError::UnsupportedActionType(0));
        }

        let mut kernel_actions: u16 = 0;
        let mut retried = false;
        let mut last_error = None;

        for (i, action) in call.primitive.actions.iter().enumerate() {
            let algorithm = call.dsp.get_algorithm(action.action_type);
            let backend = if action.is_kernel {
                kernel_actions += 1;
                ActionBackend::Kernel(kernel_actions - 1)
            } else {
                ActionBackend::User
            };

            let mut outcome = self.prepare_request(call, action, algorithm, request);
            if outcome.is_ok() {
                outcome = self.invoke(call, action, backend, request, response);
            }

            if let Err(UfError::NeedLargerBuffer { needed }) = outcome {
                if backend == ActionBackend::User && call.rsp_auto && !retried {
                    retried = true;
                    debug!(action = i, needed, "Retrying action with larger response buffer");
                    response.reallocate(needed as usize);
                    outcome = self.invoke(call, action, backend, request, response);
                    if let Err(e @ UfError::NeedLargerBuffer { .. }) = outcome {
                        return Err(e);
                    }
                }
            }

            if outcome.is_ok() {
                outcome = self.finish_response(call, action, algorithm, response);
            }

            match outcome {
                Ok(()) => {
                    self.notify(call, action);
                    trace!(action = i, action_type = %ActionType(action.action_type), "Action succeeded");
                    return Ok(());
                }
                Err(e) => {
                    debug!(
                        tuple = %call.tuple(),
                        action = i,
                        action_type = %ActionType(action.action_type),
                        kernel = action.is_kernel,
                        error = %e,
                        "Action failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(UfError::UnsupportedActionType(0)))
    }

    /// Put the caller's value, converted for this action, into the request
    fn prepare_request(
        &self,
        call: &Call<'_>,
        action: &Action,
        algorithm: Option<&Algorithm>,
        request: &mut DataBuffer,
    ) -> Result<()> {
        if let (Some(measure), Some(value)) = (call.request_measure, call.saved_request) {
            let hw = measure.convert(value, action.action_type, algorithm, PrimitiveOpcode::Set)?;
            request.set_u32(hw)?;
        }
        Ok(())
    }

    fn invoke(
        &self,
        call: &Call<'_>,
        action: &Action,
        backend: ActionBackend,
        request: &DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()> {
        match backend {
            ActionBackend::Kernel(index) => self.invoke_kernel(call, action, index, request, response),
            ActionBackend::User => self.invoke_user(call, action, request, response),
        }
    }

    fn invoke_kernel(
        &self,
        call: &Call<'_>,
        action: &Action,
        index: u16,
        request: &DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()> {
        let t = call.tuple();
        let req = (request.data_type, request.data());
        let rsp = (response.data_type, response.buf_len());
        let dst = call.participant.id();

        let message = match call.opcode {
            PrimitiveOpcode::Get => {
                PrimitiveRequest::get(t.id as u32, t.domain, t.instance, dst, index, action.action_type, req, rsp)
            }
            PrimitiveOpcode::Set => {
                PrimitiveRequest::set(t.id as u32, t.domain, t.instance, dst, index, action.action_type, req, rsp)
            }
        };
        message.validate().map_err(UfError::IpcDataInvalid)?;

        let reply = self.ipc.execute(&message)?;
        match Status::from_code(reply.return_code) {
            Some(status) => status.into_result(reply.rsp_data_len)?,
            None => {
                warn!(code = reply.return_code, "Unknown status from kernel");
                return Err(UfError::KernelStatus(reply.return_code));
            }
        }

        if call.opcode == PrimitiveOpcode::Get {
            let len = (reply.rsp_data_len as usize).min(reply.data.len());
            response.write(&reply.data[..len])?;
        }
        Ok(())
    }

    fn invoke_user(
        &self,
        call: &Call<'_>,
        action: &Action,
        request: &DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()> {
        let action_type = ActionType(action.action_type);
        let entry = self
            .actions
            .get(action_type)
            .ok_or(UfError::UnsupportedActionType(action.action_type))?;
        let handler = entry
            .handler_for(call.opcode)
            .ok_or(UfError::UnsupportedActionType(action.action_type))?;

        let params = expand_params(&action.params, call.participant.name(), &call.domain)?;
        let path = call.participant.device_path();

        match call.opcode {
            PrimitiveOpcode::Get => handler.get(path, &params, request, response),
            PrimitiveOpcode::Set => handler.set(path, &params, request),
        }
    }

    /// GET results back to normalized units
    fn finish_response(
        &self,
        call: &Call<'_>,
        action: &Action,
        algorithm: Option<&Algorithm>,
        response: &mut DataBuffer,
    ) -> Result<()> {
        if call.opcode != PrimitiveOpcode::Get {
            return Ok(());
        }
        if let Some(measure) = call.response_measure {
            let raw = response
                .u32_value()
                .ok_or_else(|| UfError::ParameterIsNull("response value".into()))?;
            let value = measure.convert(raw, action.action_type, algorithm, PrimitiveOpcode::Get)?;
            response.set_u32(value)?;
        }

        // LAL reports hysteresis in milli-degrees
        if ActionType(action.action_type) == ActionType::LAL
            && call.tuple().id == primitive_id::GET_TEMPERATURE_THRESHOLD_HYSTERESIS
        {
            if let Some(v) = response.u32_value() {
                response.set_u32(v / LAL_HYSTERESIS_DIVISOR)?;
            }
        }
        Ok(())
    }

    fn notify(&self, call: &Call<'_>, action: &Action) {
        if action.is_kernel
            || call.opcode != PrimitiveOpcode::Set
            || ActionType(action.action_type) != ActionType::CONFIG
        {
            return;
        }
        if let Some(event) = change_event_for(call.tuple().id) {
            debug!(participant = call.participant.id(), event = %event, "Configuration change event");
            self.events.emit(call.participant.id(), call.tuple().domain, event, None);
        }
    }
}
