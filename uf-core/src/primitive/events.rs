//! Event fan-out seam

use tracing::info;

use super::ids::EventType;
use crate::data::DataBuffer;

/// Receiver of framework events
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn emit(&self, participant_id: u8, domain: u16, event_type: EventType, payload: Option<DataBuffer>);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, participant_id: u8, domain: u16, event_type: EventType, payload: Option<DataBuffer>) {
        info!(
            participant = participant_id,
            domain = %crate::dsp::domain_str(domain),
            event = %event_type,
            payload_len = payload.as_ref().map(|p| p.data_len()).unwrap_or(0),
            "Event"
        );
    }
}
