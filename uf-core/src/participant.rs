//! Participants
//!
//! An enumerated device plus the profile bound to it. The binding is
//! replaced whole; readers holding the previous `Arc<DspIndex>` keep a
//! consistent view until they drop it.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::dsp::{DspId, DspIndex, SelectCriteria};
use crate::error::{Result, UfError};

/// Lowest id handed to an enumerated participant; 0 is the framework itself
pub const FIRST_PARTICIPANT_ID: u8 = 1;

/// Highest id; 254 and 255 are reserved instance numbers
pub const LAST_PARTICIPANT_ID: u8 = 253;

/// What an enumerator reports about a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantInfo {
    /// Short ACPI-style name ("TCPU", "TFN1")
    pub name: String,
    pub device_path: String,
    pub criteria: SelectCriteria,
}

/// Current profile of a participant
#[derive(Debug, Default)]
pub struct ParticipantBinding {
    current: RwLock<Option<(DspId, Arc<DspIndex>)>>,
}

impl ParticipantBinding {
    /// Swap in a new profile, returning the previous one
    pub fn bind(&self, id: DspId, index: Arc<DspIndex>) -> Option<(DspId, Arc<DspIndex>)> {
        self.current.write().replace((id, index))
    }

    pub fn unbind(&self) -> Option<(DspId, Arc<DspIndex>)> {
        self.current.write().take()
    }

    pub fn current(&self) -> Option<(DspId, Arc<DspIndex>)> {
        self.current.read().clone()
    }
}

#[derive(Debug)]
pub struct Participant {
    id: u8,
    info: ParticipantInfo,
    binding: ParticipantBinding,
}

impl Participant {
    pub fn new(id: u8, info: ParticipantInfo) -> Self {
        Self {
            id,
            info,
            binding: ParticipantBinding::default(),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn device_path(&self) -> &str {
        &self.info.device_path
    }

    pub fn info(&self) -> &ParticipantInfo {
        &self.info
    }

    pub fn binding(&self) -> &ParticipantBinding {
        &self.binding
    }

    /// Bound profile, if any
    pub fn dsp(&self) -> Option<Arc<DspIndex>> {
        self.binding.current().map(|(_, index)| index)
    }
}

/// Live participants by id
#[derive(Debug, Default)]
pub struct ParticipantTable {
    inner: RwLock<BTreeMap<u8, Arc<Participant>>>,
}

impl ParticipantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the lowest free id
    pub fn insert(&self, info: ParticipantInfo) -> Result<Arc<Participant>> {
        let mut inner = self.inner.write();
        let id = (FIRST_PARTICIPANT_ID..=LAST_PARTICIPANT_ID)
            .find(|id| !inner.contains_key(id))
            .ok_or(UfError::ResourceExhausted {
                what: "participant",
                count: inner.len() as u32,
                max: (LAST_PARTICIPANT_ID - FIRST_PARTICIPANT_ID + 1) as u32,
            })?;

        let participant = Arc::new(Participant::new(id, info));
        inner.insert(id, Arc::clone(&participant));
        debug!(id, name = %participant.name(), "Participant added");
        Ok(participant)
    }

    pub fn get(&self, id: u8) -> Option<Arc<Participant>> {
        self.inner.read().get(&id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<Participant>> {
        self.inner.read().values().find(|p| p.name() == name).cloned()
    }

    pub fn remove(&self, id: u8) -> Option<Arc<Participant>> {
        self.inner.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn list(&self) -> Vec<Arc<Participant>> {
        self.inner.read().values().cloned().collect()
    }
}
