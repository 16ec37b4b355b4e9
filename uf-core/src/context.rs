//! Framework context
//!
//! Owns the profile registry, the action-type registry, the participant
//! table and the IPC/event collaborators. Everything that used to be
//! process-wide state hangs off one value that callers pass around.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::data::DataBuffer;
use crate::dsp::selector::select_by_participant_name;
use crate::dsp::{select, DspId, DspLoader, DspRegistry, LoadReport};
use crate::error::{Result, UfError};
use crate::participant::{Participant, ParticipantInfo, ParticipantTable};
use crate::primitive::{
    ActionRegistry, ActionType, ActionTypeEntry, ConfigAction, ConstAction, Directions, Dispatcher, EventSink,
    EventType, IpcTransport, LogEventSink, LoopbackTransport,
};
use crate::settings::AppSettings;

/// Domain code used for participant-wide events
const PARTICIPANT_DOMAIN: u16 = 0;

pub struct UfContext {
    registry: DspRegistry,
    actions: ActionRegistry,
    participants: ParticipantTable,
    ipc: Arc<dyn IpcTransport>,
    events: Arc<dyn EventSink>,
    loader: DspLoader,
    search_paths: Vec<PathBuf>,
}

impl UfContext {
    /// Context with the built-in CONST/CONFIG action types registered
    pub fn new(ipc: Arc<dyn IpcTransport>, events: Arc<dyn EventSink>) -> Self {
        let actions = ActionRegistry::new();
        actions.register(ActionTypeEntry::new(
            ActionType::CONST,
            "CONST",
            Directions::GET_ONLY,
            Arc::new(ConstAction),
        ));
        actions.register(ActionTypeEntry::new(
            ActionType::CONFIG,
            "CONFIG",
            Directions::BOTH,
            Arc::new(ConfigAction::new()),
        ));

        Self {
            registry: DspRegistry::new(),
            actions,
            participants: ParticipantTable::new(),
            ipc,
            events,
            loader: DspLoader::new(),
            search_paths: Vec::new(),
        }
    }

    /// Loopback IPC and a logging event sink
    pub fn standalone() -> Self {
        Self::new(Arc::new(LoopbackTransport::new()), Arc::new(LogEventSink))
    }

    /// Apply loader limits and search paths from settings
    pub fn with_settings(mut self, settings: &AppSettings) -> Self {
        self.loader = DspLoader::from_settings(&settings.dsp);
        self.search_paths = settings.dsp.search_paths.clone();
        self
    }

    pub fn registry(&self) -> &DspRegistry {
        &self.registry
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn participants(&self) -> &ParticipantTable {
        &self.participants
    }

    pub fn loader(&self) -> &DspLoader {
        &self.loader
    }

    /// Load every package found in the configured search paths
    pub fn load_dsp_dirs(&self) -> Result<LoadReport> {
        let report = self.loader.load_paths(&self.registry, &self.search_paths)?;
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Loaded DSP packages"
        );
        Ok(report)
    }

    /// Profile for a new participant: weighted match first, then the
    /// participant-name table
    fn choose_dsp(&self, info: &ParticipantInfo) -> Option<DspId> {
        select(&self.registry, &info.criteria).or_else(|| {
            let fallback = select_by_participant_name(&self.registry, &info.name);
            if fallback.is_some() {
                debug!(name = %info.name, "No weighted DSP match, using name table");
            }
            fallback
        })
    }

    fn bind(&self, participant: &Participant, id: DspId) -> Result<()> {
        let index = self
            .registry
            .get(id)
            .ok_or_else(|| UfError::NullRecord(format!("{} is not loaded", id)))?;
        info!(
            participant = participant.id(),
            name = %participant.name(),
            dsp = %index.code(),
            "Participant bound"
        );
        participant.binding().bind(id, index);
        Ok(())
    }

    /// Register an enumerated device and bind its profile.
    ///
    /// A participant without a matching profile is still created; its
    /// primitives fail with `NeedDsp` until a later `rebind`.
    pub fn create_participant(&self, info: ParticipantInfo) -> Result<Arc<Participant>> {
        let participant = self.participants.insert(info)?;
        match self.choose_dsp(participant.info()) {
            Some(id) => self.bind(&participant, id)?,
            None => warn!(name = %participant.name(), "No DSP matches participant"),
        }
        self.events
            .emit(participant.id(), PARTICIPANT_DOMAIN, EventType::PARTICIPANT_CREATE, None);
        Ok(participant)
    }

    /// Rerun selection for an existing participant, e.g. after new packages
    /// were loaded. Returns the bound profile id.
    pub fn rebind(&self, participant_id: u8) -> Result<Option<DspId>> {
        let participant = self
            .participants
            .get(participant_id)
            .ok_or(UfError::ParticipantNotFound(participant_id))?;
        match self.choose_dsp(participant.info()) {
            Some(id) => {
                self.bind(&participant, id)?;
                Ok(Some(id))
            }
            None => {
                participant.binding().unbind();
                Ok(None)
            }
        }
    }

    pub fn remove_participant(&self, participant_id: u8) -> Result<()> {
        let participant = self
            .participants
            .remove(participant_id)
            .ok_or(UfError::ParticipantNotFound(participant_id))?;
        participant.binding().unbind();
        self.events
            .emit(participant_id, PARTICIPANT_DOMAIN, EventType::PARTICIPANT_DESTROY, None);
        Ok(())
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.participants, &self.actions, self.ipc.as_ref(), self.events.as_ref())
    }

    pub fn execute_primitive(
        &self,
        participant_id: u8,
        primitive_id: u16,
        domain: &str,
        instance: u8,
        request: &mut DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()> {
        self.dispatcher()
            .execute_primitive(participant_id, primitive_id, domain, instance, request, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataType;
    use crate::dsp::builder::{ActionSpec, DomainSpec, PackageBuilder, PrimitiveSpec};
    use crate::dsp::{parse, SelectCriteria};
    use crate::primitive::MockEventSink;
    use mockall::predicate::*;

    fn tfn1() -> ParticipantInfo {
        ParticipantInfo {
            name: "TFN1".into(),
            device_path: "\\_SB_.PCI0.LPCB.EC0.TFN1".into(),
            criteria: SelectCriteria::acpi("INT3404", "", "", ""),
        }
    }

    fn fan_package() -> PackageBuilder {
        PackageBuilder::new("dpf_fan").acpi("INT3404", "", "").domain(
            DomainSpec::new("FAN", "D0").primitive(
                PrimitiveSpec::get(80, "D0", 255, 24, 3).action(ActionSpec::user(ActionType::CONST.raw()).u32_param(0, 1200)),
            ),
        )
    }

    #[test]
    fn test_create_bind_execute_remove() {
        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .with(eq(1u8), eq(0u16), eq(EventType::PARTICIPANT_CREATE), eq(None))
            .times(1)
            .return_const(());
        sink.expect_emit()
            .with(eq(1u8), eq(0u16), eq(EventType::PARTICIPANT_DESTROY), eq(None))
            .times(1)
            .return_const(());

        let ctx = UfContext::new(Arc::new(LoopbackTransport::new()), Arc::new(sink));
        ctx.registry().register(parse(&fan_package().build()).unwrap());

        let p = ctx.create_participant(tfn1()).unwrap();
        assert_eq!(p.dsp().unwrap().code(), "dpf_fan");

        let mut rsp = DataBuffer::allocate(DataType::Auto);
        ctx.execute_primitive(p.id(), 80, "D0", 255, &mut DataBuffer::void(), &mut rsp)
            .unwrap();
        assert_eq!(rsp.u32_value(), Some(1200));

        ctx.remove_participant(p.id()).unwrap();
        assert!(matches!(
            ctx.execute_primitive(p.id(), 80, "D0", 255, &mut DataBuffer::void(), &mut rsp),
            Err(UfError::ParticipantNotFound(_))
        ));
    }

    #[test]
    fn test_name_table_fallback_and_rebind() {
        let ctx = UfContext::standalone();
        // Registered under the name-table code but with a different HID
        ctx.registry()
            .register(parse(&PackageBuilder::new("dpf_fan").acpi("INT9999", "", "").domain(DomainSpec::new("FAN", "D0")).build()).unwrap());

        let p = ctx.create_participant(tfn1()).unwrap();
        assert_eq!(p.dsp().unwrap().code(), "dpf_fan");

        let exact = ctx.registry().register(parse(&fan_package().build()).unwrap());
        assert_eq!(ctx.rebind(p.id()).unwrap(), Some(exact));
        assert!(matches!(ctx.rebind(42), Err(UfError::ParticipantNotFound(42))));
    }

    #[test]
    fn test_participant_without_dsp() {
        let ctx = UfContext::standalone();
        let p = ctx.create_participant(tfn1()).unwrap();
        assert!(p.dsp().is_none());
        let err = ctx
            .execute_primitive(p.id(), 80, "D0", 255, &mut DataBuffer::void(), &mut DataBuffer::allocate(DataType::Auto))
            .unwrap_err();
        assert!(matches!(err, UfError::NeedDsp(_)));
    }

    #[test]
    fn test_missing_search_paths_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fan.fpc"), fan_package().build()).unwrap();

        let mut settings = AppSettings::default();
        settings.dsp.search_paths = vec![dir.path().join("absent"), dir.path().to_path_buf()];
        let ctx = UfContext::standalone().with_settings(&settings);

        let report = ctx.load_dsp_dirs().unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert!(ctx.registry().get_by_code("dpf_fan").is_some());
    }
}
