//! User action types
//!
//! In-process backends registered by numeric action type. A handler may
//! serve GET, SET or both; asking for a direction it does not serve is the
//! same as asking for an unknown type.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::ids::ActionType;
use crate::data::{DataBuffer, PrimitiveOpcode};
use crate::dsp::ActionParams;
use crate::error::Result;

/// Backend for one user action type.
///
/// `params` are the action's positional parameters with `%nm%` already
/// expanded. A GET that needs more room than `response` offers returns
/// `UfError::NeedLargerBuffer` with the required size.
#[cfg_attr(test, mockall::automock)]
pub trait ActionHandler: Send + Sync {
    fn get(
        &self,
        device_path: &str,
        params: &ActionParams,
        request: &DataBuffer,
        response: &mut DataBuffer,
    ) -> Result<()>;

    fn set(&self, device_path: &str, params: &ActionParams, request: &DataBuffer) -> Result<()>;
}

/// Directions a registered handler serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directions {
    pub get: bool,
    pub set: bool,
}

impl Directions {
    pub const BOTH: Directions = Directions { get: true, set: true };
    pub const GET_ONLY: Directions = Directions { get: true, set: false };
    pub const SET_ONLY: Directions = Directions { get: false, set: true };
}

pub struct ActionTypeEntry {
    action_type: ActionType,
    name: String,
    directions: Directions,
    handler: Arc<dyn ActionHandler>,
}

impl ActionTypeEntry {
    pub fn new(action_type: ActionType, name: &str, directions: Directions, handler: Arc<dyn ActionHandler>) -> Self {
        Self {
            action_type,
            name: name.to_string(),
            directions,
            handler,
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handler for `opcode`, if this entry serves that direction
    pub fn handler_for(&self, opcode: PrimitiveOpcode) -> Option<&dyn ActionHandler> {
        let served = match opcode {
            PrimitiveOpcode::Get => self.directions.get,
            PrimitiveOpcode::Set => self.directions.set,
        };
        served.then_some(self.handler.as_ref())
    }
}

impl std::fmt::Debug for ActionTypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTypeEntry")
            .field("action_type", &self.action_type)
            .field("name", &self.name)
            .field("directions", &self.directions)
            .finish()
    }
}

/// Registered user action types
#[derive(Default)]
pub struct ActionRegistry {
    entries: RwLock<HashMap<ActionType, Arc<ActionTypeEntry>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the backend for an action type
    pub fn register(&self, entry: ActionTypeEntry) -> Option<Arc<ActionTypeEntry>> {
        debug!(
            action_type = %entry.action_type,
            name = %entry.name,
            get = entry.directions.get,
            set = entry.directions.set,
            "Registered action type"
        );
        self.entries.write().insert(entry.action_type, Arc::new(entry))
    }

    pub fn unregister(&self, action_type: ActionType) -> Option<Arc<ActionTypeEntry>> {
        self.entries.write().remove(&action_type)
    }

    pub fn get(&self, action_type: ActionType) -> Option<Arc<ActionTypeEntry>> {
        self.entries.read().get(&action_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered types in ascending order
    pub fn action_types(&self) -> Vec<ActionType> {
        let mut types: Vec<ActionType> = self.entries.read().keys().copied().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_filter() {
        let reg = ActionRegistry::new();
        reg.register(ActionTypeEntry::new(
            ActionType::CONST,
            "const",
            Directions::GET_ONLY,
            Arc::new(MockActionHandler::new()),
        ));

        let entry = reg.get(ActionType::CONST).unwrap();
        assert!(entry.handler_for(PrimitiveOpcode::Get).is_some());
        assert!(entry.handler_for(PrimitiveOpcode::Set).is_none());
        assert!(reg.get(ActionType::MSR).is_none());
    }

    #[test]
    fn test_replace_and_unregister() {
        let reg = ActionRegistry::new();
        let mk = |name: &str| {
            ActionTypeEntry::new(ActionType::VAR, name, Directions::BOTH, Arc::new(MockActionHandler::new()))
        };
        assert!(reg.register(mk("first")).is_none());
        let old = reg.register(mk("second")).unwrap();
        assert_eq!(old.name(), "first");
        assert_eq!(reg.get(ActionType::VAR).unwrap().name(), "second");
        assert_eq!(reg.action_types(), vec![ActionType::VAR]);
        assert!(reg.unregister(ActionType::VAR).is_some());
        assert!(reg.is_empty());
    }
}
