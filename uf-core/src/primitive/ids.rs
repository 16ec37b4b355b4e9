//! Well-known identifiers
//!
//! Primitive ids, action types and event types the dispatcher treats
//! specially. Values are shared with compiled packages and peers and must
//! not be renumbered.

use serde::Serialize;
use std::fmt;

/// Primitive ids with dispatcher side effects
pub mod primitive_id {
    pub const GET_TEMPERATURE: u16 = 14;
    pub const GET_TEMPERATURE_THRESHOLD_HYSTERESIS: u16 = 15;
    pub const SET_TRIP_POINT_ACTIVE: u16 = 200;
    pub const SET_TRIP_POINT_CRITICAL: u16 = 201;
    pub const SET_TRIP_POINT_HOT: u16 = 202;
    pub const SET_TRIP_POINT_PASSIVE: u16 = 203;
    pub const SET_TRIP_POINT_WARM: u16 = 204;
    pub const SET_THERMAL_RELATIONSHIP_TABLE: u16 = 205;
    pub const SET_ACTIVE_RELATIONSHIP_TABLE: u16 = 206;
}

// ============================================================================
// Action Types
// ============================================================================

/// Numeric tag selecting the backend of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActionType(pub u32);

impl ActionType {
    pub const ACPI: ActionType = ActionType(1);
    pub const ACPILPAT: ActionType = ActionType(2);
    pub const CODE: ActionType = ActionType(3);
    pub const CONFIG: ActionType = ActionType(4);
    pub const CONST: ActionType = ActionType(5);
    pub const DELEGATE: ActionType = ActionType(6);
    pub const KODE: ActionType = ActionType(7);
    pub const LAL: ActionType = ActionType(8);
    pub const MMIO: ActionType = ActionType(9);
    pub const MSR: ActionType = ActionType(10);
    pub const SYSFS: ActionType = ActionType(11);
    pub const SYSTEMIO: ActionType = ActionType(12);
    pub const VAR: ActionType = ActionType(13);

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionType::ACPI => "ACPI",
            ActionType::ACPILPAT => "ACPILPAT",
            ActionType::CODE => "CODE",
            ActionType::CONFIG => "CONFIG",
            ActionType::CONST => "CONST",
            ActionType::DELEGATE => "DELEGATE",
            ActionType::KODE => "KODE",
            ActionType::LAL => "LAL",
            ActionType::MMIO => "MMIO",
            ActionType::MSR => "MSR",
            ActionType::SYSFS => "SYSFS",
            ActionType::SYSTEMIO => "SYSTEMIO",
            ActionType::VAR => "VAR",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

// ============================================================================
// Event Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventType(pub u32);

impl EventType {
    pub const CONNECTED_STANDBY_ENTRY: EventType = EventType(0);
    pub const CONNECTED_STANDBY_EXIT: EventType = EventType(1);
    pub const APP_ACTIVE_RELATIONSHIP_CHANGED: EventType = EventType(2);
    pub const APP_THERMAL_RELATIONSHIP_CHANGED: EventType = EventType(3);
    pub const DOMAIN_CONFIG_TDP_CAPS_CHANGED: EventType = EventType(4);
    pub const DOMAIN_CORE_CONTROL_CHANGED: EventType = EventType(5);
    pub const DOMAIN_DISPLAY_CONTROL_CHANGED: EventType = EventType(6);
    pub const DOMAIN_PERF_CAPABILITY_CHANGED: EventType = EventType(7);
    pub const DOMAIN_PERF_CONTROL_CHANGED: EventType = EventType(8);
    pub const DOMAIN_POWER_CAPABILITY_CHANGED: EventType = EventType(9);
    pub const DOMAIN_PRIORITY_CHANGED: EventType = EventType(10);
    pub const DOMAIN_TEMP_THRESHOLD_CROSSED: EventType = EventType(11);
    pub const PARTICIPANT_SPEC_INFO_CHANGED: EventType = EventType(17);
    pub const PARTICIPANT_CREATE: EventType = EventType(18);
    pub const PARTICIPANT_DESTROY: EventType = EventType(19);

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            EventType::APP_ACTIVE_RELATIONSHIP_CHANGED => "APP_ACTIVE_RELATIONSHIP_CHANGED",
            EventType::APP_THERMAL_RELATIONSHIP_CHANGED => "APP_THERMAL_RELATIONSHIP_CHANGED",
            EventType::PARTICIPANT_SPEC_INFO_CHANGED => "PARTICIPANT_SPEC_INFO_CHANGED",
            EventType::PARTICIPANT_CREATE => "PARTICIPANT_CREATE",
            EventType::PARTICIPANT_DESTROY => "PARTICIPANT_DESTROY",
            _ => return write!(f, "EVENT({})", self.0),
        };
        f.write_str(name)
    }
}

/// Event raised after a successful configuration SET of primitive `id`
pub fn change_event_for(id: u16) -> Option<EventType> {
    use self::primitive_id::*;
    match id {
        SET_TRIP_POINT_ACTIVE | SET_TRIP_POINT_CRITICAL | SET_TRIP_POINT_HOT | SET_TRIP_POINT_PASSIVE
        | SET_TRIP_POINT_WARM => Some(EventType::PARTICIPANT_SPEC_INFO_CHANGED),
        SET_THERMAL_RELATIONSHIP_TABLE => Some(EventType::APP_THERMAL_RELATIONSHIP_CHANGED),
        SET_ACTIVE_RELATIONSHIP_TABLE => Some(EventType::APP_ACTIVE_RELATIONSHIP_CHANGED),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_table() {
        for id in 200..=204 {
            assert_eq!(change_event_for(id), Some(EventType::PARTICIPANT_SPEC_INFO_CHANGED));
        }
        assert_eq!(
            change_event_for(primitive_id::SET_THERMAL_RELATIONSHIP_TABLE),
            Some(EventType::APP_THERMAL_RELATIONSHIP_CHANGED)
        );
        assert_eq!(
            change_event_for(primitive_id::SET_ACTIVE_RELATIONSHIP_TABLE),
            Some(EventType::APP_ACTIVE_RELATIONSHIP_CHANGED)
        );
        assert_eq!(change_event_for(primitive_id::GET_TEMPERATURE), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ActionType::LAL.to_string(), "LAL(8)");
        assert_eq!(ActionType(99).to_string(), "UNKNOWN(99)");
        assert_eq!(EventType::PARTICIPANT_CREATE.to_string(), "PARTICIPANT_CREATE");
        assert_eq!(EventType(30).to_string(), "EVENT(30)");
    }
}
