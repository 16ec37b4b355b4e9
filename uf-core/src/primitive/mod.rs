//! Primitive execution
//!
//! - `dispatch` - resolves and runs one primitive through its action chain
//! - `action` - user action-type registry and handler trait
//! - `ipc` - kernel transport seam and the in-process loopback
//! - `events` - event sink seam
//! - `builtin` - CONST and CONFIG user actions
//! - `ids` - well-known primitive, action and event ids

mod action;
mod builtin;
mod dispatch;
mod events;
pub mod ids;
mod ipc;

pub use action::{ActionHandler, ActionRegistry, ActionTypeEntry, Directions};
pub use builtin::{ConfigAction, ConstAction};
pub use dispatch::{expand_params, Dispatcher};
pub use events::{EventSink, LogEventSink};
pub use ids::{change_event_for, primitive_id, ActionType, EventType};
pub use ipc::{IpcTransport, LoopbackTransport};

#[cfg(test)]
pub use action::MockActionHandler;
#[cfg(test)]
pub use events::MockEventSink;
#[cfg(test)]
pub use ipc::MockIpcTransport;
