//! ufdsp Core Library
//!
//! Device Support Package engine for a thermal and power framework.
//!
//! # Features
//!
//! - **Package Parsing**: Validating decoder for compiled `.fpc` images and `.edp` containers
//! - **Profile Index**: O(1) primitive lookup by `(id, domain, instance)`
//! - **Selection**: Weighted matching of enumerated devices to profiles
//! - **Unit Transforms**: Temperature, power and time conversion per action type
//! - **Dispatch**: Ordered action fallback across kernel and user backends
//!
//! # Module Structure
//!
//! - `dsp/` - Package format, index, registry, selector, loader
//! - `primitive/` - Dispatcher, action registry, IPC and event seams
//! - `xform/` - Unit transforms
//! - `data/` - Typed buffers
//!
//! # Example
//!
//! ```no_run
//! use uf_core::{DataBuffer, DataType, UfContext};
//!
//! let ctx = UfContext::standalone();
//! ctx.load_dsp_dirs().unwrap();
//! let mut rsp = DataBuffer::allocate(DataType::Auto);
//! let _ = ctx.execute_primitive(1, 14, "D0", 255, &mut DataBuffer::void(), &mut rsp);
//! ```

// Grouped modules
pub mod data;
pub mod dsp;
pub mod primitive;
pub mod xform;

// Standalone modules
pub mod constants;
pub mod context;
pub mod error;
pub mod participant;
pub mod settings;

pub use context::UfContext;
pub use data::{DataBuffer, DataType, PrimitiveOpcode};
pub use error::{Result, Status, UfError};
pub use participant::{Participant, ParticipantInfo, ParticipantTable};

pub use dsp::{
    parse, parse_edp, select, DspDescriptor, DspId, DspIndex, DspLoader, DspRegistry, LoadReport, PrimitiveTuple,
    SelectCriteria,
};

pub use primitive::{
    ActionHandler, ActionRegistry, ActionType, ActionTypeEntry, Directions, Dispatcher, EventSink, EventType,
    IpcTransport, LogEventSink, LoopbackTransport,
};

pub use xform::{transform_power, transform_temperature, transform_time, AlgorithmKind};

pub use settings::{
    get_cached_settings, get_settings_path, invalidate_settings_cache, load_settings, load_settings_from,
    save_settings, save_settings_to, update_setting, AppSettings, DspSettings, LoggingSettings,
};
