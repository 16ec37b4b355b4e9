//! Device Support Packages
//!
//! Parsing, indexing, loading and selection of hardware profiles.

pub mod builder;
mod cursor;
mod index;
mod loader;
pub mod package;
mod records;
mod registry;
pub mod selector;

pub use cursor::{ByteCursor, Record};
pub use index::{DspIndex, DuplicateTuple};
pub use loader::{DspLoader, LoadReport};
pub use package::{parse, parse_edp};
pub use records::{
    domain_code, domain_str, Action, ActionParam, ActionParams, Algorithm, BusEnum, Domain,
    DomainCapability, DspDescriptor, Event, EventGroup, Primitive, PrimitiveTuple,
};
pub use registry::{DspId, DspRegistry};
pub use selector::{default_dsp_for_participant, select, SelectCriteria};
