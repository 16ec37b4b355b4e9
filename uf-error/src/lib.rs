//! Unified error handling for ufdsp
//!
//! This crate provides the single error type used across the DSP engine and
//! the primitive dispatcher, together with the numeric status codes that are
//! exchanged with the kernel side and with external collaborators. Status
//! values are part of the wire contract and must never be renumbered.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// Result type alias using UfError
pub type Result<T> = std::result::Result<T, UfError>;

// ============================================================================
// Status Codes
// ============================================================================

/// Stable numeric status codes.
///
/// Peers (IPC transport, event consumers, action handlers) pattern-match on
/// these numbers, so every variant carries an explicit discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    NotSupported = 1002,
    Unspecified = 1003,
    UnsupportedActionType = 1202,
    NeedLargerBuffer = 1300,
    CpcShort = 1600,
    CpcSizeInvalid = 1601,
    CpcPrimitiveSizeInvalid = 1603,
    IpcDataInvalid = 1700,
    NoMemory = 1800,
    ParticipantNotFound = 2200,
    ParameterIsNull = 2300,
    ParameterOutOfBounds = 2301,
    NullPrimitive = 2400,
    NeedDsp = 2401,
    PrimitiveNotFoundInDsp = 2404,
    Timeout = 2600,
    NeedAlgorithm = 2900,
    UnsupportedAlgorithm = 2901,
}

impl Status {
    const ALL: [Status; 19] = [
        Status::Ok,
        Status::NotSupported,
        Status::Unspecified,
        Status::UnsupportedActionType,
        Status::NeedLargerBuffer,
        Status::CpcShort,
        Status::CpcSizeInvalid,
        Status::CpcPrimitiveSizeInvalid,
        Status::IpcDataInvalid,
        Status::NoMemory,
        Status::ParticipantNotFound,
        Status::ParameterIsNull,
        Status::ParameterOutOfBounds,
        Status::NullPrimitive,
        Status::NeedDsp,
        Status::PrimitiveNotFoundInDsp,
        Status::Timeout,
        Status::NeedAlgorithm,
        Status::UnsupportedAlgorithm,
    ];

    /// Numeric wire value
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Reverse lookup of a wire value. Unknown codes map to `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Convert a status returned by a collaborator into a `Result`.
    ///
    /// `NeedLargerBuffer` carries the size the peer asked for in `needed`.
    pub fn into_result(self, needed: u32) -> Result<()> {
        match self {
            Status::Ok => Ok(()),
            Status::NeedLargerBuffer => Err(UfError::NeedLargerBuffer { needed }),
            other => Err(UfError::Status(other)),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Unified error type for all ufdsp operations
#[derive(thiserror::Error, Debug)]
pub enum UfError {
    // ============================================================================
    // Package Parsing Errors
    // ============================================================================
    #[error("DSP package declares no domains")]
    MissingDomain,

    #[error("DSP package truncated: {record} at offset {offset} needs {needed} bytes, {available} available")]
    PackageShort {
        record: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid {record} size {size} at offset {offset}")]
    RecordSizeInvalid {
        record: &'static str,
        offset: usize,
        size: u32,
    },

    #[error("Record could not be resolved: {0}")]
    NullRecord(String),

    #[error("Resource limit exceeded: {what} count {count} (max {max})")]
    ResourceExhausted {
        what: &'static str,
        count: u32,
        max: u32,
    },

    #[error("Malformed DSP package: {0}")]
    Parse(String),

    // ============================================================================
    // Lookup Errors
    // ============================================================================
    #[error("Participant not found: {0}")]
    ParticipantNotFound(u8),

    #[error("Participant {0} has no DSP bound")]
    NeedDsp(u8),

    #[error("Primitive {id} domain {domain} instance {instance} not found in DSP {dsp}")]
    PrimitiveNotFoundInDsp {
        dsp: String,
        id: u16,
        domain: String,
        instance: u8,
    },

    // ============================================================================
    // Dispatch Errors
    // ============================================================================
    #[error("Unsupported action type: {0}")]
    UnsupportedActionType(u32),

    #[error("Response buffer too small: {needed} bytes required")]
    NeedLargerBuffer { needed: u32 },

    #[error("Parameter is null: {0}")]
    ParameterIsNull(String),

    #[error("Parameter out of bounds: {0}")]
    ParameterOutOfBounds(String),

    #[error("IPC data invalid: {0}")]
    IpcDataInvalid(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A status code reported by an external collaborator
    #[error("Collaborator returned status {0}")]
    Status(Status),

    /// Kernel status outside the known set, carried verbatim
    #[error("Kernel returned status {0}")]
    KernelStatus(u32),

    // ============================================================================
    // Unit Transform Errors
    // ============================================================================
    #[error("No algorithm registered for action type {0}")]
    NeedAlgorithm(u32),

    #[error("Unsupported algorithm kind: {0}")]
    UnsupportedAlgorithm(u32),

    // ============================================================================
    // I/O and Configuration Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl UfError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error from a string
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Stable status code for this error
    pub fn status(&self) -> Status {
        match self {
            UfError::MissingDomain => Status::ParameterIsNull,
            UfError::PackageShort { .. } => Status::CpcShort,
            UfError::RecordSizeInvalid { record, .. } => {
                if *record == "primitive" {
                    Status::CpcPrimitiveSizeInvalid
                } else {
                    Status::CpcSizeInvalid
                }
            }
            UfError::NullRecord(_) => Status::NullPrimitive,
            UfError::ResourceExhausted { .. } => Status::NoMemory,
            UfError::Parse(_) => Status::CpcSizeInvalid,
            UfError::ParticipantNotFound(_) => Status::ParticipantNotFound,
            UfError::NeedDsp(_) => Status::NeedDsp,
            UfError::PrimitiveNotFoundInDsp { .. } => Status::PrimitiveNotFoundInDsp,
            UfError::UnsupportedActionType(_) => Status::UnsupportedActionType,
            UfError::NeedLargerBuffer { .. } => Status::NeedLargerBuffer,
            UfError::ParameterIsNull(_) => Status::ParameterIsNull,
            UfError::ParameterOutOfBounds(_) => Status::ParameterOutOfBounds,
            UfError::IpcDataInvalid(_) => Status::IpcDataInvalid,
            UfError::Timeout(_) => Status::Timeout,
            UfError::Status(s) => *s,
            UfError::KernelStatus(_) => Status::Unspecified,
            UfError::NeedAlgorithm(_) => Status::NeedAlgorithm,
            UfError::UnsupportedAlgorithm(_) => Status::UnsupportedAlgorithm,
            UfError::NotSupported(_) => Status::NotSupported,
            UfError::Io(_)
            | UfError::FileRead { .. }
            | UfError::FileTooLarge { .. }
            | UfError::Config(_)
            | UfError::JsonParse(_)
            | UfError::Generic(_) => Status::Unspecified,
        }
    }

    /// Numeric code reported to callers.
    ///
    /// Same as `status().code()` except for kernel codes outside `Status`,
    /// which are returned unchanged.
    pub fn status_code(&self) -> u32 {
        match self {
            UfError::KernelStatus(code) => *code,
            other => other.status().code(),
        }
    }

    /// True for errors that abort loading of a single package
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            UfError::MissingDomain
                | UfError::PackageShort { .. }
                | UfError::RecordSizeInvalid { .. }
                | UfError::NullRecord(_)
                | UfError::ResourceExhausted { .. }
                | UfError::Parse(_)
        )
    }
}

// Allow converting from String to UfError
impl From<String> for UfError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to UfError
impl From<&str> for UfError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}
