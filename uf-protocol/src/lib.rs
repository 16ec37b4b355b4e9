//! Primitive IPC Protocol
//!
//! Message types exchanged between the upper framework and the kernel-side
//! lower framework when a primitive action is marked `is_kernel`. The
//! transport itself is external; this crate only defines the request and
//! response shapes, their validation rules and the data type tags carried
//! with every payload.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global request ID counter for correlation
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum payload carried by one primitive message (64KB)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Instance id reserved for the lower framework
pub const INSTANCE_LF: u8 = 0;

/// Instance id reserved for the upper framework (source of every request)
pub const INSTANCE_UF: u8 = 254;

/// Broadcast destination
pub const INSTANCE_BROADCAST: u8 = 255;

/// Current primitive message version
pub const PRIMITIVE_IPC_VERSION: u8 = 1;

/// Generate a unique request ID for correlation
pub fn generate_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

// ============================================================================
// Data Types
// ============================================================================

/// Data type tag attached to every request/response buffer.
///
/// Numeric values are shared with compiled packages and the kernel side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DataType {
    Uint8 = 1,
    Uint16 = 2,
    Uint32 = 3,
    Uint64 = 4,
    Guid = 5,
    Temperature = 6,
    Binary = 7,
    String = 8,
    Unicode = 9,
    Int8 = 11,
    Int16 = 12,
    Int32 = 13,
    Int64 = 14,
    Void = 24,
    Power = 26,
    Bit = 27,
    Percent = 29,
    Time = 31,
    Structure = 32,
    Dsp = 33,
    Blob = 34,
    Table = 35,
    Auto = 36,
    Frequency = 40,
}

impl DataType {
    const ALL: [DataType; 24] = [
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Guid,
        DataType::Temperature,
        DataType::Binary,
        DataType::String,
        DataType::Unicode,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Void,
        DataType::Power,
        DataType::Bit,
        DataType::Percent,
        DataType::Time,
        DataType::Structure,
        DataType::Dsp,
        DataType::Blob,
        DataType::Table,
        DataType::Auto,
        DataType::Frequency,
    ];

    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Decode a raw tag read from a package or a message
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.raw() == raw)
    }

    /// Default response allocation for this type when the caller asks the
    /// dispatcher to allocate.
    pub fn default_buffer_size(self) -> usize {
        match self {
            DataType::Uint64 | DataType::Int64 | DataType::Frequency => 8,
            DataType::String => 128,
            DataType::Unicode => 256,
            DataType::Binary | DataType::Table => 4096,
            _ => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Uint8 => "UINT8",
            DataType::Uint16 => "UINT16",
            DataType::Uint32 => "UINT32",
            DataType::Uint64 => "UINT64",
            DataType::Guid => "GUID",
            DataType::Temperature => "TEMPERATURE",
            DataType::Binary => "BINARY",
            DataType::String => "STRING",
            DataType::Unicode => "UNICODE",
            DataType::Int8 => "INT8",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Void => "VOID",
            DataType::Power => "POWER",
            DataType::Bit => "BIT",
            DataType::Percent => "PERCENT",
            DataType::Time => "TIME",
            DataType::Structure => "STRUCTURE",
            DataType::Dsp => "DSP",
            DataType::Blob => "BLOB",
            DataType::Table => "TABLE",
            DataType::Auto => "AUTO",
            DataType::Frequency => "FREQUENCY",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.raw())
    }
}

/// Primitive operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PrimitiveOpcode {
    Get = 1,
    Set = 2,
}

impl PrimitiveOpcode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(PrimitiveOpcode::Get),
            2 => Some(PrimitiveOpcode::Set),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

// ============================================================================
// Primitive Messages
// ============================================================================

/// Kernel primitive request.
///
/// `data` holds the raw payload. For GET the layout is `{rsp_data, req_data}`
/// with the request placed after the reserved response area; for SET only the
/// request is carried, starting at offset zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveRequest {
    pub version: u8,
    pub id: u32,
    pub domain: u16,
    pub instance: u8,
    pub src_id: u8,
    pub dst_id: u8,
    /// i-th kernel action of the primitive to run
    pub kern_action: u16,
    pub action_type: u32,
    pub opcode: PrimitiveOpcode,
    pub req_data_type: DataType,
    pub req_data_offset: u32,
    pub req_data_len: u32,
    pub rsp_data_type: DataType,
    pub rsp_data_offset: u32,
    pub rsp_data_len: u32,
    pub data: Vec<u8>,
}

impl PrimitiveRequest {
    /// Build a GET message: response area first, request bytes after it
    #[allow(clippy::too_many_arguments)]
    pub fn get(
        id: u32,
        domain: u16,
        instance: u8,
        dst_id: u8,
        kern_action: u16,
        action_type: u32,
        request: (DataType, &[u8]),
        response: (DataType, usize),
    ) -> Self {
        let (req_type, req_bytes) = request;
        let (rsp_type, rsp_len) = response;

        let mut data = vec![0u8; rsp_len];
        let (req_data_type, req_data_offset, req_data_len) = if req_bytes.is_empty() {
            (DataType::Void, 0, 0)
        } else {
            data.extend_from_slice(req_bytes);
            (req_type, rsp_len as u32, req_bytes.len() as u32)
        };

        Self {
            version: PRIMITIVE_IPC_VERSION,
            id,
            domain,
            instance,
            src_id: INSTANCE_UF,
            dst_id,
            kern_action,
            action_type,
            opcode: PrimitiveOpcode::Get,
            req_data_type,
            req_data_offset,
            req_data_len,
            rsp_data_type: rsp_type,
            rsp_data_offset: 0,
            rsp_data_len: rsp_len as u32,
            data,
        }
    }

    /// Build a SET message: request bytes only
    #[allow(clippy::too_many_arguments)]
    pub fn set(
        id: u32,
        domain: u16,
        instance: u8,
        dst_id: u8,
        kern_action: u16,
        action_type: u32,
        request: (DataType, &[u8]),
        response: (DataType, usize),
    ) -> Self {
        let (req_type, req_bytes) = request;
        let (rsp_type, rsp_len) = response;

        Self {
            version: PRIMITIVE_IPC_VERSION,
            id,
            domain,
            instance,
            src_id: INSTANCE_UF,
            dst_id,
            kern_action,
            action_type,
            opcode: PrimitiveOpcode::Set,
            req_data_type: req_type,
            req_data_offset: 0,
            req_data_len: req_bytes.len() as u32,
            rsp_data_type: rsp_type,
            rsp_data_offset: 0,
            rsp_data_len: rsp_len as u32,
            data: req_bytes.to_vec(),
        }
    }

    /// Request bytes carried in the payload
    pub fn request_bytes(&self) -> &[u8] {
        let start = self.req_data_offset as usize;
        let end = start + self.req_data_len as usize;
        self.data.get(start..end).unwrap_or(&[])
    }

    /// Validate offsets and lengths before handing the message to a transport
    pub fn validate(&self) -> Result<(), String> {
        if self.data.len() > MAX_PAYLOAD_SIZE {
            return Err(format!(
                "Payload too large: {} bytes (max {})",
                self.data.len(),
                MAX_PAYLOAD_SIZE
            ));
        }
        validate_window("request", self.req_data_offset, self.req_data_len, self.data.len())?;
        if self.opcode == PrimitiveOpcode::Get {
            validate_window("response", self.rsp_data_offset, self.rsp_data_len, self.data.len())?;
        }
        if self.src_id != INSTANCE_UF {
            return Err(format!("Unexpected source instance {}", self.src_id));
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        match self.opcode {
            PrimitiveOpcode::Get => "PrimitiveGet",
            PrimitiveOpcode::Set => "PrimitiveSet",
        }
    }
}

fn validate_window(what: &str, offset: u32, len: u32, total: usize) -> Result<(), String> {
    let end = offset as u64 + len as u64;
    if end > total as u64 {
        return Err(format!(
            "{} window {}..{} exceeds payload of {} bytes",
            what, offset, end, total
        ));
    }
    Ok(())
}

/// Kernel primitive response.
///
/// `return_code` is the numeric status reported by the lower framework. On
/// `NEED_LARGER_BUFFER` the peer puts the required size in `rsp_data_len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveResponse {
    pub return_code: u32,
    pub rsp_data_len: u32,
    pub data: Vec<u8>,
}

impl PrimitiveResponse {
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            return_code: 0,
            rsp_data_len: data.len() as u32,
            data,
        }
    }

    pub fn error(return_code: u32) -> Self {
        Self {
            return_code,
            rsp_data_len: 0,
            data: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.return_code == 0
    }
}

// ============================================================================
// Envelopes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation and debugging
    pub id: u64,
    /// The actual request
    pub request: PrimitiveRequest,
}

impl RequestEnvelope {
    pub fn new(request: PrimitiveRequest) -> Self {
        Self {
            id: generate_request_id(),
            request,
        }
    }

    pub fn with_id(request: PrimitiveRequest, id: u64) -> Self {
        Self { id, request }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to
    pub id: u64,
    /// The actual response
    pub response: PrimitiveResponse,
}

impl ResponseEnvelope {
    pub fn new(id: u64, response: PrimitiveResponse) -> Self {
        Self { id, response }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_raw_values() {
        assert_eq!(DataType::Temperature.raw(), 6);
        assert_eq!(DataType::Auto.raw(), 36);
        assert_eq!(DataType::from_raw(26), Some(DataType::Power));
        assert_eq!(DataType::from_raw(10), None);
    }

    #[test]
    fn test_default_buffer_sizes() {
        assert_eq!(DataType::Uint32.default_buffer_size(), 4);
        assert_eq!(DataType::Uint64.default_buffer_size(), 8);
        assert_eq!(DataType::Frequency.default_buffer_size(), 8);
        assert_eq!(DataType::String.default_buffer_size(), 128);
        assert_eq!(DataType::Unicode.default_buffer_size(), 256);
        assert_eq!(DataType::Binary.default_buffer_size(), 4096);
        assert_eq!(DataType::Table.default_buffer_size(), 4096);
    }

    #[test]
    fn test_get_layout_places_request_after_response() {
        let req = PrimitiveRequest::get(
            14,
            0x3044,
            255,
            1,
            0,
            4,
            (DataType::Uint32, &[1, 2, 3, 4]),
            (DataType::Uint32, 4),
        );
        assert_eq!(req.rsp_data_offset, 0);
        assert_eq!(req.req_data_offset, 4);
        assert_eq!(req.data.len(), 8);
        assert_eq!(req.request_bytes(), &[1, 2, 3, 4]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_get_without_request_is_void() {
        let req = PrimitiveRequest::get(14, 0, 0, 1, 0, 4, (DataType::Uint32, &[]), (DataType::Uint32, 4));
        assert_eq!(req.req_data_type, DataType::Void);
        assert_eq!(req.req_data_len, 0);
    }

    #[test]
    fn test_validate_rejects_bad_window() {
        let mut req = PrimitiveRequest::set(1, 0, 0, 1, 0, 4, (DataType::Uint32, &[0; 4]), (DataType::Void, 0));
        req.req_data_len = 16;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_envelope_json() {
        let req = PrimitiveRequest::set(7, 0x3044, 255, 2, 1, 9, (DataType::Uint32, &[5, 0, 0, 0]), (DataType::Void, 0));
        let env = RequestEnvelope::with_id(req.clone(), 42);
        let json = env.to_json().unwrap();
        let back = RequestEnvelope::from_json(&json).unwrap();
        assert_eq!(back.id, 42);
        assert_eq!(back.request, req);
    }

    #[test]
    fn test_request_ids_increase() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert!(b > a);
    }
}
