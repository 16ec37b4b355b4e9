//! Kernel IPC seam
//!
//! Kernel actions are forwarded as one synchronous request/response
//! exchange. A transport carries at most one request in flight per channel;
//! callers sharing a channel are serialized by the transport.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, trace};

use uf_protocol::{PrimitiveOpcode, PrimitiveRequest, PrimitiveResponse, RequestEnvelope, ResponseEnvelope};

use crate::error::{Result, Status, UfError};

#[cfg_attr(test, mockall::automock)]
pub trait IpcTransport: Send + Sync {
    /// Execute one kernel primitive request
    fn execute(&self, request: &PrimitiveRequest) -> Result<PrimitiveResponse>;
}

/// (primitive id, domain, instance, kernel action index)
type LoopbackKey = (u32, u16, u8, u16);

/// In-process stand-in for the kernel side.
///
/// Every exchange is round-tripped through the JSON wire envelopes. A SET
/// stores the request bytes; a GET returns the stored bytes for the same
/// key, reporting `NeedLargerBuffer` when the response area is too small.
#[derive(Default)]
pub struct LoopbackTransport {
    store: Mutex<HashMap<LoopbackKey, Vec<u8>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload the value a GET of this primitive will return
    pub fn preload(&self, id: u16, domain: u16, instance: u8, kern_action: u16, bytes: &[u8]) {
        self.store
            .lock()
            .insert((id as u32, domain, instance, kern_action), bytes.to_vec());
    }

    fn serve(&self, request: &PrimitiveRequest) -> PrimitiveResponse {
        let key = (request.id, request.domain, request.instance, request.kern_action);
        let mut store = self.store.lock();
        match request.opcode {
            PrimitiveOpcode::Set => {
                store.insert(key, request.request_bytes().to_vec());
                PrimitiveResponse::ok(Vec::new())
            }
            PrimitiveOpcode::Get => match store.get(&key) {
                Some(bytes) if bytes.len() > request.rsp_data_len as usize => PrimitiveResponse {
                    return_code: Status::NeedLargerBuffer.code(),
                    rsp_data_len: bytes.len() as u32,
                    data: Vec::new(),
                },
                Some(bytes) => PrimitiveResponse::ok(bytes.clone()),
                None => PrimitiveResponse::error(Status::PrimitiveNotFoundInDsp.code()),
            },
        }
    }
}

impl IpcTransport for LoopbackTransport {
    fn execute(&self, request: &PrimitiveRequest) -> Result<PrimitiveResponse> {
        request.validate().map_err(UfError::IpcDataInvalid)?;

        let wire = RequestEnvelope::new(request.clone()).to_json()?;
        trace!(bytes = wire.len(), "IPC request");
        let envelope = RequestEnvelope::from_json(&wire)?;

        let response = self.serve(&envelope.request);
        debug!(
            id = envelope.id,
            primitive = envelope.request.id,
            kind = envelope.request.type_name(),
            return_code = response.return_code,
            "Loopback IPC"
        );

        let wire = ResponseEnvelope::new(envelope.id, response).to_json()?;
        Ok(ResponseEnvelope::from_json(&wire)?.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uf_protocol::DataType;

    #[test]
    fn test_set_then_get() {
        let t = LoopbackTransport::new();
        let set = PrimitiveRequest::set(200, 0x3044, 255, 1, 0, 7, (DataType::Uint32, &[9, 0, 0, 0]), (DataType::Void, 0));
        assert!(t.execute(&set).unwrap().is_ok());

        let get = PrimitiveRequest::get(200, 0x3044, 255, 1, 0, 7, (DataType::Void, &[]), (DataType::Uint32, 4));
        let rsp = t.execute(&get).unwrap();
        assert!(rsp.is_ok());
        assert_eq!(rsp.data, vec![9, 0, 0, 0]);
    }

    #[test]
    fn test_get_too_small_reports_needed() {
        let t = LoopbackTransport::new();
        t.preload(30, 0x3044, 0, 0, &[1u8; 64]);
        let get = PrimitiveRequest::get(30, 0x3044, 0, 1, 0, 7, (DataType::Void, &[]), (DataType::Binary, 16));
        let rsp = t.execute(&get).unwrap();
        assert_eq!(rsp.return_code, Status::NeedLargerBuffer.code());
        assert_eq!(rsp.rsp_data_len, 64);
    }

    #[test]
    fn test_unknown_primitive() {
        let t = LoopbackTransport::new();
        let get = PrimitiveRequest::get(1, 0, 0, 1, 0, 7, (DataType::Void, &[]), (DataType::Uint32, 4));
        assert_eq!(t.execute(&get).unwrap().return_code, Status::PrimitiveNotFoundInDsp.code());
    }
}
