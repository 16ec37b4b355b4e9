//! Registry of loaded DSP profiles
//!
//! Written at load time, read by selection and dispatch. Profiles are handed
//! out as `Arc<DspIndex>` so an unload never invalidates a binding that is
//! still in use.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::index::DspIndex;

/// Handle of a registered profile, stable for the registry's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DspId(u32);

impl DspId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dsp#{}", self.0)
    }
}

#[derive(Default)]
struct RegistryInner {
    next_id: u32,
    /// Load order; selection ties resolve to the earliest entry
    entries: Vec<(DspId, Arc<DspIndex>)>,
}

#[derive(Default)]
pub struct DspRegistry {
    inner: RwLock<RegistryInner>,
}

impl DspRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed profile and return its handle
    pub fn register(&self, index: DspIndex) -> DspId {
        self.register_shared(Arc::new(index))
    }

    pub fn register_shared(&self, index: Arc<DspIndex>) -> DspId {
        let mut inner = self.inner.write();
        let id = DspId(inner.next_id);
        inner.next_id += 1;
        info!(
            id = %id,
            code = %index.code(),
            primitives = index.primitive_count(),
            "Registered DSP"
        );
        inner.entries.push((id, index));
        id
    }

    pub fn get(&self, id: DspId) -> Option<Arc<DspIndex>> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, idx)| Arc::clone(idx))
    }

    /// First-loaded profile whose code equals `code`
    pub fn get_by_code(&self, code: &str) -> Option<(DspId, Arc<DspIndex>)> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|(_, idx)| idx.code() == code)
            .map(|(id, idx)| (*id, Arc::clone(idx)))
    }

    /// Remove a profile; participants bound to it keep their reference
    pub fn unload(&self, id: DspId) -> Option<Arc<DspIndex>> {
        let mut inner = self.inner.write();
        let pos = inner.entries.iter().position(|(i, _)| *i == id)?;
        let (_, index) = inner.entries.remove(pos);
        debug!(id = %id, code = %index.code(), "Unloaded DSP");
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent copy of the registered profiles in load order
    pub fn snapshot(&self) -> Vec<(DspId, Arc<DspIndex>)> {
        self.inner.read().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::records::DspDescriptor;

    fn index(code: &str) -> DspIndex {
        DspIndex::new(
            DspDescriptor {
                code: code.into(),
                ..DspDescriptor::default()
            },
            0,
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let reg = DspRegistry::new();
        let a = reg.register(index("dpf_fan"));
        let b = reg.register(index("dpf_fan"));
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(b).map(|i| i.code().to_string()), Some("dpf_fan".into()));
        // First loaded wins on a shared code
        assert_eq!(reg.get_by_code("dpf_fan").map(|(id, _)| id), Some(a));
        assert!(reg.get_by_code("nope").is_none());
    }

    #[test]
    fn test_unload_keeps_outstanding_references() {
        let reg = DspRegistry::new();
        let id = reg.register(index("dpf_wifi"));
        let held = reg.get(id).unwrap();

        assert!(reg.unload(id).is_some());
        assert!(reg.get(id).is_none());
        assert!(reg.is_empty());
        assert_eq!(held.code(), "dpf_wifi");
        assert!(reg.unload(id).is_none());
    }

    #[test]
    fn test_ids_not_reused_after_unload() {
        let reg = DspRegistry::new();
        let a = reg.register(index("x"));
        reg.unload(a);
        let b = reg.register(index("y"));
        assert!(b > a);
    }
}
