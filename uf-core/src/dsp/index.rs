//! DSP Index
//!
//! Aggregate root for one hardware profile. Primitives are keyed by their
//! tuple; each key maps to an ordered chain so that a later record carrying
//! an already-seen tuple is kept (and reported) instead of silently
//! replacing the first one. Lookups always return the first entry of the
//! chain.

use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::records::{Action, Algorithm, Domain, DspDescriptor, Event, Primitive, PrimitiveTuple};
use crate::constants::dsp::HASH_BUCKETS;

/// Primitive shadowed by an earlier record with the same tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateTuple {
    pub tuple: PrimitiveTuple,
    /// Position of the shadowed record in parse order
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct DspIndex {
    descriptor: DspDescriptor,
    declared_size: u32,
    domains: Vec<Domain>,
    primitives: Vec<Primitive>,
    table: HashMap<PrimitiveTuple, Vec<usize>>,
    algorithms: Vec<Algorithm>,
    events: Vec<Event>,
    duplicates: Vec<DuplicateTuple>,
}

impl DspIndex {
    pub fn new(descriptor: DspDescriptor, declared_size: u32) -> Self {
        Self {
            descriptor,
            declared_size,
            domains: Vec::new(),
            primitives: Vec::new(),
            table: HashMap::with_capacity(HASH_BUCKETS),
            algorithms: Vec::new(),
            events: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    // ========================================================================
    // Insertion (parse time only)
    // ========================================================================

    /// Insert a primitive keyed by its tuple.
    ///
    /// Returns `false` when the tuple was already present; the new record is
    /// appended to the chain behind the existing one and recorded in
    /// [`DspIndex::duplicates`].
    pub fn insert_primitive(&mut self, primitive: Primitive) -> bool {
        let position = self.primitives.len();
        let tuple = primitive.tuple;
        self.primitives.push(primitive);

        let chain = self.table.entry(tuple).or_default();
        chain.push(position);
        if chain.len() > 1 {
            warn!(
                dsp = %self.descriptor.code,
                tuple = %tuple,
                position,
                "Duplicate primitive tuple shadowed by earlier record"
            );
            self.duplicates.push(DuplicateTuple { tuple, position });
            return false;
        }
        true
    }

    pub fn insert_domain(&mut self, domain: Domain) {
        self.domains.push(domain);
    }

    pub fn insert_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithms.push(algorithm);
    }

    pub fn insert_event(&mut self, event: Event) {
        self.events.push(event);
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn descriptor(&self) -> &DspDescriptor {
        &self.descriptor
    }

    pub fn code(&self) -> &str {
        &self.descriptor.code
    }

    pub fn version(&self) -> (u8, u8) {
        (self.descriptor.ver_major, self.descriptor.ver_minor)
    }

    /// Size declared in the package header
    pub fn declared_size(&self) -> u32 {
        self.declared_size
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// First primitive whose tuple equals `tuple`
    pub fn get_primitive(&self, tuple: &PrimitiveTuple) -> Option<&Primitive> {
        let first = *self.table.get(tuple)?.first()?;
        self.primitives.get(first)
    }

    /// Every record carrying `tuple`, lookup winner first
    pub fn primitive_chain(&self, tuple: &PrimitiveTuple) -> Vec<&Primitive> {
        self.table
            .get(tuple)
            .map(|chain| chain.iter().filter_map(|&i| self.primitives.get(i)).collect())
            .unwrap_or_default()
    }

    /// i-th action of `primitive` (zero-based, chain order)
    pub fn get_action<'p>(&self, primitive: &'p Primitive, index: usize) -> Option<&'p Action> {
        primitive.actions.get(index)
    }

    /// First algorithm declared for `action_type`
    pub fn get_algorithm(&self, action_type: u32) -> Option<&Algorithm> {
        self.algorithms.iter().find(|a| a.action_type == action_type)
    }

    /// Domain by 1-based index
    pub fn get_domain(&self, index: usize) -> Option<&Domain> {
        index.checked_sub(1).and_then(|i| self.domains.get(i))
    }

    /// Domain by its packed qualifier
    pub fn get_domain_by_qualifier(&self, qualifier: u16) -> Option<&Domain> {
        self.domains.iter().find(|d| d.qualifier == qualifier)
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub fn get_event_by_type(&self, event_type: u32) -> Option<&Event> {
        self.events.iter().find(|e| e.event_type == event_type)
    }

    pub fn get_event_by_guid(&self, guid: &[u8; 16]) -> Option<&Event> {
        self.events.iter().find(|e| &e.event_guid == guid)
    }

    /// Event by alias name
    pub fn get_event_by_name(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// All primitive records in parse order, duplicates included
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Records shadowed by an earlier tuple
    pub fn duplicates(&self) -> &[DuplicateTuple] {
        &self.duplicates
    }
}
