// src/analysis/association.rs
//
// Permanent box -> pizza credit table. Once a box is credited it keeps
// its pizza for the lifetime of the stream, and a pizza is never credited
// to a second box. A side without a track id can hold a credit but can
// never be matched against one.

use crate::types::TrackId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AssociationTable {
    by_container: HashMap<TrackId, Option<TrackId>>,
    by_content: HashMap<TrackId, Option<TrackId>>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(credit)` if the box already holds a credit. The inner value is
    /// `None` when the credited pizza was untracked.
    pub fn content_of(&self, container_id: TrackId) -> Option<Option<TrackId>> {
        self.by_container.get(&container_id).copied()
    }

    pub fn container_of(&self, content_id: TrackId) -> Option<Option<TrackId>> {
        self.by_content.get(&content_id).copied()
    }

    pub fn is_container_credited(&self, container_id: TrackId) -> bool {
        self.by_container.contains_key(&container_id)
    }

    pub fn is_content_credited(&self, content_id: TrackId) -> bool {
        self.by_content.contains_key(&content_id)
    }

    /// Record a credit. Returns false and leaves the table untouched if
    /// either tracked side is already credited.
    pub fn insert(&mut self, container_id: Option<TrackId>, content_id: Option<TrackId>) -> bool {
        if container_id.is_some_and(|id| self.is_container_credited(id))
            || content_id.is_some_and(|id| self.is_content_credited(id))
        {
            return false;
        }

        if let Some(id) = container_id {
            self.by_container.insert(id, content_id);
        }
        if let Some(id) = content_id {
            self.by_content.insert(id, container_id);
        }
        true
    }

    /// Number of credited boxes
    pub fn len(&self) -> usize {
        self.by_container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_container.is_empty() && self.by_content.is_empty()
    }
}
