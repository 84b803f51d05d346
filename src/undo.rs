//! Per-layer undo/redo history of slice edits.

use std::collections::VecDeque;

use crate::enums::Orientation;
use crate::layers::LayerIds;

pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// Before/after bytes of one slice of one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoDelta {
    pub layer_id: String,
    pub orientation: Orientation,
    pub slice_index: usize,
    /// Raw slice bytes before the edit
    pub old_slice: Vec<u8>,
    /// Raw slice bytes after the edit
    pub new_slice: Vec<u8>,
}

#[derive(Debug, Default)]
struct LayerHistory {
    undo: VecDeque<UndoDelta>,
    redo: Vec<UndoDelta>,
}

/// Bounded undo and redo stacks, one pair per layer.
///
/// `undo` and `redo` act on the active layer and hand back the delta they
/// moved; the caller writes `old_slice` (undo) or `new_slice` (redo) into
/// the volume. Both return `None` when there is nothing to move.
#[derive(Debug)]
pub struct UndoManager {
    ids: LayerIds,
    histories: Vec<LayerHistory>,
    active: usize,
    capacity: usize,
}

impl UndoManager {
    pub fn new(ids: LayerIds) -> Self {
        Self::with_capacity(ids, DEFAULT_UNDO_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(ids: LayerIds, capacity: usize) -> Self {
        let histories = (0..ids.len()).map(|_| LayerHistory::default()).collect();
        Self {
            ids,
            histories,
            active: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_active_layer(&mut self, id: &str) {
        self.active = self.ids.resolve(id);
    }

    pub fn active_layer(&self) -> &str {
        self.ids.name(self.active).unwrap_or_default()
    }

    /// Record an edit. Evicts the oldest delta of that layer once the stack
    /// is full, and drops the layer's redo history.
    pub fn push(&mut self, delta: UndoDelta) {
        let layer = self.ids.resolve(&delta.layer_id);
        let history = &mut self.histories[layer];
        history.redo.clear();
        history.undo.push_back(delta);
        while history.undo.len() > self.capacity {
            history.undo.pop_front();
            log::debug!(
                "Undo history of layer {:?} full, evicted oldest delta",
                self.ids.name(layer).unwrap_or_default()
            );
        }
    }

    pub fn undo(&mut self) -> Option<&UndoDelta> {
        let history = &mut self.histories[self.active];
        let delta = history.undo.pop_back()?;
        history.redo.push(delta);
        history.redo.last()
    }

    pub fn redo(&mut self) -> Option<&UndoDelta> {
        let history = &mut self.histories[self.active];
        let delta = history.redo.pop()?;
        history.undo.push_back(delta);
        history.undo.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.histories[self.active].undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.histories[self.active].redo.is_empty()
    }

    pub fn undo_depth(&self, id: &str) -> usize {
        self.ids
            .position(id)
            .map_or(0, |layer| self.histories[layer].undo.len())
    }

    pub fn redo_depth(&self, id: &str) -> usize {
        self.ids
            .position(id)
            .map_or(0, |layer| self.histories[layer].redo.len())
    }

    pub fn clear_layer(&mut self, id: &str) {
        let layer = self.ids.resolve(id);
        self.histories[layer] = LayerHistory::default();
    }

    pub fn clear_all(&mut self) {
        for history in &mut self.histories {
            *history = LayerHistory::default();
        }
    }
}
