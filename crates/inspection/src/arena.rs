// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference-counted string arena
//!
//! Decoded string signals are variable length; storing them by handle
//! keeps the history rings `Copy` and avoids copying on every read.
//! Identical strings share a slot. The arena lives on the evaluator
//! task, so no locking.

use canopy_core::StringHandle;
use std::collections::HashMap;

struct Slot {
    value: String,
    refs: u32,
}

#[derive(Default)]
pub struct StringArena {
    slots: Vec<Option<Slot>>,
    free: Vec<u32>,
    by_value: HashMap<String, u32>,
}

impl StringArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string with an initial reference. An already-present
    /// string gets its refcount bumped instead of a new slot.
    pub fn insert(&mut self, value: &str) -> StringHandle {
        if let Some(&slot) = self.by_value.get(value) {
            if let Some(entry) = self.slots.get_mut(slot as usize).and_then(|s| s.as_mut()) {
                entry.refs += 1;
                return StringHandle(slot);
            }
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(Slot { value: value.to_string(), refs: 1 });
                slot
            }
            None => {
                self.slots.push(Some(Slot { value: value.to_string(), refs: 1 }));
                (self.slots.len() - 1) as u32
            }
        };
        self.by_value.insert(value.to_string(), slot);
        StringHandle(slot)
    }

    /// Add a reference for a handle already held somewhere.
    pub fn retain(&mut self, handle: StringHandle) {
        if let Some(entry) = self.slots.get_mut(handle.0 as usize).and_then(|s| s.as_mut()) {
            entry.refs += 1;
        }
    }

    /// Drop one reference; the slot is reused once the last holder lets
    /// go.
    pub fn release(&mut self, handle: StringHandle) {
        let Some(slot) = self.slots.get_mut(handle.0 as usize) else { return };
        let Some(entry) = slot.as_mut() else { return };
        entry.refs -= 1;
        if entry.refs == 0 {
            self.by_value.remove(&entry.value);
            *slot = None;
            self.free.push(handle.0);
        }
    }

    pub fn get(&self, handle: StringHandle) -> Option<&str> {
        self.slots
            .get(handle.0 as usize)
            .and_then(|s| s.as_ref())
            .map(|entry| entry.value.as_str())
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "arena_tests.rs"]
mod tests;
