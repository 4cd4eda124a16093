//! Sandbox-side registries: live engine objects by handle, and the file
//! materialization table.
//!
//! [`HandleRegistry`] is a dense slot arena with a free list. A removed slot
//! goes back on the free list and its number may be minted again; a
//! *retired* slot has released its value but keeps its number reserved until
//! [`HandleRegistry::reclaim`] is called. The dispatcher retires connection
//! handles that still have live statements so the number is not handed to a
//! different database while those statements can still name it.
//!
//! Correctness of reuse beyond that is a caller contract: the registry does
//! not know who else holds a copy of a handle.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::handle::{ConnectionHandle, Handle};

enum Slot<T> {
    Live(T),
    Retired,
    Vacant,
}

/// Integer-keyed arena of live objects.
pub struct HandleRegistry<H, T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
    _handle: PhantomData<H>,
}

impl<H: Handle, T> HandleRegistry<H, T> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }

    /// Registers `value` under a freshly minted handle.
    ///
    /// Returns `None` only when the handle space is exhausted.
    pub fn insert(&mut self, value: T) -> Option<H> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len();
                // Check the handle fits before growing the arena.
                H::from_slot(index)?;
                self.slots.push(Slot::Vacant);
                index
            }
        };
        let handle = H::from_slot(index)?;
        self.slots[index] = Slot::Live(value);
        self.live += 1;
        Some(handle)
    }

    /// Returns the live object behind `handle`.
    pub fn get(&self, handle: H) -> Option<&T> {
        match self.slots.get(handle.slot()?)? {
            Slot::Live(value) => Some(value),
            Slot::Retired | Slot::Vacant => None,
        }
    }

    /// Returns the live object behind `handle`, mutably.
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        match self.slots.get_mut(handle.slot()?)? {
            Slot::Live(value) => Some(value),
            Slot::Retired | Slot::Vacant => None,
        }
    }

    /// Removes the object and frees its handle for reuse.
    pub fn remove(&mut self, handle: H) -> Option<T> {
        let index = handle.slot()?;
        let value = self.take(index, Slot::Vacant)?;
        self.free.push(index);
        Some(value)
    }

    /// Removes the object but keeps its handle reserved.
    pub fn retire(&mut self, handle: H) -> Option<T> {
        self.take(handle.slot()?, Slot::Retired)
    }

    /// Frees a retired handle for reuse. Returns `false` if it was not retired.
    pub fn reclaim(&mut self, handle: H) -> bool {
        let Some(index) = handle.slot() else {
            return false;
        };
        match self.slots.get_mut(index) {
            Some(slot @ Slot::Retired) => {
                *slot = Slot::Vacant;
                self.free.push(index);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `handle` is retired (closed but still reserved).
    pub fn is_retired(&self, handle: H) -> bool {
        handle
            .slot()
            .and_then(|index| self.slots.get(index))
            .is_some_and(|slot| matches!(slot, Slot::Retired))
    }

    /// Number of live objects.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` when no object is live.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Live(value) => Some((H::from_slot(index)?, value)),
                Slot::Retired | Slot::Vacant => None,
            })
    }

    fn take(&mut self, index: usize, replacement: Slot<T>) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        if !matches!(slot, Slot::Live(_)) {
            return None;
        }
        match std::mem::replace(slot, replacement) {
            Slot::Live(value) => {
                self.live -= 1;
                Some(value)
            }
            Slot::Retired | Slot::Vacant => None,
        }
    }
}

impl<H: Handle, T> Default for HandleRegistry<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps each open connection to the storage name its image came from.
#[derive(Debug, Default)]
pub struct FileTable {
    entries: HashMap<ConnectionHandle, String>,
}

impl FileTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the storage name for `handle`, replacing any stale entry.
    pub fn insert(&mut self, handle: ConnectionHandle, name: impl Into<String>) {
        self.entries.insert(handle, name.into());
    }

    /// Storage name recorded for `handle`.
    #[must_use]
    pub fn get(&self, handle: ConnectionHandle) -> Option<&str> {
        self.entries.get(&handle).map(String::as_str)
    }

    /// Removes and returns the entry for `handle`.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<String> {
        self.entries.remove(&handle)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
