//! Sparse ordered container keyed by a [`FixedId`].

use crate::{Error, FixedId};
use std::fmt;

/// A keyed container over the fixed id range `[0, K::COUNT)`.
///
/// Values live in a dense slot array indexed by id, giving O(1) presence checks and lookups.
/// A separate ascending list of present ids gives ordered iteration over only the `len()`
/// present entries.
///
/// Ordinals (positions in the ascending id list) are stable until the next `add` or `remove`;
/// any structural mutation may shift them.
#[derive(Clone)]
pub struct FixedIdSet<K: FixedId, T> {
    slots: Vec<Option<T>>,
    order: Vec<K>,
}

impl<K: FixedId, T> Default for FixedIdSet<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: FixedId, T> FixedIdSet<K, T> {
    pub fn new() -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(K::COUNT).collect(),
            order: Vec::with_capacity(K::COUNT),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: K) -> bool {
        self.get(id).is_some()
    }

    /// Stores `value` under `id` and returns its ordinal.
    pub fn add(&mut self, id: K, value: T) -> Result<usize, Error> {
        let slot = &mut self.slots[id.index()];
        if slot.is_some() {
            return Err(Error::SlotOccupied { id: id.name() });
        }
        *slot = Some(value);

        let ordinal = self.order.partition_point(|&present| present < id);
        self.order.insert(ordinal, id);
        Ok(ordinal)
    }

    pub fn remove(&mut self, id: K) -> Result<T, Error> {
        let value = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(Error::SlotEmpty { id: id.name() })?;

        if let Ok(ordinal) = self.order.binary_search(&id) {
            self.order.remove(ordinal);
        }
        Ok(value)
    }

    pub fn get(&self, id: K) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn get_by_ordinal(&self, ordinal: usize) -> Option<&T> {
        self.id_at_ordinal(ordinal).and_then(|id| self.get(id))
    }

    pub fn get_by_ordinal_mut(&mut self, ordinal: usize) -> Option<&mut T> {
        let id = self.id_at_ordinal(ordinal)?;
        self.get_mut(id)
    }

    pub fn id_at_ordinal(&self, ordinal: usize) -> Option<K> {
        self.order.get(ordinal).copied()
    }

    pub fn ordinal_of(&self, id: K) -> Option<usize> {
        self.order.binary_search(&id).ok()
    }

    /// Present ids in ascending order.
    pub fn ids(&self) -> &[K] {
        &self.order
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (K, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.slots[id.index()].as_ref().map(|value| (id, value)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        // Slots are visited in index order, which is ascending id order.
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let id = K::from_index(index)?;
                slot.as_mut().map(|value| (id, value))
            })
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Removes every entry, highest id first.
    pub fn drain_descending(&mut self) -> Vec<(K, T)> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(id) = self.order.pop() {
            if let Some(value) = self.slots[id.index()].take() {
                out.push((id, value));
            }
        }
        out
    }
}

impl<K: FixedId, T: fmt::Debug> fmt::Debug for FixedIdSet<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
