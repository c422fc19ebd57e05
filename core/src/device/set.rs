use super::reading::{DeviceId, DeviceReading};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered collection of the latest accepted reading per device.
///
/// Entries are shared so that a reading which survives a reconciliation
/// untouched stays pointer-identical across sets.
#[derive(Debug, Clone, Default)]
pub struct DeviceSet {
    entries: Vec<Arc<DeviceReading>>,
    index: HashMap<DeviceId, usize>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set wholesale, e.g. from a freshly loaded map. A repeated id
    /// keeps its first position and its last reading.
    pub fn from_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = DeviceReading>,
    {
        let mut set = Self::new();
        for reading in readings {
            match set.position(reading.id) {
                Some(slot) => set.replace(slot, Arc::new(reading)),
                None => set.push(Arc::new(reading)),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: DeviceId) -> Option<&Arc<DeviceReading>> {
        self.index.get(&id).map(|&slot| &self.entries[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceReading>> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<DeviceId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub(crate) fn position(&self, id: DeviceId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn entry(&self, slot: usize) -> &Arc<DeviceReading> {
        &self.entries[slot]
    }

    pub(crate) fn push(&mut self, reading: Arc<DeviceReading>) {
        self.index.insert(reading.id, self.entries.len());
        self.entries.push(reading);
    }

    pub(crate) fn replace(&mut self, slot: usize, reading: Arc<DeviceReading>) {
        self.entries[slot] = reading;
    }
}

impl<'a> IntoIterator for &'a DeviceSet {
    type Item = &'a Arc<DeviceReading>;
    type IntoIter = std::slice::Iter<'a, Arc<DeviceReading>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
