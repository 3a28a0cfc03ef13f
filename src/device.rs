//! Fixed-size device table.
//!
//! Every slot is statically allocated; there is no heap and no resizing.
//! `DeviceTable` owns a flat `[DeviceRecord; MAX_DEVICE]` array, built with
//! [`core::array::from_fn`] so construction doesn't require `DeviceRecord` to
//! implement `Copy`.

use crate::consts::{MAX_DESCRIPTION, MAX_DEVICE, MAX_UNIT};
use heapless::Vec;

/// Per-device liveness and attribute state.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Monotonic timestamp (ms) of the most recent successful poll, or 0.
    pub last_poll_time_ms: u64,
    /// Seconds between polls, as last reported by the device's discover
    /// response.
    pub poll_interval_s: u16,
    /// Remaining consecutive-failure budget. `0` means inactive.
    pub active_count: u8,
    /// Opaque device description, as last reported by discover.
    pub description: Vec<u8, MAX_DESCRIPTION>,
    /// Opaque unit string, as last reported by discover.
    pub unit: Vec<u8, MAX_UNIT>,
}

impl DeviceRecord {
    pub(crate) const fn empty() -> Self {
        Self {
            last_poll_time_ms: 0,
            poll_interval_s: 0,
            active_count: 0,
            description: Vec::new(),
            unit: Vec::new(),
        }
    }

    /// Whether this device currently counts as active.
    pub fn is_active(&self) -> bool {
        self.active_count > 0
    }

    /// Clears attribute fields. Called when a device decays to inactive.
    pub(crate) fn clear(&mut self) {
        self.last_poll_time_ms = 0;
        self.poll_interval_s = 0;
        self.description.clear();
        self.unit.clear();
    }
}

/// The fixed table of all device slots, indexed by device id.
#[derive(Debug)]
pub struct DeviceTable {
    records: [DeviceRecord; MAX_DEVICE],
}

impl DeviceTable {
    /// Builds a table with every slot inactive and empty.
    pub fn new() -> Self {
        Self {
            records: core::array::from_fn(|_| DeviceRecord::empty()),
        }
    }

    /// Borrows a device record by id.
    ///
    /// # Panics
    /// Panics if `id >= MAX_DEVICE`. Callers mask ids to the wire's 7-bit
    /// range before indexing, so this is a programming-error guard, not a
    /// reachable runtime condition.
    pub fn get(&self, id: usize) -> &DeviceRecord {
        &self.records[id]
    }

    /// Mutably borrows a device record by id. See [`DeviceTable::get`].
    pub fn get_mut(&mut self, id: usize) -> &mut DeviceRecord {
        &mut self.records[id]
    }

    /// Iterates over all `(id, record)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DeviceRecord)> {
        self.records.iter().enumerate()
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}
