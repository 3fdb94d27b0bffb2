//! Generation-tagged slot keys.

use std::fmt;

/// Key of an element in a [`SlotPool`](crate::SlotPool).
///
/// Encoding: upper 32 bits = slot index, lower 32 bits = generation.
/// The raw `u64` form is what crosses into the native extra slot, the
/// script opaque slot and completion tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(u64);

impl SlotKey {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self(((slot as u64) << 32) | (generation as u64))
    }

    /// Rebuild a key from its raw form.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw form of this key.
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Slot index.
    pub fn slot(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Generation the key was issued for.
    pub fn generation(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot(), self.generation())
    }
}
