//! Capped quantity slots and keyed slot collections.
//!
//! A [`Slot`] always satisfies `quantity <= cap`. Mutations clamp instead of
//! failing; the only caller errors are creating a key twice and adding to a
//! key that does not exist.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from slot collection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot '{key}' already exists")]
    Duplicate { key: String },
    #[error("slot '{key}' does not exist")]
    Missing { key: String },
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A capped, non-negative quantity.
///
/// Deserialized slots go through [`Slot::new`], so saved data with a
/// quantity above its cap loads clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SavedSlot")]
pub struct Slot {
    quantity: u32,
    cap: u32,
}

/// Wire shape of a [`Slot`], before clamping.
#[derive(Deserialize)]
struct SavedSlot {
    quantity: u32,
    cap: u32,
}

impl From<SavedSlot> for Slot {
    fn from(saved: SavedSlot) -> Self {
        Slot::new(saved.cap, saved.quantity)
    }
}

impl Slot {
    /// Create a slot. The initial quantity is clamped to the cap.
    pub fn new(cap: u32, initial: u32) -> Self {
        Self {
            quantity: initial.min(cap),
            cap,
        }
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Room left before the cap is reached.
    pub fn space(&self) -> u32 {
        self.cap.saturating_sub(self.quantity)
    }

    pub fn is_full(&self) -> bool {
        self.quantity == self.cap
    }

    /// Change the cap, pulling the quantity down if it no longer fits.
    pub fn set_cap(&mut self, cap: u32) {
        self.cap = cap;
        self.quantity = self.quantity.min(cap);
    }

    /// Add up to `amount`. Returns how much was actually added.
    #[must_use = "the added amount may be less than requested"]
    pub fn add(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.space());
        self.quantity += added;
        added
    }

    /// Remove up to `amount`. Returns how much was actually removed.
    #[must_use = "the removed amount may be less than requested"]
    pub fn remove(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.quantity);
        self.quantity -= removed;
        removed
    }
}

// ---------------------------------------------------------------------------
// SlotCollection
// ---------------------------------------------------------------------------

/// Slots keyed by a unique label. Iterates in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCollection {
    slots: BTreeMap<String, Slot>,
}

impl SlotCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new slot. Fails if the key is already taken.
    pub fn create(&mut self, key: &str, cap: u32, initial: u32) -> Result<(), SlotError> {
        if self.slots.contains_key(key) {
            return Err(SlotError::Duplicate {
                key: key.to_string(),
            });
        }
        self.slots.insert(key.to_string(), Slot::new(cap, initial));
        Ok(())
    }

    /// Quantity held under `key`, or 0 when the key is missing.
    pub fn quantity(&self, key: &str) -> u32 {
        self.slots.get(key).map(Slot::quantity).unwrap_or(0)
    }

    /// Cap of `key`, or 0 when the key is missing.
    pub fn cap(&self, key: &str) -> u32 {
        self.slots.get(key).map(Slot::cap).unwrap_or(0)
    }

    /// Set the cap of `key`, creating an empty slot if it is missing.
    pub fn set_cap(&mut self, key: &str, cap: u32) {
        match self.slots.get_mut(key) {
            Some(slot) => slot.set_cap(cap),
            None => {
                self.slots.insert(key.to_string(), Slot::new(cap, 0));
            }
        }
    }

    /// Add to an existing slot. Returns the amount actually added, which is
    /// less than `amount` when the slot hits its cap.
    pub fn add(&mut self, key: &str, amount: u32) -> Result<u32, SlotError> {
        let slot = self.slots.get_mut(key).ok_or_else(|| SlotError::Missing {
            key: key.to_string(),
        })?;
        Ok(slot.add(amount))
    }

    /// Remove from a slot. Returns the amount actually removed (0 when the
    /// key is missing).
    pub fn remove(&mut self, key: &str, amount: u32) -> u32 {
        self.slots
            .get_mut(key)
            .map(|slot| slot.remove(amount))
            .unwrap_or(0)
    }

    /// True if `key` exists and holds at least `amount`.
    pub fn has_enough(&self, key: &str, amount: u32) -> bool {
        self.slots.get(key).is_some_and(|s| s.quantity() >= amount)
    }

    /// Get the slot for `key`, creating it with `default_cap` if missing.
    pub fn ensure(&mut self, key: &str, default_cap: u32) -> &mut Slot {
        self.slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::new(default_cap, 0))
    }

    pub fn get(&self, key: &str) -> Option<&Slot> {
        self.slots.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Keys currently holding a positive quantity, in key order.
    pub fn stocked(&self) -> Vec<(String, u32)> {
        self.slots
            .iter()
            .filter(|(_, s)| s.quantity() > 0)
            .map(|(k, s)| (k.clone(), s.quantity()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Selects one of the two keyed collections of an [`Inventory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    Resource,
    Item,
}

/// A resources collection and an items collection. Shared shape of the pool
/// and of every agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub resources: SlotCollection,
    pub items: SlotCollection,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, kind: SlotKind) -> &SlotCollection {
        match kind {
            SlotKind::Resource => &self.resources,
            SlotKind::Item => &self.items,
        }
    }

    pub fn collection_mut(&mut self, kind: SlotKind) -> &mut SlotCollection {
        match kind {
            SlotKind::Resource => &mut self.resources,
            SlotKind::Item => &mut self.items,
        }
    }

    /// True if neither collection holds a positive quantity.
    pub fn is_drained(&self) -> bool {
        self.resources.iter().all(|(_, s)| s.quantity() == 0)
            && self.items.iter().all(|(_, s)| s.quantity() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_clamps_initial_quantity() {
        let mut slots = SlotCollection::new();
        slots.create("Gold", 10, 25).unwrap();
        assert_eq!(slots.quantity("Gold"), 10);
        assert_eq!(slots.cap("Gold"), 10);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let mut slots = SlotCollection::new();
        slots.create("Gold", 10, 0).unwrap();
        let err = slots.create("Gold", 99, 5).unwrap_err();
        assert_eq!(
            err,
            SlotError::Duplicate {
                key: "Gold".to_string()
            }
        );
        // Existing slot untouched.
        assert_eq!(slots.cap("Gold"), 10);
        assert_eq!(slots.quantity("Gold"), 0);
    }

    #[test]
    fn missing_keys_read_as_zero() {
        let slots = SlotCollection::new();
        assert_eq!(slots.quantity("Wood"), 0);
        assert_eq!(slots.cap("Wood"), 0);
        assert!(!slots.has_enough("Wood", 1));
    }

    #[test]
    fn add_is_partial_at_cap() {
        let mut slots = SlotCollection::new();
        slots.create("Wood", 10, 8).unwrap();
        assert_eq!(slots.add("Wood", 5).unwrap(), 2);
        assert_eq!(slots.quantity("Wood"), 10);
        assert_eq!(slots.add("Wood", 5).unwrap(), 0);
    }

    #[test]
    fn add_to_missing_key_fails() {
        let mut slots = SlotCollection::new();
        assert!(matches!(
            slots.add("Wood", 1),
            Err(SlotError::Missing { .. })
        ));
        assert!(!slots.contains("Wood"));
    }

    #[test]
    fn remove_is_partial_and_missing_is_zero() {
        let mut slots = SlotCollection::new();
        slots.create("Stone", 50, 3).unwrap();
        assert_eq!(slots.remove("Stone", 10), 3);
        assert_eq!(slots.quantity("Stone"), 0);
        assert_eq!(slots.remove("Nothing", 10), 0);
    }

    #[test]
    fn set_cap_creates_or_clamps() {
        let mut slots = SlotCollection::new();
        slots.set_cap("Iron", 20);
        assert_eq!(slots.cap("Iron"), 20);
        assert_eq!(slots.quantity("Iron"), 0);

        assert_eq!(slots.add("Iron", 15).unwrap(), 15);
        slots.set_cap("Iron", 5);
        assert_eq!(slots.quantity("Iron"), 5);
        assert_eq!(slots.cap("Iron"), 5);

        slots.set_cap("Iron", 0);
        assert_eq!(slots.quantity("Iron"), 0);
    }

    #[test]
    fn ensure_keeps_existing_cap() {
        let mut slots = SlotCollection::new();
        slots.create("Gold", 7, 1).unwrap();
        assert_eq!(slots.ensure("Gold", 10_000).cap(), 7);
        assert_eq!(slots.ensure("Silver", 10_000).cap(), 10_000);
    }

    #[test]
    fn stocked_skips_empty_slots() {
        let mut slots = SlotCollection::new();
        slots.create("A", 10, 0).unwrap();
        slots.create("B", 10, 4).unwrap();
        assert_eq!(slots.stocked(), vec![("B".to_string(), 4)]);
    }

    #[test]
    fn saved_slot_over_cap_loads_clamped() {
        let slot: Slot = serde_json::from_str(r#"{"quantity":10,"cap":5}"#).unwrap();
        assert_eq!(slot, Slot::new(5, 5));
        assert_eq!(slot.space(), 0);

        let slot: Slot = serde_json::from_str(r#"{"quantity":3,"cap":5}"#).unwrap();
        assert_eq!(slot.quantity(), 3);
    }

    #[test]
    fn inventory_addresses_both_collections() {
        let mut inv = Inventory::new();
        inv.collection_mut(SlotKind::Resource)
            .create("Gold", 10, 1)
            .unwrap();
        inv.collection_mut(SlotKind::Item)
            .create("Rope", 10, 0)
            .unwrap();
        assert_eq!(inv.resources.quantity("Gold"), 1);
        assert!(inv.items.contains("Rope"));
        assert!(!inv.is_drained());
        let _ = inv.collection_mut(SlotKind::Resource).remove("Gold", 1);
        assert!(inv.is_drained());
    }
}
