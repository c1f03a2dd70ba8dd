// 📦 Inventory Ledger - Available counts per animal type
// Counts never go negative: a borrow against an empty slot is rejected
// before any state changes.

use crate::animals::AnimalType;
use crate::lending::LendingError;
use std::collections::HashMap;

// ============================================================================
// INVENTORY LEDGER
// ============================================================================

/// Available stock per animal type.
///
/// Owned and exclusively mutated by the lending engine. Absent keys read
/// as zero, so an empty ledger is a valid starting state.
#[derive(Debug, Clone, Default)]
pub struct InventoryLedger {
    counts: HashMap<AnimalType, u64>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        InventoryLedger {
            counts: HashMap::new(),
        }
    }

    /// Rebuild a ledger from stored (animal, count) rows
    pub fn from_counts(rows: impl IntoIterator<Item = (AnimalType, u64)>) -> Self {
        InventoryLedger {
            counts: rows
                .into_iter()
                .filter(|(animal, _)| animal.is_borrowable())
                .collect(),
        }
    }

    /// Stock `count` more of an animal. The None sentinel is never stockable.
    pub fn add(&mut self, animal: AnimalType, count: u64) -> Result<(), LendingError> {
        if !animal.is_borrowable() {
            return Err(LendingError::InvalidAnimal);
        }

        *self.counts.entry(animal).or_insert(0) += count;
        Ok(())
    }

    /// Current available count (None trivially 0)
    pub fn available(&self, animal: AnimalType) -> u64 {
        self.counts.get(&animal).copied().unwrap_or(0)
    }

    /// Take one animal out of stock. Fails when the count is already zero.
    pub fn decrement(&mut self, animal: AnimalType) -> Result<(), LendingError> {
        match self.counts.get_mut(&animal) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(LendingError::OutOfStock { animal }),
        }
    }

    /// Put one animal back into stock
    pub fn increment(&mut self, animal: AnimalType) {
        *self.counts.entry(animal).or_insert(0) += 1;
    }

    /// Snapshot of all tracked counts, sorted by animal name
    pub fn counts(&self) -> Vec<(AnimalType, u64)> {
        let mut rows: Vec<_> = self.counts.iter().map(|(a, c)| (*a, *c)).collect();
        rows.sort_by_key(|(animal, _)| animal.as_str());
        rows
    }
}

// ============================================================================
// TESTS
// ============================================================================
