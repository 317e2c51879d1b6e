use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKind};
use crate::error::{WgError, WgResult};

/// Number of distinct two-digit base-36 suffixes.
pub const ID_SPACE: u32 = 36 * 36;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hands out sequential, type-prefixed entity IDs.
///
/// Each prefix keeps its own counter holding the last suffix handed out.
/// Suffix `00` is never used, so a prefix runs out after `ID_SPACE - 1`
/// allocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdAllocator {
    counters: BTreeMap<String, u32>,
}

impl IdAllocator {
    /// An allocator with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from persisted counters.
    pub fn from_counters(counters: BTreeMap<String, u32>) -> Self {
        Self { counters }
    }

    /// Rebuild counters from the highest suffix seen per prefix.
    pub fn reconstruct<'a>(ids: impl IntoIterator<Item = &'a EntityId>) -> Self {
        let mut allocator = Self::new();
        for id in ids {
            allocator.observe(id);
        }
        allocator
    }

    /// Allocate the next ID for `kind`.
    pub fn allocate(&mut self, kind: &EntityKind) -> WgResult<EntityId> {
        let prefix = kind.prefix();
        let next = match self.counter(prefix).checked_add(1) {
            Some(next) if next < ID_SPACE => next,
            _ => {
                return Err(WgError::IdOverflow {
                    prefix: prefix.to_string(),
                });
            }
        };
        self.counters.insert(prefix.to_string(), next);
        Ok(EntityId(format!("{prefix}{}", encode_suffix(next))))
    }

    /// Raise the counter for `id`'s prefix so the allocator never reissues it.
    pub fn observe(&mut self, id: &EntityId) {
        if let Some((prefix, n)) = id.split_suffix() {
            let counter = self.counters.entry(prefix.to_string()).or_insert(0);
            *counter = (*counter).max(n);
        }
    }

    /// The last suffix handed out for `prefix`.
    pub fn counter(&self, prefix: &str) -> u32 {
        self.counters.get(prefix).copied().unwrap_or(0)
    }

    /// All counters, keyed by prefix.
    pub fn counters(&self) -> &BTreeMap<String, u32> {
        &self.counters
    }
}

fn encode_suffix(n: u32) -> String {
    let hi = DIGITS[(n / 36) as usize] as char;
    let lo = DIGITS[(n % 36) as usize] as char;
    format!("{hi}{lo}")
}
