//! Rough PC-builder compatibility filtering over product spec highlights
//!
//! A [`PcBuild`] holds at most one selected product per [`BuildSlot`]. When
//! choosing a part for a slot, candidates are checked against every already
//! selected part using a table of [`CompatibilityRule`]s. Two highlight
//! values conflict only when both are present and differ (compared trimmed
//! and case-insensitively). There is no solver: a selection never causes
//! earlier selections to be revisited.

use crate::types::Product;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BuildSlot {
    Cpu,
    Motherboard,
    Memory,
    Gpu,
    Storage,
    Psu,
    Case,
    Cooler,
}

impl BuildSlot {
    pub const ALL: [Self; 8] = [
        Self::Cpu,
        Self::Motherboard,
        Self::Memory,
        Self::Gpu,
        Self::Storage,
        Self::Psu,
        Self::Case,
        Self::Cooler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Motherboard => "motherboard",
            Self::Memory => "memory",
            Self::Gpu => "gpu",
            Self::Storage => "storage",
            Self::Psu => "psu",
            Self::Case => "case",
            Self::Cooler => "cooler",
        }
    }
}

impl fmt::Display for BuildSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BuildSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown build slot: {s}"))
    }
}

/// Highlight `key_a` of the part in `slot_a` must equal highlight `key_b`
/// of the part in `slot_b`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityRule {
    pub slot_a: BuildSlot,
    pub key_a: String,
    pub slot_b: BuildSlot,
    pub key_b: String,
}

impl CompatibilityRule {
    pub fn new(
        slot_a: BuildSlot,
        key_a: impl Into<String>,
        slot_b: BuildSlot,
        key_b: impl Into<String>,
    ) -> Self {
        Self {
            slot_a,
            key_a: key_a.into(),
            slot_b,
            key_b: key_b.into(),
        }
    }

    /// The rule from the point of view of `slot`, as (own key, other slot, other key)
    fn facing(&self, slot: BuildSlot) -> Option<(&str, BuildSlot, &str)> {
        if self.slot_a == slot {
            Some((self.key_a.as_str(), self.slot_b, self.key_b.as_str()))
        } else if self.slot_b == slot {
            Some((self.key_b.as_str(), self.slot_a, self.key_a.as_str()))
        } else {
            None
        }
    }
}

/// Socket, memory type and form-factor matching
pub fn default_rules() -> Vec<CompatibilityRule> {
    use BuildSlot::{Case, Cooler, Cpu, Memory, Motherboard};
    vec![
        CompatibilityRule::new(Cpu, "socket", Motherboard, "socket"),
        CompatibilityRule::new(Cooler, "socket", Cpu, "socket"),
        CompatibilityRule::new(Memory, "memoryType", Motherboard, "memoryType"),
        CompatibilityRule::new(Cpu, "memoryType", Memory, "memoryType"),
        CompatibilityRule::new(Motherboard, "formFactor", Case, "formFactor"),
    ]
}

#[derive(Debug, Clone)]
pub struct PcBuild {
    rules: Vec<CompatibilityRule>,
    parts: BTreeMap<BuildSlot, Product>,
}

impl Default for PcBuild {
    fn default() -> Self {
        Self::new()
    }
}

impl PcBuild {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<CompatibilityRule>) -> Self {
        Self {
            rules,
            parts: BTreeMap::new(),
        }
    }

    /// Put `product` in `slot`, returning the part it replaced
    pub fn select(&mut self, slot: BuildSlot, product: Product) -> Option<Product> {
        self.parts.insert(slot, product)
    }

    pub fn remove(&mut self, slot: BuildSlot) -> Option<Product> {
        self.parts.remove(&slot)
    }

    pub fn part(&self, slot: BuildSlot) -> Option<&Product> {
        self.parts.get(&slot)
    }

    pub fn parts(&self) -> impl Iterator<Item = (BuildSlot, &Product)> {
        self.parts.iter().map(|(slot, p)| (*slot, p))
    }

    pub fn is_compatible(&self, slot: BuildSlot, candidate: &Product) -> bool {
        self.rules.iter().all(|rule| {
            let Some((own_key, other_slot, other_key)) = rule.facing(slot) else {
                return true;
            };
            if other_slot == slot {
                return true;
            }
            let Some(other) = self.parts.get(&other_slot) else {
                return true;
            };
            match (candidate.highlight(own_key), other.highlight(other_key)) {
                (Some(ours), Some(theirs)) => ours.eq_ignore_ascii_case(theirs),
                _ => true,
            }
        })
    }

    /// Filter `candidates` for `slot` down to those compatible with the current selection
    pub fn compatible_candidates<'a>(
        &self,
        slot: BuildSlot,
        candidates: &'a [Product],
    ) -> Vec<&'a Product> {
        candidates
            .iter()
            .filter(|c| self.is_compatible(slot, c))
            .collect()
    }

    /// Sum of the selected parts' prices
    pub fn total_price(&self) -> rust_decimal::Decimal {
        self.parts.values().map(|p| p.price).sum()
    }
}
