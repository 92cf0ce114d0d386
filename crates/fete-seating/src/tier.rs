//! Tier table: priority levels, capacities and invitation codes.
//!
//! Levels are ordinals where a higher value is more privileged. The table is
//! static configuration; nothing here changes at runtime.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A priority level. Higher = more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierLevel(pub u8);

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One capacity bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Priority level
    pub level: TierLevel,

    /// Display name ("VIP", "General", ...)
    pub name: String,

    /// Fixed number of seats
    pub capacity: u32,
}

impl Tier {
    /// Create a tier.
    pub fn new(level: u8, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            level: TierLevel(level),
            name: name.into(),
            capacity,
        }
    }
}

/// Raw, unvalidated table as it appears in a config file.
#[derive(Debug, Clone, Deserialize)]
struct TierTableConfig {
    tiers: Vec<Tier>,
    #[serde(default)]
    codes: HashMap<String, TierLevel>,
    default_level: Option<TierLevel>,
}

/// Ordered tiers plus the invitation code mapping.
///
/// Tiers are kept sorted from most to least privileged, which is also the
/// order the downgrade walk visits them in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TierTableConfig")]
pub struct TierTable {
    tiers: Vec<Tier>,
    codes: HashMap<String, TierLevel>,
    default_level: TierLevel,
}

impl TryFrom<TierTableConfig> for TierTable {
    type Error = ConfigError;

    fn try_from(raw: TierTableConfig) -> Result<Self, Self::Error> {
        TierTable::new(raw.tiers, raw.codes, raw.default_level)
    }
}

impl TierTable {
    /// Build and validate a table.
    ///
    /// `default_level` falls back to the lowest defined tier. The summed
    /// capacity must fit in a `u32`, so every capacity sum below is exact.
    pub fn new(
        mut tiers: Vec<Tier>,
        codes: HashMap<String, TierLevel>,
        default_level: Option<TierLevel>,
    ) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }

        let mut seen = BTreeSet::new();
        let mut total: u32 = 0;
        for tier in &tiers {
            if !seen.insert(tier.level) {
                return Err(ConfigError::DuplicateLevel(tier.level));
            }
            total = total
                .checked_add(tier.capacity)
                .ok_or(ConfigError::CapacityOverflow)?;
        }

        for (code, level) in &codes {
            if !seen.contains(level) {
                return Err(ConfigError::UnknownCodeLevel {
                    code: code.clone(),
                    level: *level,
                });
            }
        }

        tiers.sort_by(|a, b| b.level.cmp(&a.level));

        let lowest = tiers[tiers.len() - 1].level;
        let default_level = default_level.unwrap_or(lowest);
        if !seen.contains(&default_level) {
            return Err(ConfigError::UnknownDefault(default_level));
        }

        Ok(Self {
            tiers,
            codes,
            default_level,
        })
    }

    /// Tiers from most to least privileged.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Levels from most to least privileged.
    pub fn levels(&self) -> impl Iterator<Item = TierLevel> + '_ {
        self.tiers.iter().map(|t| t.level)
    }

    /// Look up a tier by level.
    pub fn tier(&self, level: TierLevel) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.level == level)
    }

    /// The level used for absent or unrecognized codes.
    pub fn default_level(&self) -> TierLevel {
        self.default_level
    }

    /// Seats in a single tier (0 for an undefined level).
    pub fn tier_capacity(&self, level: TierLevel) -> u32 {
        self.tier(level).map(|t| t.capacity).unwrap_or(0)
    }

    /// Map an invitation code to a requested level.
    ///
    /// Never fails: missing, blank and unknown codes all get the default.
    pub fn priority_for_code(&self, code: Option<&str>) -> TierLevel {
        match code.map(str::trim) {
            Some(code) if !code.is_empty() => {
                self.codes.get(code).copied().unwrap_or(self.default_level)
            }
            _ => self.default_level,
        }
    }

    /// Capacity of `level` and every less privileged tier.
    ///
    /// This follows the cascade direction: it is the pool a request at
    /// `level` can eventually draw from.
    pub fn cumulative_capacity(&self, level: TierLevel) -> u32 {
        self.tiers
            .iter()
            .filter(|t| t.level <= level)
            .map(|t| t.capacity)
            .sum()
    }

    /// Capacity of `level` and every more privileged tier.
    pub fn privileged_capacity(&self, level: TierLevel) -> u32 {
        self.tiers
            .iter()
            .filter(|t| t.level >= level)
            .map(|t| t.capacity)
            .sum()
    }

    /// Total seats across all tiers.
    pub fn total_capacity(&self) -> u32 {
        self.tiers.iter().map(|t| t.capacity).sum()
    }

    /// The next defined level below `level`, if any.
    pub fn next_lower(&self, level: TierLevel) -> Option<TierLevel> {
        self.levels().find(|l| *l < level)
    }

    /// Display name for a level, `"Tier N"` when undefined.
    pub fn tier_name(&self, level: TierLevel) -> String {
        match self.tier(level) {
            Some(tier) => tier.name.clone(),
            None => format!("Tier {}", level),
        }
    }

    /// Parse a table from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for TierTable {
    /// VIP 2, Close Friends 1, Colleagues 1, General 2; codes are the
    /// level digits and General is the default.
    fn default() -> Self {
        let tiers = vec![
            Tier::new(3, "VIP", 2),
            Tier::new(2, "Close Friends", 1),
            Tier::new(1, "Colleagues", 1),
            Tier::new(0, "General", 2),
        ];
        let codes = (0..=3u8)
            .map(|l| (l.to_string(), TierLevel(l)))
            .collect();

        Self {
            tiers,
            codes,
            default_level: TierLevel(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vip() -> TierLevel {
        TierLevel(3)
    }

    fn general() -> TierLevel {
        TierLevel(0)
    }

    #[test]
    fn default_table_shape() {
        let table = TierTable::default();
        let levels: Vec<u8> = table.levels().map(|l| l.0).collect();
        assert_eq!(levels, vec![3, 2, 1, 0]);
        assert_eq!(table.total_capacity(), 6);
        assert_eq!(table.default_level(), general());
    }

    #[test]
    fn codes_map_to_levels() {
        let table = TierTable::default();
        assert_eq!(table.priority_for_code(Some("3")), vip());
        assert_eq!(table.priority_for_code(Some(" 2 ")), TierLevel(2));
        assert_eq!(table.priority_for_code(Some("1")), TierLevel(1));
    }

    #[test]
    fn missing_and_unknown_codes_get_default() {
        let table = TierTable::default();
        assert_eq!(table.priority_for_code(None), general());
        assert_eq!(table.priority_for_code(Some("")), general());
        assert_eq!(table.priority_for_code(Some("   ")), general());
        assert_eq!(table.priority_for_code(Some("platinum")), general());
    }

    #[test]
    fn cumulative_capacity_follows_cascade() {
        let table = TierTable::default();
        let cases = [(3, 6), (2, 4), (1, 3), (0, 2)];
        for (level, expected) in cases {
            assert_eq!(
                table.cumulative_capacity(TierLevel(level)),
                expected,
                "cumulative_capacity({})",
                level
            );
        }
    }

    #[test]
    fn privileged_capacity_counts_upward() {
        let table = TierTable::default();
        assert_eq!(table.privileged_capacity(vip()), 2);
        assert_eq!(table.privileged_capacity(TierLevel(1)), 4);
        assert_eq!(table.privileged_capacity(general()), 6);
    }

    #[test]
    fn undefined_level_has_no_capacity() {
        let table = TierTable::default();
        assert_eq!(table.tier_capacity(TierLevel(9)), 0);
        assert_eq!(table.tier_name(TierLevel(9)), "Tier 9");
        assert_eq!(table.tier_name(vip()), "VIP");
    }

    #[test]
    fn next_lower_skips_gaps() {
        let table = TierTable::new(
            vec![Tier::new(10, "Top", 1), Tier::new(4, "Mid", 1), Tier::new(0, "Low", 1)],
            HashMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(table.next_lower(TierLevel(10)), Some(TierLevel(4)));
        assert_eq!(table.next_lower(TierLevel(7)), Some(TierLevel(4)));
        assert_eq!(table.next_lower(TierLevel(0)), None);
    }

    #[test]
    fn validation_rejects_bad_tables() {
        assert_eq!(
            TierTable::new(vec![], HashMap::new(), None),
            Err(ConfigError::NoTiers)
        );
        assert_eq!(
            TierTable::new(
                vec![Tier::new(1, "A", 1), Tier::new(1, "B", 1)],
                HashMap::new(),
                None
            ),
            Err(ConfigError::DuplicateLevel(TierLevel(1)))
        );

        let mut codes = HashMap::new();
        codes.insert("gold".to_string(), TierLevel(5));
        assert_eq!(
            TierTable::new(vec![Tier::new(1, "A", 1)], codes, None),
            Err(ConfigError::UnknownCodeLevel {
                code: "gold".into(),
                level: TierLevel(5)
            })
        );
        assert_eq!(
            TierTable::new(vec![Tier::new(1, "A", 1)], HashMap::new(), Some(TierLevel(0))),
            Err(ConfigError::UnknownDefault(TierLevel(0)))
        );
    }

    #[test]
    fn validation_bounds_total_capacity() {
        let cases = [
            (vec![(1, u32::MAX), (0, 10)], Err(ConfigError::CapacityOverflow)),
            (vec![(2, u32::MAX / 2), (1, u32::MAX / 2), (0, 2)], Err(ConfigError::CapacityOverflow)),
            (vec![(1, u32::MAX - 10), (0, 10)], Ok(u32::MAX)),
            (vec![(0, u32::MAX)], Ok(u32::MAX)),
        ];

        for (tiers, want) in cases {
            let tiers: Vec<Tier> = tiers
                .iter()
                .map(|&(level, capacity)| Tier::new(level, format!("T{}", level), capacity))
                .collect();
            let got = TierTable::new(tiers.clone(), HashMap::new(), None)
                .map(|t| t.total_capacity());
            assert_eq!(got, want, "tiers {:?}", tiers);
        }
    }

    #[test]
    fn json_table_with_overflowing_capacity_is_rejected() {
        let json = r#"{"tiers": [{"level": 1, "name": "Big", "capacity": 4294967295},
                                 {"level": 0, "name": "General", "capacity": 10}]}"#;
        assert!(TierTable::from_json(json).is_err());
    }

    #[test]
    fn parse_from_json() {
        let json = r#"{
            "tiers": [
                {"level": 0, "name": "Walk-in", "capacity": 50},
                {"level": 5, "name": "Speakers", "capacity": 10}
            ],
            "codes": {"SPEAK2026": 5}
        }"#;
        let table = TierTable::from_json(json).unwrap();
        assert_eq!(table.tiers()[0].name, "Speakers");
        assert_eq!(table.default_level(), TierLevel(0));
        assert_eq!(table.priority_for_code(Some("SPEAK2026")), TierLevel(5));
        assert_eq!(table.total_capacity(), 60);
    }

    #[test]
    fn parse_rejects_invalid_json_table() {
        let json = r#"{"tiers": [], "codes": {}}"#;
        assert!(TierTable::from_json(json).is_err());
    }
}
