//! Point-in-time snapshots and variant selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `(value, timestamp)` snapshot of a computed metric or balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cache {
    pub value: u128,
    pub timestamp: u64,
}

impl Cache {
    pub fn new(value: u128, timestamp: u64) -> Self {
        Self { value, timestamp }
    }

    /// Whether the snapshot is no older than `max_age` at time `now`
    pub fn is_fresh(&self, now: u64, max_age: u64) -> bool {
        self.timestamp >= now.saturating_sub(max_age)
    }
}

/// Selects between live recomputation and the cached snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Variant {
    /// Recompute from live balances
    Current = 0,
    /// Read the last stored snapshot
    Last = 1,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Current => write!(f, "current"),
            Variant::Last => write!(f, "last"),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "current" => Ok(Variant::Current),
            "last" => Ok(Variant::Last),
            other => Err(format!("unknown variant: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_freshness() {
        let cache = Cache::new(10, 1_000);
        assert!(cache.is_fresh(1_000, 0));
        assert!(cache.is_fresh(1_100, 100));
        assert!(!cache.is_fresh(1_101, 100));
        // max_age larger than now never underflows
        assert!(cache.is_fresh(50, 10_000));
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("CURRENT".parse::<Variant>().unwrap(), Variant::Current);
        assert_eq!("last".parse::<Variant>().unwrap(), Variant::Last);
        assert!("stale".parse::<Variant>().is_err());
    }
}
