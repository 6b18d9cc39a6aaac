//! Physical inventory audits: filtering the audit sheet, marking coins
//! accounted for or missing, and tallying the results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Coin, InventoryStatus};

/// Filters available on the inventory screen. Empty fields match all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryFilter {
    pub country: Option<String>,
    /// Any-of match on the series; empty means every series.
    pub series: Vec<String>,
    pub denomination: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl InventoryFilter {
    pub fn matches(&self, coin: &Coin) -> bool {
        let country = self.country.as_deref().map_or(true, |c| coin.country == c);
        let series = self.series.is_empty()
            || coin
                .series
                .as_ref()
                .is_some_and(|s| self.series.iter().any(|wanted| wanted == s));
        let denomination = self
            .denomination
            .as_deref()
            .map_or(true, |d| coin.denomination == d);

        let value = coin.estimated_value_max.unwrap_or(0.0);
        let in_range = value >= self.min_value.unwrap_or(0.0) && value <= self.max_value.unwrap_or(f64::INFINITY);

        country && series && denomination && in_range
    }

    /// Coins on the audit sheet, ordered by year then denomination.
    pub fn apply<'a>(&self, coins: &'a [Coin]) -> Vec<&'a Coin> {
        let mut out: Vec<&Coin> = coins.iter().filter(|c| self.matches(c)).collect();
        out.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.denomination.cmp(&b.denomination)));
        out
    }
}

/// Distinct non-empty series names, sorted, for the series picker.
pub fn unique_series(coins: &[Coin]) -> Vec<String> {
    coins
        .iter()
        .filter_map(|c| c.series.as_deref())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Copy of `coin` with a new status, stamped with `now`.
pub fn with_status(coin: &Coin, status: InventoryStatus, now: &str) -> Coin {
    Coin {
        inventory_status: Some(status),
        last_inventoried: Some(now.to_string()),
        ..coin.clone()
    }
}

/// Copies of every coin marked accounted for.
pub fn mark_all_accounted<'a>(coins: impl IntoIterator<Item = &'a Coin>, now: &str) -> Vec<Coin> {
    coins
        .into_iter()
        .map(|c| with_status(c, InventoryStatus::Accounted, now))
        .collect()
}

/// Audit tallies. Coins never audited count as unchecked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total: usize,
    pub accounted: usize,
    pub missing: usize,
    pub unchecked: usize,
}

pub fn stats<'a>(coins: impl IntoIterator<Item = &'a Coin>) -> InventoryStats {
    let mut stats = InventoryStats::default();
    for coin in coins {
        stats.total += 1;
        match coin.inventory_status {
            Some(InventoryStatus::Accounted) => stats.accounted += 1,
            Some(InventoryStatus::Missing) => stats.missing += 1,
            Some(InventoryStatus::Unchecked) | None => stats.unchecked += 1,
        }
    }
    stats
}
