//! In-memory search, sort and summary helpers for the collection table.
//!
//! The store has no secondary indices, so every filter and ordering the
//! collection screens need happens here, over a full collection read.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Coin;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Whether a coin matches the table's free-text search box.
///
/// Country, denomination, series and storage location match
/// case-insensitively; the year matches as a plain substring.
pub fn matches_search(coin: &Coin, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let lower = term.to_lowercase();
    let contains = |s: &str| s.to_lowercase().contains(&lower);

    contains(&coin.country)
        || contains(&coin.denomination)
        || coin.year.contains(term)
        || coin.series.as_deref().is_some_and(contains)
        || coin.storage_location.as_deref().is_some_and(contains)
}

/// Coins matching `term`, in collection order.
pub fn search<'a>(coins: &'a [Coin], term: &str) -> Vec<&'a Coin> {
    coins.iter().filter(|c| matches_search(c, term)).collect()
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sortable collection table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    DateAdded,
    Country,
    Year,
    MintMark,
    Denomination,
    Quantity,
    Series,
    Theme,
    Condition,
    /// Displayed grade: certification grade when certified, else condition.
    Grade,
    PurchaseCost,
    DatePurchased,
    Retailer,
    MeltValue,
    StorageLocation,
    EstimatedValueMin,
    EstimatedValueMax,
    ValuationDate,
    LastInventoried,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Current sort column and direction of the collection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::DateAdded,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    /// Config after the user clicks the `key` column header: clicking the
    /// ascending column flips it to descending, anything else sorts
    /// ascending by `key`.
    pub fn toggle(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Self { key, direction }
    }
}

enum SortValue<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

fn optional_text(s: &Option<String>) -> SortValue<'_> {
    match s {
        Some(s) => SortValue::Text(s.as_str()),
        None => SortValue::Missing,
    }
}

fn optional_number(n: Option<f64>) -> SortValue<'static> {
    match n {
        Some(n) => SortValue::Number(n),
        None => SortValue::Missing,
    }
}

fn sort_value(coin: &Coin, key: SortKey) -> SortValue<'_> {
    match key {
        SortKey::DateAdded => SortValue::Text(&coin.date_added),
        SortKey::Country => SortValue::Text(&coin.country),
        SortKey::Year => SortValue::Text(&coin.year),
        SortKey::MintMark => optional_text(&coin.mint_mark),
        SortKey::Denomination => SortValue::Text(&coin.denomination),
        SortKey::Quantity => SortValue::Number(coin.quantity as f64),
        SortKey::Series => optional_text(&coin.series),
        SortKey::Theme => optional_text(&coin.theme),
        SortKey::Condition => SortValue::Text(&coin.condition),
        SortKey::Grade => SortValue::Text(coin.display_grade()),
        SortKey::PurchaseCost => optional_number(coin.purchase_cost),
        SortKey::DatePurchased => optional_text(&coin.date_purchased),
        SortKey::Retailer => optional_text(&coin.retailer),
        SortKey::MeltValue => optional_number(coin.melt_value),
        SortKey::StorageLocation => optional_text(&coin.storage_location),
        SortKey::EstimatedValueMin => optional_number(coin.estimated_value_min),
        SortKey::EstimatedValueMax => optional_number(coin.estimated_value_max),
        SortKey::ValuationDate => optional_text(&coin.valuation_date),
        SortKey::LastInventoried => optional_text(&coin.last_inventoried),
    }
}

/// Compare two coins under a sort config.
///
/// Missing values sort last in both directions. The grade column compares
/// case-insensitively; other text compares by code point.
pub fn compare(a: &Coin, b: &Coin, config: SortConfig) -> Ordering {
    let directed = |ord: Ordering| match config.direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };

    match (sort_value(a, config.key), sort_value(b, config.key)) {
        (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
        (SortValue::Missing, _) => Ordering::Greater,
        (_, SortValue::Missing) => Ordering::Less,
        (SortValue::Number(x), SortValue::Number(y)) => directed(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
        (SortValue::Text(x), SortValue::Text(y)) if config.key == SortKey::Grade => {
            directed(x.to_lowercase().cmp(&y.to_lowercase()).then_with(|| x.cmp(y)))
        }
        (SortValue::Text(x), SortValue::Text(y)) => directed(x.cmp(y)),
        (SortValue::Number(x), SortValue::Text(y)) => directed(x.to_string().as_str().cmp(y)),
        (SortValue::Text(x), SortValue::Number(y)) => directed(x.cmp(y.to_string().as_str())),
    }
}

/// Stable in-place sort: coins that tie keep their relative order.
pub fn sort_coins(coins: &mut [Coin], config: SortConfig) {
    coins.sort_by(|a, b| compare(a, b, config));
}

/// Sorted view over borrowed coins, same ordering as [`sort_coins`].
pub fn sorted<'a>(coins: impl IntoIterator<Item = &'a Coin>, config: SortConfig) -> Vec<&'a Coin> {
    let mut out: Vec<&Coin> = coins.into_iter().collect();
    out.sort_by(|a, b| compare(a, b, config));
    out
}

// ---------------------------------------------------------------------------
// CollectionSummary
// ---------------------------------------------------------------------------

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CollectionSummary {
    pub coin_count: usize,
    pub total_value: f64,
    pub total_cost: f64,
    pub pending_valuations: usize,
}

/// Sum the maximum estimates and purchase costs; unvalued coins count zero.
pub fn summarize(coins: &[Coin]) -> CollectionSummary {
    CollectionSummary {
        coin_count: coins.len(),
        total_value: coins.iter().filter_map(|c| c.estimated_value_max).sum(),
        total_cost: coins.iter().filter_map(|c| c.purchase_cost).sum(),
        pending_valuations: coins.iter().filter(|c| c.is_pending_valuation()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_only_same_ascending_key() {
        let cfg = SortConfig::default();
        let cfg = cfg.toggle(SortKey::Year);
        assert_eq!(cfg.direction, SortDirection::Asc);
        let cfg = cfg.toggle(SortKey::Year);
        assert_eq!(cfg.direction, SortDirection::Desc);
        let cfg = cfg.toggle(SortKey::Year);
        assert_eq!(cfg.direction, SortDirection::Asc);
        let cfg = cfg.toggle(SortKey::Country);
        assert_eq!(cfg, SortConfig { key: SortKey::Country, direction: SortDirection::Asc });
    }

    #[test]
    fn search_is_case_insensitive() {
        let coin = Coin {
            country: "Canada".into(),
            denomination: "Loonie".into(),
            year: "1987".into(),
            ..Coin::default()
        };
        assert!(matches_search(&coin, "canada"));
        assert!(matches_search(&coin, "198"));
        assert!(!matches_search(&coin, "mexico"));
        assert!(matches_search(&coin, ""));
    }
}
