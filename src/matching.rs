//! Wishlist ownership: which wanted coins are already in the collection.
//!
//! A wishlist item is owned by the first coin, in collection order, that
//! matches it under any of three rules. The reported rule is the
//! highest-precedence one that coin satisfies: series, then design, then
//! year and denomination.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Coin, WishlistItem};

/// The rule that tied a wishlist item to a coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchRule {
    /// The coin's series contains the item's series (case-insensitive).
    Series,
    /// The coin's design contains the item's design (case-insensitive).
    Design,
    /// Same year, and the coin's denomination contains the item's.
    YearDenomination,
}

/// A wishlist item found in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipMatch {
    pub wishlist_id: String,
    pub coin_id: String,
    pub rule: MatchRule,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.trim().is_empty())
}

fn matches_rule(item: &WishlistItem, coin: &Coin, rule: MatchRule) -> bool {
    match rule {
        MatchRule::Series => match (non_blank(&item.series), non_blank(&coin.series)) {
            (Some(wanted), Some(have)) => contains_ci(have, wanted),
            _ => false,
        },
        MatchRule::Design => match (non_blank(&item.design), non_blank(&coin.design)) {
            (Some(wanted), Some(have)) => contains_ci(have, wanted),
            _ => false,
        },
        MatchRule::YearDenomination => match non_blank(&item.year) {
            Some(year) => coin.year == year && contains_ci(&coin.denomination, &item.denomination),
            None => false,
        },
    }
}

/// The coin that satisfies a wishlist item, if any, with the rule used.
pub fn owned_by<'a>(item: &WishlistItem, coins: &'a [Coin]) -> Option<(&'a Coin, MatchRule)> {
    const PRECEDENCE: [MatchRule; 3] = [MatchRule::Series, MatchRule::Design, MatchRule::YearDenomination];
    coins.iter().find_map(|coin| {
        PRECEDENCE
            .into_iter()
            .find(|rule| matches_rule(item, coin, *rule))
            .map(|rule| (coin, rule))
    })
}

/// At most one match per wishlist item, in wishlist order.
pub fn match_ownership(coins: &[Coin], wishlist: &[WishlistItem]) -> Vec<OwnershipMatch> {
    wishlist
        .iter()
        .filter_map(|item| {
            owned_by(item, coins).map(|(coin, rule)| OwnershipMatch {
                wishlist_id: item.id.clone(),
                coin_id: coin.id.clone(),
                rule,
            })
        })
        .collect()
}

/// Ownership keyed by wishlist id, for quick lookups while rendering.
pub fn ownership_index(matches: &[OwnershipMatch]) -> HashMap<&str, &OwnershipMatch> {
    matches.iter().map(|m| (m.wishlist_id.as_str(), m)).collect()
}

// ---------------------------------------------------------------------------
// WishlistFilter
// ---------------------------------------------------------------------------

/// Wishlist screen filters. An item without a max price counts as a
/// zero budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WishlistFilter {
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub hide_owned: bool,
}

impl WishlistFilter {
    pub fn apply<'a>(&self, wishlist: &'a [WishlistItem], coins: &[Coin]) -> Vec<&'a WishlistItem> {
        wishlist
            .iter()
            .filter(|item| {
                let price = item.max_price.unwrap_or(0.0);
                self.min_budget.map_or(true, |min| price >= min) && self.max_budget.map_or(true, |max| price <= max)
            })
            .filter(|item| !self.hide_owned || owned_by(item, coins).is_none())
            .collect()
    }
}
