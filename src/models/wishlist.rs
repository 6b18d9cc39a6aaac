use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

// ---------------------------------------------------------------------------
// WishlistItem — A coin the collector wants but does not own
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WishlistItem {
    pub id: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    pub denomination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "super::coin::lenient_amount")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub priority: Priority,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WishlistItem {
    /// Create an item with a fresh id and medium priority.
    ///
    /// Fails when the denomination is blank, the one field the wishlist form
    /// requires.
    pub fn new(country: &str, denomination: &str) -> crate::Result<Self> {
        if denomination.trim().is_empty() {
            return Err(crate::NumismaError::InvalidArgument(
                "wishlist item requires a denomination".into(),
            ));
        }
        let country = if country.trim().is_empty() {
            crate::config::DEFAULT_COUNTRY
        } else {
            country
        };
        Ok(Self {
            id: super::new_id(),
            country: country.to_string(),
            denomination: denomination.to_string(),
            ..Self::default()
        })
    }
}
