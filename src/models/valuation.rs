use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source — Citation attached to a valuation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

// ---------------------------------------------------------------------------
// Valuation — Result of one enrichment call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub min: f64,
    pub max: f64,
    pub face_value: Option<f64>,
    pub notes: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}
