//! Remote enrichment: coin valuation and spreadsheet row mapping.
//!
//! The pipeline talks to two seams, [`Appraiser`] and [`FragmentMapper`].
//! [`GeminiClient`] implements both against the Gemini `generateContent`
//! REST endpoint; [`AliasMapper`] is the offline row mapper built on the
//! local alias dictionary.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config;
use crate::error::{NumismaError, Result};
use crate::models::{Coin, Source, Valuation};
use crate::normalize::{self, Normalizer, RawRow};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Produces a market valuation for one coin.
pub trait Appraiser {
    fn appraise(&self, coin: &Coin) -> impl Future<Output = Result<Valuation>> + Send;
}

/// Maps raw spreadsheet rows to canonical record fragments.
///
/// Fragments are partial: the [`Normalizer`] completes them with defaults
/// and identity fields.
pub trait FragmentMapper {
    fn map_rows(&self, rows: &[RawRow]) -> impl Future<Output = Result<Vec<RawRow>>> + Send;
}

/// Row mapper that applies the local alias dictionary; never fails.
#[derive(Debug, Clone, Default)]
pub struct AliasMapper {
    normalizer: Normalizer,
}

impl AliasMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FragmentMapper for AliasMapper {
    async fn map_rows(&self, rows: &[RawRow]) -> Result<Vec<RawRow>> {
        Ok(rows.iter().map(|r| self.normalizer.map_fragment(r)).collect())
    }
}

// ---------------------------------------------------------------------------
// GeminiConfig
// ---------------------------------------------------------------------------

/// Explicit configuration for [`GeminiClient`]. Nothing is read from the
/// environment.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub analysis_model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: config::VALUATION_MODEL.to_string(),
            analysis_model: config::ANALYSIS_MODEL.to_string(),
            base_url: config::GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebChunk {
    title: Option<String>,
    uri: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn sources(&self) -> Vec<Source> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| {
                m.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .map(|web| Source {
                        title: non_empty(web.title.as_deref()).unwrap_or("Market Source").to_string(),
                        uri: non_empty(web.uri.as_deref()).unwrap_or("#").to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini generative model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(NumismaError::InvalidArgument("Gemini API key is empty".into()));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Free-form markdown report on a coin's history and collector notes.
    pub async fn analysis(&self, coin: &Coin) -> Result<String> {
        let prompt = format!(
            "Provide a professional numismatic analysis for a {}. \
             Include historical background, production details, and key features for collectors. \
             Use Markdown for formatting.",
            coin.title()
        );
        let body = json!({
            "contents": [user_content(&prompt)],
            "generationConfig": { "thinkingConfig": { "thinkingBudget": 4000 } }
        });
        let response = self.generate(&self.config.analysis_model, &body).await?;
        non_empty_text(response.text())
    }

    /// Answer a question about the collection, looking at the first ten
    /// coins only.
    pub async fn insights(&self, coins: &[Coin], query: &str) -> Result<String> {
        let summary: Vec<Value> = coins
            .iter()
            .take(10)
            .map(|c| json!({ "y": c.year, "d": c.denomination, "v": c.estimated_value_max }))
            .collect();
        let prompt = format!(
            "As a numismatic expert, analyze this subset of the user's collection: {}. \
             Answer the user's query: \"{}\"",
            Value::Array(summary),
            query
        );
        let body = json!({
            "contents": [user_content(&prompt)],
            "generationConfig": { "thinkingConfig": { "thinkingBudget": 0 } }
        });
        let response = self.generate(&self.config.model, &body).await?;
        non_empty_text(response.text())
    }

    /// Ask which of `candidates` belong in the named set; returns their ids.
    ///
    /// Ids the model invents are filtered out.
    pub async fn find_set_members(&self, set_name: &str, selected: &[Coin], candidates: &[Coin]) -> Result<Vec<String>> {
        let current: Vec<String> = selected
            .iter()
            .map(|c| format!("{} {}", c.year, c.denomination))
            .collect();
        let pool: Vec<Value> = candidates
            .iter()
            .map(|c| json!({ "id": c.id, "y": c.year, "d": c.denomination, "s": c.series }))
            .collect();
        let prompt = format!(
            "Task: Find which available coins belong in the set \"{}\". \
             Set currently contains: {}. Check these candidates: {}. \
             Return ONLY a JSON array of string IDs.",
            set_name,
            current.join(", "),
            Value::Array(pool)
        );
        let body = json!({
            "contents": [user_content(&prompt)],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } }
            }
        });
        let response = self.generate(&self.config.model, &body).await?;
        let ids = match extract_json(&response.text()) {
            Some(Value::Array(items)) => items,
            _ => return Err(NumismaError::Enrichment("set scan returned no id list".into())),
        };
        Ok(ids
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .filter(|id| candidates.iter().any(|c| &c.id == id))
            .collect())
    }

    async fn generate(&self, model: &str, body: &Value) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url.trim_end_matches('/'), model);
        tracing::debug!(%model, "Calling generateContent");

        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| NumismaError::Enrichment(format!("request failed: {}", e.without_url())))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(NumismaError::Enrichment(format!(
                "model returned HTTP {}: {}",
                status.as_u16(),
                detail.chars().take(300).collect::<String>()
            )));
        }

        resp.json::<GenerateContentResponse>()
            .await
            .map_err(|e| NumismaError::Enrichment(format!("unreadable response: {}", e.without_url())))
    }
}

impl Appraiser for GeminiClient {
    async fn appraise(&self, coin: &Coin) -> Result<Valuation> {
        let prompt = format!(
            "Appraise this coin: {}. Condition: {}. Provide estimated minimum and maximum retail values in USD, \
             face value if applicable, and a brief market summary.",
            coin.title(),
            coin.display_grade()
        );
        let body = json!({
            "contents": [user_content(&prompt)],
            "tools": [{ "googleSearch": {} }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "minPrice": { "type": "NUMBER" },
                        "maxPrice": { "type": "NUMBER" },
                        "faceValue": { "type": "NUMBER" },
                        "summary": { "type": "STRING" }
                    },
                    "required": ["minPrice", "maxPrice", "summary"]
                },
                "temperature": 0.1
            }
        });

        let response = self.generate(&self.config.model, &body).await?;
        let data = extract_json(&response.text())
            .filter(Value::is_object)
            .ok_or_else(|| NumismaError::Enrichment(format!("no valuation in response for {}", coin.title())))?;
        Ok(valuation_from(&data, response.sources()))
    }
}

impl FragmentMapper for GeminiClient {
    async fn map_rows(&self, rows: &[RawRow]) -> Result<Vec<RawRow>> {
        let mappings: Vec<String> = config::COLLECTION_COLUMNS
            .iter()
            .map(|(header, field)| format!("- '{}' -> {}", header, field))
            .collect();
        let prompt = format!(
            "Map these raw spreadsheet rows to a standard JSON Coin object array.\n\
             Important Column Mappings:\n{}\n\nData: {}",
            mappings.join("\n"),
            Value::Array(rows.iter().cloned().map(Value::Object).collect())
        );

        let properties: serde_json::Map<String, Value> = config::COLLECTION_COLUMNS
            .iter()
            .map(|(_, field)| {
                let kind = match *field {
                    "quantity" | "purchaseCost" | "meltValue" => "NUMBER",
                    _ => "STRING",
                };
                (field.to_string(), json!({ "type": kind }))
            })
            .collect();
        let body = json!({
            "contents": [user_content(&prompt)],
            "generationConfig": {
                "responseMimeType": "application/json",
                "thinkingConfig": { "thinkingBudget": 0 },
                "responseSchema": {
                    "type": "ARRAY",
                    "items": { "type": "OBJECT", "properties": properties }
                }
            }
        });

        let response = self.generate(&self.config.model, &body).await?;
        match extract_json(&response.text()) {
            Some(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            _ => Err(NumismaError::Enrichment("row mapping did not return an array".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn user_content(prompt: &str) -> Value {
    json!({ "role": "user", "parts": [{ "text": prompt }] })
}

fn non_empty_text(text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(NumismaError::Enrichment("model returned no text".into()))
    } else {
        Ok(text)
    }
}

/// Build a valuation from the model's JSON object.
fn valuation_from(data: &Value, sources: Vec<Source>) -> Valuation {
    let number = |key: &str| data.get(key).map(normalize::coerce_number).unwrap_or(0.0);
    Valuation {
        min: number("minPrice"),
        max: number("maxPrice"),
        face_value: data.get("faceValue").map(normalize::coerce_number),
        notes: data
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        sources,
    }
}

/// Pull a JSON value out of model text.
///
/// Strips markdown code fences, then tries the whole text, the outermost
/// `[...]` span and the outermost `{...}` span in that order.
pub fn extract_json(text: &str) -> Option<Value> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(cleaned) {
        return Some(value);
    }
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (cleaned.find(open), cleaned.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&cleaned[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}
