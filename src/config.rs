use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const BACKUP_VERSION: &str = "2.0";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DATABASE_FILE: &str = "numisma.duckdb";

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const VALUATION_MODEL: &str = "gemini-3-flash-preview";
pub const ANALYSIS_MODEL: &str = "gemini-3-pro-preview";

/// Settings key holding the generative model API key.
pub const GEMINI_API_KEY_SETTING: &str = "geminiApiKey";
/// Settings key holding an optional model override for valuation calls.
pub const GEMINI_MODEL_SETTING: &str = "geminiModel";

/// Pause between consecutive valuation requests.
pub const ESTIMATE_DELAY: Duration = Duration::from_millis(2000);
/// Rows sent to the normalization service per request.
pub const IMPORT_CHUNK_SIZE: usize = 10;

pub const DEFAULT_COUNTRY: &str = "United States";
pub const DEFAULT_CONDITION: &str = "Circulated";
pub const UNKNOWN_YEAR: &str = "Unknown";

/// Spreadsheet columns in export order, paired with the coin field they hold.
///
/// The same headers are the primary import aliases, so an exported sheet
/// re-imports without loss.
pub const COLLECTION_COLUMNS: [(&str, &str); 23] = [
    ("Country", "country"),
    ("Year", "year"),
    ("Mint Mark", "mintMark"),
    ("Denomination", "denomination"),
    ("Quantity", "quantity"),
    ("Program/Series", "series"),
    ("Theme/Subject", "theme"),
    ("Condition", "condition"),
    ("Surface & Strike Quality", "surfaceQuality"),
    ("Grading Service", "certService"),
    ("Grading Certification Number", "certSerial"),
    ("Cost", "purchaseCost"),
    ("Purchase Date", "datePurchased"),
    ("Retailer/Website", "retailer"),
    ("Retailer Item No.", "retailerItemNo"),
    ("Retailer Invoice #", "retailerInvoiceNo"),
    ("Metal Content", "metalContent"),
    ("Melt Value", "meltValue"),
    ("Personal Notes", "personalNotes"),
    ("Personal Reference #", "personalRefNo"),
    ("Storage Location", "storageLocation"),
    ("Variety (Legacy)", "varietyLegacy"),
    ("Notes (Legacy)", "notesLegacy"),
];

/// Loose headers seen in hand-made sheets.
pub const LOOSE_ALIASES: [(&str, &str); 5] = [
    ("Date", "year"),
    ("Coin Type", "denomination"),
    ("Description", "denomination"),
    ("Grade", "condition"),
    ("Series / Program", "series"),
];

/// Header aliases accepted on import, mapped to canonical field names.
///
/// Includes the export headers, the loose headers, and every canonical
/// name mapped to itself (fragments returned by the normalization service
/// already use canonical names).
pub fn column_aliases() -> HashMap<&'static str, &'static str> {
    let mut map: HashMap<&'static str, &'static str> = LOOSE_ALIASES.iter().copied().collect();
    map.extend(COLLECTION_COLUMNS.iter().copied());
    for (_, field) in COLLECTION_COLUMNS {
        map.insert(field, field);
    }
    map.insert("certGrade", "certGrade");
    map
}

/// Precedence of a header when several cells of one row map to the same
/// field; lower wins. Canonical names rank 0, export headers 1, loose
/// aliases 2.
pub fn alias_rank(header: &str) -> u8 {
    if header == "certGrade" || COLLECTION_COLUMNS.iter().any(|(_, field)| *field == header) {
        0
    } else if COLLECTION_COLUMNS.iter().any(|(export, _)| *export == header) {
        1
    } else {
        2
    }
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_local_dir() {
        data.join("numisma")
    } else {
        PathBuf::from(".numisma-data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_headers_are_import_aliases() {
        let aliases = column_aliases();
        for (header, field) in COLLECTION_COLUMNS {
            assert_eq!(aliases.get(header), Some(&field));
        }
    }

    #[test]
    fn canonical_names_map_to_themselves() {
        let aliases = column_aliases();
        assert_eq!(aliases.get("series"), Some(&"series"));
        assert_eq!(aliases.get("certSerial"), Some(&"certSerial"));
        assert_eq!(aliases.get("Coin Type"), Some(&"denomination"));
    }

    #[test]
    fn canonical_then_export_then_loose() {
        assert_eq!(alias_rank("denomination"), 0);
        assert_eq!(alias_rank("Denomination"), 1);
        assert_eq!(alias_rank("Coin Type"), 2);
        assert_eq!(alias_rank("certGrade"), 0);
    }
}
