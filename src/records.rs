use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LabelError, Result};

/// A rated beer as exported from the ratings service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeerRecord {
    #[serde(deserialize_with = "bid_from_string_or_number")]
    pub bid: String,
    /// Label image URL, empty when the beer has none
    #[serde(default)]
    pub label: String,
    pub rating: f64,
}

/// Read-only lookup of beer records by bid.
#[derive(Debug, Clone, Default)]
pub struct BeerRecords {
    records: Vec<BeerRecord>,
    by_bid: HashMap<String, usize>,
}

/// Accepted file shapes: a plain list, or an object keyed by an opaque id.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    List(Vec<BeerRecord>),
    Keyed(HashMap<String, BeerRecord>),
}

impl BeerRecords {
    /// Index `records` by bid. A later duplicate bid wins.
    pub fn new(records: Vec<BeerRecord>) -> Self {
        let by_bid = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.bid.clone(), idx))
            .collect();
        Self { records, by_bid }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let mut records = match serde_json::from_str(json)? {
            RecordsFile::List(records) => records,
            RecordsFile::Keyed(map) => map.into_values().collect(),
        };
        // Keyed files carry no order of their own.
        records.sort_by(|a, b| a.bid.cmp(&b.bid));
        Ok(Self::new(records))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LabelError::io(path, e))?;
        Self::from_json_str(&text).map_err(|source| LabelError::Data {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, bid: &str) -> Option<&BeerRecord> {
        self.by_bid.get(bid).map(|&idx| &self.records[idx])
    }

    pub fn require(&self, bid: &str) -> Result<&BeerRecord> {
        self.get(bid).ok_or_else(|| LabelError::MissingRecord {
            bid: bid.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &BeerRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn bid_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bid {
        Text(String),
        Number(u64),
    }

    Ok(match Bid::deserialize(deserializer)? {
        Bid::Text(s) => s,
        Bid::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_with_numeric_and_text_bids() {
        let records = BeerRecords::from_json_str(
            r#"[
                {"bid": 123, "label": "https://example.com/a.png", "rating": 4.5},
                {"bid": "77", "rating": 3.0}
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records.get("123").unwrap().rating, 4.5);
        assert_eq!(records.get("77").unwrap().label, "");
    }

    #[test]
    fn parses_keyed_object() {
        let records = BeerRecords::from_json_str(
            r#"{"f00": {"bid": 2, "label": "", "rating": 1.0},
                "ba5": {"bid": 1, "label": "", "rating": 2.0}}"#,
        )
        .unwrap();

        let bids: Vec<&str> = records.iter().map(|r| r.bid.as_str()).collect();
        assert_eq!(bids, vec!["1", "2"]);
    }

    #[test]
    fn missing_bid_is_an_error() {
        let records = BeerRecords::new(Vec::new());
        assert!(matches!(
            records.require("9"),
            Err(LabelError::MissingRecord { bid }) if bid == "9"
        ));
    }
}
