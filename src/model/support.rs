//! Supporting records and the lookup store they are fetched from
//!
//! Pages ship a `category -> id -> record` blob next to the chart. Miners pull
//! populations, categories, features, RNAs, alignments and colors out of it
//! while building a tooltip. Records are read-only; a missing record is `None`
//! and callers fall back to an empty one.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::de;
use crate::error::TipError;
use crate::model::items::ItemBase;

/// Tag name -> ordered raw values
pub type Tags = BTreeMap<String, Vec<String>>;

/// Population id -> allele -> frequency entry, in page order
pub type FreqTable = IndexMap<String, IndexMap<String, AlleleFreq>>;

// =============================================================================
// Allele Frequencies
// =============================================================================

/// One `[frequency, count]` pair; either part may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlleleFreq {
    pub freq: Option<f64>,
    pub count: Option<u64>,
}

impl AlleleFreq {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Array(parts) => AlleleFreq {
                freq: parts.first().and_then(de::value_f64),
                count: parts
                    .get(1)
                    .and_then(de::value_f64)
                    .filter(|c| *c > 0.0)
                    .map(|c| c as u64),
            },
            other => AlleleFreq { freq: de::value_f64(other), count: None },
        }
    }
}

pub fn freq_table<'de, D>(d: D) -> Result<FreqTable, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    let mut table = FreqTable::new();
    if let Value::Object(pops) = v {
        for (pid, alleles) in pops {
            let mut by_allele = IndexMap::new();
            if let Value::Object(alleles) = alleles {
                for (allele, entry) in alleles {
                    by_allele.insert(allele, AlleleFreq::from_value(&entry));
                }
            }
            table.insert(pid, by_allele);
        }
    }
    Ok(table)
}

// =============================================================================
// Categories
// =============================================================================

/// Kind of supporting record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Pop,
    Cat,
    Feat,
    Rna,
    Align,
    Color,
    Gene,
    Other(String),
}

impl Category {
    pub fn parse(s: &str) -> Self {
        match s {
            "Pop" => Category::Pop,
            "Cat" => Category::Cat,
            "Feat" => Category::Feat,
            "RNA" => Category::Rna,
            "Align" => Category::Align,
            "Color" => Category::Color,
            "Gene" => Category::Gene,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Pop => "Pop",
            Category::Cat => "Cat",
            Category::Feat => "Feat",
            Category::Rna => "RNA",
            Category::Align => "Align",
            Category::Color => "Color",
            Category::Gene => "Gene",
            Category::Other(s) => s.as_str(),
        }
    }
}

/// Identity of a supporting record, used as the tag walk's visited key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub category: Category,
    pub id: String,
}

impl RecordKey {
    pub fn new(category: Category, id: &str) -> Self {
        Self { category, id: id.to_string() }
    }
}

// =============================================================================
// Supporting Record
// =============================================================================

/// Population, category, feature, RNA or alignment record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupportingRecord {
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub text: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub parent: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub root: Option<String>,
    #[serde(deserialize_with = "de::tag_map")]
    pub tags: Tags,
    #[serde(deserialize_with = "de::opt_string")]
    pub color_tag: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub color: Option<String>,
    /// Free-text comment
    #[serde(deserialize_with = "de::opt_string")]
    pub com: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub acc: Option<String>,
    /// Percent worse than the best genomic placement
    #[serde(deserialize_with = "de::opt_f64")]
    pub howbad: Option<f64>,
    #[serde(deserialize_with = "de::id_list")]
    pub cats: Vec<String>,
    #[serde(deserialize_with = "freq_table")]
    pub freqs: FreqTable,
}

// =============================================================================
// Tagged
// =============================================================================

/// Anything that contributes to tag resolution
pub trait Tagged {
    fn tags(&self) -> &Tags;
    /// Populations referenced through frequency data
    fn population_ids(&self) -> Vec<&str>;
    /// Directly assigned categories
    fn category_ids(&self) -> &[String];
}

impl Tagged for ItemBase {
    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn population_ids(&self) -> Vec<&str> {
        self.freqs.keys().map(String::as_str).collect()
    }

    fn category_ids(&self) -> &[String] {
        &self.cats
    }
}

impl Tagged for SupportingRecord {
    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn population_ids(&self) -> Vec<&str> {
        self.freqs.keys().map(String::as_str).collect()
    }

    fn category_ids(&self) -> &[String] {
        &self.cats
    }
}

// =============================================================================
// Support Store
// =============================================================================

/// Lookup cache of externally supplied records, keyed by category then id
#[derive(Debug, Clone, Default)]
pub struct SupportStore {
    data: HashMap<String, HashMap<String, Value>>,
}

impl SupportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a `{ category: { id: record } }` blob into the store
    pub fn load(&mut self, blob: Value) -> Result<usize, TipError> {
        let categories = match blob {
            Value::Object(map) => map,
            other => {
                return Err(TipError::InvalidInput(format!(
                    "support data must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };
        let mut loaded = 0;
        for (category, records) in categories {
            let Value::Object(records) = records else {
                console_warn!("[SupportStore] Skipping non-object category '{}'", category);
                continue;
            };
            let slot = self.data.entry(category).or_default();
            for (key, record) in records {
                slot.insert(key, record);
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    pub fn insert(&mut self, category: &Category, key: &str, record: Value) {
        self.data
            .entry(category.as_str().to_string())
            .or_default()
            .insert(key.to_string(), record);
    }

    /// `fetchSupportingData`: raw record or `None`
    pub fn fetch(&self, category: &Category, key: &str) -> Option<&Value> {
        self.data.get(category.as_str()).and_then(|records| records.get(key))
    }

    /// Typed record; `None` when absent or not record-shaped
    pub fn record(&self, category: &Category, key: &str) -> Option<SupportingRecord> {
        let raw = self.fetch(category, key)?;
        if !raw.is_object() {
            return None;
        }
        serde_json::from_value(raw.clone()).ok()
    }

    /// Typed record, or an empty one when missing
    pub fn record_or_default(&self, category: &Category, key: &str) -> SupportingRecord {
        self.record(category, key).unwrap_or_default()
    }

    /// Color records are inline style strings
    pub fn color(&self, key: &str) -> Option<String> {
        self.fetch(&Category::Color, key)
            .and_then(de::value_text)
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.data.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
