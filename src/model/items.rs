//! Plotted objects and the typed data items they carry
//!
//! The host hands over loosely shaped JSON. Items stay raw until the composer
//! has classified the track, then decode into the matching `DataItem` case.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::de;
use crate::model::support::{AlleleFreq, FreqTable, Tags};

// =============================================================================
// Plotted Object
// =============================================================================

/// The record the charting widget reports for a hovered/clicked location
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlottedObject {
    #[serde(deserialize_with = "de::array")]
    pub data: Vec<Value>,
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub track_type: Option<String>,
    /// Use the literal track name as the miner type when no pattern matches
    #[serde(deserialize_with = "de::truthy")]
    pub honor_type: bool,
    #[serde(deserialize_with = "de::opt_usize")]
    pub brief_len: Option<usize>,
    /// Per-column fill colors for information tracks
    #[serde(deserialize_with = "de::string_list")]
    pub fill: Vec<String>,
    /// Column names for information tracks
    #[serde(deserialize_with = "de::string_list")]
    pub names: Vec<String>,
    #[serde(deserialize_with = "de::truthy")]
    pub window: bool,
}

impl PlottedObject {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// =============================================================================
// Track Classification
// =============================================================================

/// Semantic type of a track, decides which miners run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackKind {
    Polymorphism,
    Alignment,
    Feature,
    /// A literal track name kept because the object asked for it (`honorType`)
    Named(String),
    Unknown,
}

impl TrackKind {
    pub fn as_str(&self) -> &str {
        match self {
            TrackKind::Polymorphism => "polymorphism",
            TrackKind::Alignment => "alignment",
            TrackKind::Feature => "feature",
            TrackKind::Named(name) => name.as_str(),
            TrackKind::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Links
// =============================================================================

/// Entry of an item's `links` list
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    Url(String),
    Labeled { url: String, label: Option<String> },
    /// Anything else; rendered as a visible error naming the shape
    Malformed(&'static str),
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(Link::from_value(&v))
    }
}

impl Link {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::String(s) => Link::Url(s.clone()),
            Value::Array(parts) => Link::Labeled {
                url: parts.first().and_then(de::value_text).unwrap_or_default(),
                label: parts.get(1).and_then(de::value_text).filter(|s| !s.is_empty()),
            },
            Value::Object(_) => Link::Malformed("Object"),
            Value::Number(_) => Link::Malformed("Number"),
            Value::Bool(_) => Link::Malformed("Boolean"),
            Value::Null => Link::Malformed("Null"),
        }
    }
}

// =============================================================================
// Item Fields
// =============================================================================

/// Fields every item kind may carry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemBase {
    #[serde(deserialize_with = "de::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub label: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub caption: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub note: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub len: Option<String>,
    #[serde(deserialize_with = "de::tag_map")]
    pub tags: Tags,
    #[serde(deserialize_with = "de::id_list")]
    pub cats: Vec<String>,
    #[serde(deserialize_with = "crate::model::support::freq_table")]
    pub freqs: FreqTable,
    #[serde(deserialize_with = "link_list")]
    pub links: Vec<Link>,
    /// Ranges for features (`[[start, end], ...]`), counts for information tracks
    #[serde(deserialize_with = "de::array")]
    pub data: Vec<Value>,
}

fn link_list<'de, D>(d: D) -> Result<Vec<Link>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => items.iter().map(Link::from_value).collect(),
        Value::Null => Vec::new(),
        other => vec![Link::from_value(&other)],
    })
}

/// One codon-level change: `[codon, protein]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodonChange {
    pub codon: Option<String>,
    pub protein: Option<String>,
}

impl<'de> Deserialize<'de> for CodonChange {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        let parts = match v {
            Value::Array(parts) => parts,
            other => vec![other],
        };
        Ok(CodonChange {
            codon: parts.first().and_then(de::value_text).filter(|s| !s.is_empty()),
            protein: parts.get(1).and_then(de::value_text).filter(|s| !s.is_empty()),
        })
    }
}

/// Predicted impact of a variant on one RNA
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RnaImpact {
    /// allele -> codon change
    pub var: BTreeMap<String, CodonChange>,
    #[serde(rename = "ref", deserialize_with = "de::opt_string")]
    pub reference: Option<String>,
    #[serde(rename = "ERROR", deserialize_with = "de::string_list")]
    pub errors: Vec<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub align: Option<String>,
    #[serde(deserialize_with = "de::opt_f64")]
    pub cdpos: Option<f64>,
    #[serde(deserialize_with = "de::opt_string")]
    pub imp: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub prot_nom: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub prot_pos: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub nuc_nom: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub nuc_pos: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub note: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub imp_note: Option<String>,
}

/// `impact` map of a variant: RNA id -> impact, plus the reserved `ERROR` list
#[derive(Debug, Clone, Default)]
pub struct ImpactTable {
    pub rnas: BTreeMap<String, RnaImpact>,
    pub errors: Vec<String>,
}

impl ImpactTable {
    pub fn is_empty(&self) -> bool {
        self.rnas.is_empty() && self.errors.is_empty()
    }
}

impl<'de> Deserialize<'de> for ImpactTable {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        let mut table = ImpactTable::default();
        if let Value::Object(map) = v {
            for (rid, rec) in map {
                if rid == "ERROR" {
                    table.errors.extend(de::value_list(&rec));
                    continue;
                }
                match serde_json::from_value::<RnaImpact>(rec) {
                    Ok(imp) => {
                        table.rnas.insert(rid, imp);
                    }
                    Err(e) => table
                        .errors
                        .push(format!("Unreadable impact record for {}: {}", rid, e)),
                }
            }
        }
        Ok(table)
    }
}

// =============================================================================
// Item Kinds
// =============================================================================

/// Polymorphism (SNP / indel) record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariantItem {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(deserialize_with = "de::opt_string")]
    pub chrid: Option<String>,
    /// accession -> sources reporting it
    #[serde(deserialize_with = "de::tag_map")]
    pub accs: BTreeMap<String, Vec<String>>,
    #[serde(rename = "MAF", deserialize_with = "de::opt_string")]
    pub maf: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub imp_name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub imp_token: Option<String>,
    pub impact: ImpactTable,
    /// allele -> allele on the reported strand, when reported on -1
    #[serde(deserialize_with = "de::string_map")]
    pub revcom: BTreeMap<String, String>,
    /// Overlapping feature ids
    #[serde(deserialize_with = "de::id_list")]
    pub features: Vec<String>,
    /// Population filter state: 0 fail, negative ok, positive pass
    #[serde(deserialize_with = "de::opt_number_map")]
    pub ok_pids: Option<BTreeMap<String, f64>>,
}

/// RNA / probe / exon alignment record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlignmentItem {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(deserialize_with = "de::opt_string")]
    pub llid: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub gene: Option<String>,
    #[serde(deserialize_with = "de::array")]
    pub aacoord: Vec<Value>,
    #[serde(deserialize_with = "de::opt_string")]
    pub phase: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub score: Option<String>,
    #[serde(deserialize_with = "de::opt_f64")]
    pub howbad: Option<f64>,
    #[serde(rename = "type", deserialize_with = "de::opt_string")]
    pub kind: Option<String>,
    /// chromosome -> `[build, start, end, hit, strand]` rows
    pub coords: BTreeMap<String, Vec<Vec<Value>>>,
    #[serde(deserialize_with = "de::opt_string")]
    pub source: Option<String>,
}

/// CRISPR read cluster
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrisprItem {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(deserialize_with = "de::opt_string")]
    pub aln_blk: Option<String>,
}

/// Generic information track entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoItem {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(deserialize_with = "de::opt_string")]
    pub info: Option<String>,
    #[serde(deserialize_with = "de::array")]
    pub counts: Vec<Value>,
    #[serde(deserialize_with = "de::opt_string")]
    pub imp_token: Option<String>,
    /// Display position
    #[serde(deserialize_with = "de::opt_string")]
    pub show: Option<String>,
}

/// Features, unknown tracks and honoured types without a dedicated shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenericItem {
    #[serde(flatten)]
    pub base: ItemBase,
}

/// A single entity at the hovered location
#[derive(Debug, Clone)]
pub enum DataItem {
    Variant(VariantItem),
    Alignment(AlignmentItem),
    Crispr(CrisprItem),
    Info(InfoItem),
    Generic(GenericItem),
}

impl DataItem {
    /// Decode a raw item according to the track it came from.
    ///
    /// An item that does not fit its track's shape keeps its common fields.
    pub fn from_value(kind: &TrackKind, value: &Value) -> Self {
        let decoded = match kind {
            TrackKind::Polymorphism => serde_json::from_value(value.clone()).map(DataItem::Variant),
            TrackKind::Alignment => serde_json::from_value(value.clone()).map(DataItem::Alignment),
            TrackKind::Named(name) if name == "crispr" => {
                serde_json::from_value(value.clone()).map(DataItem::Crispr)
            }
            TrackKind::Named(name) if name == "information" => {
                serde_json::from_value(value.clone()).map(DataItem::Info)
            }
            _ => serde_json::from_value(value.clone()).map(DataItem::Generic),
        };
        match decoded {
            Ok(item) => item,
            Err(e) => {
                console_warn!("[DataItem] {} item kept as generic: {}", kind.as_str(), e);
                let base = serde_json::from_value(value.clone()).unwrap_or_default();
                DataItem::Generic(GenericItem { base })
            }
        }
    }

    pub fn base(&self) -> &ItemBase {
        match self {
            DataItem::Variant(v) => &v.base,
            DataItem::Alignment(a) => &a.base,
            DataItem::Crispr(c) => &c.base,
            DataItem::Info(i) => &i.base,
            DataItem::Generic(g) => &g.base,
        }
    }

    pub fn as_variant(&self) -> Option<&VariantItem> {
        match self {
            DataItem::Variant(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_alignment(&self) -> Option<&AlignmentItem> {
        match self {
            DataItem::Alignment(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_crispr(&self) -> Option<&CrisprItem> {
        match self {
            DataItem::Crispr(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_info(&self) -> Option<&InfoItem> {
        match self {
            DataItem::Info(i) => Some(i),
            _ => None,
        }
    }
}

/// Frequency entry lookup shared by the variant miners
pub fn allele_freq<'a>(freqs: &'a FreqTable, pid: &str, allele: &str) -> Option<&'a AlleleFreq> {
    freqs.get(pid).and_then(|by_allele| by_allele.get(allele))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plotted_object_lenient_fields() {
        let obj = PlottedObject::from_value(json!({
            "data": [{ "id": 1 }],
            "name": "SNPs",
            "honorType": 1,
            "briefLen": "3"
        }))
        .unwrap();
        assert_eq!(obj.data.len(), 1);
        assert!(obj.honor_type);
        assert_eq!(obj.brief_len, Some(3));
    }

    #[test]
    fn test_variant_decodes_impacts_and_errors() {
        let item = DataItem::from_value(
            &TrackKind::Polymorphism,
            &json!({
                "id": "v1",
                "impName": "Missense",
                "impToken": 3,
                "impact": {
                    "ERROR": ["bad frame"],
                    "r1": { "var": { "A": ["GCA", "Ala"] }, "ref": "A", "imp": "SYN", "cdpos": 2 }
                },
                "freqs": { "p1": { "A": [0.25, 40], "T": ["", 12] } }
            }),
        );
        let v = item.as_variant().expect("variant");
        assert_eq!(v.imp_token.as_deref(), Some("3"));
        assert_eq!(v.impact.errors, vec!["bad frame"]);
        let r1 = &v.impact.rnas["r1"];
        assert_eq!(r1.reference.as_deref(), Some("A"));
        assert_eq!(r1.var["A"].protein.as_deref(), Some("Ala"));
        assert_eq!(r1.cdpos, Some(2.0));
        let a = allele_freq(&v.base.freqs, "p1", "A").unwrap();
        assert_eq!(a.freq, Some(0.25));
        assert_eq!(a.count, Some(40));
        assert_eq!(allele_freq(&v.base.freqs, "p1", "T").unwrap().freq, None);
    }

    #[test]
    fn test_links_shapes() {
        let base: ItemBase = serde_json::from_value(json!({
            "links": ["http://a", ["http://b", "B"], { "x": 1 }]
        }))
        .unwrap();
        assert_eq!(base.links[0], Link::Url("http://a".into()));
        assert_eq!(
            base.links[1],
            Link::Labeled { url: "http://b".into(), label: Some("B".into()) }
        );
        assert_eq!(base.links[2], Link::Malformed("Object"));
    }

    #[test]
    fn test_misshapen_item_falls_back_to_generic() {
        let item = DataItem::from_value(
            &TrackKind::Alignment,
            &json!({ "id": "a1", "coords": "not a map" }),
        );
        assert!(item.as_alignment().is_none());
        assert_eq!(item.base().id.as_deref(), Some("a1"));
    }

    #[test]
    fn test_named_kinds_pick_their_shape() {
        let item = DataItem::from_value(
            &TrackKind::Named("crispr".into()),
            &json!({ "name": "read1", "alnBlk": "ACGT" }),
        );
        assert_eq!(item.as_crispr().unwrap().aln_blk.as_deref(), Some("ACGT"));
    }
}
