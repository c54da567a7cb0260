//! Inline tag metadata parser
//!
//! Tag values carry their own display rules written as `key="value"` pairs:
//!
//! ```text
//! tag="Clinical Significance" value="color: red" keep="^Pathogenic"
//! tag="dbSNP" url="http://www.ncbi.nlm.nih.gov/snp/TAGVAL" name="dbSNP"
//! tag="Impact" imp-high
//! ```
//!
//! Pairs are pulled out left to right; whatever text remains becomes `value`
//! unless a pair already set it. Quotes cannot be escaped, so a value stops at
//! the first embedded `"`. Malformed input yields whatever pairs were found.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static META_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\S+)="([^"]+)""#).expect("meta pair pattern"));

/// Parsed `key="value"` record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaRecord {
    fields: BTreeMap<String, String>,
}

impl MetaRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn value(&self) -> Option<&str> {
        self.get("value")
    }

    pub fn tag(&self) -> Option<&str> {
        self.get("tag")
    }

    pub fn url(&self) -> Option<&str> {
        self.get("url")
    }

    /// Set flags (`tagtoo="1"`) count when present and non-empty
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty() && v != "0")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Parse a tag metadata string. `None` yields an empty record.
pub fn parse_meta(text: Option<&str>) -> MetaRecord {
    let mut record = MetaRecord::default();
    let Some(text) = text else {
        return record;
    };
    let mut rest = text.to_string();
    loop {
        let (range, key, value) = match META_PAIR_RE.captures(&rest) {
            Some(caps) => {
                let whole = caps.get(0).map(|m| m.range());
                match (whole, caps.get(1), caps.get(2)) {
                    (Some(range), Some(k), Some(v)) => {
                        (range, k.as_str().to_string(), v.as_str().to_string())
                    }
                    _ => break,
                }
            }
            None => break,
        };
        rest.replace_range(range, "");
        record.fields.insert(key, value);
    }
    let leftover = rest.trim();
    if !record.fields.contains_key("value") && !leftover.is_empty() {
        record.fields.insert("value".to_string(), leftover.to_string());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_and_leftover_value() {
        let m = parse_meta(Some(r#"tag="Impact" imp-high keep="^HIGH""#));
        assert_eq!(m.tag(), Some("Impact"));
        assert_eq!(m.get("keep"), Some("^HIGH"));
        assert_eq!(m.value(), Some("imp-high"));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_explicit_value_beats_leftover() {
        let m = parse_meta(Some(r#"value="color: red" stray words tag="X""#));
        assert_eq!(m.value(), Some("color: red"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_no_pairs() {
        let m = parse_meta(Some("  just text  "));
        assert_eq!(m.value(), Some("just text"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_empty_and_missing_input() {
        assert!(parse_meta(Some("   ")).is_empty());
        assert!(parse_meta(None).is_empty());
    }

    #[test]
    fn test_embedded_quote_terminates_value() {
        // The quote inside the value cuts it short; the tail is left over
        let m = parse_meta(Some(r#"name="say "hi" now""#));
        assert_eq!(m.get("name"), Some("say "));
        assert_eq!(m.value(), Some(r#"hi" now""#));
    }

    #[test]
    fn test_n_pairs_give_n_keys() {
        let m = parse_meta(Some(r#"a="1" b="2" c="3""#));
        assert_eq!(m.len(), 3);
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(m.value(), None);
    }

    #[test]
    fn test_later_duplicate_key_overwrites() {
        let m = parse_meta(Some(r#"tag="A" tag="B""#));
        assert_eq!(m.tag(), Some("B"));
    }

    #[test]
    fn test_flags() {
        let m = parse_meta(Some(r#"tagtoo="1" off="0""#));
        assert!(m.flag("tagtoo"));
        assert!(!m.flag("off"));
        assert!(!m.flag("missing"));
    }
}
