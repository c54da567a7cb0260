//! TextLinker - accession hyperlinking and pattern-driven CSS classes
//!
//! Two registries filled once at startup by the miner modules:
//! - Linkers: `pattern -> URL template`. Recognized substrings (RefSeq and
//!   Ensembl ids, `PMID:123`, ...) become anchors. `__ID__` in the template is
//!   replaced by the hit, `__NUM__` by its digits.
//! - Classers: `pattern -> CSS class`. Every matching class is attached to a
//!   table cell.
//!
//! Every linker is matched against the original text. A hit claims its byte
//! range; hits from later linkers that overlap a claimed range are dropped,
//! so anchors never nest and a later pattern never sees an earlier anchor.

use regex::Regex;
use std::ops::Range;

use crate::error::{compile_pattern, TipError};

/// Compiled `pattern -> URL template` rule
#[derive(Debug, Clone)]
pub struct LinkRule {
    pub source: String,
    pub pattern: Regex,
    pub url: String,
}

/// Compiled `pattern -> CSS class` rule
#[derive(Debug, Clone)]
pub struct ClassRule {
    pub source: String,
    pub pattern: Regex,
    pub class: String,
}

#[derive(Debug, Clone, Default)]
pub struct TextLinker {
    linkers: Vec<LinkRule>,
    classers: Vec<ClassRule>,
}

impl TextLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case-insensitive linker. Re-registering a pattern replaces
    /// its URL template in place.
    pub fn register_linker(&mut self, pattern: &str, url: &str) -> Result<(), TipError> {
        if pattern.is_empty() {
            return Err(TipError::InvalidInput("empty linker pattern".to_string()));
        }
        let rule = LinkRule {
            source: pattern.to_string(),
            pattern: compile_pattern(pattern, true)?,
            url: url.to_string(),
        };
        match self.linkers.iter_mut().find(|r| r.source == pattern) {
            Some(existing) => *existing = rule,
            None => self.linkers.push(rule),
        }
        Ok(())
    }

    /// Register a classer. Re-registering a pattern replaces it in place.
    pub fn register_classer(
        &mut self,
        pattern: &str,
        class: &str,
        case_insensitive: bool,
    ) -> Result<(), TipError> {
        if pattern.is_empty() {
            return Err(TipError::InvalidInput("empty classer pattern".to_string()));
        }
        let rule = ClassRule {
            source: pattern.to_string(),
            pattern: compile_pattern(pattern, case_insensitive)?,
            class: class.to_string(),
        };
        match self.classers.iter_mut().find(|r| r.source == pattern) {
            Some(existing) => *existing = rule,
            None => self.classers.push(rule),
        }
        Ok(())
    }

    pub fn linker_count(&self) -> usize {
        self.linkers.len()
    }

    pub fn classer_count(&self) -> usize {
        self.classers.len()
    }

    /// Replace every recognized substring with an anchor
    pub fn rewrite_links(&self, text: &str) -> String {
        let mut claimed: Vec<(Range<usize>, String)> = Vec::new();

        for rule in &self.linkers {
            if rule.url.is_empty() {
                continue;
            }
            for hit in rule.pattern.find_iter(text) {
                let range = hit.range();
                if range.is_empty() || claimed.iter().any(|(r, _)| overlaps(r, &range)) {
                    continue;
                }
                claimed.push((range, rule.anchor(hit.as_str())));
            }
        }

        if claimed.is_empty() {
            return text.to_string();
        }
        claimed.sort_by_key(|(r, _)| r.start);

        let mut out = String::with_capacity(text.len() + claimed.len() * 48);
        let mut cursor = 0;
        for (range, anchor) in &claimed {
            out.push_str(&text[cursor..range.start]);
            out.push_str(anchor);
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Space-joined classes of every classer matching `text`
    pub fn classes_for(&self, text: &str) -> String {
        self.classers
            .iter()
            .filter(|r| r.pattern.is_match(text))
            .map(|r| r.class.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl LinkRule {
    fn anchor(&self, hit: &str) -> String {
        let digits: String = hit.chars().filter(char::is_ascii_digit).collect();
        let href = self.url.replacen("__ID__", hit, 1).replacen("__NUM__", &digits, 1);
        format!("<a target='_blank' href='{}'>{}</a>", href, hit)
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn linker() -> TextLinker {
        let mut l = TextLinker::new();
        l.register_linker(r"[NX][MR]_[0-9]+(\.[0-9]+)?", "rna?acc=__ID__").unwrap();
        l.register_linker(r"PMID:\d+", "http://pubmed/?term=__NUM__").unwrap();
        l
    }

    #[test]
    fn test_rewrite_single_accession() {
        let out = linker().rewrite_links("see NM_000546.5 for details");
        assert_eq!(
            out,
            "see <a target='_blank' href='rna?acc=NM_000546.5'>NM_000546.5</a> for details"
        );
    }

    #[test]
    fn test_num_placeholder_keeps_digits_only() {
        let out = linker().rewrite_links("PMID:12345");
        assert!(out.contains("href='http://pubmed/?term=12345'"));
    }

    #[test]
    fn test_every_distinct_hit_is_linked() {
        let out = linker().rewrite_links("NM_1 and NR_2 and NM_1");
        assert_eq!(out.matches("<a ").count(), 3);
        assert!(out.contains("acc=NR_2"));
    }

    #[test]
    fn test_overlapping_patterns_do_not_nest() {
        let mut l = TextLinker::new();
        l.register_linker(r"LOC\d+", "gene/__ID__").unwrap();
        l.register_linker(r"\d+", "num/__ID__").unwrap();
        let out = l.rewrite_links("LOC123");
        assert_eq!(out, "<a target='_blank' href='gene/LOC123'>LOC123</a>");
    }

    #[test]
    fn test_later_pattern_cannot_rematch_generated_anchor() {
        let mut l = TextLinker::new();
        l.register_linker(r"CDD:\d+", "cdd?uid=__NUM__").unwrap();
        l.register_linker(r"href", "bogus").unwrap();
        let out = l.rewrite_links("CDD:42");
        assert_eq!(out.matches("<a ").count(), 1);
    }

    #[test]
    fn test_reregistering_replaces_template() {
        let mut l = linker();
        l.register_linker(r"PMID:\d+", "pm/__NUM__").unwrap();
        assert_eq!(l.linker_count(), 2);
        assert!(l.rewrite_links("PMID:7").contains("href='pm/7'"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let mut l = TextLinker::new();
        let err = l.register_linker("(unclosed", "x").unwrap_err();
        assert!(matches!(err, TipError::InvalidPattern { .. }));
    }

    #[test]
    fn test_classes_in_registration_order() {
        let mut l = TextLinker::new();
        l.register_classer("^SYN", "syn", false).unwrap();
        l.register_classer("syn", "lower", false).unwrap();
        l.register_classer("syn", "any", true).unwrap();
        // same source re-registered in place
        assert_eq!(l.classer_count(), 2);
        assert_eq!(l.classes_for("SYNONYMOUS"), "syn any");
        assert_eq!(l.classes_for("missense"), "");
    }

    #[test]
    fn test_prefix_hit_does_not_split_longer_hit() {
        let mut l = TextLinker::new();
        l.register_linker(r"[NX][MR]_[0-9]+", "rna?acc=__ID__").unwrap();
        let out = l.rewrite_links("NM_1 NM_12");
        assert_eq!(
            out,
            "<a target='_blank' href='rna?acc=NM_1'>NM_1</a> \
             <a target='_blank' href='rna?acc=NM_12'>NM_12</a>"
        );
    }

    #[test]
    fn test_earlier_rule_keeps_its_range() {
        let mut l = TextLinker::new();
        l.register_linker(r"NM_\d+", "rna/__ID__").unwrap();
        l.register_linker(r"_\d+ and", "bogus/__ID__").unwrap();
        let out = l.rewrite_links("NM_7 and NM_8");
        assert_eq!(out.matches("<a ").count(), 2);
        assert!(!out.contains("bogus"));
        assert!(out.ends_with(" and <a target='_blank' href='rna/NM_8'>NM_8</a>"));
    }
}
