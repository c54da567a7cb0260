//! Tag Resolver - effective tag display policy for a record
//!
//! A record's tags can say which tags are worth showing (`Useful Tag`), how
//! multi-valued tags are joined (`Concatenate Tag`), how values are styled or
//! classed (`Style Tag`, `Class Tag`) and which values link out (`URL Tag`).
//! Those rules are inherited: the record's own tags come first, then the tags
//! of every population it has frequencies for, then the tags of every category
//! it belongs to. Populations and categories carry tags of their own and are
//! walked recursively.
//!
//! # Cycle guard
//! Populations and categories may reference each other. The walk threads an
//! explicit visited set; a record reached a second time (through a cycle or a
//! second path) is skipped, so its rules count once. Records are never mutated.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use crate::error::compile_pattern;
use crate::model::support::{Category, RecordKey, SupportStore, Tagged};
use crate::tags::meta::parse_meta;

pub const USEFUL_TAG: &str = "Useful Tag";
pub const CONCATENATE_TAG: &str = "Concatenate Tag";
pub const URL_TAG: &str = "URL Tag";
pub const STYLE_TAG: &str = "Style Tag";
pub const CLASS_TAG: &str = "Class Tag";
pub const CATEGORY_TAG: &str = "Category";

/// Placeholder in style, class and URL templates replaced by the tag value
pub const TAG_VALUE_TOKEN: &str = "TAGVAL";

const DEFAULT_CONCAT: &str = " && ";
const GRAY_STYLE: &str = "color: #aaa; font-size: 0.7em;";

static CONCAT_RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(.+)"\s+(.+)$"#).expect("concat rule pattern"));

// =============================================================================
// Tag Selection
// =============================================================================

/// A style or class fragment applied to matching values of one tag
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// CSS fragment; may contain `TAGVAL`
    pub value: String,
    /// Only values matching this pattern get the fragment
    pub keep: Option<Regex>,
    /// Apply to the tag-name cell as well
    pub tag_too: bool,
}

impl StyleRule {
    pub fn applies_to(&self, value: &str) -> bool {
        self.keep.as_ref().map_or(true, |re| re.is_match(value))
    }
}

/// A link template for values of one tag
#[derive(Debug, Clone)]
pub struct UrlRule {
    /// URL or `MLdoEvent ...` command template; may contain `TAGVAL`
    pub url: String,
    /// Link text; the value itself when absent
    pub name: Option<String>,
    pub keep: Option<Regex>,
}

impl UrlRule {
    fn command(url: &str) -> Self {
        Self { url: url.to_string(), name: None, keep: None }
    }

    pub fn applies_to(&self, value: &str) -> bool {
        self.keep.as_ref().map_or(true, |re| re.is_match(value))
    }
}

/// Effective tag display policy, built fresh for each render
#[derive(Debug, Clone)]
pub struct TagSelection {
    /// Tags worth showing in the condensed table
    pub useful: BTreeSet<String>,
    /// tag -> join separator
    pub concat: BTreeMap<String, String>,
    pub style: BTreeMap<String, Vec<StyleRule>>,
    pub class: BTreeMap<String, Vec<StyleRule>>,
    pub urls: BTreeMap<String, Vec<UrlRule>>,
}

impl Default for TagSelection {
    fn default() -> Self {
        let gray = || {
            vec![StyleRule { value: GRAY_STYLE.to_string(), keep: None, tag_too: true }]
        };
        let pop_url = format!("MLdoEvent objid='{}' objtype='Pop'", TAG_VALUE_TOKEN);
        let cat_url = format!("MLdoEvent objid='{}' objtype='Cat'", TAG_VALUE_TOKEN);

        let mut concat = BTreeMap::new();
        for tag in [URL_TAG, USEFUL_TAG, CONCATENATE_TAG, STYLE_TAG] {
            concat.insert(tag.to_string(), DEFAULT_CONCAT.to_string());
        }
        let mut style = BTreeMap::new();
        for tag in [URL_TAG, USEFUL_TAG, CONCATENATE_TAG, CLASS_TAG, STYLE_TAG] {
            style.insert(tag.to_string(), gray());
        }
        let mut urls = BTreeMap::new();
        urls.insert(CATEGORY_TAG.to_string(), vec![UrlRule::command(&cat_url)]);
        urls.insert("Reference Population".to_string(), vec![UrlRule::command(&pop_url)]);
        urls.insert("Normal Population".to_string(), vec![UrlRule::command(&pop_url)]);

        Self {
            useful: BTreeSet::new(),
            concat,
            style,
            class: BTreeMap::new(),
            urls,
        }
    }
}

impl TagSelection {
    pub fn is_useful(&self, tag: &str) -> bool {
        self.useful.contains(tag)
    }

    /// Fold one record's own rule tags into the selection
    fn absorb(&mut self, obj: &dyn Tagged) {
        let tags = obj.tags();

        for tag in tags.get(USEFUL_TAG).into_iter().flatten() {
            if !tag.is_empty() {
                self.useful.insert(tag.clone());
            }
        }

        for rule in tags.get(CONCATENATE_TAG).into_iter().flatten() {
            if let Some(caps) = CONCAT_RULE_RE.captures(rule) {
                let sep = caps[1].to_string();
                self.concat.entry(caps[2].to_string()).or_insert(sep);
            }
        }

        for raw in tags.get(URL_TAG).into_iter().flatten() {
            let meta = parse_meta(Some(raw));
            let (Some(tag), Some(url)) = (meta.tag(), meta.url()) else {
                continue;
            };
            let rules = self.urls.entry(tag.to_string()).or_default();
            if rules.iter().any(|r| r.url == url) {
                continue;
            }
            rules.push(UrlRule {
                url: url.to_string(),
                name: meta.get("name").map(str::to_string),
                keep: keep_pattern(meta.get("keep")),
            });
        }

        for (tag_name, target) in [(STYLE_TAG, &mut self.style), (CLASS_TAG, &mut self.class)] {
            for raw in tags.get(tag_name).into_iter().flatten() {
                let meta = parse_meta(Some(raw));
                let (Some(tag), Some(value)) = (meta.tag(), meta.value()) else {
                    continue;
                };
                let keep = match meta.get("keep") {
                    Some(src) => match keep_pattern(Some(src)) {
                        Some(re) => Some(re),
                        None => continue,
                    },
                    None => None,
                };
                target.entry(tag.to_string()).or_default().push(StyleRule {
                    value: value.to_string(),
                    keep,
                    tag_too: meta.flag("tagtoo"),
                });
            }
        }
    }
}

fn keep_pattern(src: Option<&str>) -> Option<Regex> {
    let src = src.filter(|s| !s.is_empty())?;
    match compile_pattern(src, false) {
        Ok(re) => Some(re),
        Err(e) => {
            console_warn!("[TagResolver] Ignoring keep rule: {}", e);
            None
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

pub struct TagResolver<'a> {
    store: &'a SupportStore,
}

impl<'a> TagResolver<'a> {
    pub fn new(store: &'a SupportStore) -> Self {
        Self { store }
    }

    /// Resolve the policy for `obj`. `origin` names the record itself when it
    /// is a supporting record, so a cycle back to it is recognized.
    pub fn resolve(&self, obj: &dyn Tagged, origin: Option<RecordKey>) -> TagSelection {
        let mut selection = TagSelection::default();
        let mut visited: HashSet<RecordKey> = HashSet::new();
        if let Some(key) = origin {
            visited.insert(key);
        }
        self.walk(obj, &mut selection, &mut visited);
        selection
    }

    fn walk(&self, obj: &dyn Tagged, selection: &mut TagSelection, visited: &mut HashSet<RecordKey>) {
        selection.absorb(obj);

        // Populations take precedence over categories
        for pid in obj.population_ids() {
            self.visit(Category::Pop, pid, selection, visited);
        }

        let tagged_cats = obj.tags().get(CATEGORY_TAG).into_iter().flatten();
        let cats: Vec<String> = tagged_cats.chain(obj.category_ids()).cloned().collect();
        for cat in &cats {
            self.visit(Category::Cat, cat, selection, visited);
        }
    }

    fn visit(
        &self,
        category: Category,
        id: &str,
        selection: &mut TagSelection,
        visited: &mut HashSet<RecordKey>,
    ) {
        if !visited.insert(RecordKey::new(category.clone(), id)) {
            return;
        }
        if let Some(record) = self.store.record(&category, id) {
            self.walk(&record, selection, visited);
        }
    }
}

// ==================== TESTS ====================
