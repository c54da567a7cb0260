//! Tag tables
//!
//! Renders a record's tags as a two-column `Tag | Values` table, applying the
//! resolved `TagSelection`: concatenation, style and class rules, and URL
//! templates (plain links or record commands).

use std::collections::HashSet;

use crate::model::support::Tags;
use crate::render::command::{TipCommand, COMMAND_URL_PREFIX};
use crate::render::format::unxss;
use crate::render::table::{TableCell, TableRenderer};
use crate::tags::resolver::{StyleRule, TagSelection, TAG_VALUE_TOKEN};

const TAG_VALUE_CLASS: &str = "tagval";
const TABLE_OPEN: &str = "<table style='font-size:1.0em' class='tab tagtab'><tbody>";
const TABLE_HEADER: &str = "<tr><th>Tag</th><th>Values</th></tr>";
const TABLE_CLOSE: &str = "</tbody></table>";

/// Which tags make it into the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    All,
    /// Only tags named by a `Useful Tag` somewhere up the inheritance chain
    Useful,
}

/// Which attribute a rule writes to
#[derive(Clone, Copy)]
enum RuleSlot {
    Class,
    Style,
}

pub struct TagTable<'a> {
    selection: &'a TagSelection,
    renderer: &'a TableRenderer<'a>,
    cxid: &'a str,
}

impl<'a> TagTable<'a> {
    pub fn new(selection: &'a TagSelection, renderer: &'a TableRenderer<'a>, cxid: &'a str) -> Self {
        Self { selection, renderer, cxid }
    }

    /// Full table markup, or `""` when no tag survives the filter.
    /// `with_body` wraps the rows in `<table><tbody>`; the header row is always present.
    pub fn render(&self, tags: &Tags, filter: TagFilter, with_body: bool) -> String {
        let rows = self.rows(tags, filter);
        if rows.is_empty() {
            return String::new();
        }
        let mut html = String::new();
        if with_body {
            html.push_str(TABLE_OPEN);
        }
        html.push_str(TABLE_HEADER);
        html.push_str(&self.renderer.render_html(rows, 0));
        if with_body {
            html.push_str(TABLE_CLOSE);
        }
        html
    }

    /// Unsorted `[tag, value]` cell rows
    pub fn rows(&self, tags: &Tags, filter: TagFilter) -> Vec<Vec<TableCell>> {
        let sel = self.selection;
        let mut table = Vec::new();
        for (tag, vals) in tags {
            if filter == TagFilter::Useful && !sel.is_useful(tag) {
                continue;
            }
            let vals: Vec<String> = match sel.concat.get(tag) {
                Some(sep) => vec![vals.join(sep)],
                None => vals.clone(),
            };

            let mut rows: Vec<[TableCell; 2]> = vals
                .iter()
                .map(|val| {
                    let mut tag_cell = TableCell::new(tag.as_str());
                    let mut val_cell = TableCell::new(val.as_str()).class(TAG_VALUE_CLASS);
                    let rule_sets = [
                        (RuleSlot::Class, sel.class.get(tag)),
                        (RuleSlot::Style, sel.style.get(tag)),
                    ];
                    for (slot, rules) in rule_sets {
                        for rule in rules.into_iter().flatten() {
                            apply_rule(rule, slot, val, &mut tag_cell, &mut val_cell);
                        }
                    }
                    [tag_cell, val_cell]
                })
                .collect();

            if let Some(url_rules) = sel.urls.get(tag) {
                for [_, val_cell] in rows.iter_mut() {
                    let val = val_cell.text.clone();
                    let mut done: HashSet<String> = HashSet::new();
                    let mut urlified: Vec<String> = Vec::new();
                    for rule in url_rules.iter().filter(|r| r.applies_to(&val)) {
                        let url = rule.url.replacen(TAG_VALUE_TOKEN, &val, 1);
                        if !done.insert(url.clone()) {
                            continue;
                        }
                        let name = rule.name.as_deref().unwrap_or(&val);
                        urlified.push(self.link(&url, name));
                    }
                    if !urlified.is_empty() {
                        val_cell.text = urlified.join(", ");
                    }
                }
            }

            table.extend(rows.into_iter().map(Vec::from));
        }
        table
    }

    fn link(&self, url: &str, name: &str) -> String {
        if url.starts_with(COMMAND_URL_PREFIX) {
            match TipCommand::from_url_template(self.cxid, url) {
                Some(cmd) => return cmd.span(name),
                None => console_warn!("[TagTable] Command template without objid: {}", url),
            }
        }
        format!("<a target='_blank' href='{}'>{}</a>", url, name)
    }
}

fn apply_rule(
    rule: &StyleRule,
    slot: RuleSlot,
    val: &str,
    tag_cell: &mut TableCell,
    val_cell: &mut TableCell,
) {
    if !rule.applies_to(val) {
        return;
    }
    let fragment = unxss(&rule.value.replacen(TAG_VALUE_TOKEN, val, 1));
    let field = match slot {
        RuleSlot::Class => &mut val_cell.class,
        RuleSlot::Style => &mut val_cell.style,
    };
    *field = Some(match field.take() {
        Some(prev) if !prev.is_empty() => format!("{} {}", prev, fragment),
        _ => fragment,
    });
    if rule.tag_too {
        match slot {
            RuleSlot::Class => tag_cell.class = val_cell.class.clone(),
            RuleSlot::Style => tag_cell.style = val_cell.style.clone(),
        }
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::items::ItemBase;
    use crate::model::support::SupportStore;
    use crate::render::linker::TextLinker;
    use crate::tags::resolver::TagResolver;
    use serde_json::json;

    fn render(item: serde_json::Value, filter: TagFilter) -> String {
        let base: ItemBase = serde_json::from_value(item).unwrap();
        let store = SupportStore::new();
        let sel = TagResolver::new(&store).resolve(&base, None);
        let linker = TextLinker::new();
        let renderer = TableRenderer::new(&linker);
        TagTable::new(&sel, &renderer, "cx").render(&base.tags, filter, true)
    }

    #[test]
    fn test_no_tags_renders_nothing() {
        assert_eq!(render(json!({}), TagFilter::All), "");
    }

    #[test]
    fn test_basic_table() {
        let html = render(json!({ "tags": { "Gene": ["BRCA2"] } }), TagFilter::All);
        assert!(html.starts_with(TABLE_OPEN));
        assert!(html.contains(TABLE_HEADER));
        assert!(html.contains("<td>Gene</td><td class='tagval'>BRCA2</td>"));
        assert!(html.ends_with(TABLE_CLOSE));
    }

    #[test]
    fn test_useful_filter() {
        let item = json!({ "tags": {
            "Useful Tag": ["Gene"],
            "Gene": ["BRCA2"],
            "Noise": ["x"]
        }});
        let html = render(item.clone(), TagFilter::Useful);
        assert!(html.contains("BRCA2"));
        assert!(!html.contains("Noise"));
        assert!(render(item, TagFilter::All).contains("Noise"));
    }

    #[test]
    fn test_concat_joins_values() {
        let html = render(
            json!({ "tags": { "Concatenate Tag": ["\"; \" Gene"], "Gene": ["A", "B"] } }),
            TagFilter::All,
        );
        assert!(html.contains(">A; B</td>"));
    }

    #[test]
    fn test_style_keep_and_tagtoo() {
        let html = render(
            json!({ "tags": {
                "Style Tag": ["tag=\"Sig\" value=\"color: red\" keep=\"^Path\" tagtoo=\"1\""],
                "Sig": ["Pathogenic", "Benign"]
            }}),
            TagFilter::All,
        );
        assert!(html.contains("<td style='color: red' class='tagval'>Pathogenic</td>"));
        assert!(html.contains("<td class='tagval'>Benign</td>"));
        // The tag cell takes the style only on the matching row
        assert!(html.contains("<td style='color: red'>Sig</td>"));
    }

    #[test]
    fn test_class_rule_is_sanitized() {
        let html = render(
            json!({ "tags": {
                "Class Tag": ["tag=\"Impact\" imp-TAGVAL"],
                "Impact": ["<b>"]
            }}),
            TagFilter::All,
        );
        assert!(html.contains("class='tagval imp-b'"));
    }

    #[test]
    fn test_url_rules_and_commands() {
        let html = render(
            json!({ "tags": {
                "URL Tag": [
                    "tag=\"Gene\" url=\"http://g/TAGVAL\" name=\"GeneDB\"",
                    "tag=\"Gene\" url=\"http://g/TAGVAL\" name=\"Dup\""
                ],
                "Gene": ["BRCA2"],
                "Category": ["C1"]
            }}),
            TagFilter::All,
        );
        assert!(html.contains("<a target='_blank' href='http://g/BRCA2'>GeneDB</a>"));
        assert!(!html.contains(">Dup</a>"));
        assert!(html.contains(
            "<span class='faux moreinfo' data-ml-cxid='cx' data-ml-objid='C1' data-ml-objtype='Cat'>C1</span>"
        ));
    }
}
