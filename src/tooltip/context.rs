//! Per-render context handed to every miner
//!
//! Holds the plotted object, its decoded items and shared access to the
//! composer's store, linker and configuration, plus the formatting helpers
//! the miners have in common.

use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::TipConfig;
use crate::de;
use crate::miners::EventKind;
use crate::model::items::{DataItem, Link, PlottedObject, TrackKind, VariantItem};
use crate::model::support::{Category, FreqTable, RecordKey, SupportStore, SupportingRecord, Tagged};
use crate::render::command::TipCommand;
use crate::render::gravity::GravityPlot;
use crate::render::linker::TextLinker;
use crate::render::table::{TableCell, TableRenderer};
use crate::tags::resolver::TagResolver;
use crate::tags::table::{TagFilter, TagTable};
use crate::tooltip::TipComposer;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(#[A-F0-9]+)").expect("hex color pattern"));

const SNP_REPORT_URL: &str = "http://www.ncbi.nlm.nih.gov/projects/SNP/snp_ref.cgi?rs=";

pub struct TipContext<'a> {
    composer: &'a TipComposer,
    pub obj: &'a PlottedObject,
    pub kind: TrackKind,
    pub event: EventKind,
    pub items: Vec<DataItem>,
    plots: RefCell<Vec<GravityPlot>>,
}

impl<'a> TipContext<'a> {
    pub(crate) fn new(composer: &'a TipComposer, obj: &'a PlottedObject, event: EventKind) -> Self {
        let kind = super::classify(obj);
        let items = obj.data.iter().map(|raw| DataItem::from_value(&kind, raw)).collect();
        Self {
            composer,
            obj,
            kind,
            event,
            items,
            plots: RefCell::new(Vec::new()),
        }
    }

    pub fn item(&self, d: usize) -> Option<&DataItem> {
        self.items.get(d)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn config(&self) -> &TipConfig {
        self.composer.config()
    }

    pub fn store(&self) -> &SupportStore {
        self.composer.store()
    }

    pub fn linker(&self) -> &TextLinker {
        self.composer.linker()
    }

    pub fn cxid(&self) -> &str {
        self.composer.cxid()
    }

    /// Fragment separator
    pub fn sep(&self) -> &str {
        &self.config().separator
    }

    pub fn record(&self, category: Category, id: &str) -> Option<SupportingRecord> {
        self.store().record(&category, id)
    }

    pub fn record_or_default(&self, category: Category, id: &str) -> SupportingRecord {
        self.store().record_or_default(&category, id)
    }

    pub fn swap_link(&self, text: &str) -> String {
        self.linker().rewrite_links(text)
    }

    /// Clickable span opening the popup for another record
    pub fn command_span(&self, objid: &str, objtype: Option<&str>, label: &str) -> String {
        TipCommand::new(self.cxid(), objid, objtype).span(label)
    }

    /// Bold id, else label, else name; all link-rewritten
    pub fn basic_id(&self, d: usize) -> String {
        let Some(item) = self.item(d) else {
            return String::new();
        };
        let base = item.base();
        if let Some(id) = &base.id {
            format!("<b>{}</b>", self.swap_link(id))
        } else if let Some(label) = base.label.as_ref().or(base.name.as_ref()) {
            self.swap_link(label)
        } else {
            String::new()
        }
    }

    /// `extra` links followed by the item's own, joined with ` | `
    pub fn hyperlinks(&self, d: usize, extra: Vec<Link>) -> String {
        let mut links = extra;
        if let Some(item) = self.item(d) {
            links.extend(item.base().links.iter().cloned());
        }
        links
            .iter()
            .enumerate()
            .map(|(i, link)| match link {
                Link::Url(url) => format!("<a target='_blank' href='{}'>Link {}</a>", url, i + 1),
                Link::Labeled { url, label } => {
                    let name = label.clone().unwrap_or_else(|| format!("Link {}", i + 1));
                    format!("<a target='_blank' href='{}'>{}</a>", url, name)
                }
                Link::Malformed(shape) => format!("<i>JS Error! {}</i>", shape),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Coordinate span plus one entry per accession, dbSNP ids linked
    pub fn var_name(&self, item: &VariantItem) -> Vec<String> {
        let mut text = vec![format!(
            "<span class='coord'>{}</span>",
            item.chrid.as_deref().unwrap_or("")
        )];
        for (acc, sources) in &item.accs {
            let name = if acc.starts_with("rs") {
                format!("<a target='_blank' href='{}{}'>{}</a>", SNP_REPORT_URL, acc, acc)
            } else {
                acc.clone()
            };
            text.push(format!("{} ({})", name, sources.join(", ")));
        }
        text
    }

    /// Id, links, size and range, note and tag table for any item
    pub fn generic_pop_text(&self, d: usize) -> String {
        let Some(item) = self.item(d) else {
            return String::new();
        };
        let base = item.base();
        let mut text = vec![self.basic_id(d)];
        let links = self.hyperlinks(d, Vec::new());
        if !links.is_empty() {
            text.push(links);
        }

        let mut pos = Vec::new();
        if let Some(len) = &base.len {
            pos.push(format!("{}bp", len));
        }
        let start = base.data.first().and_then(|r| range_end(r, 0));
        let end = base.data.last().and_then(|r| range_end(r, 1));
        if let (Some(start), Some(end)) = (start, end) {
            pos.push(format!("<b>{}-{}</b>", start, end));
        }
        if !pos.is_empty() {
            text.push(pos.join(" "));
        }
        if let Some(note) = &base.note {
            text.push(format!("<i>{}</i>", note));
        }
        let tab = self.tag_table(base);
        if !tab.is_empty() {
            text.push(tab);
        }
        text.join(self.sep())
    }

    /// Every tag of `obj`, in its own table
    pub fn tag_table(&self, obj: &dyn Tagged) -> String {
        self.render_tags(obj, None, TagFilter::All)
    }

    /// Only the tags marked useful somewhere up the inheritance chain
    pub fn selected_tag_table(&self, obj: &dyn Tagged) -> String {
        self.render_tags(obj, None, TagFilter::Useful)
    }

    /// Tag table for a supporting record, which must not be revisited
    pub fn record_tag_table(&self, record: &SupportingRecord, key: RecordKey) -> String {
        self.render_tags(record, Some(key), TagFilter::All)
    }

    fn render_tags(&self, obj: &dyn Tagged, origin: Option<RecordKey>, filter: TagFilter) -> String {
        if obj.tags().is_empty() {
            return String::new();
        }
        let selection = TagResolver::new(self.store()).resolve(obj, origin);
        let renderer = TableRenderer::new(self.linker());
        TagTable::new(&selection, &renderer, self.cxid()).render(obj.tags(), filter, true)
    }

    /// Sorted, span-merged `<tr>` rows
    pub fn slim_table(&self, rows: Vec<Vec<TableCell>>, first_col: usize) -> String {
        TableRenderer::new(self.linker()).render_html(rows, first_col)
    }

    /// Canvas placeholder; the plot is drawn once the markup is on the page
    pub fn gravity_plot(
        &self,
        freqs: &FreqTable,
        alleles: &[String],
        revcom: &BTreeMap<String, String>,
    ) -> String {
        let id = self.composer.next_canvas_id();
        let plot = GravityPlot::layout(&id, self.config().plot_width, freqs, alleles, revcom, |pid| {
            self.record(Category::Pop, pid).and_then(|p| p.color_tag)
        });
        let html = plot.canvas_html();
        self.plots.borrow_mut().push(plot);
        html
    }

    /// Hex color named by a `Color` record, or `""`
    pub fn text_color(&self, text: &str) -> String {
        self.store()
            .color(text)
            .and_then(|style| HEX_COLOR_RE.captures(&style).map(|c| c[1].to_string()))
            .unwrap_or_default()
    }

    /// Deferred plots queued while rendering
    pub fn take_plots(&self) -> Vec<GravityPlot> {
        self.plots.take()
    }
}

fn range_end(range: &serde_json::Value, idx: usize) -> Option<String> {
    range.as_array()?.get(idx).and_then(de::value_text)
}
