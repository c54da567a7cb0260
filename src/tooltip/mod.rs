//! Tooltip Composer
//!
//! Entry point for host events. A hovered or clicked location arrives as a
//! plotted object; the composer classifies its track, picks miners (brief
//! variants when the location is crowded), joins their output and hands the
//! HTML to the host. Clicks on rendered `data-ml-*` elements come back as
//! `TipCommand`s and open a popup for the referenced supporting record.
//!
//! # Flow
//! 1. `event_to_object` - normalize the host payload per graph type
//! 2. `classify` - track type from `trackType`/`name`
//! 3. `render_tooltip` - run miners, build HTML, collect deferred plots
//! 4. `show` - display through the host, then draw the plots

pub mod context;


pub use context::*;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::Cell;
use std::sync::LazyLock;

use crate::config::TipConfig;
use crate::de;
use crate::error::TipError;
use crate::miners::{EventKind, MinerOutput, MinerRegistry};
use crate::model::items::{PlottedObject, TrackKind};
use crate::model::support::{Category, RecordKey, SupportStore};
use crate::render::command::TipCommand;
use crate::render::gravity::GravityPlot;
use crate::render::linker::TextLinker;
use crate::render::table::TableCell;

const BREAK_DIV: &str = "<div class='break'>&nbsp;</div>";
const BRIEF_SUFFIX: &str = "Brief";
const CATCH_ALL: &str = "all";
const DEFAULT_POPUP_TYPE: &str = "Pop";
const CANVAS_PREFIX: &str = "MlIntCanvas";

static TRACK_PATTERNS: LazyLock<Vec<(Regex, TrackKind)>> = LazyLock::new(|| {
    [
        ("polymorph|snp|vari", TrackKind::Polymorphism),
        ("align|rna|probe|oligo|exon", TrackKind::Alignment),
        ("feature|motif", TrackKind::Feature),
    ]
    .into_iter()
    .map(|(p, kind)| (Regex::new(p).expect("track pattern"), kind))
    .collect()
});

// =============================================================================
// Host Interface
// =============================================================================

/// Chart layout the host reports with each event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphType {
    Network,
    Genome,
    Other,
}

impl GraphType {
    pub fn parse(s: &str) -> Self {
        match s {
            "Network" => GraphType::Network,
            "Genome" => GraphType::Genome,
            _ => GraphType::Other,
        }
    }
}

/// Display primitives of the host widget
pub trait TooltipHost {
    /// Transient hover display
    fn show_info_span(&self, html: &str);
    /// Persistent click display
    fn show_tooltip_div(&self, html: &str);
    /// Draw a deferred plot into its canvas, which is on the page by now
    fn draw_plot(&self, plot: &GravityPlot);
}

/// Output of one render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TipRender {
    pub html: String,
    pub plots: Vec<GravityPlot>,
}

/// Normalize a host payload into a plotted object. Network graphs wrap their
/// `nodes` as a track named after the first node's type; genome tracks report
/// a list whose first element is the track. Other graph types are ignored, as
/// are objects without `data`.
pub fn event_to_object(raw: &Value, graph: GraphType) -> Option<PlottedObject> {
    if !raw.is_object() && !raw.is_array() {
        return None;
    }
    let obj = match graph {
        GraphType::Network => match raw.get("nodes").filter(|n| de::value_truthy(n)) {
            Some(nodes) => {
                let name = nodes
                    .get(0)
                    .and_then(|n| n.get("type"))
                    .and_then(de::value_text)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string());
                json!({ "data": nodes, "name": name })
            }
            None => raw.clone(),
        },
        GraphType::Genome => raw.get(0)?.clone(),
        GraphType::Other => return None,
    };
    if !obj.get("data").is_some_and(de::value_truthy) {
        return None;
    }
    match PlottedObject::from_value(obj) {
        Ok(obj) => Some(obj),
        Err(e) => {
            console_warn!("[TipComposer] Ignoring unreadable plotted object: {}", e);
            None
        }
    }
}

/// Semantic track type from `trackType` (or `name`)
pub fn classify(obj: &PlottedObject) -> TrackKind {
    let name = obj
        .track_type
        .as_deref()
        .or(obj.name.as_deref())
        .unwrap_or("")
        .to_lowercase();
    for (re, kind) in TRACK_PATTERNS.iter() {
        if re.is_match(&name) {
            return kind.clone();
        }
    }
    if obj.honor_type && !name.is_empty() {
        TrackKind::Named(name)
    } else {
        TrackKind::Unknown
    }
}

// =============================================================================
// Composer
// =============================================================================

pub struct TipComposer {
    config: TipConfig,
    cxid: String,
    store: SupportStore,
    linker: TextLinker,
    miners: MinerRegistry,
    canvas_counter: Cell<u64>,
}

impl TipComposer {
    /// Composer for host widget `cxid` with the bundled miners and linkers
    pub fn new(config: TipConfig, cxid: &str) -> Result<Self, TipError> {
        let mut linker = TextLinker::new();
        let miners = MinerRegistry::with_bundled(&mut linker)?;
        Ok(Self::with_registries(config, cxid, miners, linker))
    }

    pub fn with_registries(
        config: TipConfig,
        cxid: &str,
        miners: MinerRegistry,
        linker: TextLinker,
    ) -> Self {
        Self {
            config,
            cxid: cxid.to_string(),
            store: SupportStore::new(),
            linker,
            miners,
            canvas_counter: Cell::new(0),
        }
    }

    pub fn config(&self) -> &TipConfig {
        &self.config
    }

    pub fn cxid(&self) -> &str {
        &self.cxid
    }

    pub fn store(&self) -> &SupportStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SupportStore {
        &mut self.store
    }

    pub fn linker(&self) -> &TextLinker {
        &self.linker
    }

    pub fn linker_mut(&mut self) -> &mut TextLinker {
        &mut self.linker
    }

    pub fn miners(&self) -> &MinerRegistry {
        &self.miners
    }

    pub fn miners_mut(&mut self) -> &mut MinerRegistry {
        &mut self.miners
    }

    pub fn context<'a>(&'a self, obj: &'a PlottedObject, event: EventKind) -> TipContext<'a> {
        TipContext::new(self, obj, event)
    }

    pub(crate) fn next_canvas_id(&self) -> String {
        let n = self.canvas_counter.get() + 1;
        self.canvas_counter.set(n);
        format!("{}{}", CANVAS_PREFIX, n)
    }

    /// Build the tooltip for `obj`
    pub fn render_tooltip(&self, obj: &PlottedObject, event: EventKind) -> TipRender {
        let ctx = self.context(obj, event);
        let html = self.compose(&ctx);
        TipRender { html, plots: ctx.take_plots() }
    }

    fn compose(&self, ctx: &TipContext) -> String {
        // Fall back to hover miners
        let event = if self.miners.has_event(ctx.event) {
            ctx.event
        } else {
            EventKind::MouseOver
        };
        if !self.miners.has_event(event) {
            return self.default_tip(ctx);
        }

        let count = ctx.len();
        let brief_len = self.config.brief_len_for(ctx.obj.brief_len);
        let mut text: Vec<String> = Vec::new();
        let mut suffix = "";
        if count >= brief_len {
            if brief_len != 1 {
                text.push(format!(
                    "<i>{} features at this location, zoom in for more details</i>",
                    count
                ));
            }
            suffix = BRIEF_SUFFIX;
        }

        for base in [ctx.kind.as_str(), CATCH_ALL] {
            let name = format!("{}{}", base, suffix);
            let miners = self.miners.lookup(event, &name);
            if miners.is_empty() {
                continue;
            }
            let header = self.miners.header(event, &name).map(|h| h(ctx));
            let mut rows: Vec<Vec<TableCell>> = Vec::new();

            for d in 0..count {
                let outputs = miners.iter().filter_map(|miner| miner(ctx, d));
                if header.is_some() {
                    rows.extend(outputs.map(|out| match out {
                        MinerOutput::Row(row) => row,
                        MinerOutput::Html(html) => vec![TableCell::new(html)],
                    }));
                    continue;
                }
                let parts: Vec<String> = outputs
                    .map(|out| match out {
                        MinerOutput::Html(html) => html,
                        MinerOutput::Row(row) => table_html(None, &ctx.slim_table(vec![row], 0)),
                    })
                    .collect();
                let mut sub = parts.join(ctx.sep());
                if sub.is_empty() {
                    sub = ctx.basic_id(d);
                }
                if d > 0 {
                    sub.insert_str(0, BREAK_DIV);
                }
                text.push(sub);
            }

            if let Some(head) = header {
                text.push(table_html(Some(head.as_slice()), &ctx.slim_table(rows, 0)));
            }
        }

        if text.is_empty() {
            return self.default_tip(ctx);
        }
        if count == 1 {
            if let Some(caption) = ctx.item(0).and_then(|i| i.base().caption.as_ref()) {
                text.insert(0, format!("<span class='caption'>{}</span>", caption));
            }
        }
        let html = text.join(ctx.sep());
        if html.is_empty() {
            "?".to_string()
        } else {
            html
        }
    }

    /// Basic ids of every item, or `"N name"` when none have one
    fn default_tip(&self, ctx: &TipContext) -> String {
        let ids: Vec<String> = (0..ctx.len())
            .map(|d| ctx.basic_id(d))
            .filter(|s| !s.is_empty())
            .collect();
        if ids.is_empty() {
            format!("{} {}", ctx.len(), ctx.obj.name.as_deref().unwrap_or(""))
        } else {
            ids.join("<br />")
        }
    }

    /// Render and display: hover goes to the info span, click to the tooltip div
    pub fn show(&self, obj: &PlottedObject, event: EventKind, host: &dyn TooltipHost) -> String {
        let render = self.render_tooltip(obj, event);
        display(host, event, &render.html);
        for plot in &render.plots {
            host.draw_plot(plot);
        }
        render.html
    }

    /// Popup report for a supporting record
    pub fn popup_html(&self, command: &TipCommand) -> String {
        let objtype = command.objtype.as_deref().unwrap_or(DEFAULT_POPUP_TYPE);
        let category = Category::parse(objtype);
        let record = self.store.record_or_default(&category, &command.objid);
        let name = record
            .name
            .as_deref()
            .or(record.text.as_deref())
            .unwrap_or("Object Report");

        let mut html = format!("<h3>{}</h3>", name);
        if let Some(parent) = &record.parent {
            let crumb = TipCommand::new(&self.cxid, parent, Some(objtype));
            html.push_str(&format!("<b>Parent:</b>{}<br />", crumb.span(parent)));
            if let Some(root) = record.root.as_ref().filter(|r| *r != parent) {
                let crumb = TipCommand::new(&self.cxid, root, Some(objtype));
                html.push_str(&format!("<b>Root:</b>{}<br />", crumb.span(root)));
            }
        }

        let obj = PlottedObject::default();
        let ctx = self.context(&obj, EventKind::Click);
        html.push_str(&ctx.record_tag_table(&record, RecordKey::new(category, &command.objid)));
        html.push_str(&format!("<i>DB ID = {}</i>", command.objid));
        html
    }

    /// Display the popup for a command raised by a rendered element
    pub fn popup(&self, command: &TipCommand, event: EventKind, host: &dyn TooltipHost) -> String {
        let html = self.popup_html(command);
        display(host, event, &html);
        html
    }
}

fn display(host: &dyn TooltipHost, event: EventKind, html: &str) {
    match event {
        EventKind::MouseOver => host.show_info_span(html),
        EventKind::Click => host.show_tooltip_div(html),
    }
}

fn table_html(header: Option<&[String]>, rows: &str) -> String {
    let head = header
        .map(|h| format!("<tr><th>{}</th></tr>", h.join("</th><th>")))
        .unwrap_or_default();
    format!(
        "<table style='font-size:1.0em' class='tab'><tbody>{}{}</tbody></table>",
        head, rows
    )
}
