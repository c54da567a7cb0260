//! WASM bindings
//!
//! `MapLocTips` wraps a `TipComposer` for one host widget. The host object
//! supplies the widget id (`target`) and the display callbacks:
//! `showInfoSpan(evt, html)`, `showTooltipDiv(evt, html)` and
//! `getNewCanvasContext(id)`.

use js_sys::{Function, Reflect};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Element, Event};

use crate::config::TipConfig;
use crate::miners::crispr::{chart_gallery, ChartOptions};
use crate::miners::EventKind;
use crate::render::command::{TipCommand, ATTR_OBJID};
use crate::render::format;
use crate::render::gravity::{GravityPlot, PlotSurface};
use crate::tags::meta::parse_meta;
use crate::tooltip::{event_to_object, GraphType, TipComposer, TooltipHost};

// =============================================================================
// Conversions
// =============================================================================

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Plain JS objects rather than `Map`s
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn host_method(host: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(host, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
}

// =============================================================================
// Host Adapter
// =============================================================================

/// Host callbacks bound to the DOM event being answered
struct JsHost<'a> {
    host: &'a JsValue,
    event: &'a JsValue,
}

impl JsHost<'_> {
    fn call_display(&self, method: &str, html: &str) {
        let Some(f) = host_method(self.host, method) else {
            console_warn!("[MapLocTips] Host has no {} method", method);
            return;
        };
        if let Err(e) = f.call2(self.host, self.event, &JsValue::from_str(html)) {
            console_error!("[MapLocTips] {} failed: {:?}", method, e);
        }
    }
}

impl TooltipHost for JsHost<'_> {
    fn show_info_span(&self, html: &str) {
        self.call_display("showInfoSpan", html);
    }

    fn show_tooltip_div(&self, html: &str) {
        self.call_display("showTooltipDiv", html);
    }

    fn draw_plot(&self, plot: &GravityPlot) {
        let Some(f) = host_method(self.host, "getNewCanvasContext") else {
            console_warn!("[MapLocTips] Host cannot provide canvases; plot {} skipped", plot.canvas_id);
            return;
        };
        let ctx = f
            .call1(self.host, &JsValue::from_str(&plot.canvas_id))
            .ok()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
        match ctx {
            Some(ctx) => plot.draw(&mut CanvasSurface { ctx }),
            None => console_warn!("[MapLocTips] No 2D context for canvas {}", plot.canvas_id),
        }
    }
}

struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl PlotSurface for CanvasSurface {
    fn resize(&mut self, height: f64) {
        if let Some(canvas) = self.ctx.canvas() {
            canvas.set_height(height.ceil() as u32);
        }
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn text_width(&mut self, text: &str) -> f64 {
        self.ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str) {
        self.ctx.set_fill_style_str(color);
        canvas_ok("fillText", self.ctx.fill_text(text, x, y));
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: &str) {
        self.ctx.set_stroke_style_str(color);
        self.ctx.begin_path();
        self.ctx.move_to(from.0, from.1);
        self.ctx.line_to(to.0, to.1);
        self.ctx.stroke();
    }

    fn dot(&mut self, at: (f64, f64), radius: f64, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.begin_path();
        if canvas_ok("arc", self.ctx.arc(at.0, at.1, radius, 0.0, 2.0 * PI)) {
            self.ctx.fill();
        }
    }
}

/// Warn on a failed canvas call; true when it succeeded
fn canvas_ok(op: &str, result: Result<(), JsValue>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            console_warn!("[MapLocTips] Canvas {} failed: {:?}", op, e);
            false
        }
    }
}

// =============================================================================
// MapLocTips
// =============================================================================

#[wasm_bindgen]
pub struct MapLocTips {
    composer: TipComposer,
    host: JsValue,
}

#[wasm_bindgen]
impl MapLocTips {
    /// `config` may be `undefined` for the defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, host: JsValue) -> Result<MapLocTips, JsValue> {
        let config: TipConfig = if config.is_undefined() || config.is_null() {
            TipConfig::default()
        } else {
            from_js(config, "config")?
        };
        let cxid = Reflect::get(&host, &JsValue::from_str("target"))
            .ok()
            .and_then(|t| t.as_string())
            .unwrap_or_default();
        let composer = TipComposer::new(config, &cxid)?;
        console_log!(
            "[MapLocTips] Ready for '{}' with {} miners",
            cxid,
            composer.miners().miner_count()
        );
        Ok(MapLocTips { composer, host })
    }

    /// Merge a `{ category: { id: record } }` blob; returns records loaded
    #[wasm_bindgen(js_name = loadSupportData)]
    pub fn load_support_data(&mut self, data: JsValue) -> Result<usize, JsValue> {
        let blob: Value = from_js(data, "support data")?;
        Ok(self.composer.store_mut().load(blob)?)
    }

    #[wasm_bindgen(js_name = supportCount)]
    pub fn support_count(&self) -> usize {
        self.composer.store().len()
    }

    #[wasm_bindgen(js_name = registerLinker)]
    pub fn register_linker(&mut self, pattern: &str, url: &str) -> Result<(), JsValue> {
        Ok(self.composer.linker_mut().register_linker(pattern, url)?)
    }

    #[wasm_bindgen(js_name = registerClasser)]
    pub fn register_classer(
        &mut self,
        pattern: &str,
        class: &str,
        case_insensitive: Option<bool>,
    ) -> Result<(), JsValue> {
        Ok(self
            .composer
            .linker_mut()
            .register_classer(pattern, class, case_insensitive.unwrap_or(false))?)
    }

    /// Hover: render into the info span. Returns the HTML, or `undefined`
    /// when the payload holds nothing to describe.
    #[wasm_bindgen(js_name = mouseOver)]
    pub fn mouse_over(&self, obj: JsValue, evt: JsValue, graph_type: &str) -> Result<Option<String>, JsValue> {
        self.handle(obj, &evt, graph_type, EventKind::MouseOver)
    }

    /// Click: render into the persistent tooltip div
    #[wasm_bindgen(js_name = mouseClick)]
    pub fn mouse_click(&self, obj: JsValue, evt: JsValue, graph_type: &str) -> Result<Option<String>, JsValue> {
        self.handle(obj, &evt, graph_type, EventKind::Click)
    }

    /// Open the popup for a rendered `data-ml-*` element. `source` is the
    /// element itself or a DOM event whose target sits inside one. Commands
    /// addressed to another widget are ignored.
    #[wasm_bindgen(js_name = handleCommand)]
    pub fn handle_command(&self, source: JsValue, evt: JsValue) -> Option<String> {
        let element = command_element(&source)?;
        let command = TipCommand::from_attrs(|name| element.get_attribute(name))?;
        if !command.cxid.is_empty() && command.cxid != self.composer.cxid() {
            return None;
        }
        let event = evt
            .dyn_ref::<Event>()
            .map(|e| EventKind::from_dom(&e.type_()))
            .unwrap_or(EventKind::Click);
        let host = JsHost { host: &self.host, event: &evt };
        Some(self.composer.popup(&command, event, &host))
    }

    /// Popup HTML for a record without displaying it
    #[wasm_bindgen(js_name = popupHtml)]
    pub fn popup_html(&self, objid: &str, objtype: Option<String>) -> String {
        let command = TipCommand::new(self.composer.cxid(), objid, objtype.as_deref());
        self.composer.popup_html(&command)
    }

    #[wasm_bindgen(js_name = prettyLocation)]
    pub fn pretty_location(loc: &str) -> String {
        format::pretty_location(loc)
    }

    /// `key="value"` pairs as a plain object; bare leftover text under `value`
    #[wasm_bindgen(js_name = parseMeta)]
    pub fn parse_meta(text: Option<String>) -> Result<JsValue, JsValue> {
        let meta = parse_meta(text.as_deref());
        let fields: BTreeMap<&str, &str> = meta
            .keys()
            .filter_map(|k| meta.get(k).map(|v| (k, v)))
            .collect();
        to_js(&fields)
    }

    /// Image table for a CRISPR sample; `options` may be `undefined`
    #[wasm_bindgen(js_name = chartGallery)]
    pub fn chart_gallery(sample: &str, crispr_name: &str, options: JsValue) -> Result<String, JsValue> {
        let opts: ChartOptions = if options.is_undefined() || options.is_null() {
            ChartOptions::default()
        } else {
            from_js(options, "chart options")?
        };
        Ok(chart_gallery(sample, crispr_name, &opts))
    }

    /// Effective configuration as a plain object
    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> Result<JsValue, JsValue> {
        to_js(self.composer.config())
    }
}

impl MapLocTips {
    fn handle(
        &self,
        obj: JsValue,
        evt: &JsValue,
        graph_type: &str,
        event: EventKind,
    ) -> Result<Option<String>, JsValue> {
        let raw: Value = from_js(obj, "plotted object")?;
        let Some(obj) = event_to_object(&raw, GraphType::parse(graph_type)) else {
            return Ok(None);
        };
        let host = JsHost { host: &self.host, event: evt };
        Ok(Some(self.composer.show(&obj, event, &host)))
    }
}

/// The element carrying the command attributes for `source`
fn command_element(source: &JsValue) -> Option<Element> {
    let start = match source.dyn_ref::<Event>() {
        Some(evt) => evt.target()?.dyn_into::<Element>().ok()?,
        None => source.dyn_ref::<Element>()?.clone(),
    };
    start
        .closest(&format!("[{}]", ATTR_OBJID))
        .ok()
        .flatten()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_canvas_failure_is_reported() {
        assert!(canvas_ok("arc", Ok(())));
        assert!(!canvas_ok("arc", Err(JsValue::from_str("IndexSizeError"))));
    }
}
