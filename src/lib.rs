//! MapLoc Tips: tooltip and popup rendering for genome map widgets
//!
//! Turns the records plotted by the host charting widget (variants, alignments,
//! features, CRISPR reads, information tracks) into HTML fragments shown on
//! hover and click.
//!
//! # Architecture
//! - `model/` - Plotted objects, typed data items, supporting records
//! - `tags/` - `key="value"` meta parsing, tag policy resolution, tag tables
//! - `render/` - Table renderer, link/class rewriting, formatting helpers, commands
//! - `miners/` - Miner registry plus the standard, CRISPR and info miners
//! - `tooltip/` - Composer: classification, brief mode, popups, host display
//! - `wasm.rs` - JavaScript bindings
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { MapLocTips } from 'maploc-tips';
//!
//! await init();
//! const tips = new MapLocTips({ briefLen: 4 }, {
//!   target: 'canvasId',
//!   showInfoSpan: (evt, html) => cx.showInfoSpan(evt, html),
//!   showTooltipDiv: (evt, html) => cx.showTooltipDiv(evt, html),
//!   getNewCanvasContext: (id) => cx.getNewCanvasContext(id),
//! });
//! tips.loadSupportData(MLsupportData);
//! tips.mouseOver(obj, evt, cx.graphType);
//! ```

#[macro_use]
mod log;

pub mod config;
pub mod de;
pub mod error;
pub mod miners;
pub mod model;
pub mod render;
pub mod tags;
pub mod tooltip;
pub mod wasm;

pub use config::*;
pub use error::*;
pub use miners::*;
pub use model::*;
pub use render::*;
pub use tags::*;
pub use tooltip::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("maploc-tips v{}", env!("CARGO_PKG_VERSION"))
}
