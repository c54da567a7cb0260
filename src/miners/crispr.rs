//! CRISPR read-cluster miner and the per-sample chart gallery

use serde::{Deserialize, Serialize};

use crate::error::TipError;
use crate::miners::{EventKind, MinerOutput, MinerRegistry};
use crate::model::items::CrisprItem;
use crate::render::linker::TextLinker;
use crate::tooltip::context::TipContext;

const SEQUENCE_TYPE_TAG: &str = "Sequence Type";
const LENGTH_TAG: &str = "Len";
const READ_DEPTH_TAG: &str = "Read Depth";
const READ_PERCENT_TAG: &str = "Percent of Reads";
const SAMPLE_TAG: &str = "Sample";

pub fn register(registry: &mut MinerRegistry, _linker: &mut TextLinker) -> Result<(), TipError> {
    registry.register(EventKind::MouseOver, "crispr", crispr);
    Ok(())
}

fn crispr(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let item = ctx.item(d)?;
    let Some(c) = item.as_crispr() else {
        return MinerOutput::html(ctx.generic_pop_text(d));
    };
    MinerOutput::html(crispr_text(ctx, c))
}

/// Tag values as one string, comma-joined
fn tag_text(c: &CrisprItem, tag: &str) -> String {
    c.base.tags.get(tag).map(|v| v.join(",")).unwrap_or_default()
}

fn crispr_text(ctx: &TipContext, c: &CrisprItem) -> String {
    let mut text = vec![format!(
        "<span class='pophead'>{}</span>",
        c.base.name.as_deref().unwrap_or("")
    )];

    let seq_type = tag_text(c, SEQUENCE_TYPE_TAG);
    let len_text = tag_text(c, LENGTH_TAG);
    let mut_len = len_text.trim().parse::<f64>().unwrap_or(0.0) as i64;
    if !seq_type.is_empty() {
        let mut class = format!(
            "<b>Class:</b> <span class='csp{}'>&nbsp;{}&nbsp;</span>",
            seq_type, seq_type
        );
        if mut_len != 0 {
            class.push_str(&format!(" {}bp", len_text));
        }
        text.push(class);
    }

    let depth = tag_text(c, READ_DEPTH_TAG);
    if !depth.is_empty() {
        let mut line = format!("<b>Read Depth:</b> {}", depth);
        let percent = tag_text(c, READ_PERCENT_TAG);
        if !percent.is_empty() {
            line.push_str(&format!(" = <span class='perc'>{}%</span>", percent));
        }
        text.push(line);
    }

    let sample = tag_text(c, SAMPLE_TAG);
    if !sample.is_empty() {
        text.push(format!(
            "<b>Sample:</b> {}",
            ctx.command_span(&sample, Some(SAMPLE_TAG), &sample)
        ));
    }

    if let Some(block) = c.aln_blk.as_deref().filter(|b| !b.is_empty()) {
        if block.contains('*') {
            text.push("<span class='stop'>Stop Codon Present</span>".to_string());
        }
        if mut_len % 3 != 0 {
            text.push("<span class='shift'>Frame Shift</span>".to_string());
        } else if mut_len != 0 {
            text.push("<span class='frame'>Frame Preserved</span>".to_string());
        }
        text.push(format!("<b>Sequence:</b><pre class='aln'>{}</pre>", block));
    }
    text.join(ctx.sep())
}

// =============================================================================
// Chart Gallery
// =============================================================================

/// Which plot set the pipeline produced for each sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartSet {
    /// coverage, insertions, deletions, length
    #[default]
    Coverage,
    /// insertions, deletions, length, secondary length
    Length,
}

impl ChartSet {
    fn plots(&self) -> [&'static str; 4] {
        match self {
            ChartSet::Coverage => ["cov", "ins", "del", "len"],
            ChartSet::Length => ["ins", "del", "len", "len2"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartOptions {
    /// Directory holding the rendered plot images
    pub assets_dir: String,
    pub charts: ChartSet,
    /// `.tif` instead of `.png`
    pub high_res: bool,
    /// Append the HDR SNP plot
    pub hdr_snp: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            assets_dir: "Assets".to_string(),
            charts: ChartSet::Coverage,
            high_res: false,
            hdr_snp: false,
        }
    }
}

/// Image table for one sample's plots of a CRISPR target; `""` without a sample
pub fn chart_gallery(sample: &str, crispr_name: &str, opts: &ChartOptions) -> String {
    if sample.is_empty() {
        return String::new();
    }
    let ext = if opts.high_res { ".tif" } else { ".png" };
    let img = |plot: &str| {
        format!(
            "<img src={}/{}.{}.{}{}>",
            opts.assets_dir, sample, crispr_name, plot, ext
        )
    };

    let mut html = String::from("<table border=0>");
    for pair in opts.charts.plots().chunks(2) {
        html.push_str("<tr>");
        for plot in pair {
            html.push_str(&format!("<td>{}</td>", img(plot)));
        }
        html.push_str("</tr>");
    }
    html.push_str(&format!("<tr><td colspan=2>{}</td></tr>", img("snp")));
    if opts.hdr_snp {
        html.push_str(&format!(
            "<tr><td colspan=2 align=center>{}</td></tr>",
            img("hdr.snp")
        ));
    }
    html.push_str("</table>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TipConfig;
    use crate::model::items::PlottedObject;
    use crate::tooltip::TipComposer;
    use serde_json::json;

    fn render(item: serde_json::Value) -> String {
        let composer = TipComposer::new(TipConfig::default(), "cx").unwrap();
        let obj = PlottedObject::from_value(json!({
            "name": "crispr",
            "honorType": true,
            "data": [item]
        }))
        .unwrap();
        let ctx = composer.context(&obj, EventKind::MouseOver);
        match crispr(&ctx, 0) {
            Some(MinerOutput::Html(html)) => html,
            other => panic!("unexpected miner output: {:?}", other),
        }
    }

    #[test]
    fn test_frame_shift_with_stop() {
        let html = render(json!({
            "name": "cluster7",
            "alnBlk": "ACG*TT",
            "tags": {
                "Sequence Type": "Del",
                "Len": "4",
                "Read Depth": "120",
                "Percent of Reads": "12.5",
                "Sample": "S01"
            }
        }));
        assert!(html.starts_with("<span class='pophead'>cluster7</span>"));
        assert!(html.contains("<span class='cspDel'>&nbsp;Del&nbsp;</span> 4bp"));
        assert!(html.contains("<b>Read Depth:</b> 120 = <span class='perc'>12.5%</span>"));
        assert!(html.contains("data-ml-objid='S01' data-ml-objtype='Sample'"));
        assert!(html.contains("Stop Codon Present"));
        assert!(html.contains("Frame Shift"));
        assert!(html.ends_with("<b>Sequence:</b><pre class='aln'>ACG*TT</pre>"));
    }

    #[test]
    fn test_frame_preserved_without_block_flags() {
        let html = render(json!({
            "name": "c2",
            "alnBlk": "ACGTTT",
            "tags": { "Sequence Type": "Ins", "Len": "3" }
        }));
        assert!(html.contains("Frame Preserved"));
        assert!(!html.contains("Stop Codon"));

        let bare = render(json!({ "name": "c3", "tags": { "Len": "3" } }));
        assert!(!bare.contains("Frame"));
        assert!(!bare.contains("Class:"));
    }

    #[test]
    fn test_chart_gallery_layouts() {
        assert_eq!(chart_gallery("", "gRNA1", &ChartOptions::default()), "");

        let html = chart_gallery("S01", "gRNA1", &ChartOptions::default());
        assert!(html.starts_with(
            "<table border=0><tr><td><img src=Assets/S01.gRNA1.cov.png></td>\
             <td><img src=Assets/S01.gRNA1.ins.png></td></tr>"
        ));
        assert!(html.contains("<tr><td colspan=2><img src=Assets/S01.gRNA1.snp.png></td></tr>"));
        assert!(!html.contains("hdr.snp"));
        assert!(html.ends_with("</table>"));

        let opts = ChartOptions {
            assets_dir: "assets".into(),
            charts: ChartSet::Length,
            high_res: true,
            hdr_snp: true,
        };
        let html = chart_gallery("S02", "g2", &opts);
        assert!(html.contains("<img src=assets/S02.g2.len2.tif>"));
        assert!(html.contains("<td colspan=2 align=center><img src=assets/S02.g2.hdr.snp.tif></td>"));
        assert!(!html.contains(".cov."));
    }
}
