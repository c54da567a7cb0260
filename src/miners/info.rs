//! Information track miners: free-text info, or a count row per position

use crate::de;
use crate::error::TipError;
use crate::miners::{EventKind, MinerOutput, MinerRegistry};
use crate::render::format::frac_to_gray;
use crate::render::linker::TextLinker;
use crate::render::table::TableCell;
use crate::tooltip::context::TipContext;

/// Count total that renders as a fully dark position cell
const SATURATING_TOTAL: f64 = 20.0;

pub fn register(registry: &mut MinerRegistry, _linker: &mut TextLinker) -> Result<(), TipError> {
    let ev = EventKind::MouseOver;
    registry.register(ev, "information", information);
    registry.register(ev, "informationBrief", information_brief);
    registry.register_header(ev, "informationBrief", information_header);
    Ok(())
}

fn information(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let info = ctx.item(d)?.as_info()?;
    MinerOutput::html(info.info.clone().unwrap_or_default())
}

fn information_brief(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let info = ctx.item(d)?.as_info()?;
    let counts = if info.counts.is_empty() {
        &info.base.data
    } else {
        &info.counts
    };

    let mut total = 0.0;
    let mut cells = Vec::with_capacity(counts.len());
    for (c, raw) in counts.iter().enumerate() {
        let num = de::value_f64(raw).unwrap_or(0.0);
        total += num;
        let mut cell = TableCell::new(de::value_text(raw).unwrap_or_default()).class("cen bold");
        if let Some(fill) = ctx.obj.fill.get(c).filter(|_| num != 0.0) {
            cell = cell.style(format!("background-color:{}", fill));
        }
        cells.push(cell);
    }
    let mut row = vec![TableCell::new(info.show.clone().unwrap_or_default())
        .style(frac_to_gray(total / SATURATING_TOTAL))];
    row.extend(cells);
    if !ctx.obj.window {
        let token = info.imp_token.as_deref().unwrap_or("");
        row.push(TableCell::new(token).class(format!("Imp{}", token)));
    }
    Some(MinerOutput::Row(row))
}

fn information_header(ctx: &TipContext) -> Vec<String> {
    let mut head = vec!["Pos".to_string()];
    head.extend(ctx.obj.names.iter().cloned());
    if !ctx.obj.window {
        head.push("Impact".to_string());
    }
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TipConfig;
    use crate::model::items::PlottedObject;
    use crate::tooltip::TipComposer;
    use serde_json::json;

    fn object(window: bool) -> PlottedObject {
        PlottedObject::from_value(json!({
            "name": "information",
            "honorType": true,
            "window": window,
            "names": ["A", "B"],
            "fill": ["#f00", "#0f0"],
            "data": [
                { "info": "<b>hello</b>", "show": "1,204", "counts": [10, 0], "impToken": "NON" },
                { "show": "1,205", "data": [3, 7] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_information_text() {
        let composer = TipComposer::new(TipConfig::default(), "cx").unwrap();
        let obj = object(false);
        let ctx = composer.context(&obj, EventKind::MouseOver);
        assert_eq!(information(&ctx, 0), Some(MinerOutput::Html("<b>hello</b>".into())));
        assert_eq!(information(&ctx, 1), None);
    }

    #[test]
    fn test_brief_row_cells() {
        let composer = TipComposer::new(TipConfig::default(), "cx").unwrap();
        let obj = object(false);
        let ctx = composer.context(&obj, EventKind::MouseOver);

        let Some(MinerOutput::Row(row)) = information_brief(&ctx, 0) else {
            panic!("expected a row");
        };
        assert_eq!(row.len(), 4);
        assert_eq!(row[0].style, Some(frac_to_gray(0.5)));
        assert_eq!(row[1].style.as_deref(), Some("background-color:#f00"));
        assert_eq!(row[2].text, "0");
        assert!(row[2].style.is_none());
        assert_eq!(row[3].class.as_deref(), Some("ImpNON"));

        // Falls back to `data` for counts
        let Some(MinerOutput::Row(row)) = information_brief(&ctx, 1) else {
            panic!("expected a row");
        };
        assert_eq!(row[1].text, "3");
        assert_eq!(row[0].style, Some(frac_to_gray(0.5)));
    }

    #[test]
    fn test_window_drops_impact() {
        let composer = TipComposer::new(TipConfig::default(), "cx").unwrap();
        let obj = object(true);
        let ctx = composer.context(&obj, EventKind::MouseOver);
        assert_eq!(information_header(&ctx), vec!["Pos", "A", "B"]);
        let Some(MinerOutput::Row(row)) = information_brief(&ctx, 0) else {
            panic!("expected a row");
        };
        assert_eq!(row.len(), 3);
    }
}
