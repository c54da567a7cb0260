//! TableRenderer - sorted, span-merged HTML table bodies
//!
//! Miners hand over a grid of `TableCell`s. Rows are sorted, then vertically
//! adjacent cells with the same merge key collapse into one `rowspan` cell and
//! `SPAN_SENTINEL` cells extend their left neighbour with `colspan`.
//!
//! Every scanned cell is either emitted once as a `<td>` or skipped because a
//! span already covers it.

use crate::render::linker::TextLinker;

/// Cell text meaning "covered by the colspan of the cell to my left"
pub const SPAN_SENTINEL: &str = "+SPAN+";

/// Class added to row-spanned cells so their content is vertically centered
pub const ROWSPAN_CLASS: &str = "vam";

/// One table cell: text, CSS class, inline style, extra HTML attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub class: Option<String>,
    pub style: Option<String>,
    pub attrs: Option<String>,
}

impl TableCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn span() -> Self {
        Self::new(SPAN_SENTINEL)
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into()).filter(|c: &String| !c.is_empty());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn attrs(mut self, attrs: impl Into<String>) -> Self {
        self.attrs = Some(attrs.into()).filter(|a: &String| !a.is_empty());
        self
    }

    pub fn is_span(&self) -> bool {
        self.text == SPAN_SENTINEL
    }

    /// Cells with equal keys in the same column of adjacent rows merge
    pub fn merge_key(&self) -> String {
        [
            self.text.as_str(),
            self.class.as_deref().unwrap_or(""),
            self.style.as_deref().unwrap_or(""),
            self.attrs.as_deref().unwrap_or(""),
        ]
        .join("+")
    }
}

/// Rendered `<tr>` rows plus span bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedTable {
    pub html: String,
    /// `<td>` elements emitted
    pub rendered: usize,
    /// Cells covered by a rowspan or colspan
    pub skipped: usize,
}

/// Sort key: tab-prefixed text of every cell, upper-cased
fn row_sort_key(row: &[TableCell]) -> String {
    let mut key = String::new();
    for cell in row {
        key.push('\t');
        key.push_str(&cell.text);
    }
    key.to_uppercase()
}

pub struct TableRenderer<'a> {
    linker: &'a TextLinker,
}

impl<'a> TableRenderer<'a> {
    pub fn new(linker: &'a TextLinker) -> Self {
        Self { linker }
    }

    /// Sort `rows` and render them from column `first_col` onward
    pub fn render(&self, mut rows: Vec<Vec<TableCell>>, first_col: usize) -> RenderedTable {
        rows.sort_by_cached_key(|row| row_sort_key(row));
        let keys: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(TableCell::merge_key).collect())
            .collect();

        let mut out = RenderedTable::default();
        for (r, row) in rows.iter().enumerate() {
            out.html.push_str("<tr>");
            for c in first_col..row.len() {
                let cell = &row[c];
                if cell.is_span() {
                    out.skipped += 1;
                    continue;
                }
                let key = &keys[r][c];
                let covered_from_above = r > 0 && keys[r - 1].get(c) == Some(key);
                if covered_from_above {
                    out.skipped += 1;
                    continue;
                }

                let rowspan = 1 + keys[r + 1..]
                    .iter()
                    .take_while(|below| below.get(c) == Some(key))
                    .count();
                let colspan = 1 + row[c + 1..].iter().take_while(|n| n.is_span()).count();

                let pattern_classes = self.linker.classes_for(&cell.text);
                let mut classes: Vec<&str> = Vec::new();
                if let Some(cls) = cell.class.as_deref() {
                    classes.push(cls);
                }
                if !pattern_classes.is_empty() {
                    classes.push(&pattern_classes);
                }

                out.html.push_str("<td");
                if let Some(style) = cell.style.as_deref() {
                    out.html.push_str(&format!(" style='{}'", style));
                }
                if let Some(attrs) = cell.attrs.as_deref() {
                    out.html.push(' ');
                    out.html.push_str(attrs);
                }
                if rowspan != 1 {
                    out.html.push_str(&format!(" rowspan='{}'", rowspan));
                    classes.push(ROWSPAN_CLASS);
                }
                if colspan != 1 {
                    out.html.push_str(&format!(" colspan='{}'", colspan));
                }
                if !classes.is_empty() {
                    out.html.push_str(&format!(" class='{}'", classes.join(" ")));
                }
                out.html.push('>');
                out.html.push_str(&self.linker.rewrite_links(&cell.text));
                out.html.push_str("</td>");
                out.rendered += 1;
            }
            out.html.push_str("</tr>");
        }
        out
    }

    /// Shorthand for callers that only need the markup
    pub fn render_html(&self, rows: Vec<Vec<TableCell>>, first_col: usize) -> String {
        self.render(rows, first_col).html
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(texts: &[&str]) -> Vec<TableCell> {
        texts.iter().map(|t| TableCell::new(*t)).collect()
    }

    fn count_cells(rows: &[Vec<TableCell>], first_col: usize) -> usize {
        rows.iter().map(|r| r.len().saturating_sub(first_col)).sum()
    }

    #[test]
    fn test_rows_are_sorted_case_insensitively() {
        let linker = TextLinker::new();
        let html = TableRenderer::new(&linker)
            .render_html(vec![cells(&["beta"]), cells(&["Alpha"]), cells(&["gamma"])], 0);
        assert_eq!(html, "<tr><td>Alpha</td></tr><tr><td>beta</td></tr><tr><td>gamma</td></tr>");
    }

    #[test]
    fn test_rowspan_group() {
        let linker = TextLinker::new();
        let rows = vec![
            cells(&["A", "1"]),
            cells(&["A", "2"]),
            cells(&["A", "3"]),
            cells(&["B", "4"]),
        ];
        let total = count_cells(&rows, 0);
        let t = TableRenderer::new(&linker).render(rows, 0);
        assert_eq!(t.html.matches("rowspan='3'").count(), 1);
        assert!(t.html.contains("<td rowspan='3' class='vam'>A</td>"));
        assert_eq!(t.html.matches("<td").count(), t.rendered);
        assert_eq!(t.rendered, 6);
        assert_eq!(t.skipped, 2);
        assert_eq!(t.rendered + t.skipped, total);
    }

    #[test]
    fn test_colspan_from_sentinels() {
        let linker = TextLinker::new();
        let rows = vec![vec![
            TableCell::new("wide").class("note"),
            TableCell::span(),
            TableCell::span(),
            TableCell::new("x"),
        ]];
        let t = TableRenderer::new(&linker).render(rows, 0);
        assert_eq!(t.html, "<tr><td colspan='3' class='note'>wide</td><td>x</td></tr>");
        assert_eq!(t.rendered, 2);
        assert_eq!(t.skipped, 2);
    }

    #[test]
    fn test_merge_key_includes_class_and_style() {
        let linker = TextLinker::new();
        let rows = vec![
            vec![TableCell::new("same").class("a")],
            vec![TableCell::new("same").class("b")],
        ];
        let t = TableRenderer::new(&linker).render(rows, 0);
        assert_eq!(t.rendered, 2);
        assert!(!t.html.contains("rowspan"));
    }

    #[test]
    fn test_first_col_hidden_but_used_for_sorting() {
        let linker = TextLinker::new();
        let rows = vec![cells(&["2", "second"]), cells(&["1", "first"])];
        let t = TableRenderer::new(&linker).render(rows, 1);
        assert_eq!(t.html, "<tr><td>first</td></tr><tr><td>second</td></tr>");
    }

    #[test]
    fn test_attribute_order_and_pattern_classes() {
        let mut linker = TextLinker::new();
        linker.register_classer("^%", "pct", false).unwrap();
        linker.register_linker(r"PMID:\d+", "pm/__NUM__").unwrap();
        let rows = vec![
            vec![TableCell::new("%").class("freq").style("color: red").attrs("title='t'")],
            vec![TableCell::new("PMID:9")],
        ];
        let html = TableRenderer::new(&linker).render_html(rows, 0);
        assert!(html.contains("<td style='color: red' title='t' class='freq pct'>%</td>"));
        assert!(html.contains("<td><a target='_blank' href='pm/9'>PMID:9</a></td>"));
    }

    #[test]
    fn test_ragged_rows_do_not_panic() {
        let linker = TextLinker::new();
        let rows = vec![cells(&["a", "b", "c"]), cells(&["a"]), cells(&["b", "x"])];
        let total = count_cells(&rows, 0);
        let t = TableRenderer::new(&linker).render(rows, 0);
        assert_eq!(t.rendered + t.skipped, total);
    }

    #[test]
    fn test_sentinel_count_invariant_on_grid() {
        let linker = TextLinker::new();
        let rows = vec![
            vec![TableCell::new("p"), TableCell::span(), TableCell::new("q")],
            vec![TableCell::new("p"), TableCell::span(), TableCell::new("r")],
            vec![TableCell::new("z"), TableCell::new("y"), TableCell::span()],
        ];
        let total = count_cells(&rows, 0);
        let t = TableRenderer::new(&linker).render(rows, 0);
        assert_eq!(t.rendered + t.skipped, total);
        assert_eq!(t.html.matches("<td").count(), t.rendered);
    }
}
