//! Gravity plots - allele distribution across populations
//!
//! Alleles sit on a circle, heaviest first; each population is a dot at the
//! frequency-weighted centroid of the allele positions. The markup only holds
//! an empty `<canvas>`; the plot itself is laid out here and drawn after the
//! host has inserted the tooltip into the page.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::model::support::FreqTable;

const PAD: f64 = 16.0;
const TEXT_HEIGHT: f64 = 12.0;
const HEADER_BASELINE: f64 = 10.0;
const LABEL_SPREAD: f64 = 1.2;
const TICKS: usize = 10;
const DOT_RADIUS: f64 = 5.0;
const TICK_RADIUS: f64 = 1.0;
const DEFAULT_POP_COLOR: &str = "#aaa";

const LABEL_COLOR: &str = "rgb(255,0,0)";
const EDGE_COLOR: &str = "rgba(0,0,255,0.2)";
const TICK_COLOR: &str = "rgba(0,0,0,1)";
const HEADER_COLOR: &str = "rgb(200,200,200)";
const POP_ALPHA: f64 = 0.2;

/// One allele's anchor on the circle
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleMark {
    pub allele: String,
    /// Text drawn next to the anchor (reverse-complemented when needed)
    pub label: String,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
}

/// One population's dot
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationMark {
    pub pid: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

/// Canvas placeholder plus everything needed to draw into it later
#[derive(Debug, Clone, PartialEq)]
pub struct GravityPlot {
    pub canvas_id: String,
    pub width: u32,
    /// Height written into the placeholder markup
    pub height: u32,
    /// Height the canvas is resized to before drawing
    pub draw_height: Option<f64>,
    pub center: (f64, f64),
    pub alleles: Vec<AlleleMark>,
    pub populations: Vec<PopulationMark>,
}

/// What the draw pass needs from a 2D context
pub trait PlotSurface {
    fn resize(&mut self, height: f64);
    fn set_font(&mut self, font: &str);
    fn set_alpha(&mut self, alpha: f64);
    fn text_width(&mut self, text: &str) -> f64;
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str);
    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: &str);
    fn dot(&mut self, at: (f64, f64), radius: f64, color: &str);
}

impl GravityPlot {
    /// Lay out a plot. `alleles` is the full allele list of the variant and
    /// only decides the placeholder height; the circle is built from `freqs`.
    pub fn layout<F>(
        canvas_id: &str,
        width: u32,
        freqs: &FreqTable,
        alleles: &[String],
        revcom: &BTreeMap<String, String>,
        color_for: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let height = if alleles.len() <= 2 { 40 } else { width };
        let w = f64::from(width);
        let rad = (w / 2.0).floor() - PAD;
        let cx = (w / 2.0).floor();
        let cy = (f64::from(height) / 2.0).floor();

        // Normalize each population to sum to 1, tallying allele weight
        let mut normalized: Vec<(&str, Vec<(&str, f64)>)> = Vec::new();
        let mut totals: Vec<(&str, f64)> = Vec::new();
        for (pid, by_allele) in freqs {
            let mut shares: Vec<(&str, f64)> = Vec::new();
            for (allele, entry) in by_allele {
                let f = entry.freq.unwrap_or(1.0);
                if f == 0.0 {
                    continue;
                }
                shares.push((allele.as_str(), f));
            }
            let total: f64 = shares.iter().map(|(_, f)| f).sum();
            if total == 0.0 {
                continue;
            }
            for share in shares.iter_mut() {
                share.1 /= total;
                let (allele, f) = *share;
                match totals.iter_mut().find(|entry| entry.0 == allele) {
                    Some(entry) => entry.1 += f,
                    None => totals.push((allele, f)),
                }
            }
            normalized.push((pid.as_str(), shares));
        }
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));

        let step = 2.0 * PI / totals.len().max(1) as f64;
        let start = PI / 2.0 + step / 2.0;
        let marks: Vec<AlleleMark> = totals
            .iter()
            .enumerate()
            .map(|(i, (allele, _))| {
                let angle = start - i as f64 * step;
                let label = if revcom.is_empty() {
                    allele.to_string()
                } else {
                    revcom.get(*allele).cloned().unwrap_or_else(|| format!("?{}?", allele))
                };
                AlleleMark {
                    allele: allele.to_string(),
                    label,
                    angle,
                    x: cx + angle.cos() * rad,
                    y: cy + angle.sin() * rad,
                }
            })
            .collect();

        let max_y = marks.iter().map(|m| m.y).fold(0.0, f64::max);
        let draw_height = (max_y > 0.0).then_some(max_y + TEXT_HEIGHT);

        let populations = normalized
            .iter()
            .map(|(pid, shares)| {
                let (mut dx, mut dy) = (0.0, 0.0);
                for (allele, f) in shares {
                    if let Some(mark) = marks.iter().find(|m| m.allele == *allele) {
                        dx += f * mark.angle.cos();
                        dy += f * mark.angle.sin();
                    }
                }
                PopulationMark {
                    pid: pid.to_string(),
                    color: color_for(pid)
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| DEFAULT_POP_COLOR.to_string()),
                    x: cx + dx * rad,
                    y: cy + dy * rad,
                }
            })
            .collect();

        Self {
            canvas_id: canvas_id.to_string(),
            width,
            height,
            draw_height,
            center: (cx, cy),
            alleles: marks,
            populations,
        }
    }

    /// Placeholder element the plot is drawn into
    pub fn canvas_html(&self) -> String {
        format!(
            "<canvas id='{}' width='{}' height='{}'></canvas>",
            self.canvas_id, self.width, self.height
        )
    }

    pub fn draw(&self, surface: &mut dyn PlotSurface) {
        if let Some(h) = self.draw_height {
            surface.resize(h);
        }
        surface.set_font(&format!("bold {}px", TEXT_HEIGHT));

        let n = self.alleles.len();
        for (i, mark) in self.alleles.iter().enumerate() {
            let tw = surface.text_width(&mark.label);
            surface.fill_text(
                &mark.label,
                mark.x - tw * (1.0 - LABEL_SPREAD * mark.angle.cos()) / 2.0,
                mark.y + TEXT_HEIGHT * (1.0 + LABEL_SPREAD * mark.angle.sin()) / 2.0,
                LABEL_COLOR,
            );
            if n > 2 {
                surface.line(self.center, (mark.x, mark.y), EDGE_COLOR);
            }
            for (j, other) in self.alleles.iter().enumerate() {
                if i == j {
                    continue;
                }
                surface.line((other.x, other.y), (mark.x, mark.y), EDGE_COLOR);
                let (dx, dy) = (other.x - mark.x, other.y - mark.y);
                for k in 0..=TICKS {
                    let t = k as f64 / TICKS as f64;
                    surface.dot((mark.x + t * dx, mark.y + t * dy), TICK_RADIUS, TICK_COLOR);
                }
            }
        }

        surface.fill_text(
            &format!("Allele distribution: {} populations", self.populations.len()),
            0.0,
            HEADER_BASELINE,
            HEADER_COLOR,
        );

        surface.set_alpha(POP_ALPHA);
        for pop in &self.populations {
            surface.dot((pop.x, pop.y), DOT_RADIUS, &pop.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::support::AlleleFreq;

    #[derive(Default)]
    struct Recorder {
        texts: Vec<String>,
        lines: usize,
        dots: Vec<String>,
        height: Option<f64>,
    }

    impl PlotSurface for Recorder {
        fn resize(&mut self, height: f64) {
            self.height = Some(height);
        }
        fn set_font(&mut self, _font: &str) {}
        fn set_alpha(&mut self, _alpha: f64) {}
        fn text_width(&mut self, text: &str) -> f64 {
            text.len() as f64 * 6.0
        }
        fn fill_text(&mut self, text: &str, _x: f64, _y: f64, _color: &str) {
            self.texts.push(text.to_string());
        }
        fn line(&mut self, _from: (f64, f64), _to: (f64, f64), _color: &str) {
            self.lines += 1;
        }
        fn dot(&mut self, _at: (f64, f64), radius: f64, color: &str) {
            if radius == DOT_RADIUS {
                self.dots.push(color.to_string());
            }
        }
    }

    fn freqs(rows: &[(&str, &[(&str, Option<f64>)])]) -> FreqTable {
        let mut table = FreqTable::new();
        for (pid, alleles) in rows {
            let by_allele = alleles
                .iter()
                .map(|(a, f)| (a.to_string(), AlleleFreq { freq: *f, count: None }))
                .collect();
            table.insert(pid.to_string(), by_allele);
        }
        table
    }

    fn alleles(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_biallelic_layout() {
        let f = freqs(&[
            ("p1", &[("A", Some(0.9)), ("T", Some(0.1))]),
            ("p2", &[("A", Some(0.2)), ("T", Some(0.8))]),
            ("p3", &[("A", Some(0.0)), ("T", Some(1.0))]),
        ]);
        let plot = GravityPlot::layout("c1", 400, &f, &alleles(&["A", "T"]), &BTreeMap::new(), |pid| {
            (pid == "p1").then(|| "#f00".to_string())
        });
        assert_eq!(plot.height, 40);
        assert_eq!(plot.canvas_html(), "<canvas id='c1' width='400' height='40'></canvas>");
        // T carries more total weight, so it is placed first
        assert_eq!(plot.alleles[0].allele, "T");
        assert_eq!(plot.populations.len(), 3);
        assert_eq!(plot.populations[0].color, "#f00");
        assert_eq!(plot.populations[1].color, DEFAULT_POP_COLOR);
        // A population fixed for one allele sits on that allele's anchor
        let p3 = &plot.populations[2];
        assert!((p3.x - plot.alleles[0].x).abs() < 1e-9);
        assert!((p3.y - plot.alleles[0].y).abs() < 1e-9);
    }

    #[test]
    fn test_missing_frequency_counts_as_present() {
        let f = freqs(&[("p1", &[("A", None), ("G", Some(0.0))])]);
        let plot = GravityPlot::layout("c", 400, &f, &alleles(&["A", "G"]), &BTreeMap::new(), |_| None);
        assert_eq!(plot.alleles.len(), 1);
        assert_eq!(plot.alleles[0].allele, "A");
    }

    #[test]
    fn test_reverse_complement_labels() {
        let f = freqs(&[("p1", &[("A", Some(0.5)), ("C", Some(0.5))])]);
        let mut rc = BTreeMap::new();
        rc.insert("A".to_string(), "T".to_string());
        let plot = GravityPlot::layout("c", 400, &f, &alleles(&["A", "C"]), &rc, |_| None);
        let labels: Vec<&str> = plot.alleles.iter().map(|m| m.label.as_str()).collect();
        assert!(labels.contains(&"T"));
        assert!(labels.contains(&"?C?"));
    }

    #[test]
    fn test_draw_pass() {
        let f = freqs(&[
            ("p1", &[("A", Some(0.5)), ("C", Some(0.3)), ("G", Some(0.2))]),
            ("p2", &[("A", Some(0.1)), ("C", Some(0.1)), ("G", Some(0.8))]),
        ]);
        let plot = GravityPlot::layout("c", 400, &f, &alleles(&["A", "C", "G"]), &BTreeMap::new(), |_| None);
        assert_eq!(plot.height, 400);
        let mut rec = Recorder::default();
        plot.draw(&mut rec);
        assert!(rec.height.is_some());
        assert_eq!(rec.texts.len(), 4);
        assert_eq!(rec.texts[3], "Allele distribution: 2 populations");
        // 3 spokes plus 3 * 2 directed edges
        assert_eq!(rec.lines, 9);
        assert_eq!(rec.dots.len(), 2);
    }
}
