//! # SVG Plots
//!
//! Minimal standalone SVG rendering for the evaluation report: scatter plots
//! with an optional reference line, histograms and horizontal bar charts.
//! Output is a complete `<svg>` document with fixed 800×600 geometry, so the
//! files open directly in a browser.

use std::fmt::Write as _;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const TICKS: usize = 5;

const POINT_COLOR: &str = "#1f77b4";
const REFERENCE_COLOR: &str = "#d62728";
const BAR_COLOR: &str = "#2ca02c";

/// Line drawn behind scatter points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// No line.
    None,
    /// `y = x`, for actual-vs-predicted plots.
    Diagonal,
    /// `y = 0`, for residual plots.
    Zero,
}

/// Maps a data interval onto a pixel interval.
#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    fn new(values: impl Iterator<Item = f64>, px_lo: f64, px_hi: f64) -> Self {
        let (mut lo, mut hi) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() {
            (lo, hi) = (0.0, 1.0);
        } else if hi - lo < 1e-12 {
            (lo, hi) = (lo - 0.5, hi + 0.5);
        }
        let pad = (hi - lo) * 0.05;
        Self {
            lo: lo - pad,
            hi: hi + pad,
            px_lo,
            px_hi,
        }
    }

    fn include_zero(mut self) -> Self {
        self.lo = self.lo.min(0.0);
        self.hi = self.hi.max(0.0);
        self
    }

    fn map(&self, v: f64) -> f64 {
        self.px_lo + (v - self.lo) / (self.hi - self.lo) * (self.px_hi - self.px_lo)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..=TICKS).map(move |i| self.lo + (self.hi - self.lo) * i as f64 / TICKS as f64)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn tick_label(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{v:.0}")
    } else if v.abs() >= 10.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

struct Document {
    body: String,
}

impl Document {
    fn new(title: &str) -> Self {
        let mut body = String::new();
        let _ = write!(
            body,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = write!(body, r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#);
        let _ = write!(
            body,
            r#"<text x="{}" y="30" font-size="18" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            escape(title)
        );
        Self { body }
    }

    fn axes(&mut self, x: &Scale, y: &Scale, x_label: &str, y_label: &str) {
        let bottom = HEIGHT - MARGIN_BOTTOM;
        let right = WIDTH - MARGIN_RIGHT;
        let _ = write!(
            self.body,
            r#"<line x1="{MARGIN_LEFT}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="black"/><line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{bottom}" stroke="black"/>"#
        );
        for t in x.ticks() {
            let px = x.map(t);
            let _ = write!(
                self.body,
                r#"<line x1="{px:.1}" y1="{bottom}" x2="{px:.1}" y2="{}" stroke="black"/><text x="{px:.1}" y="{}" font-size="11" text-anchor="middle">{}</text>"#,
                bottom + 5.0,
                bottom + 20.0,
                tick_label(t)
            );
        }
        for t in y.ticks() {
            let py = y.map(t);
            let _ = write!(
                self.body,
                r#"<line x1="{}" y1="{py:.1}" x2="{MARGIN_LEFT}" y2="{py:.1}" stroke="black"/><text x="{}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 5.0,
                MARGIN_LEFT - 8.0,
                py + 4.0,
                tick_label(t)
            );
        }
        self.labels(x_label, y_label);
    }

    fn labels(&mut self, x_label: &str, y_label: &str) {
        let _ = write!(
            self.body,
            r#"<text x="{:.1}" y="{}" font-size="13" text-anchor="middle">{}</text>"#,
            (MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0,
            HEIGHT - 25.0,
            escape(x_label)
        );
        let cy = (MARGIN_TOP + HEIGHT - MARGIN_BOTTOM) / 2.0;
        let _ = write!(
            self.body,
            r#"<text x="20" y="{cy:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 20 {cy:.1})">{}</text>"#,
            escape(y_label)
        );
    }

    fn line(&mut self, (x1, y1): (f64, f64), (x2, y2): (f64, f64), color: &str) {
        let _ = write!(
            self.body,
            r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{color}" stroke-width="2" stroke-dasharray="6 4"/>"#
        );
    }

    fn finish(mut self) -> String {
        self.body.push_str("</svg>\n");
        self.body
    }
}

fn x_scale(values: impl Iterator<Item = f64>) -> Scale {
    Scale::new(values, MARGIN_LEFT, WIDTH - MARGIN_RIGHT)
}

fn y_scale(values: impl Iterator<Item = f64>) -> Scale {
    // pixel y grows downward
    Scale::new(values, HEIGHT - MARGIN_BOTTOM, MARGIN_TOP)
}

/// Scatter plot of `(x, y)` points. Non-finite points are skipped.
pub fn scatter(title: &str, x_label: &str, y_label: &str, points: &[(f64, f64)], reference: Reference) -> String {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let mut xs = x_scale(finite.iter().map(|p| p.0));
    let mut ys = y_scale(finite.iter().map(|p| p.1));
    match reference {
        Reference::Diagonal => {
            let both = finite.iter().flat_map(|&(x, y)| [x, y]);
            xs = x_scale(both.clone());
            ys = y_scale(both);
        }
        Reference::Zero => ys = ys.include_zero(),
        Reference::None => {}
    }

    let mut doc = Document::new(title);
    doc.axes(&xs, &ys, x_label, y_label);
    for (x, y) in &finite {
        let _ = write!(
            doc.body,
            r#"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{POINT_COLOR}" fill-opacity="0.5"/>"#,
            xs.map(*x),
            ys.map(*y)
        );
    }
    match reference {
        Reference::Diagonal => {
            let lo = xs.lo.max(ys.lo);
            let hi = xs.hi.min(ys.hi);
            doc.line((xs.map(lo), ys.map(lo)), (xs.map(hi), ys.map(hi)), REFERENCE_COLOR);
        }
        Reference::Zero => doc.line((xs.map(xs.lo), ys.map(0.0)), (xs.map(xs.hi), ys.map(0.0)), REFERENCE_COLOR),
        Reference::None => {}
    }
    doc.finish()
}

/// Histogram of `values` with `bins` equal-width bins.
pub fn histogram(title: &str, x_label: &str, values: &[f64], bins: usize) -> String {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let xs = x_scale(finite.iter().copied());
    let width = (xs.hi - xs.lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - xs.lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let ys = y_scale([0.0, max_count as f64].into_iter()).include_zero();

    let mut doc = Document::new(title);
    doc.axes(&xs, &ys, x_label, "Count");
    for (i, &count) in counts.iter().enumerate() {
        let left = xs.map(xs.lo + width * i as f64);
        let right = xs.map(xs.lo + width * (i + 1) as f64);
        let top = ys.map(count as f64);
        let _ = write!(
            doc.body,
            r#"<rect x="{left:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="{POINT_COLOR}" stroke="white"/>"#,
            (right - left).max(0.0),
            (ys.map(0.0) - top).max(0.0)
        );
    }
    doc.finish()
}

/// Horizontal bar chart, largest value on top.
pub fn bar_chart(title: &str, value_label: &str, bars: &[(&str, f64)]) -> String {
    let mut sorted: Vec<(&str, f64)> = bars.iter().copied().filter(|(_, v)| v.is_finite()).collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    let xs = x_scale(sorted.iter().map(|b| b.1)).include_zero();

    let mut doc = Document::new(title);
    let bottom = HEIGHT - MARGIN_BOTTOM;
    let _ = write!(
        doc.body,
        r#"<line x1="{MARGIN_LEFT}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="black"/>"#,
        WIDTH - MARGIN_RIGHT
    );
    for t in xs.ticks() {
        let _ = write!(
            doc.body,
            r#"<text x="{:.1}" y="{}" font-size="11" text-anchor="middle">{}</text>"#,
            xs.map(t),
            bottom + 20.0,
            tick_label(t)
        );
    }
    doc.labels(value_label, "");

    let slot = (bottom - MARGIN_TOP) / sorted.len().max(1) as f64;
    let zero = xs.map(0.0);
    for (i, (name, value)) in sorted.iter().enumerate() {
        let y = MARGIN_TOP + slot * i as f64 + slot * 0.15;
        let end = xs.map(*value);
        let _ = write!(
            doc.body,
            r#"<rect x="{:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{BAR_COLOR}"/><text x="{:.1}" y="{:.1}" font-size="12" text-anchor="start" fill="black">{} ({value:.3})</text>"#,
            zero.min(end),
            (end - zero).abs(),
            slot * 0.7,
            zero.min(end) + 4.0,
            y + slot * 0.35 + 4.0,
            escape(name)
        );
    }
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn scatter_draws_every_finite_point() {
        let points = [(1.0, 2.0), (2.0, 1.5), (f64::NAN, 1.0), (3.0, 3.5)];
        let svg = scatter("Actual vs Predicted", "Actual", "Predicted", &points, Reference::Diagonal);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(count(&svg, "<circle"), 3);
        assert!(!svg.contains("NaN"));
        assert_eq!(count(&svg, "stroke-dasharray"), 1);
    }

    #[test]
    fn empty_and_constant_inputs_stay_finite() {
        for svg in [
            scatter("t", "x", "y", &[], Reference::Zero),
            scatter("t", "x", "y", &[(1.0, 1.0), (1.0, 1.0)], Reference::None),
            histogram("t", "x", &[], 10),
            histogram("t", "x", &[2.0; 5], 10),
            bar_chart("t", "v", &[]),
        ] {
            assert!(!svg.contains("NaN") && !svg.contains("inf"), "{svg}");
        }
    }

    #[test]
    fn histogram_has_one_rect_per_bin() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let svg = histogram("Residuals", "Residual", &values, 20);
        // background plus bins
        assert_eq!(count(&svg, "<rect"), 21);
    }

    #[test]
    fn bars_are_sorted_and_escaped() {
        let svg = bar_chart("Importance", "weight", &[("a<b", 0.1), ("MedInc", 0.7), ("HouseAge", 0.2)]);
        let med = svg.find("MedInc").unwrap();
        let age = svg.find("HouseAge").unwrap();
        assert!(med < age);
        assert!(svg.contains("a&lt;b"));
    }
}
