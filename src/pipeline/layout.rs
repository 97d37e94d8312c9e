//! Layout reconstruction: positioned glyphs → lines and paragraphs.
//!
//! PDF text extraction yields glyphs with bounding boxes and no notion of
//! words, lines or paragraphs. This module infers them from geometry alone.
//!
//! Coordinates are bottom-up (PDF user space): a larger `bottom` is higher
//! on the page.
//!
//! ## Algorithm
//!
//! 1. Median glyph width and height over the page set the scale. Medians
//!    rather than means so a large heading or a run of narrow punctuation
//!    does not skew them.
//! 2. `space_threshold = max(0.7 × median width, 1.0)`,
//!    `same_line_threshold = max(0.45 × median height, 0.5)`.
//! 3. Glyphs sorted top-first are grouped greedily into lines; the first
//!    glyph of a line fixes its baseline.
//! 4. Each line is read left to right. A gap wider than `space_threshold`
//!    becomes one space.
//! 5. A gap between baselines larger than 1.4 × the rolling average of the
//!    last 20 gaps starts a new paragraph.

use std::collections::VecDeque;

/// Multiplier on the median glyph width above which a gap is a word break.
pub const SPACE_WIDTH_FACTOR: f64 = 0.7;

/// Multiplier on the median glyph height within which glyphs share a line.
pub const SAME_LINE_HEIGHT_FACTOR: f64 = 0.45;

/// A baseline gap this many times the running average starts a paragraph.
pub const PARAGRAPH_GAP_FACTOR: f64 = 1.4;

/// How many recent baseline gaps feed the running line-height average.
pub const LINE_HEIGHT_WINDOW: usize = 20;

/// One positioned piece of text, usually a single character.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Glyph {
    pub fn new(text: impl Into<String>, left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            bottom,
            top,
        }
    }

    pub fn width(&self) -> f64 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.top - self.bottom).max(0.0)
    }

    /// Finite, non-inverted box.
    pub fn has_geometry(&self) -> bool {
        [self.left, self.right, self.bottom, self.top]
            .iter()
            .all(|v| v.is_finite())
            && self.right >= self.left
            && self.top >= self.bottom
    }
}

/// What a decoder extracted from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub glyphs: Vec<Glyph>,
    /// The decoder's own text extraction, used when `glyphs` is empty.
    pub raw_text: String,
}

impl PageText {
    pub fn new(glyphs: Vec<Glyph>, raw_text: impl Into<String>) -> Self {
        Self {
            glyphs,
            raw_text: raw_text.into(),
        }
    }
}

/// Thresholds derived from the glyph population of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutThresholds {
    pub space: f64,
    pub same_line: f64,
}

impl LayoutThresholds {
    pub fn from_glyphs(glyphs: &[Glyph]) -> Self {
        let mut widths: Vec<f64> = glyphs.iter().map(Glyph::width).collect();
        let mut heights: Vec<f64> = glyphs.iter().map(Glyph::height).collect();
        Self {
            space: (median(&mut widths) * SPACE_WIDTH_FACTOR).max(1.0),
            same_line: (median(&mut heights) * SAME_LINE_HEIGHT_FACTOR).max(0.5),
        }
    }
}

/// Statistical median; the mean of the two middle values for even counts.
/// Returns 0.0 for an empty slice. Reorders `values`.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

struct Line<'g> {
    baseline: f64,
    glyphs: Vec<&'g Glyph>,
}

fn group_lines<'g>(glyphs: &'g [Glyph], same_line: f64) -> Vec<Line<'g>> {
    let mut sorted: Vec<&Glyph> = glyphs.iter().collect();
    sorted.sort_by(|a, b| b.bottom.total_cmp(&a.bottom));

    let mut lines: Vec<Line<'g>> = Vec::new();
    for glyph in sorted {
        match lines.last_mut() {
            Some(line) if (line.baseline - glyph.bottom).abs() <= same_line => {
                line.glyphs.push(glyph);
            }
            _ => lines.push(Line {
                baseline: glyph.bottom,
                glyphs: vec![glyph],
            }),
        }
    }
    lines
}

fn render_line(line: &mut Line<'_>, space: f64) -> String {
    line.glyphs.sort_by(|a, b| a.left.total_cmp(&b.left));
    let mut out = String::new();
    let mut prev_right: Option<f64> = None;
    for glyph in &line.glyphs {
        if let Some(right) = prev_right {
            if glyph.left - right > space {
                out.push(' ');
            }
        }
        out.push_str(&glyph.text);
        prev_right = Some(glyph.right);
    }
    out
}

/// Reconstruct the text of a single page from its glyphs.
pub fn reconstruct_glyphs(glyphs: &[Glyph]) -> String {
    if glyphs.is_empty() {
        return String::new();
    }
    let thresholds = LayoutThresholds::from_glyphs(glyphs);
    let mut lines = group_lines(glyphs, thresholds.same_line);

    let mut out = String::new();
    let mut recent_gaps: VecDeque<f64> = VecDeque::with_capacity(LINE_HEIGHT_WINDOW + 1);
    let mut prev_baseline: Option<f64> = None;

    for line in &mut lines {
        if let Some(prev) = prev_baseline {
            let gap = prev - line.baseline;
            let is_paragraph = !recent_gaps.is_empty() && {
                let avg = recent_gaps.iter().sum::<f64>() / recent_gaps.len() as f64;
                gap > avg * PARAGRAPH_GAP_FACTOR
            };
            out.push_str(if is_paragraph { "\n\n" } else { "\n" });

            recent_gaps.push_back(gap);
            if recent_gaps.len() > LINE_HEIGHT_WINDOW {
                recent_gaps.pop_front();
            }
        }
        out.push_str(&render_line(line, thresholds.space));
        prev_baseline = Some(line.baseline);
    }
    out
}

/// Page text: reconstructed from glyphs, or the raw extraction when the
/// page has none.
pub fn reconstruct_page(page: &PageText) -> String {
    if page.glyphs.is_empty() {
        page.raw_text.clone()
    } else {
        reconstruct_glyphs(&page.glyphs)
    }
}

/// Reconstruct every page independently and join them with a blank line.
pub fn assemble_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(reconstruct_page)
        .collect::<Vec<_>>()
        .join("\n\n")
}
