//! Node box sizing.
//!
//! The oracle asks a [`TextMeasurer`] how tall a node's text becomes when
//! wrapped at a few candidate widths and keeps the narrowest width that stays
//! within the line budget. The resulting [`NodeBox`] is shared by the
//! renderer and by [`crate::hit_test`].

use crate::model::Node;
use unicode_width::UnicodeWidthStr;

/// Words kept in the preview of a collapsed node.
pub const PREVIEW_WORDS: usize = 3;

/// Text measuring capability supplied by the rendering side.
pub trait TextMeasurer {
    /// Height of `text` when word-wrapped to `max_width`.
    fn wrapped_height(&self, text: &str, max_width: f32) -> f32;
    /// Height of a single line.
    fn line_height(&self) -> f32;
}

/// Deterministic measurer: fixed advance per display column, greedy word wrap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    pub char_width: f32,
    pub line_height: f32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            char_width: 7.5,
            line_height: 18.0,
        }
    }
}

impl MonospaceMeasurer {
    /// Number of lines `text` wraps to at `max_width`.
    pub fn line_count(&self, text: &str, max_width: f32) -> usize {
        let columns = ((max_width / self.char_width).floor() as usize).max(1);
        let mut lines = 0;
        for paragraph in text.split('\n') {
            lines += 1;
            let mut used = 0usize;
            for word in paragraph.split_whitespace() {
                let w = word.width();
                if used == 0 {
                    // Overlong words break across lines.
                    lines += w.saturating_sub(1) / columns;
                    used = w % columns;
                    if used == 0 && w > 0 {
                        used = columns;
                    }
                } else if used + 1 + w <= columns {
                    used += 1 + w;
                } else {
                    lines += 1 + w.saturating_sub(1) / columns;
                    used = w % columns;
                    if used == 0 {
                        used = columns;
                    }
                }
            }
        }
        lines.max(1)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn wrapped_height(&self, text: &str, max_width: f32) -> f32 {
        self.line_count(text, max_width) as f32 * self.line_height
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

/// Text shown for a node: full text, or a short preview when collapsed.
pub fn display_text(node: &Node) -> String {
    if !node.is_collapsed() {
        return node.text.clone();
    }
    let words: Vec<&str> = node.text.split_whitespace().collect();
    if words.len() <= PREVIEW_WORDS {
        words.join(" ")
    } else {
        format!("{}…", words[..PREVIEW_WORDS].join(" "))
    }
}

/// Width and height of a node's drawn box, centered on the node position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub width: f32,
    pub height: f32,
}

impl NodeBox {
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }
}

/// Sizing limits for [`SizingOracle`].
#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    /// Widths tried in ascending order.
    pub candidate_widths: Vec<f32>,
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    /// Horizontal padding on each side of the text.
    pub padding_x: f32,
    /// Vertical padding above and below the text.
    pub padding_y: f32,
    /// Most text lines a candidate may produce before a wider one is tried.
    pub max_lines: usize,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            candidate_widths: vec![120.0, 160.0, 200.0, 240.0, 280.0],
            min_width: 96.0,
            max_width: 280.0,
            min_height: 40.0,
            padding_x: 12.0,
            padding_y: 8.0,
            max_lines: 2,
        }
    }
}

pub struct SizingOracle<M = MonospaceMeasurer> {
    measurer: M,
    config: SizingConfig,
}

impl Default for SizingOracle<MonospaceMeasurer> {
    fn default() -> Self {
        Self::new(MonospaceMeasurer::default())
    }
}

impl<M: TextMeasurer> SizingOracle<M> {
    pub fn new(measurer: M) -> Self {
        Self::with_config(measurer, SizingConfig::default())
    }

    pub fn with_config(measurer: M, config: SizingConfig) -> Self {
        Self { measurer, config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Box for an arbitrary display string.
    pub fn measure(&self, text: &str) -> NodeBox {
        let c = &self.config;
        let threshold = c.max_lines as f32 * self.measurer.line_height() + 2.0 * c.padding_y;

        let mut chosen: Option<(f32, f32)> = None;
        let mut last: Option<(f32, f32)> = None;
        for &candidate in &c.candidate_widths {
            let width = candidate.min(c.max_width);
            let text_width = (width - 2.0 * c.padding_x).max(1.0);
            let height = self.measurer.wrapped_height(text, text_width) + 2.0 * c.padding_y;
            last = Some((width, height));
            if height <= threshold {
                chosen = Some((width, height));
                break;
            }
        }

        let (width, height) = chosen.or(last).unwrap_or((c.min_width, c.min_height));
        NodeBox {
            width: width.clamp(c.min_width, c.max_width),
            height: height.max(c.min_height),
        }
    }

    /// Box for a node, honoring its collapsed preview.
    pub fn node_box(&self, node: &Node) -> NodeBox {
        self.measure(&display_text(node))
    }
}
