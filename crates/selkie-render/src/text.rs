use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 16.0,
            font_weight: None,
        }
    }
}

impl TextStyle {
    pub fn with_size(font_size: f64) -> Self {
        Self {
            font_size,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

/// Measures label text. Implementations must be deterministic for a given input.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Width is `chars * font_size * char_width_factor` of the longest line, height is
/// `lines * font_size * line_height_factor`. Zero factors fall back to 0.6 and 1.2.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    /// Splits on newlines and the `<br>` spellings labels commonly carry.
    pub fn lines(text: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut rest = text;
        loop {
            let next_break = ["<br/>", "<br />", "<br>", "\n"]
                .iter()
                .filter_map(|sep| rest.find(sep).map(|at| (at, sep.len())))
                .min_by_key(|(at, _)| *at);
            match next_break {
                Some((at, len)) => {
                    out.push(&rest[..at]);
                    rest = &rest[at + len..];
                }
                None => {
                    out.push(rest);
                    return out;
                }
            }
        }
    }

    fn factors(&self) -> (f64, f64) {
        let char_width = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };
        (char_width, line_height)
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        if text.is_empty() {
            return TextMetrics {
                width: 0.0,
                height: 0.0,
                line_count: 0,
            };
        }
        let (char_width, line_height) = self.factors();
        let lines = Self::lines(text);
        let font_size = style.font_size.max(1.0);
        let max_chars = lines
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        TextMetrics {
            width: max_chars as f64 * font_size * char_width,
            height: lines.len() as f64 * font_size * line_height,
            line_count: lines.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn br_variants_split_lines() {
        assert_eq!(
            DeterministicTextMeasurer::lines("a<br>bb<br/>ccc<br />d\ne"),
            vec!["a", "bb", "ccc", "d", "e"]
        );
    }

    #[test]
    fn longest_line_drives_width() {
        let m = DeterministicTextMeasurer::default();
        let metrics = m.measure("ab<br>abcd", &TextStyle::with_size(10.0));
        assert_eq!(metrics.line_count, 2);
        assert!((metrics.width - 24.0).abs() < 1e-9);
        assert!((metrics.height - 24.0).abs() < 1e-9);
    }

    #[test]
    fn empty_text_has_no_extent() {
        let m = DeterministicTextMeasurer::default();
        let metrics = m.measure("", &TextStyle::default());
        assert_eq!(metrics.width, 0.0);
        assert_eq!(metrics.height, 0.0);
    }
}
