//! Static font-metric tables for the PDF base-14 Helvetica faces.
//!
//! Character widths are in em units (relative to font size), taken from the
//! Adobe Helvetica and Helvetica-Bold AFM files and divided by 1000. Because the
//! renderer draws with those exact standard fonts, measured widths match what
//! ends up on the page.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

/// Millimetres per PostScript point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Multiplier applied to the font size to get the distance between baselines.
pub const DEFAULT_LINE_HEIGHT_FACTOR: f32 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Normal,
    Bold,
}

// ────────────────────────────────────────────────────────────────────────────
// Measurement capability
// ────────────────────────────────────────────────────────────────────────────

/// Text measurement supplied by the rendering backend.
///
/// The layout engine never computes font metrics itself; everything it knows
/// about text size comes through this trait. Lengths are in the same unit as
/// the page geometry.
pub trait TextMeasurer: Send + Sync {
    /// Width of `text` on a single line.
    fn text_width(&self, text: &str, style: TextStyle, font_size_pt: f32) -> f32;

    /// Vertical space a body-text value occupies when wrapped to `max_width`.
    /// `None` when the text cannot be measured.
    fn wrapped_height(&self, text: &str, max_width: f32) -> Option<f32>;

    /// Splits `text` into the lines a renderer should draw at `max_width`.
    fn wrap_lines(
        &self,
        text: &str,
        style: TextStyle,
        font_size_pt: f32,
        max_width: f32,
    ) -> Vec<String>;

    /// Baseline-to-baseline distance for the given font size.
    fn line_height(&self, font_size_pt: f32) -> f32;
}

/// Measures with the static Helvetica tables, in millimetres.
#[derive(Debug, Clone)]
pub struct HelveticaMeasurer {
    /// Font size of field values, the text `wrapped_height` measures.
    pub body_font_size_pt: f32,
    pub line_height_factor: f32,
}

impl HelveticaMeasurer {
    pub fn new(body_font_size_pt: f32) -> Self {
        Self {
            body_font_size_pt,
            line_height_factor: DEFAULT_LINE_HEIGHT_FACTOR,
        }
    }
}

impl TextMeasurer for HelveticaMeasurer {
    fn text_width(&self, text: &str, style: TextStyle, font_size_pt: f32) -> f32 {
        get_metrics(style).measure_str(text) * font_size_pt * MM_PER_PT
    }

    fn wrapped_height(&self, text: &str, max_width: f32) -> Option<f32> {
        if !(max_width.is_finite() && max_width > 0.0) {
            return None;
        }
        let lines = self
            .wrap_lines(text, TextStyle::Normal, self.body_font_size_pt, max_width)
            .len()
            .max(1);
        Some(lines as f32 * self.line_height(self.body_font_size_pt))
    }

    fn wrap_lines(
        &self,
        text: &str,
        style: TextStyle,
        font_size_pt: f32,
        max_width: f32,
    ) -> Vec<String> {
        let metrics = get_metrics(style);
        let scale = font_size_pt * MM_PER_PT;
        if scale <= 0.0 || !max_width.is_finite() || max_width <= 0.0 {
            return text.lines().map(str::to_string).collect();
        }
        let max_em = max_width / scale;

        text.split('\n')
            .flat_map(|paragraph| metrics.wrap_paragraph(paragraph.trim_end_matches('\r'), max_em))
            .collect()
    }

    fn line_height(&self, font_size_pt: f32) -> f32 {
        font_size_pt * self.line_height_factor * MM_PER_PT
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for one font face.
///
/// `widths[i]` = width of ASCII character `(i + 32)`, covering 0x20 (space) through 0x7E (~).
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    pub fn char_width(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else if c == '\t' {
            self.space_width
        } else {
            self.average_char_width
        }
    }

    /// Measures the rendered width of a string in em units.
    ///
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    /// Greedy word wrap of one paragraph (no newlines) at `max_em`.
    ///
    /// Words wider than a whole line are broken between characters.
    /// An empty paragraph yields one empty line.
    fn wrap_paragraph(&self, paragraph: &str, max_em: f32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in paragraph.split_whitespace() {
            let word_w = self.measure_str(word);
            let space_w = if current.is_empty() { 0.0 } else { self.space_width };

            if current_width + space_w + word_w <= max_em {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width += space_w + word_w;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }

            if word_w <= max_em {
                current.push_str(word);
                current_width = word_w;
                continue;
            }

            for c in word.chars() {
                let cw = self.char_width(c);
                if !current.is_empty() && current_width + cw > max_em {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(c);
                current_width += cw;
            }
        }

        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

/// Helvetica — used for field values.
static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.556,
    space_width: 0.278,
};

/// Helvetica-Bold — used for the title and field labels.
static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.333, 0.474, 0.556, 0.556, 0.889, 0.722, 0.238, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.333, 0.333, 0.584, 0.584, 0.584, 0.611, 0.975,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.722, 0.722, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.556, 0.722, 0.611, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.333, 0.278, 0.333, 0.584, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.611, 0.556, 0.611, 0.556, 0.333, 0.611, 0.611, 0.278, 0.278, 0.556, 0.278, 0.889,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.611, 0.611, 0.611, 0.611, 0.389, 0.556, 0.333, 0.611, 0.556, 0.778, 0.556, 0.556, 0.500,
        // {      |      }      ~
        0.389, 0.280, 0.389, 0.584,
    ],
    average_char_width: 0.611,
    space_width: 0.278,
};

/// Returns the static metric table for a text style.
pub fn get_metrics(style: TextStyle) -> &'static FontMetricTable {
    match style {
        TextStyle::Normal => &HELVETICA_TABLE,
        TextStyle::Bold => &HELVETICA_BOLD_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
