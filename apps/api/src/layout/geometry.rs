//! Page geometry and layout constants.
//!
//! All lengths are millimetres with the origin at the top-left corner of the
//! page, matching what `HelveticaMeasurer` reports.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::MM_PER_PT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// Right edge of the value column. Value text wraps at
    /// `usable_width_for_values - value_x`.
    pub usable_width_for_values: f32,
}

impl PageGeometry {
    /// A4 portrait. Fields flow until y passes 280mm.
    pub fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin_left: 20.0,
            margin_top: 20.0,
            margin_bottom: 17.0,
            usable_width_for_values: 190.0,
        }
    }

    /// The y coordinate past which a page break is inserted.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn is_valid(&self) -> bool {
        [
            self.width,
            self.height,
            self.margin_left,
            self.margin_top,
            self.margin_bottom,
            self.usable_width_for_values,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
            && self.margin_top < self.bottom_limit()
    }

    pub fn width_pt(&self) -> f32 {
        self.width / MM_PER_PT
    }

    pub fn height_pt(&self) -> f32 {
        self.height / MM_PER_PT
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Fixed offsets and sizes the engine lays fields out with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub title_height: f32,
    pub title_font_size_pt: f32,
    pub body_font_size_pt: f32,
    /// Default x of the value column.
    pub value_column_x: f32,
    /// Space kept between a wide label and its value.
    pub label_gap: f32,
    pub min_value_width: f32,
    pub min_row_height: f32,
    pub row_gap: f32,
    /// Row height used when a value cannot be measured.
    pub fallback_row_height: f32,
    pub photo_width: f32,
    pub photo_height: f32,
    /// x of the first and second image in a photo row.
    pub photo_slots_x: [f32; 2],
    pub photo_row_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title_height: 20.0,
            title_font_size_pt: 22.0,
            body_font_size_pt: 12.0,
            value_column_x: 80.0,
            label_gap: 5.0,
            min_value_width: 20.0,
            min_row_height: 10.0,
            row_gap: 6.0,
            fallback_row_height: 10.0,
            photo_width: 50.0,
            photo_height: 50.0,
            photo_slots_x: [140.0, 80.0],
            photo_row_height: 60.0,
        }
    }
}
