//! Layout Engine — places a form's labeled fields and photos onto fixed-size pages.
//!
//! # Flow
//! 1. Title on page 1 only.
//! 2. Photos with an image, two per row, ahead of every other field.
//! 3. Remaining fields in form order: bold label, wrapped value, row advance.
//! 4. A page break follows any row that leaves the cursor past the bottom limit.
//!
//! `layout_form` is pure: it reads a snapshot of the form, asks the supplied
//! `TextMeasurer` for sizes, and returns fresh pages. It has no failure path.
//! A field is never split across pages; content taller than a page is clipped
//! by the renderer.

use serde::{Deserialize, Serialize};

use crate::forms::{FieldDescriptor, FieldKind, FieldValue, FormModel, ImageRef};
use crate::layout::font_metrics::{TextMeasurer, TextStyle};
use crate::layout::geometry::{LayoutConfig, PageGeometry};

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRole {
    Title,
    Label,
    Value,
}

/// A positioned text run. `y` is the baseline of the first line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPlacement {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub style: TextStyle,
    pub role: TextRole,
    pub font_size_pt: f32,
    /// Wrap width; `None` draws on a single line.
    pub max_width: Option<f32>,
}

/// A positioned image. `y` is the top edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub field: String,
    pub image: ImageRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Placement {
    Text(TextPlacement),
    Image(ImagePlacement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPage {
    pub index: usize,
    pub placements: Vec<Placement>,
}

impl LayoutPage {
    pub fn texts(&self) -> impl Iterator<Item = &TextPlacement> {
        self.placements.iter().filter_map(|p| match p {
            Placement::Text(t) => Some(t),
            Placement::Image(_) => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImagePlacement> {
        self.placements.iter().filter_map(|p| match p {
            Placement::Image(i) => Some(i),
            Placement::Text(_) => None,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry point
// ────────────────────────────────────────────────────────────────────────────

/// Lays out `form` under `title`. Always returns at least one page.
pub fn layout_form(
    form: &FormModel,
    title: &str,
    geometry: &PageGeometry,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> Vec<LayoutPage> {
    let mut cursor = PageCursor::new(geometry);

    cursor.push(Placement::Text(TextPlacement {
        x: geometry.margin_left,
        y: cursor.y,
        text: title.to_string(),
        style: TextStyle::Bold,
        role: TextRole::Title,
        font_size_pt: config.title_font_size_pt,
        max_width: None,
    }));
    cursor.y += config.title_height;

    place_photos(&mut cursor, form, config);

    for (descriptor, value) in form.entries().filter(|(d, _)| d.kind != FieldKind::Photo) {
        place_field(&mut cursor, descriptor, value, geometry, config, measurer);
    }

    cursor.finish()
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

struct PageCursor<'g> {
    geometry: &'g PageGeometry,
    pages: Vec<LayoutPage>,
    current: Vec<Placement>,
    y: f32,
}

impl<'g> PageCursor<'g> {
    fn new(geometry: &'g PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: Vec::new(),
            y: geometry.margin_top,
        }
    }

    fn push(&mut self, placement: Placement) {
        self.current.push(placement);
    }

    fn new_page(&mut self) {
        let index = self.pages.len();
        self.pages.push(LayoutPage {
            index,
            placements: std::mem::take(&mut self.current),
        });
        self.y = self.geometry.margin_top;
    }

    /// Breaks the page once the cursor has moved past the bottom limit.
    fn break_if_past_bottom(&mut self) {
        if self.y > self.geometry.bottom_limit() {
            self.new_page();
        }
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.geometry.margin_top
    }

    fn finish(mut self) -> Vec<LayoutPage> {
        let index = self.pages.len();
        self.pages.push(LayoutPage {
            index,
            placements: self.current,
        });
        self.pages
    }
}

/// Photos with an image, two per row, in form order.
/// An odd last image sits alone in the first slot.
fn place_photos(cursor: &mut PageCursor<'_>, form: &FormModel, config: &LayoutConfig) {
    let photos: Vec<(&FieldDescriptor, &ImageRef)> = form
        .entries()
        .filter(|(d, v)| d.kind == FieldKind::Photo && v.is_some_and(FieldValue::is_present))
        .filter_map(|(d, v)| match v {
            Some(FieldValue::Image(img)) => Some((d, img)),
            _ => None,
        })
        .collect();

    for (i, (descriptor, image)) in photos.iter().enumerate() {
        let slot = i % 2;
        if slot == 0 {
            if i > 0 {
                cursor.y += config.photo_row_height;
            }
            let row_bottom = cursor.y + config.photo_height;
            if row_bottom > cursor.geometry.bottom_limit() && !cursor.at_page_top() {
                cursor.new_page();
            }
        }
        cursor.push(Placement::Image(ImagePlacement {
            x: config.photo_slots_x[slot],
            y: cursor.y,
            width: config.photo_width,
            height: config.photo_height,
            field: descriptor.name.clone(),
            image: (*image).clone(),
        }));
    }

    if !photos.is_empty() {
        cursor.y += config.photo_row_height;
        cursor.break_if_past_bottom();
    }
}

/// The text a field renders, or `None` when the field is skipped.
fn display_value(kind: FieldKind, value: Option<&FieldValue>) -> Option<String> {
    match (kind, value.filter(|v| v.is_present())) {
        (FieldKind::Checkbox, Some(FieldValue::Flag(true))) => Some("Yes".to_string()),
        (FieldKind::Checkbox, _) => Some("No".to_string()),
        (FieldKind::Text | FieldKind::Date, Some(FieldValue::Text(s))) => Some(s.trim().to_string()),
        _ => None,
    }
}

fn place_field(
    cursor: &mut PageCursor<'_>,
    descriptor: &FieldDescriptor,
    value: Option<&FieldValue>,
    geometry: &PageGeometry,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) {
    let Some(display) = display_value(descriptor.kind, value) else {
        return;
    };

    let label = format!("{}:", descriptor.label);
    let label_width = measurer.text_width(&label, TextStyle::Bold, config.body_font_size_pt);
    let label_width = if label_width.is_finite() {
        label_width.max(0.0)
    } else {
        0.0
    };

    let value_x = config
        .value_column_x
        .max(geometry.margin_left + label_width + config.label_gap);
    let max_width = (geometry.usable_width_for_values - value_x).max(config.min_value_width);

    let row_height = match measurer
        .wrapped_height(&display, max_width)
        .filter(|h| h.is_finite() && *h >= 0.0)
    {
        Some(h) => config.min_row_height.max(h + config.row_gap),
        None => config.fallback_row_height,
    };

    cursor.push(Placement::Text(TextPlacement {
        x: geometry.margin_left,
        y: cursor.y,
        text: label,
        style: TextStyle::Bold,
        role: TextRole::Label,
        font_size_pt: config.body_font_size_pt,
        max_width: None,
    }));
    cursor.push(Placement::Text(TextPlacement {
        x: value_x,
        y: cursor.y,
        text: display,
        style: TextStyle::Normal,
        role: TextRole::Value,
        font_size_pt: config.body_font_size_pt,
        max_width: Some(max_width),
    }));

    cursor.y += row_height;
    cursor.break_if_past_bottom();
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
