//! PDF Renderer — serializes layout pages with `lopdf`.
//!
//! This renderer does NOT make layout decisions. Positions, row heights, and
//! wrap widths come from `layout::layout_form`; the renderer only converts
//! millimetres (top-left origin) into PDF points (bottom-left origin), splits
//! value text into lines with the same `TextMeasurer` the engine used, and
//! embeds photos.
//!
//! Text `y` is the first baseline; image `y` is the top edge. Content that runs
//! past the page bottom is clipped by the page box.

use std::io::Cursor;

use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;
use tracing::{debug, warn};

use crate::documents::DocumentData;
use crate::forms::{FormModel, ImageRef};
use crate::layout::font_metrics::MM_PER_PT;
use crate::layout::{
    layout_form, ImagePlacement, LayoutConfig, LayoutPage, PageGeometry, Placement,
    TextMeasurer, TextPlacement, TextRole, TextStyle,
};

pub const DEFAULT_TITLE_COLOR: &str = "#00BFFF";

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("invalid page geometry")]
    InvalidGeometry,

    #[error("image could not be embedded: {0}")]
    Image(String),

    #[error("PDF encoding failed: {0}")]
    Encode(String),
}

/// An RGB color with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, RenderError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RenderError::InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|_| RenderError::InvalidColor(hex.to_string()))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title_color: Rgb,
    /// Flate-compress content and image streams.
    pub compress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title_color: Rgb(0.0, 191.0 / 255.0, 1.0),
            compress: true,
        }
    }
}

/// Lays out `form` and renders it in one step.
pub fn render_form(
    form: &FormModel,
    title: &str,
    geometry: &PageGeometry,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
    options: &RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    let pages = layout_form(form, title, geometry, config, measurer);
    render_pdf(&pages, geometry, measurer, options)
}

/// Serializes `pages` into PDF bytes, one PDF page per layout page.
///
/// A photo that cannot be decoded is skipped with a warning; the rest of the
/// page still renders.
pub fn render_pdf(
    pages: &[LayoutPage],
    geometry: &PageGeometry,
    measurer: &dyn TextMeasurer,
    options: &RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    if !geometry.is_valid() {
        return Err(RenderError::InvalidGeometry);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_regular = doc.add_object(type1_font("Helvetica"));
    let font_bold = doc.add_object(type1_font("Helvetica-Bold"));

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    let mut image_count = 0usize;

    for page in pages {
        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();

        for placement in &page.placements {
            match placement {
                Placement::Text(text) => {
                    draw_text(&mut operations, text, geometry, measurer, options)
                }
                Placement::Image(img) => match embed_image(&mut doc, &img.image) {
                    Ok(image_id) => {
                        image_count += 1;
                        let name = format!("Im{image_count}");
                        draw_image(&mut operations, &name, img, geometry);
                        xobjects.set(name, image_id);
                    }
                    Err(e) => {
                        warn!(field = %img.field, "Skipping photo in PDF: {e}");
                    }
                },
            }
        }

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let resources = dictionary! {
            "Font" => dictionary! {
                FONT_REGULAR => font_regular,
                FONT_BOLD => font_bold,
            },
            "XObject" => xobjects,
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(geometry.width_pt()),
            Object::Real(geometry.height_pt()),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if options.compress {
        doc.compress();
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut Cursor::new(&mut bytes))
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    debug!(
        pages = page_count,
        images = image_count,
        bytes = bytes.len(),
        "PDF rendered"
    );
    Ok(bytes)
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn type1_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn to_pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

/// Latin-1 bytes for a WinAnsi-encoded font. Other characters become `?`;
/// control characters are dropped.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn draw_text(
    operations: &mut Vec<Operation>,
    text: &TextPlacement,
    geometry: &PageGeometry,
    measurer: &dyn TextMeasurer,
    options: &RenderOptions,
) {
    let lines = match text.max_width {
        Some(max_width) => measurer.wrap_lines(&text.text, text.style, text.font_size_pt, max_width),
        None => vec![text.text.replace('\n', " ")],
    };
    if lines.is_empty() {
        return;
    }

    let font = match text.style {
        TextStyle::Normal => FONT_REGULAR,
        TextStyle::Bold => FONT_BOLD,
    };
    let Rgb(r, g, b) = match text.role {
        TextRole::Title => options.title_color,
        TextRole::Label | TextRole::Value => Rgb::BLACK,
    };
    let line_height_pt = to_pt(measurer.line_height(text.font_size_pt));

    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![font.into(), Object::Real(text.font_size_pt)],
    ));
    operations.push(Operation::new(
        "rg",
        vec![Object::Real(r), Object::Real(g), Object::Real(b)],
    ));
    operations.push(Operation::new(
        "Td",
        vec![
            Object::Real(to_pt(text.x)),
            Object::Real(geometry.height_pt() - to_pt(text.y)),
        ],
    ));
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new(
                "Td",
                vec![Object::Real(0.0), Object::Real(-line_height_pt)],
            ));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
}

fn draw_image(
    operations: &mut Vec<Operation>,
    name: &str,
    img: &ImagePlacement,
    geometry: &PageGeometry,
) {
    let bottom = geometry.height_pt() - to_pt(img.y + img.height);
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        vec![
            Object::Real(to_pt(img.width)),
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(to_pt(img.height)),
            Object::Real(to_pt(img.x)),
            Object::Real(bottom),
        ],
    ));
    operations.push(Operation::new("Do", vec![name.into()]));
    operations.push(Operation::new("Q", vec![]));
}

/// Decodes a photo data URI and adds it as a DeviceRGB image XObject.
fn embed_image(doc: &mut Document, image_ref: &ImageRef) -> Result<ObjectId, RenderError> {
    let document = DocumentData::parse(image_ref.as_data_uri())
        .map_err(|e| RenderError::Image(e.to_string()))?;
    if !document.is_image() {
        return Err(RenderError::Image(format!(
            "'{}' is not an image",
            document.media_type()
        )));
    }
    let bytes = document
        .decode()
        .map_err(|e| RenderError::Image(e.to_string()))?;
    let decoded =
        image::load_from_memory(&bytes).map_err(|e| RenderError::Image(e.to_string()))?;
    let (width, height) = decoded.dimensions();
    let rgb = decoded.to_rgb8().into_raw();

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    );
    Ok(doc.add_object(stream))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
