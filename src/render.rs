//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).
//!
//! [`Painter`] and [`ImageRegistry`] are shared with the flow backend so both
//! emit text, rules and images the same way.

use std::collections::HashMap;

use printpdf::*;

use crate::error::BackendError;
use crate::images::ImageStore;
use crate::layout_config::*;

const MM_PER_PT: f32 = 0.352_778;

/// A printpdf XObject together with the pixel dimensions of the source image.
pub(crate) struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Every image of a document registered once as a reusable XObject.
pub(crate) struct ImageRegistry {
    resources: HashMap<String, ImageResource>,
}

impl ImageRegistry {
    pub(crate) fn register_all(doc: &mut PdfDocument, store: &ImageStore) -> Self {
        let mut resources = HashMap::new();
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        for (src, img) in store.iter() {
            match RawImage::decode_from_bytes(&img.bytes, &mut warnings) {
                Ok(raw) => {
                    let xobj_id = doc.add_image(&raw);
                    resources.insert(
                        src.clone(),
                        ImageResource {
                            xobj_id,
                            px_width: img.width,
                            px_height: img.height,
                        },
                    );
                }
                Err(e) => log::warn!("Skipping image: PDF encode error: {e}"),
            }
        }
        Self { resources }
    }

    pub(crate) fn get(&self, src: &str) -> Option<&ImageResource> {
        self.resources.get(src)
    }
}

pub(crate) fn builtin_font(bold: bool, italic: bool) -> BuiltinFont {
    match (bold, italic) {
        (true, true) => BuiltinFont::HelveticaBoldOblique,
        (true, false) => BuiltinFont::HelveticaBold,
        (false, true) => BuiltinFont::HelveticaOblique,
        (false, false) => BuiltinFont::Helvetica,
    }
}

fn rgb(c: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Encode `s` as Windows-1252, the WinAnsiEncoding used by the builtin
/// fonts. Characters outside it become `?`.
fn to_winlatin(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect()
}

/// A `Tj` operator showing already-encoded bytes as a hex string.
/// printpdf only takes `String` text for builtin fonts, so the bytes are
/// passed as a raw operand instead.
fn show_encoded_text(bytes: Vec<u8>) -> Op {
    Op::Unknown {
        key: "Tj".to_string(),
        value: vec![DictItem::String {
            data: bytes,
            literal: false,
        }],
    }
}

/// Collects drawing ops for one page in top-left-origin coordinates.
pub(crate) struct Painter {
    ops: Vec<Op>,
    page_height: f32,
}

impl Painter {
    pub(crate) fn new(page_height: f32) -> Self {
        Self {
            ops: Vec::new(),
            page_height,
        }
    }

    /// PDF origin is bottom-left.
    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    pub(crate) fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [f32; 4]) {
        let (top, bottom) = (self.flip(y), self.flip(y + h));
        self.ops.push(Op::SetFillColor { col: rgb(color) });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![
                        point(x, bottom),
                        point(x + w, bottom),
                        point(x + w, top),
                        point(x, top),
                    ],
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    pub(crate) fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, border: &BorderStyle) {
        let (top, bottom) = (self.flip(y), self.flip(y + h));
        self.ops.push(Op::SetOutlineColor {
            col: rgb(border.color),
        });
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(border.width),
        });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: vec![
                    point(x, top),
                    point(x + w, top),
                    point(x + w, bottom),
                    point(x, bottom),
                ],
                is_closed: true,
            },
        });
    }

    pub(crate) fn hline(&mut self, x1: f32, x2: f32, y: f32, width: f32, color: [f32; 4]) {
        let y = self.flip(y);
        self.ops.push(Op::SetOutlineColor { col: rgb(color) });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(width) });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: vec![point(x1, y), point(x2, y)],
                is_closed: false,
            },
        });
    }

    /// Write one line of text with its baseline at `baseline_y`.
    pub(crate) fn text(
        &mut self,
        x: f32,
        baseline_y: f32,
        text: &str,
        font_size: f32,
        font: BuiltinFont,
        color: [f32; 4],
    ) {
        if text.is_empty() {
            return;
        }
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(x),
                y: Pt(self.flip(baseline_y)),
            },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(font_size),
            font,
        });
        self.ops.push(Op::SetFillColor { col: rgb(color) });
        // Empty: only registers `font` in the page resources.
        self.ops.push(Op::WriteTextBuiltinFont {
            items: Vec::new(),
            font,
        });
        self.ops.push(show_encoded_text(to_winlatin(text)));
        self.ops.push(Op::EndTextSection);
    }

    /// Place an image so it fills the `w` x `h` box at (`x`, `y`).
    pub(crate) fn image(&mut self, res: &ImageResource, x: f32, y: f32, w: f32, h: f32) {
        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px.
        let scale_x = if res.px_width > 0 {
            w / res.px_width as f32
        } else {
            1.0
        };
        let scale_y = if res.px_height > 0 {
            h / res.px_height as f32
        } else {
            1.0
        };
        self.ops.push(Op::UseXobject {
            id: res.xobj_id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(self.flip(y + h))),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        });
    }

    pub(crate) fn into_page(self, page_width: f32) -> PdfPage {
        PdfPage::new(
            Mm(page_width * MM_PER_PT),
            Mm(self.page_height * MM_PER_PT),
            self.ops,
        )
    }
}

/// Attach pages and serialise; an empty page list yields one blank page.
pub(crate) fn finish(
    mut doc: PdfDocument,
    mut pages: Vec<PdfPage>,
    page_width: f32,
    page_height: f32,
) -> Vec<u8> {
    if pages.is_empty() {
        pages.push(Painter::new(page_height).into_page(page_width));
    }
    doc.with_pages(pages);
    // Raw `Tj` operands are written as `Op::Unknown`, which the default
    // options skip.
    let options = PdfSaveOptions {
        secure: false,
        ..PdfSaveOptions::default()
    };
    doc.save(&options, &mut Vec::new())
}

/// Render a LayoutConfig into PDF bytes. Images missing from `images` are
/// skipped.
pub fn render_pdf(config: &LayoutConfig, images: &ImageStore) -> Result<Vec<u8>, BackendError> {
    if config.page_width_pt <= 0.0 || config.page_height_pt <= 0.0 {
        return Err(BackendError::Render(format!(
            "invalid page size {}x{}",
            config.page_width_pt, config.page_height_pt
        )));
    }
    let mut doc = PdfDocument::new(&config.title);
    let registry = ImageRegistry::register_all(&mut doc, images);

    let pages = config
        .pages
        .iter()
        .map(|page| {
            let mut painter = Painter::new(config.page_height_pt);
            if let Some(bg) = &config.page_background {
                if let Some(color) = bg.color {
                    painter.fill_rect(0.0, 0.0, config.page_width_pt, config.page_height_pt, color);
                }
                if let Some(image) = &bg.image {
                    render_box(&mut painter, image, &registry);
                }
            }
            for lbox in &page.boxes {
                render_box(&mut painter, lbox, &registry);
            }
            painter.into_page(config.page_width_pt)
        })
        .collect();

    Ok(finish(doc, pages, config.page_width_pt, config.page_height_pt))
}

/// Recursively render a LayoutBox and its children.
fn render_box(painter: &mut Painter, lbox: &LayoutBox, images: &ImageRegistry) {
    if let Some(bg) = lbox.background_color {
        painter.fill_rect(lbox.x, lbox.y, lbox.width, lbox.height, bg);
    }
    if let Some(src) = &lbox.background_image {
        if let Some(res) = images.get(src) {
            painter.image(res, lbox.x, lbox.y, lbox.width, lbox.height);
        }
    }
    if let Some(border) = &lbox.border {
        painter.stroke_rect(lbox.x, lbox.y, lbox.width, lbox.height, border);
    }
    if let Some(rule) = &lbox.rule {
        let mid = lbox.y + lbox.height / 2.0;
        painter.hline(lbox.x, lbox.x + lbox.width, mid, rule.width, rule.color);
    }

    if let Some(text) = &lbox.text {
        let font = builtin_font(text.bold, text.italic);
        for line in &text.lines {
            let x = lbox.x + line.x_offset;
            let baseline = lbox.y + line.y_offset;
            painter.text(x, baseline, &line.text, text.font_size, font, text.color);
            if text.underline && !line.text.is_empty() {
                let end = lbox.x + lbox.width - line.x_offset;
                painter.hline(x, end, baseline + text.font_size * 0.1, 0.5, text.color);
            }
        }
        if let Some(marker) = &text.list_marker {
            painter.text(
                lbox.x - 12.0,
                lbox.y + text.font_size * 0.9,
                marker,
                text.font_size,
                BuiltinFont::Helvetica,
                text.color,
            );
        }
    }

    if let Some(img) = &lbox.image {
        match images.get(&img.src) {
            Some(res) => painter.image(res, lbox.x, lbox.y, img.width, img.height),
            None => log::debug!("Image not embedded, leaving its box empty"),
        }
    }

    for child in &lbox.children {
        render_box(painter, child, images);
    }
}
