//! Pagination – splits positioned boxes into pages.
//!
//! Handles:
//! - page boundaries for the configured page size and margin
//! - `page-break-before` / `page-break-after` / `page-break-inside: avoid`
//! - table row splitting, repeating `<thead>` rows on continuation pages
//! - dropping backgrounds unless `print-color-adjust: exact` applies

use crate::fonts::FontManager;
use crate::layout::{BoxContent, BoxKind, PositionedBox};
use crate::layout_config::*;
use crate::style::{self, ComputedStyle};

/// Default page margin in points.
pub const PAGE_MARGIN_PT: f32 = 40.0;

/// Page geometry in points.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

/// Expand pure-container boxes taller than a page so their children can be
/// placed individually.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && pbox.kind == BoxKind::Block
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

struct Paginator<'a> {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start_doc_y: f32,
    geometry: PageGeometry,
    fonts: &'a FontManager,
}

impl<'a> Paginator<'a> {
    fn new_page(&mut self, start_doc_y: f32) {
        let next = PageLayout {
            page_index: self.config.pages.len() + 1,
            boxes: Vec::new(),
        };
        self.config
            .pages
            .push(std::mem::replace(&mut self.current, next));
        self.page_start_doc_y = start_doc_y;
    }

    fn place(&mut self, pbox: &PositionedBox) {
        let y_on_page = (pbox.y - self.page_start_doc_y).max(0.0);
        let abs_y = self.geometry.margin + y_on_page;
        let layout_box = build_layout_box(pbox, abs_y, self.fonts);
        self.current.boxes.push(layout_box);
    }

    fn overflows(&self, pbox: &PositionedBox) -> bool {
        let y_on_page = (pbox.y - self.page_start_doc_y).max(0.0);
        y_on_page + pbox.height > self.geometry.content_height()
    }

    fn split_table(&mut self, table: &PositionedBox) {
        let headers: Vec<&PositionedBox> = table
            .children
            .iter()
            .take_while(|r| r.kind == BoxKind::Row { header: true })
            .collect();
        let header_height: f32 = headers.iter().map(|h| h.height).sum();

        for row in &table.children {
            let is_header = row.kind == BoxKind::Row { header: true };
            if !is_header && self.overflows(row) && !self.current.boxes.is_empty() {
                self.new_page(row.y);
                if !headers.is_empty() {
                    // Repeat the header rows, then continue below them.
                    let mut y = self.geometry.margin;
                    for header in &headers {
                        self.current
                            .boxes
                            .push(build_layout_box(header, y, self.fonts));
                        y += header.height;
                    }
                    self.page_start_doc_y = row.y - header_height;
                }
            }
            self.place(row);
        }
    }
}

/// Convert positioned boxes into a paginated [`LayoutConfig`].
pub fn paginate(
    boxes: &[PositionedBox],
    geometry: PageGeometry,
    title: &str,
    fonts: &FontManager,
) -> LayoutConfig {
    let content_height = geometry.content_height();
    let flat = flatten_for_pagination(boxes, content_height);

    let mut p = Paginator {
        config: LayoutConfig::new(title, geometry.width, geometry.height),
        current: PageLayout {
            page_index: 0,
            boxes: Vec::new(),
        },
        page_start_doc_y: 0.0,
        geometry,
        fonts,
    };

    for pbox in flat {
        if pbox.style.page_break_before && !p.current.boxes.is_empty() {
            p.new_page(pbox.y);
        }

        if p.overflows(pbox) && !p.current.boxes.is_empty() {
            if pbox.kind == BoxKind::Table && !pbox.style.page_break_inside_avoid {
                p.split_table(pbox);
                continue;
            }
            p.new_page(pbox.y);
        } else if p.overflows(pbox) && pbox.kind == BoxKind::Table {
            // A table taller than a whole page starting on a fresh page.
            p.split_table(pbox);
            continue;
        }

        p.place(pbox);

        if pbox.style.page_break_after {
            p.new_page(pbox.y + pbox.height);
        }
    }

    let Paginator {
        mut config, current, ..
    } = p;
    if !current.boxes.is_empty() || config.pages.is_empty() {
        config.pages.push(current);
    }
    config
}

/// Background colour/image of a box, honouring `print-color-adjust`.
fn background_of(style: &ComputedStyle) -> (Option<[f32; 4]>, Option<String>) {
    if !style.prints_backgrounds() {
        return (None, None);
    }
    let color = (!style.background_color.is_transparent()).then(|| style.background_color.to_array());
    (color, style.background_image.clone())
}

/// Build the page background from the `<body>` style. Images are centered in
/// the content area and scaled down to fit, keeping their aspect ratio.
pub fn page_background(
    body: &ComputedStyle,
    geometry: PageGeometry,
    image_size: Option<(f32, f32)>,
) -> Option<PageBackground> {
    let (color, image_src) = background_of(body);
    let image = match (image_src, image_size) {
        (Some(src), Some((iw, ih))) if iw > 0.0 && ih > 0.0 => {
            let scale = (geometry.content_width() / iw)
                .min(geometry.content_height() / ih)
                .min(1.0);
            let (w, h) = (iw * scale, ih * scale);
            let mut b = LayoutBox::new(
                (geometry.width - w) / 2.0,
                (geometry.height - h) / 2.0,
                w,
                h,
            );
            b.image = Some(ImageContent {
                src,
                width: w,
                height: h,
            });
            Some(b)
        }
        _ => None,
    };
    (color.is_some() || image.is_some()).then_some(PageBackground { color, image })
}

/// Recursively build a LayoutBox whose coordinates are page-absolute.
/// `x` is already page-absolute from layout; children keep their offset
/// relative to the parent (`child.y - parent.y`).
fn build_layout_box(pbox: &PositionedBox, abs_y: f32, fonts: &FontManager) -> LayoutBox {
    let mut lb = LayoutBox::new(pbox.x, abs_y, pbox.width, pbox.height);
    let s = &pbox.style;

    if pbox.kind != BoxKind::Text {
        let (color, image) = background_of(s);
        lb.background_color = color;
        lb.background_image = image;
    }

    if pbox.kind == BoxKind::Rule {
        lb.rule = Some(BorderStyle {
            width: pbox.height.max(0.5),
            color: s.border_color.to_array(),
        });
    } else if s.border_width > 0.0 && pbox.kind != BoxKind::Text {
        lb.border = Some(BorderStyle {
            width: s.border_width,
            color: s.border_color.to_array(),
        });
    }

    let line_height = s.line_height_pt();
    match &pbox.content {
        BoxContent::Text { lines, line_widths } => {
            let text_lines = lines
                .iter()
                .zip(line_widths)
                .enumerate()
                .map(|(i, (line, width))| TextLine {
                    text: line.clone(),
                    x_offset: match s.text_align {
                        style::TextAlign::Left => 0.0,
                        style::TextAlign::Center => ((pbox.width - width) / 2.0).max(0.0),
                        style::TextAlign::Right => (pbox.width - width).max(0.0),
                    },
                    y_offset: i as f32 * line_height
                        + baseline_offset(s, line_height, fonts),
                })
                .collect();
            lb.text = Some(text_content(s, text_lines, None));
        }
        BoxContent::ListItem { marker } => {
            lb.text = Some(text_content(s, Vec::new(), Some(marker.clone())));
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        lb.children.push(build_layout_box(child, child_abs_y, fonts));
    }
    lb
}

/// Distance from the top of a line box to its baseline (half-leading plus
/// ascender).
fn baseline_offset(s: &ComputedStyle, line_height: f32, fonts: &FontManager) -> f32 {
    let glyph = fonts.glyph_height(s.font_size, s.is_bold(), s.is_italic());
    (line_height - glyph) / 2.0 + fonts.ascender_px(s.font_size, s.is_bold(), s.is_italic())
}

fn text_content(s: &ComputedStyle, lines: Vec<TextLine>, list_marker: Option<String>) -> TextContent {
    TextContent {
        lines,
        font_size: s.font_size,
        bold: s.is_bold(),
        italic: s.is_italic(),
        color: s.color.to_array(),
        line_height: s.line_height_pt(),
        underline: s.text_decoration == style::TextDecoration::Underline,
        list_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::images::ImageStore;
    use crate::layout::compute_layout;
    use crate::style::{build_styled_tree, StyleResolver};
    use crate::stylesheet::Stylesheet;

    const A4: PageGeometry = PageGeometry {
        width: 595.0,
        height: 842.0,
        margin: PAGE_MARGIN_PT,
    };

    fn paginate_html(html: &str, css: &str) -> LayoutConfig {
        let dom = parse_html(html);
        let sheet = Stylesheet::parse(css);
        let resolver = StyleResolver::new(&sheet, true);
        let root = ComputedStyle::default();
        let styled = build_styled_tree(&dom, &resolver, &mut Vec::new(), &root).unwrap();
        let fonts = FontManager::default();
        let images = ImageStore::new(None);
        let boxes =
            compute_layout(&styled, &root, A4.content_width(), A4.margin, &fonts, &images).unwrap();
        paginate(&boxes, A4, "test", &fonts)
    }

    fn texts(b: &LayoutBox, out: &mut Vec<String>) {
        if let Some(t) = &b.text {
            out.extend(t.lines.iter().map(|l| l.text.clone()));
        }
        for c in &b.children {
            texts(c, out);
        }
    }

    #[test]
    fn single_page() {
        let config = paginate_html("<p>Short text</p>", "");
        assert_eq!(config.page_count(), 1);
        assert_eq!(config.title, "test");
    }

    #[test]
    fn multiple_pages() {
        let html: String = (0..80)
            .map(|i| format!("<p>Paragraph {i} with some text</p>"))
            .collect();
        let config = paginate_html(&html, "");
        assert!(config.page_count() > 1, "got {}", config.page_count());
    }

    #[test]
    fn explicit_page_break() {
        let config = paginate_html(
            r#"<p>one</p><div style="page-break-before: always">two</div>"#,
            "",
        );
        assert_eq!(config.page_count(), 2);
    }

    #[test]
    fn long_table_repeats_header() {
        let rows: String = (0..120)
            .map(|i| format!("<tr><td>Item {i}</td><td>1,00</td></tr>"))
            .collect();
        let html = format!(
            "<table><thead><tr><th>Descricao</th><th>Valor</th></tr></thead><tbody>{rows}</tbody></table>"
        );
        let config = paginate_html(&html, "");
        assert!(config.page_count() > 1);
        for page in &config.pages {
            let mut out = Vec::new();
            texts(&page.boxes[0], &mut out);
            assert_eq!(out.first().map(String::as_str), Some("Descricao"));
            assert!((page.boxes[0].y - PAGE_MARGIN_PT).abs() < 0.01);
        }
    }

    #[test]
    fn backgrounds_need_exact_color_adjust() {
        let economy = paginate_html(r#"<div style="background-color: #eee">x</div>"#, "");
        assert!(economy.pages[0].boxes[0].background_color.is_none());

        let exact = paginate_html(
            r#"<div style="background-color: #eee; print-color-adjust: exact">x</div>"#,
            "",
        );
        assert!(exact.pages[0].boxes[0].background_color.is_some());
    }

    #[test]
    fn right_aligned_text_is_offset() {
        let config = paginate_html(r#"<p style="text-align: right">1.050,00</p>"#, "");
        let p = &config.pages[0].boxes[0];
        let line = &p.children[0].text.as_ref().unwrap().lines[0];
        assert!(line.x_offset > 400.0);
    }

    #[test]
    fn body_background_image_is_centered() {
        let body = ComputedStyle {
            print_color_adjust: style::PrintColorAdjust::Exact,
            background_image: Some("wm.png".into()),
            ..ComputedStyle::default()
        };
        let bg = page_background(&body, A4, Some((1030.0, 200.0))).unwrap();
        let img = bg.image.unwrap();
        assert!((img.width - A4.content_width()).abs() < 0.01);
        assert!((img.x - A4.margin).abs() < 0.01);
        assert!(page_background(&ComputedStyle::default(), A4, Some((10.0, 10.0))).is_none());
    }
}
