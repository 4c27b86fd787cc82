//! Layout engine – builds a Taffy flexbox tree from the styled DOM, computes
//! it, and flattens the result into positioned boxes in document space.
//!
//! Block flow maps to flex columns. Runs of inline content become a single
//! wrapped text leaf. Tables are laid out as flex rows whose cells share the
//! column widths computed from the first row.

use std::collections::HashMap;

use taffy::{
    AvailableSpace, LengthPercentage, LengthPercentageAuto, NodeId, Rect, Size, Style, TaffyTree,
};

use crate::dom::Tag;
use crate::error::BackendError;
use crate::fonts::{wrap_text, FontManager};
use crate::images::ImageStore;
use crate::style::{self, ComputedStyle, Dimension, Display, StyledNode};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// What a positioned box is, as far as pagination cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Block,
    Table,
    /// A table row; `header` rows repeat at the top of continuation pages.
    Row { header: bool },
    Cell,
    Text,
    Image,
    Rule,
}

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: BoxKind,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text {
        lines: Vec<String>,
        /// Measured width of each line, for alignment.
        line_widths: Vec<f32>,
    },
    Image {
        src: String,
    },
    /// List item marker drawn in the left gutter.
    ListItem {
        marker: String,
    },
}

struct NodeMeta {
    kind: BoxKind,
    style: ComputedStyle,
    content: BoxContent,
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    images: &'a ImageStore,
    meta: HashMap<NodeId, NodeMeta>,
}

/// True for nodes that take part in an inline formatting context: text and
/// inline elements whose whole subtree is inline.
fn flows_inline(node: &StyledNode) -> bool {
    match node {
        StyledNode::Text { .. } => true,
        StyledNode::Element { style, children, .. } => {
            style.display == Display::Inline && children.iter().all(flows_inline)
        }
    }
}

/// Flatten an inline subtree into styled text runs. `<br>` becomes `\n`.
fn collect_runs<'n>(node: &'n StyledNode, runs: &mut Vec<(String, &'n ComputedStyle)>) {
    match node {
        StyledNode::Text { text, style } => runs.push((text.clone(), style)),
        StyledNode::Element {
            tag: Tag::Br, style, ..
        } => runs.push(("\n".to_string(), style)),
        StyledNode::Element { children, .. } => {
            for child in children {
                collect_runs(child, runs);
            }
        }
    }
}

/// Collapse whitespace inside each line while keeping hard breaks.
fn normalize_whitespace(raw: &str) -> String {
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

fn length(v: f32) -> LengthPercentage {
    LengthPercentage::Length(v)
}

fn edges_lp(e: &style::Edges) -> Rect<LengthPercentage> {
    Rect {
        top: length(e.top),
        right: length(e.right),
        bottom: length(e.bottom),
        left: length(e.left),
    }
}

fn edges_lpa(e: &style::Edges) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(e.top),
        right: LengthPercentageAuto::Length(e.right),
        bottom: LengthPercentageAuto::Length(e.bottom),
        left: LengthPercentageAuto::Length(e.left),
    }
}

fn dim_to_taffy(d: Dimension) -> taffy::Dimension {
    match d {
        Dimension::Auto => taffy::Dimension::Auto,
        Dimension::Px(v) => taffy::Dimension::Length(v),
        Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

/// Border-box width of a block given the width available to it.
fn outer_width(style: &ComputedStyle, available: f32) -> f32 {
    let mut w = style
        .width
        .resolve(available)
        .unwrap_or(available - style.margin.horizontal());
    if let Some(max) = style.max_width.resolve(available) {
        w = w.min(max);
    }
    w.max(0.0)
}

fn inner_width(style: &ComputedStyle, outer: f32) -> f32 {
    (outer - style.padding.horizontal() - 2.0 * style.border_width).max(0.0)
}

/// Common box properties (spacing, border, explicit size).
fn box_style(s: &ComputedStyle) -> Style {
    Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        },
        max_size: Size {
            width: dim_to_taffy(s.max_width),
            height: taffy::Dimension::Auto,
        },
        margin: edges_lpa(&s.margin),
        padding: edges_lp(&s.padding),
        border: Rect {
            top: length(s.border_width),
            right: length(s.border_width),
            bottom: length(s.border_width),
            left: length(s.border_width),
        },
        flex_shrink: 0.0,
        ..Default::default()
    }
}

fn flex_style(s: &ComputedStyle) -> Style {
    let mut ts = box_style(s);
    ts.flex_direction = match s.flex_direction {
        style::FlexDirection::Row => taffy::FlexDirection::Row,
        style::FlexDirection::Column => taffy::FlexDirection::Column,
    };
    ts.flex_wrap = match s.flex_wrap {
        style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
        style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
    };
    ts.justify_content = Some(match s.justify_content {
        style::JustifyContent::Start => taffy::JustifyContent::Start,
        style::JustifyContent::End => taffy::JustifyContent::End,
        style::JustifyContent::Center => taffy::JustifyContent::Center,
        style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
        style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
    });
    ts.align_items = Some(match s.align_items {
        style::AlignItems::Start => taffy::AlignItems::Start,
        style::AlignItems::End => taffy::AlignItems::End,
        style::AlignItems::Center => taffy::AlignItems::Center,
        style::AlignItems::Stretch => taffy::AlignItems::Stretch,
    });
    ts.gap = Size {
        width: length(s.gap),
        height: length(s.gap),
    };
    ts
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, images: &'a ImageStore) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            images,
            meta: HashMap::new(),
        }
    }

    fn register(&mut self, node: NodeId, kind: BoxKind, style: &ComputedStyle, content: BoxContent) {
        self.meta.insert(
            node,
            NodeMeta {
                kind,
                style: style.clone(),
                content,
            },
        );
    }

    /// Build the children of a block. Consecutive inline nodes are merged
    /// into anonymous text leaves wrapped to `available`.
    fn build_children(
        &mut self,
        parent_tag: Option<&Tag>,
        parent_style: &ComputedStyle,
        children: &[StyledNode],
        available: f32,
        fill_text: bool,
    ) -> Result<Vec<NodeId>, BackendError> {
        let mut nodes = Vec::new();
        let mut pending: Vec<&StyledNode> = Vec::new();
        let mut list_counter = 0u32;

        for child in children {
            if flows_inline(child) {
                pending.push(child);
                continue;
            }
            if let Some(leaf) = self.flush_inline(&pending, parent_style, available, fill_text)? {
                nodes.push(leaf);
            }
            pending.clear();

            let id = self.build_block(child, available)?;
            if let StyledNode::Element { tag: Tag::Li, .. } = child {
                list_counter += 1;
                let marker = if parent_tag == Some(&Tag::Ol) {
                    format!("{list_counter}.")
                } else {
                    "\u{2022}".to_string()
                };
                if let Some(meta) = self.meta.get_mut(&id) {
                    meta.content = BoxContent::ListItem { marker };
                }
            }
            nodes.push(id);
        }
        if let Some(leaf) = self.flush_inline(&pending, parent_style, available, fill_text)? {
            nodes.push(leaf);
        }
        Ok(nodes)
    }

    /// Merge pending inline nodes into one text leaf. Blank runs produce
    /// nothing.
    fn flush_inline(
        &mut self,
        pending: &[&StyledNode],
        parent_style: &ComputedStyle,
        available: f32,
        fill: bool,
    ) -> Result<Option<NodeId>, BackendError> {
        if pending.is_empty() {
            return Ok(None);
        }
        let mut runs = Vec::new();
        for node in pending {
            collect_runs(node, &mut runs);
        }
        let text = normalize_whitespace(&runs.iter().map(|(t, _)| t.as_str()).collect::<String>());
        if text.is_empty() {
            return Ok(None);
        }

        // Typography follows the runs when they agree (e.g. `<td><b>x</b></td>`).
        let visible: Vec<&ComputedStyle> = runs
            .iter()
            .filter(|(t, _)| !t.trim().is_empty())
            .map(|(_, s)| *s)
            .collect();
        let mut text_style = match visible.first() {
            Some(first) => (*first).clone(),
            None => parent_style.clone(),
        };
        if visible.iter().any(|s| !s.is_bold()) {
            text_style.font_weight = style::FontWeight::Normal;
        }
        if visible.iter().any(|s| !s.is_italic()) {
            text_style.font_style = style::FontStyle::Normal;
        }
        if visible.iter().any(|s| s.font_size != text_style.font_size || s.color != text_style.color) {
            text_style.font_size = parent_style.font_size;
            text_style.color = parent_style.color;
        }
        text_style.text_align = parent_style.text_align;
        text_style.line_height = parent_style.line_height;

        self.build_text_leaf(&text, &text_style, available, fill).map(Some)
    }

    fn build_text_leaf(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        wrap_width: f32,
        fill: bool,
    ) -> Result<NodeId, BackendError> {
        let bold = style.is_bold();
        let italic = style.is_italic();
        let lines = wrap_text(text, style.font_size, bold, italic, wrap_width, self.fonts);
        let line_widths: Vec<f32> = lines
            .iter()
            .map(|l| self.fonts.measure_text_width(l, style.font_size, bold, italic))
            .collect();
        let text_width = line_widths.iter().copied().fold(0.0f32, f32::max);
        let width = if fill { wrap_width.max(text_width) } else { text_width };
        let height = lines.len() as f32 * style.line_height_pt();

        let node = self.taffy.new_leaf(Style {
            size: Size {
                width: taffy::Dimension::Length(width),
                height: taffy::Dimension::Length(height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        })?;
        self.register(node, BoxKind::Text, style, BoxContent::Text { lines, line_widths });
        Ok(node)
    }

    /// Build a block-level styled node given the width available to it.
    fn build_block(&mut self, styled: &StyledNode, available: f32) -> Result<NodeId, BackendError> {
        let StyledNode::Element {
            tag,
            style,
            children,
            attrs,
        } = styled
        else {
            return Err(BackendError::Layout("text outside an inline context".into()));
        };

        match (tag, style.display) {
            (Tag::Img, _) => self.build_image(style, attrs.get("src"), available),
            (Tag::Hr, _) => self.build_rule(style),
            (_, Display::Table) => self.build_table(style, children, available),
            (_, Display::Flex) => {
                let outer = outer_width(style, available);
                let inner = inner_width(style, outer);
                let ids = if style.flex_direction == style::FlexDirection::Row {
                    self.build_flex_row_children(style, children, inner)?
                } else {
                    self.build_children(Some(tag), style, children, inner, true)?
                };
                let node = self.taffy.new_with_children(flex_style(style), &ids)?;
                self.register(node, BoxKind::Block, style, BoxContent::None);
                Ok(node)
            }
            _ => {
                let outer = outer_width(style, available);
                let inner = inner_width(style, outer);
                let ids = self.build_children(Some(tag), style, children, inner, true)?;
                let node = self.taffy.new_with_children(box_style(style), &ids)?;
                self.register(node, BoxKind::Block, style, BoxContent::None);
                Ok(node)
            }
        }
    }

    /// Children of a row-direction flex container share its inner width:
    /// explicit widths first, the rest split evenly.
    fn build_flex_row_children(
        &mut self,
        style: &ComputedStyle,
        children: &[StyledNode],
        inner: f32,
    ) -> Result<Vec<NodeId>, BackendError> {
        let items: Vec<&StyledNode> = children
            .iter()
            .filter(|c| !matches!(c, StyledNode::Text { text, .. } if text.trim().is_empty()))
            .collect();
        let count = items.len().max(1);
        let gaps = style.gap * (count - 1) as f32;
        let fixed: f32 = items
            .iter()
            .filter_map(|c| c.style().width.resolve(inner))
            .sum();
        let auto_count = items
            .iter()
            .filter(|c| c.style().width.resolve(inner).is_none())
            .count()
            .max(1);
        let share = ((inner - gaps - fixed) / auto_count as f32).max(1.0);

        let mut ids = Vec::new();
        for item in items {
            let width = item.style().width.resolve(inner).unwrap_or(share);
            let id = if flows_inline(item) {
                let leaf = self.flush_inline(&[item], style, width, false)?;
                match leaf {
                    Some(id) => id,
                    None => continue,
                }
            } else {
                let id = self.build_block(item, width)?;
                if item.style().flex_grow > 0.0 {
                    let mut ts = self.taffy.style(id)?.clone();
                    ts.flex_grow = item.style().flex_grow;
                    ts.flex_basis = taffy::Dimension::Length(0.0);
                    ts.flex_shrink = 1.0;
                    self.taffy.set_style(id, ts)?;
                }
                id
            };
            ids.push(id);
        }
        Ok(ids)
    }

    fn build_rule(&mut self, style: &ComputedStyle) -> Result<NodeId, BackendError> {
        let node = self.taffy.new_leaf(Style {
            size: Size {
                width: taffy::Dimension::Percent(1.0),
                height: taffy::Dimension::Length(style.border_width.max(0.5)),
            },
            margin: edges_lpa(&style.margin),
            flex_shrink: 0.0,
            ..Default::default()
        })?;
        self.register(node, BoxKind::Rule, style, BoxContent::None);
        Ok(node)
    }

    /// Images take their explicit size, or the intrinsic size scaled to keep
    /// the aspect ratio, clamped to the available width.
    fn build_image(
        &mut self,
        style: &ComputedStyle,
        src: Option<&String>,
        available: f32,
    ) -> Result<NodeId, BackendError> {
        let src = src.cloned().unwrap_or_default();
        let intrinsic = self.images.intrinsic_size(&src);
        let known_w = style.width.resolve(available);
        let known_h = match style.height {
            Dimension::Px(h) => Some(h),
            _ => None,
        };
        let (mut w, mut h) = match (known_w, known_h, intrinsic) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some((iw, ih))) => (w, w * ih / iw),
            (None, Some(h), Some((iw, ih))) => (h * iw / ih, h),
            (None, None, Some((iw, ih))) => (iw, ih),
            (w, h, None) => (w.unwrap_or(0.0), h.unwrap_or(0.0)),
        };
        if w > available && w > 0.0 {
            h *= available / w;
            w = available;
        }

        let mut ts = box_style(style);
        ts.size = Size {
            width: taffy::Dimension::Length(w),
            height: taffy::Dimension::Length(h),
        };
        ts.padding = Rect::zero();
        ts.border = Rect::zero();
        let node = self.taffy.new_leaf(ts)?;
        self.register(node, BoxKind::Image, style, BoxContent::Image { src });
        Ok(node)
    }

    fn build_table(
        &mut self,
        style: &ComputedStyle,
        children: &[StyledNode],
        available: f32,
    ) -> Result<NodeId, BackendError> {
        let outer = outer_width(style, available);
        let inner = inner_width(style, outer);

        // Row groups are transparent; remember which rows came from <thead>.
        let mut rows: Vec<(&StyledNode, bool)> = Vec::new();
        for child in children {
            let StyledNode::Element {
                tag,
                style: child_style,
                children: grandchildren,
                ..
            } = child
            else {
                continue;
            };
            match child_style.display {
                Display::TableRow => rows.push((child, false)),
                Display::TableRowGroup => {
                    let header = *tag == Tag::Thead;
                    rows.extend(
                        grandchildren
                            .iter()
                            .filter(|r| r.style().display == Display::TableRow)
                            .map(|r| (r, header)),
                    );
                }
                _ => {}
            }
        }

        let columns = rows
            .first()
            .map(|(row, _)| column_widths(row, inner))
            .unwrap_or_default();

        let mut row_ids = Vec::new();
        for (row, header) in rows {
            row_ids.push(self.build_row(row, header, &columns, inner)?);
        }

        let mut ts = box_style(style);
        ts.size.width = taffy::Dimension::Length(outer);
        let node = self.taffy.new_with_children(ts, &row_ids)?;
        self.register(node, BoxKind::Table, style, BoxContent::None);
        Ok(node)
    }

    fn build_row(
        &mut self,
        row: &StyledNode,
        header: bool,
        columns: &[f32],
        width: f32,
    ) -> Result<NodeId, BackendError> {
        let StyledNode::Element {
            style: row_style,
            children,
            ..
        } = row
        else {
            return Err(BackendError::Layout("table row is not an element".into()));
        };
        let cells: Vec<&StyledNode> = children
            .iter()
            .filter(|c| c.style().display == Display::TableCell)
            .collect();
        let spans: Vec<usize> = cells.iter().map(|c| colspan(c)).collect();
        let span_total: usize = spans.iter().sum();

        let mut cell_ids = Vec::new();
        let mut col = 0usize;
        for (cell, span) in cells.iter().zip(&spans) {
            let cell_width = if span_total == columns.len() {
                columns[col..col + span].iter().sum()
            } else {
                width * *span as f32 / span_total.max(1) as f32
            };
            col += span;
            cell_ids.push(self.build_cell(cell, cell_width)?);
        }

        let mut ts = box_style(row_style);
        ts.flex_direction = taffy::FlexDirection::Row;
        ts.align_items = Some(taffy::AlignItems::Stretch);
        ts.size.width = taffy::Dimension::Length(width);
        ts.padding = Rect::zero();
        ts.border = Rect::zero();
        let node = self.taffy.new_with_children(ts, &cell_ids)?;
        self.register(node, BoxKind::Row { header }, row_style, BoxContent::None);
        Ok(node)
    }

    fn build_cell(&mut self, cell: &StyledNode, width: f32) -> Result<NodeId, BackendError> {
        let StyledNode::Element {
            tag,
            style,
            children,
            ..
        } = cell
        else {
            return Err(BackendError::Layout("table cell is not an element".into()));
        };
        let inner = inner_width(style, width);
        let ids = self.build_children(Some(tag), style, children, inner, true)?;
        let mut ts = box_style(style);
        ts.size = Size {
            width: taffy::Dimension::Length(width),
            height: dim_to_taffy(style.height),
        };
        ts.flex_basis = taffy::Dimension::Length(width);
        ts.margin = Rect::zero();
        let node = self.taffy.new_with_children(ts, &ids)?;
        self.register(node, BoxKind::Cell, style, BoxContent::None);
        Ok(node)
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox, BackendError> {
        let layout = self.taffy.layout(node)?;
        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>, _>>()?;

        let (kind, style, content) = match self.meta.get(&node) {
            Some(meta) => (meta.kind, meta.style.clone(), meta.content.clone()),
            None => (BoxKind::Block, ComputedStyle::default(), BoxContent::None),
        };
        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            kind,
            style,
            content,
            children,
        })
    }
}

fn colspan(cell: &StyledNode) -> usize {
    match cell {
        StyledNode::Element { attrs, .. } => attrs
            .get("colspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .max(1),
        StyledNode::Text { .. } => 1,
    }
}

/// Column widths from the first row: explicit widths of single-span cells
/// are honoured, the remainder is split evenly. Oversized explicit widths
/// are scaled down to fit.
fn column_widths(first_row: &StyledNode, inner: f32) -> Vec<f32> {
    let StyledNode::Element { children, .. } = first_row else {
        return Vec::new();
    };
    let mut columns: Vec<Option<f32>> = Vec::new();
    for cell in children
        .iter()
        .filter(|c| c.style().display == Display::TableCell)
    {
        let span = colspan(cell);
        if span == 1 {
            columns.push(cell.style().width.resolve(inner));
        } else {
            columns.extend(std::iter::repeat(None).take(span));
        }
    }
    let fixed: f32 = columns.iter().flatten().sum();
    let auto_count = columns.iter().filter(|c| c.is_none()).count();
    let scale = if fixed > inner && fixed > 0.0 {
        inner / fixed
    } else {
        1.0
    };
    let share = if auto_count > 0 {
        ((inner - fixed * scale) / auto_count as f32).max(0.0)
    } else {
        0.0
    };
    columns
        .into_iter()
        .map(|c| c.map(|w| w * scale).unwrap_or(share))
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates (x already offset by the page margin).
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    root_style: &ComputedStyle,
    content_width: f32,
    page_margin: f32,
    fonts: &FontManager,
    images: &ImageStore,
) -> Result<Vec<PositionedBox>, BackendError> {
    let mut builder = LayoutBuilder::new(fonts, images);
    let child_ids = builder.build_children(None, root_style, styled_nodes, content_width, true)?;

    let root = builder.taffy.new_with_children(
        Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Column,
            size: Size {
                width: taffy::Dimension::Length(content_width),
                height: taffy::Dimension::Auto,
            },
            ..Default::default()
        },
        &child_ids,
    )?;
    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    Ok(builder.extract(root, page_margin, 0.0)?.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, DomNode};
    use crate::style::{build_styled_tree, StyleResolver};
    use crate::stylesheet::Stylesheet;

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let dom: Vec<DomNode> = parse_html(html);
        let sheet = Stylesheet::parse(css);
        let resolver = StyleResolver::new(&sheet, true);
        let root = ComputedStyle::default();
        let styled = build_styled_tree(&dom, &resolver, &mut Vec::new(), &root).unwrap();
        let fonts = FontManager::default();
        let images = ImageStore::new(None);
        compute_layout(&styled, &root, 515.0, 40.0, &fonts, &images).unwrap()
    }

    fn text_of(b: &PositionedBox) -> Option<String> {
        match &b.content {
            BoxContent::Text { lines, .. } => Some(lines.join("\n")),
            _ => b.children.iter().find_map(text_of),
        }
    }

    #[test]
    fn paragraph_merges_inline_runs() {
        let boxes = layout("<p>Total: <strong>R$ 1.050,00</strong><br>ok</p>", "");
        assert_eq!(boxes.len(), 1);
        assert_eq!(text_of(&boxes[0]).as_deref(), Some("Total: R$ 1.050,00\nok"));
        assert!(boxes[0].height > 0.0);
        assert_eq!(boxes[0].x, 40.0);
    }

    #[test]
    fn table_columns_follow_first_row() {
        let boxes = layout(
            r#"<table><thead><tr><th class="d">Descricao</th><th>Qtd</th><th>Valor</th></tr></thead>
               <tbody><tr><td>Filme</td><td>50</td><td>20</td></tr>
               <tr><td colspan="3">Obs</td></tr></tbody></table>"#,
            ".d { width: 50% }",
        );
        let table = &boxes[0];
        assert_eq!(table.kind, BoxKind::Table);
        assert_eq!(table.children.len(), 3);
        assert_eq!(table.children[0].kind, BoxKind::Row { header: true });
        assert_eq!(table.children[1].kind, BoxKind::Row { header: false });

        let body_cells = &table.children[1].children;
        assert!((body_cells[0].width - 257.5).abs() < 0.5);
        assert!((body_cells[1].width - 128.75).abs() < 0.5);
        assert!((body_cells[2].x - (40.0 + 257.5 + 128.75)).abs() < 0.5);
        assert!((table.children[2].children[0].width - 515.0).abs() < 0.5);
    }

    #[test]
    fn flex_row_splits_width() {
        let boxes = layout(
            r#"<div class="row"><div>A</div><div>B</div></div>"#,
            ".row { display: flex; gap: 15px }",
        );
        let row = &boxes[0];
        assert_eq!(row.children.len(), 2);
        assert!((row.children[0].width - 250.0).abs() < 0.5);
        assert!((row.children[1].x - (40.0 + 265.0)).abs() < 0.5);
    }

    #[test]
    fn list_items_get_markers() {
        let boxes = layout("<ol><li>um</li><li>dois</li></ol>", "");
        let markers: Vec<_> = boxes[0]
            .children
            .iter()
            .filter_map(|c| match &c.content {
                BoxContent::ListItem { marker } => Some(marker.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec!["1.", "2."]);
    }

    #[test]
    fn whitespace_between_blocks_is_ignored() {
        let boxes = layout("<div>a</div>\n   <div>b</div>", "");
        assert_eq!(boxes.len(), 2);
    }
}
