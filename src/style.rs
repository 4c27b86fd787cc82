//! Style resolver – cascades tag defaults, `<style>` rules, presentational
//! attributes and inline `style=""` declarations into a flat
//! [`ComputedStyle`] consumed by the layout engine.
//!
//! Lengths are resolved to points (1px = 1pt). In strict mode a length the
//! engine cannot coerce (`em`, `vh`, `calc()`, `auto` where it makes no
//! sense, ...) fails with [`BackendError::UnsupportedLength`]; in lenient
//! mode the declaration is ignored.

use std::collections::HashMap;

use crate::dom::{DomNode, ElementNode, Tag};
use crate::error::BackendError;
use crate::stylesheet::{parse_declarations, Stylesheet};

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: Dimension,

    // Spacing (pt)
    pub margin: Edges,
    pub padding: Edges,

    // Border
    pub border_width: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiplier of `font_size`.
    pub line_height: f32,
    pub text_decoration: TextDecoration,

    // Background
    pub background_color: Color,
    pub background_image: Option<String>,
    pub print_color_adjust: PrintColorAdjust,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            max_width: Dimension::Auto,
            margin: Edges::default(),
            padding: Edges::default(),
            border_width: 0.0,
            border_color: Color::BLACK,
            font_size: 12.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.25,
            text_decoration: TextDecoration::None,
            background_color: Color::TRANSPARENT,
            background_image: None,
            print_color_adjust: PrintColorAdjust::Economy,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    /// Copy the inherited (text) properties of `parent`.
    fn inherit_from(&mut self, parent: &ComputedStyle) {
        self.font_size = parent.font_size;
        self.font_weight = parent.font_weight;
        self.font_style = parent.font_style;
        self.color = parent.color;
        self.text_align = parent.text_align;
        self.line_height = parent.line_height;
        self.print_color_adjust = parent.print_color_adjust;
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    pub fn line_height_pt(&self) -> f32 {
        self.font_size * self.line_height
    }

    /// Backgrounds are only printed when `print-color-adjust: exact` applies.
    pub fn prints_backgrounds(&self) -> bool {
        self.print_color_adjust == PrintColorAdjust::Exact
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

/// `print-color-adjust`. Inherited; `Economy` drops backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintColorAdjust {
    Economy,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

impl Dimension {
    /// Resolve against the containing block width.
    pub fn resolve(&self, containing: f32) -> Option<f32> {
        match *self {
            Dimension::Auto => None,
            Dimension::Px(v) => Some(v),
            Dimension::Percent(p) => Some(containing * p / 100.0),
        }
    }
}

/// Box edge values in points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn all(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    /// Parse `#rgb`, `#rrggbb`, `rgb()`/`rgba()` or a handful of named colours.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value.starts_with('#') {
            return Self::from_hex(&value);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|v| v.strip_suffix(')'))
        {
            let parts: Vec<f32> = args
                .split(',')
                .map(|p| p.trim().parse::<f32>())
                .collect::<Result<_, _>>()
                .ok()?;
            return match parts.as_slice() {
                [r, g, b] => Some(Self {
                    r: r / 255.0,
                    g: g / 255.0,
                    b: b / 255.0,
                    a: 1.0,
                }),
                [r, g, b, a] => Some(Self {
                    r: r / 255.0,
                    g: g / 255.0,
                    b: b / 255.0,
                    a: *a,
                }),
                _ => None,
            };
        }
        Some(match value.as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "navy" => Self::rgb(0, 0, 128),
            "maroon" => Self::rgb(128, 0, 0),
            "orange" => Self::rgb(255, 165, 0),
            "yellow" => Self::rgb(255, 255, 0),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" => Self::rgb(192, 192, 192),
            "lightgray" | "lightgrey" => Self::rgb(211, 211, 211),
            "darkgray" | "darkgrey" => Self::rgb(169, 169, 169),
            "whitesmoke" => Self::rgb(245, 245, 245),
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Length parsing
// ---------------------------------------------------------------------------

const PT_PER_MM: f32 = 72.0 / 25.4;

/// Parse an absolute length to points. `None` for anything else.
fn parse_absolute(value: &str) -> Option<f32> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let (num, unit) = value.split_at(split);
    let num: f32 = num.parse().ok()?;
    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "px" | "pt" => 1.0,
        "mm" => PT_PER_MM,
        "cm" => PT_PER_MM * 10.0,
        "in" => 72.0,
        _ => return None,
    };
    Some(num * factor)
}

/// Parse a length or percentage (`auto` allowed when `allow_auto`).
fn parse_dimension(value: &str, allow_auto: bool) -> Option<Dimension> {
    let value = value.trim();
    if allow_auto && value.eq_ignore_ascii_case("auto") {
        return Some(Dimension::Auto);
    }
    if let Some(p) = value.strip_suffix('%') {
        return p.trim().parse().ok().map(Dimension::Percent);
    }
    parse_absolute(value).map(Dimension::Px)
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Cascades styles for one document.
pub struct StyleResolver<'a> {
    stylesheet: &'a Stylesheet,
    strict: bool,
}

impl<'a> StyleResolver<'a> {
    pub fn new(stylesheet: &'a Stylesheet, strict: bool) -> Self {
        Self { stylesheet, strict }
    }

    /// Resolve the style for an element. `ancestors` is ordered outermost
    /// first and only used for descendant selectors.
    pub fn resolve(
        &self,
        element: &ElementNode,
        ancestors: &[&ElementNode],
        parent: Option<&ComputedStyle>,
    ) -> Result<ComputedStyle, BackendError> {
        let mut style = ComputedStyle::default();
        if let Some(p) = parent {
            style.inherit_from(p);
        }
        apply_tag_defaults(&mut style, &element.tag);
        self.apply_attributes(&mut style, element)?;

        for decl in self.stylesheet.matching(element, ancestors) {
            self.apply(&mut style, &decl.property, &decl.value)?;
        }
        if let Some(inline) = element.inline_style() {
            for decl in parse_declarations(inline) {
                self.apply(&mut style, &decl.property, &decl.value)?;
            }
        }
        Ok(style)
    }

    /// `width`/`height`/`bgcolor`/`align`/`border` HTML attributes.
    fn apply_attributes(
        &self,
        style: &mut ComputedStyle,
        element: &ElementNode,
    ) -> Result<(), BackendError> {
        let sized = matches!(element.tag, Tag::Img | Tag::Table | Tag::Td | Tag::Th);
        if sized {
            if let Some(w) = element.attr("width") {
                self.apply(style, "width", w)?;
            }
            if let Some(h) = element.attr("height") {
                self.apply(style, "height", h)?;
            }
        }
        if let Some(bg) = element.attr("bgcolor") {
            self.apply(style, "background-color", bg)?;
        }
        if let Some(align) = element.attr("align") {
            self.apply(style, "text-align", align)?;
        }
        if element.tag == Tag::Table {
            if let Some(b) = element.attr("border") {
                self.apply(style, "border-width", b)?;
            }
        }
        Ok(())
    }

    fn length(&self, property: &str, value: &str) -> Result<Option<f32>, BackendError> {
        match parse_absolute(value) {
            Some(v) => Ok(Some(v)),
            None => self.unsupported(property, value),
        }
    }

    fn dimension(
        &self,
        property: &str,
        value: &str,
        allow_auto: bool,
    ) -> Result<Option<Dimension>, BackendError> {
        match parse_dimension(value, allow_auto) {
            Some(d) => Ok(Some(d)),
            None => self.unsupported(property, value),
        }
    }

    fn unsupported<T>(&self, property: &str, value: &str) -> Result<Option<T>, BackendError> {
        if self.strict {
            Err(BackendError::UnsupportedLength {
                property: property.to_string(),
                value: value.to_string(),
            })
        } else {
            log::debug!("Ignoring `{property}: {value}`");
            Ok(None)
        }
    }

    /// `margin`/`padding` shorthand with one to four values. `auto` counts
    /// as zero for margins.
    fn edges(&self, property: &str, value: &str, allow_auto: bool) -> Result<Option<Edges>, BackendError> {
        let mut parts = Vec::new();
        for token in value.split_whitespace() {
            if allow_auto && token.eq_ignore_ascii_case("auto") {
                parts.push(0.0);
                continue;
            }
            match self.length(property, token)? {
                Some(v) => parts.push(v),
                None => return Ok(None),
            }
        }
        Ok(match parts.as_slice() {
            [a] => Some(Edges::all(*a)),
            [v, h] => Some(Edges {
                top: *v,
                right: *h,
                bottom: *v,
                left: *h,
            }),
            [t, h, b] => Some(Edges {
                top: *t,
                right: *h,
                bottom: *b,
                left: *h,
            }),
            [t, r, b, l] => Some(Edges {
                top: *t,
                right: *r,
                bottom: *b,
                left: *l,
            }),
            _ => None,
        })
    }

    fn apply(&self, s: &mut ComputedStyle, prop: &str, val: &str) -> Result<(), BackendError> {
        let lower = val.trim().to_ascii_lowercase();
        let v = lower.as_str();
        match prop {
            "display" => {
                s.display = match v {
                    "block" | "inline-block" => Display::Block,
                    "flex" | "inline-flex" => Display::Flex,
                    "inline" => Display::Inline,
                    "list-item" => Display::ListItem,
                    "table" => Display::Table,
                    "table-row-group" | "table-header-group" | "table-footer-group" => {
                        Display::TableRowGroup
                    }
                    "table-row" => Display::TableRow,
                    "table-cell" => Display::TableCell,
                    "none" => Display::None,
                    _ => s.display,
                }
            }
            "flex-direction" => {
                s.flex_direction = match v {
                    "column" | "column-reverse" => FlexDirection::Column,
                    _ => FlexDirection::Row,
                }
            }
            "flex-wrap" => {
                s.flex_wrap = if v == "wrap" {
                    FlexWrap::Wrap
                } else {
                    FlexWrap::NoWrap
                }
            }
            "flex" | "flex-grow" => {
                if let Some(grow) = v.split_whitespace().next().and_then(|g| g.parse().ok()) {
                    s.flex_grow = grow;
                } else if v == "auto" {
                    s.flex_grow = 1.0;
                }
            }
            "justify-content" => {
                s.justify_content = match v {
                    "flex-end" | "end" | "right" => JustifyContent::End,
                    "center" => JustifyContent::Center,
                    "space-between" => JustifyContent::SpaceBetween,
                    "space-around" | "space-evenly" => JustifyContent::SpaceAround,
                    _ => JustifyContent::Start,
                }
            }
            "align-items" => {
                s.align_items = match v {
                    "flex-start" | "start" => AlignItems::Start,
                    "flex-end" | "end" => AlignItems::End,
                    "center" => AlignItems::Center,
                    _ => AlignItems::Stretch,
                }
            }
            "gap" | "column-gap" => {
                if let Some(g) = self.length(prop, v)? {
                    s.gap = g;
                }
            }
            "width" => {
                if let Some(d) = self.dimension(prop, v, true)? {
                    s.width = d;
                }
            }
            "height" => {
                if let Some(d) = self.dimension(prop, v, true)? {
                    s.height = d;
                }
            }
            "max-width" => {
                if v == "none" {
                    s.max_width = Dimension::Auto;
                } else if let Some(d) = self.dimension(prop, v, false)? {
                    s.max_width = d;
                }
            }
            "margin" => {
                if let Some(e) = self.edges(prop, v, true)? {
                    s.margin = e;
                }
            }
            "padding" => {
                if let Some(e) = self.edges(prop, v, false)? {
                    s.padding = e;
                }
            }
            "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => {
                let parsed = if v == "auto" {
                    Some(0.0)
                } else {
                    self.length(prop, v)?
                };
                if let Some(m) = parsed {
                    set_side(&mut s.margin, prop, m);
                }
            }
            "padding-top" | "padding-right" | "padding-bottom" | "padding-left" => {
                if let Some(p) = self.length(prop, v)? {
                    set_side(&mut s.padding, prop, p);
                }
            }
            "border" => {
                if v == "none" || v == "0" {
                    s.border_width = 0.0;
                    return Ok(());
                }
                for token in v.split_whitespace() {
                    if let Some(w) = parse_absolute(token) {
                        s.border_width = w;
                    } else if let Some(c) = Color::parse(token) {
                        s.border_color = c;
                    } else if token == "thin" {
                        s.border_width = 0.75;
                    }
                }
            }
            "border-width" => {
                if let Some(w) = self.length(prop, v)? {
                    s.border_width = w;
                }
            }
            "border-color" => {
                if let Some(c) = Color::parse(v) {
                    s.border_color = c;
                }
            }
            "font-size" => {
                let keyword = match v {
                    "xx-small" => Some(7.0),
                    "x-small" => Some(8.0),
                    "small" => Some(10.0),
                    "medium" => Some(12.0),
                    "large" => Some(14.0),
                    "x-large" => Some(18.0),
                    "xx-large" => Some(24.0),
                    _ => None,
                };
                if let Some(size) = keyword {
                    s.font_size = size;
                } else if let Some(p) = v.strip_suffix('%') {
                    if let Ok(p) = p.parse::<f32>() {
                        s.font_size *= p / 100.0;
                    }
                } else if let Some(size) = self.length(prop, v)? {
                    s.font_size = size;
                }
            }
            "font-weight" => {
                s.font_weight = match v {
                    "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                    _ => FontWeight::Normal,
                }
            }
            "font-style" => {
                s.font_style = match v {
                    "italic" | "oblique" => FontStyle::Italic,
                    _ => FontStyle::Normal,
                }
            }
            "font" => {
                for token in v.split_whitespace() {
                    match token {
                        "bold" => s.font_weight = FontWeight::Bold,
                        "italic" => s.font_style = FontStyle::Italic,
                        t => {
                            let size = t.split('/').next().unwrap_or(t);
                            if let Some(px) = parse_absolute(size) {
                                s.font_size = px;
                            }
                        }
                    }
                }
            }
            "color" => {
                if let Some(c) = Color::parse(v) {
                    s.color = c;
                }
            }
            "background-color" => {
                if let Some(c) = Color::parse(v) {
                    s.background_color = c;
                }
            }
            "background" => {
                if let Some(url) = parse_url(val) {
                    s.background_image = Some(url);
                }
                if let Some(c) = v.split_whitespace().find_map(Color::parse) {
                    s.background_color = c;
                }
            }
            "background-image" => {
                s.background_image = parse_url(val);
            }
            "text-align" => {
                s.text_align = match v {
                    "center" => TextAlign::Center,
                    "right" | "end" => TextAlign::Right,
                    _ => TextAlign::Left,
                }
            }
            "line-height" => {
                if v == "normal" {
                    s.line_height = 1.25;
                } else if let Ok(factor) = v.parse::<f32>() {
                    s.line_height = factor;
                } else if let Some(p) = v.strip_suffix('%').and_then(|p| p.parse::<f32>().ok()) {
                    s.line_height = p / 100.0;
                } else if let Some(pt) = self.length(prop, v)? {
                    if s.font_size > 0.0 {
                        s.line_height = pt / s.font_size;
                    }
                }
            }
            "text-decoration" | "text-decoration-line" => {
                s.text_decoration = if v.contains("underline") {
                    TextDecoration::Underline
                } else {
                    TextDecoration::None
                }
            }
            "print-color-adjust" | "-webkit-print-color-adjust" | "color-adjust" => {
                s.print_color_adjust = if v == "exact" {
                    PrintColorAdjust::Exact
                } else {
                    PrintColorAdjust::Economy
                }
            }
            "page-break-before" | "break-before" => {
                s.page_break_before = matches!(v, "always" | "page");
            }
            "page-break-after" | "break-after" => {
                s.page_break_after = matches!(v, "always" | "page");
            }
            "page-break-inside" | "break-inside" => {
                s.page_break_inside_avoid = v == "avoid";
            }
            _ => {}
        }
        Ok(())
    }
}

fn set_side(edges: &mut Edges, prop: &str, value: f32) {
    if prop.ends_with("top") {
        edges.top = value;
    } else if prop.ends_with("right") {
        edges.right = value;
    } else if prop.ends_with("bottom") {
        edges.bottom = value;
    } else {
        edges.left = value;
    }
}

/// Extract the target of `url(...)`, unquoted.
fn parse_url(value: &str) -> Option<String> {
    let start = value.find("url(")? + 4;
    let end = start + value[start..].rfind(')')?;
    let inner = value[start..end].trim().trim_matches(['"', '\'']);
    (!inner.is_empty()).then(|| inner.to_string())
}

/// User-agent defaults, applied after inheritance.
fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 => {
            s.font_size = match tag {
                Tag::H1 => 22.0,
                Tag::H2 => 18.0,
                Tag::H3 => 15.0,
                _ => 13.0,
            };
            s.font_weight = FontWeight::Bold;
            s.margin.top = s.font_size * 0.5;
            s.margin.bottom = s.font_size * 0.4;
        }
        Tag::P => {
            s.margin.bottom = 8.0;
        }
        Tag::Ul | Tag::Ol => {
            s.margin.bottom = 8.0;
            s.padding.left = 20.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin.bottom = 2.0;
        }
        Tag::Table => {
            s.display = Display::Table;
        }
        Tag::Thead | Tag::Tbody | Tag::Tfoot => {
            s.display = Display::TableRowGroup;
        }
        Tag::Tr => {
            s.display = Display::TableRow;
        }
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding = Edges::all(2.0);
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
            }
        }
        Tag::Span | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::Strong => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Em => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        Tag::Small => {
            s.display = Display::Inline;
            s.font_size *= 0.85;
        }
        Tag::Hr => {
            s.border_width = 0.75;
            s.border_color = Color::rgb(160, 160, 160);
            s.margin.top = 6.0;
            s.margin.bottom = 6.0;
        }
        Tag::Img => {
            s.display = Display::Block;
        }
        Tag::Div | Tag::Body | Tag::Html => {}
        Tag::Head | Tag::Style | Tag::Script | Tag::Title | Tag::Unknown(_) => {
            s.display = Display::None;
        }
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image `src`, `colspan`).
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }

    /// Inline content: text runs and inline elements (`span`, `strong`, `br`).
    pub fn is_inline(&self) -> bool {
        match self {
            StyledNode::Text { .. } => true,
            StyledNode::Element { style, .. } => style.display == Display::Inline,
        }
    }
}

/// Build a styled tree from DOM nodes, resolving styles top-down. Elements
/// with `display: none` are dropped.
pub fn build_styled_tree<'a>(
    nodes: &'a [DomNode],
    resolver: &StyleResolver<'_>,
    ancestors: &mut Vec<&'a ElementNode>,
    parent_style: &ComputedStyle,
) -> Result<Vec<StyledNode>, BackendError> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolver.resolve(e, ancestors, Some(parent_style))?;
                if style.display == Display::None {
                    continue;
                }
                ancestors.push(e);
                let children = build_styled_tree(&e.children, resolver, ancestors, &style);
                ancestors.pop();
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children: children?,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if text.trim().is_empty() && !text.contains('\u{00A0}') {
                    // Whitespace between inline siblings still separates words.
                    if !text.is_empty() {
                        result.push(StyledNode::Text {
                            text: " ".to_string(),
                            style: text_style(parent_style),
                        });
                    }
                    continue;
                }
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style: text_style(parent_style),
                });
            }
        }
    }
    Ok(result)
}

/// Text runs inherit typography only; box properties stay on the parent.
fn text_style(parent: &ComputedStyle) -> ComputedStyle {
    let mut style = ComputedStyle::default();
    style.inherit_from(parent);
    style.text_decoration = parent.text_decoration;
    style.display = Display::Inline;
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn element(html: &str) -> ElementNode {
        match parse_html(html).into_iter().next() {
            Some(DomNode::Element(e)) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    fn resolve(html: &str, css: &str, strict: bool) -> Result<ComputedStyle, BackendError> {
        let sheet = Stylesheet::parse(css);
        StyleResolver::new(&sheet, strict).resolve(&element(html), &[], None)
    }

    #[test]
    fn inline_beats_stylesheet() {
        let s = resolve(
            r#"<td class="num" style="color: #ff0000; padding: 4px 8px">1</td>"#,
            ".num { color: blue; text-align: right }",
            true,
        )
        .unwrap();
        assert!((s.color.r - 1.0).abs() < 0.01);
        assert_eq!(s.text_align, TextAlign::Right);
        assert_eq!(s.padding.left, 8.0);
        assert_eq!(s.padding.top, 4.0);
    }

    #[test]
    fn strict_mode_rejects_relative_units() {
        let err = resolve(r#"<td style="padding: 2em">x</td>"#, "", true).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedLength { ref property, .. } if property == "padding"));

        let lenient = resolve(r#"<td style="padding: 2em">x</td>"#, "", false).unwrap();
        assert_eq!(lenient.padding, Edges::all(2.0));
    }

    #[test]
    fn attribute_dimensions_and_units() {
        let s = resolve(r#"<img src="x.png" width="120" height="10mm">"#, "", true).unwrap();
        assert_eq!(s.width, Dimension::Px(120.0));
        match s.height {
            Dimension::Px(h) => assert!((h - 28.35).abs() < 0.01),
            other => panic!("unexpected {other:?}"),
        }
        assert!(resolve(r#"<td width="50%">x</td>"#, "", true).is_ok());
        assert!(resolve(r#"<td width="calc(100% - 2px)">x</td>"#, "", true).is_err());
    }

    #[test]
    fn print_color_adjust_is_inherited() {
        let sheet = Stylesheet::parse("html, body { print-color-adjust: exact; }");
        let resolver = StyleResolver::new(&sheet, true);
        let body = resolver
            .resolve(&element("<body></body>"), &[], None)
            .unwrap();
        assert!(body.prints_backgrounds());
        let div = resolver
            .resolve(&element("<div></div>"), &[], Some(&body))
            .unwrap();
        assert!(div.prints_backgrounds());
        let orphan = resolver.resolve(&element("<div></div>"), &[], None).unwrap();
        assert!(!orphan.prints_backgrounds());
    }

    #[test]
    fn background_shorthand_with_data_uri() {
        let s = resolve(
            r#"<div style="background: #eee url('data:image/png;base64,AAAA') no-repeat">x</div>"#,
            "",
            true,
        )
        .unwrap();
        assert_eq!(s.background_image.as_deref(), Some("data:image/png;base64,AAAA"));
        assert!(!s.background_color.is_transparent());
    }

    #[test]
    fn headings_keep_their_size_under_inheritance() {
        let sheet = Stylesheet::default();
        let resolver = StyleResolver::new(&sheet, true);
        let parent = ComputedStyle {
            font_size: 9.0,
            ..ComputedStyle::default()
        };
        let h1 = resolver
            .resolve(&element("<h1>x</h1>"), &[], Some(&parent))
            .unwrap();
        assert_eq!(h1.font_size, 22.0);
        assert!(h1.is_bold());
    }

    #[test]
    fn color_parsing() {
        let c = Color::parse("#ff8800").unwrap();
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("GREY"), Some(Color::rgb(128, 128, 128)));
        assert_eq!(Color::parse("papayawhip"), None);
    }
}
