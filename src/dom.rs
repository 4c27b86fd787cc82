//! HTML parser – converts rendered template output into a small DOM tree.
//!
//! The parser is forgiving: unknown tags are kept (and later hidden by the
//! style resolver), stray closing tags close the current element, and void
//! elements never take children. `<style>` and `<script>` bodies are kept as
//! raw text so stylesheets can be collected after parsing.

use std::collections::HashMap;

/// The tag name of an element the pipeline knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    Style,
    Script,
    Title,
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Span,
    Strong,
    Em,
    Small,
    Br,
    Hr,
    Img,
    /// Anything else; treated as `display: none`.
    Unknown(String),
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "title" => Tag::Title,
            "div" | "section" | "header" | "footer" | "main" | "article" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" | "h5" | "h6" => Tag::H4,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" | "label" | "a" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "small" => Tag::Small,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            "img" => Tag::Img,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case name used for stylesheet selector matching.
    pub fn name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Body => "body",
            Tag::Style => "style",
            Tag::Script => "script",
            Tag::Title => "title",
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tfoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::Small => "small",
            Tag::Br => "br",
            Tag::Hr => "hr",
            Tag::Img => "img",
            Tag::Unknown(name) => name,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::Span | Tag::Strong | Tag::Em | Tag::Small | Tag::Br
        )
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4)
    }

    /// Row groups are transparent wrappers around `<tr>` elements.
    pub fn is_row_group(&self) -> bool {
        matches!(self, Tag::Thead | Tag::Tbody | Tag::Tfoot)
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Tag::Td | Tag::Th)
    }
}

fn is_void(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "img" | "br" | "hr" | "meta" | "link" | "input" | "col" | "source" | "wbr"
    )
}

fn is_raw_text(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "style" | "script")
}

/// A node in the DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// `colspan` clamped to at least 1.
    pub fn colspan(&self) -> usize {
        self.attr("colspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .max(1)
    }

    /// Concatenated text of all descendants, whitespace preserved.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) if e.tag == Tag::Br => out.push('\n'),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of top-level DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser { input: html, pos: 0 };
    parser.parse_nodes(None)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Advance to just past the next occurrence of `needle`, or to EOF.
    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Parse siblings until EOF or a closing tag. When `parent` is set, the
    /// matching closing tag is consumed by the caller.
    fn parse_nodes(&mut self, parent: Option<&str>) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.starts_with("</") {
                if parent.is_none() {
                    // Stray closing tag at top level.
                    self.skip_past(">");
                    continue;
                }
                break;
            }
            if self.starts_with("<!--") {
                self.skip_past("-->");
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_past(">");
            } else if self.starts_with("<")
                && self.rest()[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                nodes.push(self.parse_element());
            } else {
                let text = self.parse_text();
                if !text.is_empty() {
                    nodes.push(DomNode::Text(text));
                }
            }
        }
        nodes
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        if self.starts_with("<") {
            self.bump();
        }
        while !self.eof() && !self.starts_with("<") {
            self.bump();
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn parse_element(&mut self) -> DomNode {
        self.bump(); // '<'
        let name = self.parse_name();
        let mut elem = ElementNode::new(Tag::from_name(&name));

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Junk inside the tag; skip a character to guarantee progress.
                self.bump();
                continue;
            }
            elem.attributes.entry(key).or_insert(value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.bump();
        }
        if is_void(&name) {
            return DomNode::Element(elem);
        }

        if is_raw_text(&name) {
            let close = format!("</{}", name.to_ascii_lowercase());
            let lower = self.rest().to_ascii_lowercase();
            let end = lower.find(&close).unwrap_or(lower.len());
            let raw = &self.rest()[..end];
            if !raw.is_empty() {
                elem.children.push(DomNode::Text(raw.to_string()));
            }
            self.pos += end;
        } else {
            elem.children = self.parse_nodes(Some(&name));
        }

        // Only consume our own closing tag; a mismatched one belongs to an
        // ancestor (or is dropped at top level).
        if self.starts_with("</") {
            let save = self.pos;
            self.pos += 2;
            if self.parse_name() == name {
                self.skip_past(">");
            } else {
                self.pos = save;
            }
        }
        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
        {
            self.bump();
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.bump();
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                let len = self.rest().find(quote).unwrap_or(self.rest().len());
                self.pos += len;
                let raw = &self.input[start..self.pos];
                self.bump();
                raw
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != '>')
                {
                    self.bump();
                }
                &self.input[start..self.pos]
            }
        };
        (key, decode_entities(value))
    }
}

/// Decode the named entities templates produce plus decimal/hex references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "deg" => '\u{00B0}',
        "ordm" => '\u{00BA}',
        "ordf" => '\u{00AA}',
        "middot" => '\u{00B7}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "euro" => '\u{20AC}',
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Return the children of `<body>`, or every node when there is no body.
/// `<head>` content is never part of the flow.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                return body_children(&e.children);
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head))
        .cloned()
        .collect()
}

/// Concatenate the text of every `<style>` element in document order.
pub fn collect_stylesheets(nodes: &[DomNode]) -> String {
    let mut css = String::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                css.push_str(&e.text_content());
                css.push('\n');
            } else {
                css.push_str(&collect_stylesheets(&e.children));
            }
        }
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        nodes
            .iter()
            .find_map(|n| match n {
                DomNode::Element(e) => Some(e),
                DomNode::Text(_) => None,
            })
            .expect("no element")
    }

    #[test]
    fn parses_nested_table_with_row_groups() {
        let html = r#"<table class="itens"><thead><tr><th>Qtd</th></tr></thead>
            <tbody><tr><td colspan="2">50,00</td></tr></tbody></table>"#;
        let nodes = parse_html(html);
        let table = first_element(&nodes);
        assert_eq!(table.tag, Tag::Table);
        assert_eq!(table.classes(), vec!["itens"]);
        let groups: Vec<_> = table
            .children
            .iter()
            .filter_map(|n| match n {
                DomNode::Element(e) => Some(e.tag.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(groups, vec![Tag::Thead, Tag::Tbody]);
    }

    #[test]
    fn void_elements_take_no_children() {
        let nodes = parse_html(r#"<p>a<br>b<img src='logo.png'>c</p>"#);
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 5);
        assert_eq!(p.text_content(), "a\nbc");
    }

    #[test]
    fn style_body_is_raw_text() {
        let html = "<html><head><style>td > p { color: red }</style></head><body><p>x</p></body></html>";
        let nodes = parse_html(html);
        assert!(collect_stylesheets(&nodes).contains("td > p"));
        let body = body_children(&nodes);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn decodes_escaped_template_output() {
        assert_eq!(decode_entities("Cliente &amp; Filhos"), "Cliente & Filhos");
        assert_eq!(decode_entities("a&#x2F;b&#x27;c&#39;"), "a/b'c'");
        assert_eq!(decode_entities("R&D; 5 & 6"), "R&D; 5 & 6");
    }

    #[test]
    fn unquoted_and_single_quoted_attributes() {
        let nodes = parse_html("<td width=120 style='color:red'>x</td>");
        let td = first_element(&nodes);
        assert_eq!(td.attr("width"), Some("120"));
        assert_eq!(td.inline_style(), Some("color:red"));
    }
}
