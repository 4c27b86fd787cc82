//! Minimal author stylesheet support for `<style>` blocks.
//!
//! Supported selectors: `*`, `tag`, `.class`, `#id`, compounds of those
//! (`td.num`) and the descendant combinator (`.itens td`). Rules using other
//! combinators, pseudo-classes or attribute selectors are skipped. At-rules
//! (`@page`, `@media`, `@font-face`, ...) are skipped entirely.

use crate::dom::ElementNode;

/// One `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(token: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut rest = token;
        let name_len = rest
            .find(['.', '#'])
            .unwrap_or(rest.len());
        let name = &rest[..name_len];
        match name {
            "" | "*" => {}
            n if n.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => {
                compound.tag = Some(n.to_ascii_lowercase());
            }
            _ => return None,
        }
        rest = &rest[name_len..];
        while !rest.is_empty() {
            let marker = rest.chars().next()?;
            let body = &rest[1..];
            let len = body.find(['.', '#']).unwrap_or(body.len());
            let ident = &body[..len];
            if ident.is_empty()
                || !ident
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            {
                return None;
            }
            match marker {
                '.' => compound.classes.push(ident.to_string()),
                '#' => compound.id = Some(ident.to_string()),
                _ => return None,
            }
            rest = &body[len..];
        }
        Some(compound)
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag.name() != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        let classes = element.classes();
        self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

/// A descendant-combinator chain; the last compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        if text.contains(['>', '+', '~', ':', '[', '(']) {
            return None;
        }
        let compounds = text
            .split_whitespace()
            .map(Compound::parse)
            .collect::<Option<Vec<_>>>()?;
        if compounds.is_empty() {
            return None;
        }
        Some(Self { compounds })
    }

    /// (ids, classes, tags)
    fn specificity(&self) -> (usize, usize, usize) {
        self.compounds.iter().fold((0, 0, 0), |(a, b, c), comp| {
            (
                a + usize::from(comp.id.is_some()),
                b + comp.classes.len(),
                c + usize::from(comp.tag.is_some()),
            )
        })
    }

    /// `ancestors` is ordered outermost first.
    fn matches(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        let Some((subject, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(element) {
            return false;
        }
        let mut remaining = ancestors.iter().rev();
        'outer: for compound in rest.iter().rev() {
            for ancestor in remaining.by_ref() {
                if compound.matches(ancestor) {
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    specificity: (usize, usize, usize),
    order: usize,
    declarations: Vec<Declaration>,
}

/// Parsed author rules in source order.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        let mut rest = css.as_str();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('@') {
                rest = skip_at_rule(rest);
                continue;
            }
            let Some(open) = rest.find('{') else {
                break;
            };
            let prelude = &rest[..open];
            let after = &rest[open + 1..];
            let close = after.find('}').unwrap_or(after.len());
            let declarations = parse_declarations(&after[..close]);
            for text in prelude.split(',') {
                match Selector::parse(text.trim()) {
                    Some(selector) => rules.push(Rule {
                        specificity: selector.specificity(),
                        selector,
                        order: rules.len(),
                        declarations: declarations.clone(),
                    }),
                    None => log::debug!("Skipping unsupported selector {:?}", text.trim()),
                }
            }
            rest = after.get(close + 1..).unwrap_or("");
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Declarations of every matching rule, lowest precedence first.
    pub fn matching(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> Vec<&Declaration> {
        let mut matched: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(element, ancestors))
            .collect();
        matched.sort_by_key(|r| (r.specificity, r.order));
        matched
            .into_iter()
            .flat_map(|r| r.declarations.iter())
            .collect()
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Skip an at-rule: either up to its `;` or past its balanced `{}` block.
fn skip_at_rule(css: &str) -> &str {
    let semi = css.find(';');
    let open = css.find('{');
    match (semi, open) {
        (Some(s), Some(o)) if s < o => &css[s + 1..],
        (Some(s), None) => &css[s + 1..],
        (_, Some(o)) => {
            let mut depth = 0usize;
            for (i, c) in css[o..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return &css[o + i + 1..];
                        }
                    }
                    _ => {}
                }
            }
            ""
        }
        (None, None) => "",
    }
}

/// Split a declaration block on `;`, ignoring separators inside quotes or
/// parentheses (`url(data:image/png;base64,...)`).
pub fn split_declarations(block: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in block.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&block[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&block[start..]);
    parts
}

/// Parse `prop: value; prop: value` into declarations. Property names are
/// lower-cased; `!important` is dropped.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_declarations(block)
        .into_iter()
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let property = prop.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration {
                property,
                value: value.to_string(),
            })
        })
        .collect()
}
