//! Text-level HTML dimension sanitizer.
//!
//! Strict layout engines abort on literal `width`/`height` values they cannot
//! coerce. These passes drop those values with pattern matching on the
//! markup; no DOM is built. Both passes are idempotent.

use std::borrow::Cow;
use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::stylesheet::split_declarations;

/// An opening (or self-closing) tag. Quoted values may contain `>`.
static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("valid tag pattern")
});

/// One attribute of a tag section: a name, optionally `=` and a value.
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s>"']+))?"#)
        .expect("valid attribute pattern")
});

const TABLE_TAGS: [&str; 4] = ["table", "tr", "td", "th"];

/// Keep every declaration except plain `width`/`height`.
fn strip_dimension_declarations(block: &str) -> String {
    split_declarations(block)
        .into_iter()
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or("").trim();
            !(property.eq_ignore_ascii_case("width") || property.eq_ignore_ascii_case("height"))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn unquote(value: &str) -> (char, &str) {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return (quote, inner);
        }
    }
    ('"', value)
}

/// Rewrite the attribute section of one tag, attribute by attribute.
/// Values of the attributes that are kept are copied verbatim.
fn clean_attributes(attrs: &str, drop_style: bool) -> String {
    let mut out = String::new();
    for caps in ATTRIBUTE.captures_iter(attrs) {
        let name = &caps[1];
        if name.eq_ignore_ascii_case("width") || name.eq_ignore_ascii_case("height") {
            continue;
        }
        if name.eq_ignore_ascii_case("style") {
            if drop_style {
                continue;
            }
            let Some(value) = caps.get(2) else {
                continue;
            };
            let (quote, block) = unquote(value.as_str());
            let kept = strip_dimension_declarations(block);
            if !kept.is_empty() {
                let _ = write!(out, " {name}={quote}{kept}{quote}");
            }
            continue;
        }
        out.push(' ');
        out.push_str(&caps[0]);
    }
    if attrs.trim_end().ends_with('/') {
        out.push_str(" /");
    }
    out
}

fn sanitize(html: &str, strip_table_style: bool) -> String {
    let out: Cow<'_, str> = OPEN_TAG.replace_all(html, |caps: &Captures<'_>| {
        let name = &caps[1];
        let drop_style =
            strip_table_style && TABLE_TAGS.iter().any(|t| name.eq_ignore_ascii_case(t));
        format!("<{name}{}>", clean_attributes(&caps[2], drop_style))
    });
    out.into_owned()
}

/// Remove `width`/`height` attributes and inline `width:`/`height:`
/// declarations. `min-`, `max-` and `line-height` survive; a `style` left
/// empty is dropped.
pub fn strip_dimensions(html: &str) -> String {
    sanitize(html, false)
}

/// [`strip_dimensions`] plus removal of the whole `style` attribute from
/// `table`, `tr`, `td` and `th`.
pub fn strip_table_styles(html: &str) -> String {
    sanitize(html, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_inline_dimensions() {
        assert_eq!(
            strip_dimensions(r#"<td style="height:10px;width:20px;color:red">x</td>"#),
            r#"<td style="color:red">x</td>"#
        );
        assert_eq!(
            strip_dimensions(r#"<td style="color:red; WIDTH: 20px">x</td>"#),
            r#"<td style="color:red">x</td>"#
        );
    }

    #[test]
    fn strips_attributes_in_any_quoting() {
        let html = r#"<img src="a.png" width="120" height='40'><table width=100%><td height=12/>"#;
        assert_eq!(
            strip_dimensions(html),
            r#"<img src="a.png"><table><td />"#
        );
    }

    #[test]
    fn keeps_related_properties() {
        let html = r#"<div style="min-height: 10px; max-width: 50%; line-height: 1.4; height: 3em">"#;
        assert_eq!(
            strip_dimensions(html),
            r#"<div style="min-height: 10px; max-width: 50%; line-height: 1.4">"#
        );
    }

    #[test]
    fn drops_emptied_style_and_collapses_whitespace() {
        let html = "<p   class=\"a\"\n   style=\"width: 10px;\"  >text  stays</p>";
        assert_eq!(strip_dimensions(html), r#"<p class="a">text  stays</p>"#);
    }

    #[test]
    fn data_uris_survive() {
        let html = r#"<body style="background-image: url(data:image/png;base64,AAAA); height: 100%">"#;
        assert_eq!(
            strip_dimensions(html),
            r#"<body style="background-image: url(data:image/png;base64,AAAA)">"#
        );
    }

    #[test]
    fn light_pass_is_idempotent() {
        let samples = [
            r#"<td style="height:10px;width:20px;color:red">x</td>"#,
            "<table  width=\"100%\" style='border: 1px solid #000;height:4px'>\n<tr><td>a</td></tr></table>",
            r#"<img src="logo.png" width=80 /><br/><p data-width="3">ok</p>"#,
        ];
        for html in samples {
            let once = strip_dimensions(html);
            assert_eq!(strip_dimensions(&once), once, "input: {html}");
            let aggressive = strip_table_styles(html);
            assert_eq!(strip_table_styles(&aggressive), aggressive);
        }
    }

    #[test]
    fn aggressive_pass_drops_table_styles_only() {
        let html = r#"<table style="border:1px"><tr style="color:red"><th style="padding:2em">a</th><td style="color:blue">b</td></tr></table><p style="color:red">c</p>"#;
        assert_eq!(
            strip_table_styles(html),
            r#"<table><tr><th>a</th><td>b</td></tr></table><p style="color:red">c</p>"#
        );
    }

    #[test]
    fn text_and_closing_tags_untouched() {
        let html = "<p>width=\"3\" height: 4px</p>";
        assert_eq!(strip_dimensions(html), html);
    }

    #[test]
    fn other_attribute_values_untouched() {
        let html = r#"<img alt="logo width=120 px" title="a   b" src="x.png">"#;
        assert_eq!(strip_dimensions(html), html);

        let html = r#"<td title='height: 4px' data-note="style=&quot;x&quot;" style="width:1px">"#;
        assert_eq!(
            strip_table_styles(html),
            r#"<td title='height: 4px' data-note="style=&quot;x&quot;">"#
        );
    }

    #[test]
    fn unquoted_style_is_filtered() {
        assert_eq!(
            strip_dimensions("<div style=width:3px;color:red>x</div>"),
            r#"<div style="color:red">x</div>"#
        );
    }
}
