//! Tera-backed template renderer.
//!
//! Templates are looked up by file name inside one directory and compiled
//! fresh for every render. HTML autoescaping stays on for `.html` templates;
//! data URIs go through `| safe`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::error::{error_chain, QuoteError, Result};

/// Format `value` with `decimals` places, `.` between thousands and `,`
/// before the decimals (`1050.0` -> `1.050,00`).
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped},{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Brazilian currency without the symbol: `1.050,00`.
pub fn format_brl(value: f64) -> String {
    format_decimal(value, 2)
}

fn number_arg(value: &Value, filter: &str) -> tera::Result<f64> {
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::Null => Ok(0.0),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| tera::Error::msg(format!("{filter} filter expects a number, got '{s}'"))),
        other => Err(tera::Error::msg(format!(
            "{filter} filter expects a number, got {other}"
        ))),
    }
}

/// `{{ total | brl }}` -> `1.050,00`; `{{ total | brl(symbol=true) }}` ->
/// `R$ 1.050,00`.
fn brl_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let amount = format_brl(number_arg(value, "brl")?);
    let with_symbol = args.get("symbol").and_then(Value::as_bool).unwrap_or(false);
    Ok(Value::String(if with_symbol {
        format!("R$ {amount}")
    } else {
        amount
    }))
}

/// `{{ qty | kg }}` -> `50,00`.
fn kg_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format_decimal(number_arg(value, "kg")?, 2)))
}

/// `{{ ipi | pct }}` -> `5,00%`.
fn pct_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format!(
        "{}%",
        format_decimal(number_arg(value, "pct")?, 2)
    )))
}

pub fn register_filters(tera: &mut Tera) {
    tera.register_filter("brl", brl_filter);
    tera.register_filter("kg", kg_filter);
    tera.register_filter("pct", pct_filter);
}

/// Renders named templates from a fixed directory.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    dir: PathBuf,
}

impl TemplateRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `name` inside the template directory.
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Render template `name` with `context`.
    pub fn render<C: Serialize>(&self, name: &str, context: &C) -> Result<String> {
        let path = self.template_path(name);
        if !path.is_file() {
            return Err(QuoteError::TemplateNotFound {
                name: name.to_string(),
                dir: self.dir.clone(),
            });
        }
        let source = std::fs::read_to_string(&path)?;

        let render_err = |e: tera::Error| QuoteError::Render {
            name: name.to_string(),
            cause: error_chain(&e),
        };
        let mut tera = Tera::default();
        register_filters(&mut tera);
        tera.add_raw_template(name, &source).map_err(render_err)?;
        let context = Context::from_serialize(context).map_err(render_err)?;
        let html = tera.render(name, &context).map_err(render_err)?;
        log::debug!("Rendered template '{name}' ({} bytes)", html.len());
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer_with(name: &str, body: &str) -> (tempfile::TempDir, TemplateRenderer) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), body).unwrap();
        let renderer = TemplateRenderer::new(dir.path());
        (dir, renderer)
    }

    #[test]
    fn brazilian_number_formatting() {
        assert_eq!(format_brl(1050.0), "1.050,00");
        assert_eq!(format_brl(0.0), "0,00");
        assert_eq!(format_brl(1234567.891), "1.234.567,89");
        assert_eq!(format_brl(-50.5), "-50,50");
        assert_eq!(format_brl(-0.001), "0,00");
        assert_eq!(format_decimal(999.999, 2), "1.000,00");
    }

    #[test]
    fn renders_loops_conditionals_and_filters() {
        let (_dir, renderer) = renderer_with(
            "q.html",
            "{% for item in itens %}[{{ item.descricao }} {{ item.quantidade_kg | kg }} {{ item.subtotal | brl(symbol=true) }}]{% endfor %}\
             {% if watermark_datauri %}WM{% endif %} {{ ipi | pct }}",
        );
        let ctx = json!({
            "itens": [
                {"descricao": "Filme", "quantidade_kg": 50.0, "subtotal": 1000.0},
                {"descricao": "Saco", "quantidade_kg": 1.5, "subtotal": 30.0}
            ],
            "watermark_datauri": null,
            "ipi": 5.0
        });
        let html = renderer.render("q.html", &ctx).unwrap();
        assert_eq!(
            html,
            "[Filme 50,00 R$ 1.000,00][Saco 1,50 R$ 30,00] 5,00%"
        );
    }

    #[test]
    fn autoescapes_but_keeps_safe_data_uris() {
        let (_dir, renderer) =
            renderer_with("e.html", "{{ nome }}|{{ uri | safe }}");
        let html = renderer
            .render("e.html", &json!({"nome": "A & B <Ltda>", "uri": "data:image/png;base64,AA=="}))
            .unwrap();
        assert_eq!(html, "A &amp; B &lt;Ltda&gt;|data:image/png;base64,AA==");
    }

    #[test]
    fn missing_template_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateRenderer::new(dir.path())
            .render("does_not_exist.html", &json!({}))
            .unwrap_err();
        assert!(matches!(err, QuoteError::TemplateNotFound { ref name, .. } if name == "does_not_exist.html"));
    }

    #[test]
    fn missing_field_is_a_render_error_naming_the_template() {
        let (_dir, renderer) = renderer_with("m.html", "{{ cliente.razao_social }}");
        let err = renderer.render("m.html", &json!({})).unwrap_err();
        match err {
            QuoteError::Render { name, cause } => {
                assert_eq!(name, "m.html");
                assert!(cause.contains("cliente.razao_social"), "cause: {cause}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn filters_reject_non_numbers() {
        let (_dir, renderer) = renderer_with("f.html", "{{ v | brl }}");
        assert!(renderer.render("f.html", &json!({"v": [1]})).is_err());
        assert_eq!(renderer.render("f.html", &json!({"v": "12,5"})).unwrap(), "12,50");
    }
}
