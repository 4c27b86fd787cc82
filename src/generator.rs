//! Quotation to PDF, end to end.

use std::path::{Path, PathBuf};

use crate::assets::AssetResolver;
use crate::company::PRESETS;
use crate::compositor::{BackendReport, Compositor};
use crate::config::QuoteConfig;
use crate::error::Result;
use crate::quotation::{Company, Quotation};
use crate::templates::TemplateRenderer;

/// Preset key for the logo lookup: the preset with the same name, or the
/// first word of the company name.
fn company_key(company: &Company) -> String {
    let nome = company.nome.trim();
    PRESETS
        .iter()
        .find(|p| p.nome.eq_ignore_ascii_case(nome))
        .map(|p| p.key.to_string())
        .or_else(|| nome.split_whitespace().next().map(str::to_uppercase))
        .unwrap_or_default()
}

/// Write `html` as `orcamento_debug_<pid>.html` under `dir`.
pub fn dump_html(dir: &Path, html: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("orcamento_debug_{}.html", std::process::id()));
    std::fs::write(&path, html)?;
    Ok(path)
}

pub struct QuoteGenerator {
    renderer: TemplateRenderer,
    template_name: String,
    assets: AssetResolver,
    compositor: Compositor,
    dump_dir: Option<PathBuf>,
}

impl QuoteGenerator {
    pub fn from_config(config: &QuoteConfig) -> Self {
        Self {
            renderer: TemplateRenderer::new(config.template_dir.clone()),
            template_name: config.template_name.clone(),
            assets: config.asset_resolver(),
            compositor: Compositor::from_config(&config.pipeline),
            dump_dir: config.debug_dump_html.then(|| config.dump_dir()),
        }
    }

    /// Replace the backend pair.
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn backend_report(&self) -> BackendReport {
        self.compositor.backend_report()
    }

    /// Fill in the logo and watermark the quotation does not carry yet.
    /// Missing files leave the fields empty.
    pub fn with_assets(&self, quotation: &Quotation) -> Quotation {
        let mut quotation = quotation.clone();
        if quotation.empresa.logo_base64.is_none() {
            let key = company_key(&quotation.empresa);
            let hint = Some(quotation.empresa.logo_path.as_str());
            quotation.empresa.logo_base64 =
                self.assets.resolve_logo(&key, hint).map(|a| a.data_uri);
        }
        if quotation.watermark_datauri.is_none() {
            quotation.watermark_datauri = self.assets.resolve_watermark().map(|a| a.data_uri);
        }
        quotation
    }

    /// Validate, resolve assets and render the template.
    pub fn render_html(&self, quotation: &Quotation) -> Result<String> {
        quotation.validate()?;
        let quotation = self.with_assets(quotation);
        self.renderer.render(&self.template_name, &quotation.to_context())
    }

    /// The finished PDF for `quotation`.
    pub fn generate(&self, quotation: &Quotation) -> Result<Vec<u8>> {
        let html = self.render_html(quotation)?;
        if let Some(dir) = &self.dump_dir {
            match dump_html(dir, &html) {
                Ok(path) => log::info!("Rendered HTML written to {}", path.display()),
                Err(e) => log::warn!("Cannot dump rendered HTML to {}: {e}", dir.display()),
            }
        }
        let bytes = self.compositor.compose(&html, Some(self.renderer.dir()))?;
        log::info!(
            "Quotation {} for '{}': {} bytes",
            quotation.numero,
            quotation.cliente.razao_social,
            bytes.len()
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::PLASTY;
    use crate::error::QuoteError;
    use crate::quotation::tests::sample_quotation;

    const TEMPLATE: &str = r#"<html><head><title>{{ orcamento_numero }}</title></head>
<body>
{% if empresa.logo_base64 %}<img src="{{ empresa.logo_base64 | safe }}">{% endif %}
<h1>{{ empresa.nome }}</h1>
<p>{{ cliente.razao_social }}</p>
<p>Total {{ totais.total_nf | brl(symbol=true) }}</p>
</body></html>"#;

    fn setup(dump: bool) -> (tempfile::TempDir, QuoteConfig) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("orcamento.html"), TEMPLATE).unwrap();
        let config = QuoteConfig {
            template_dir: dir.path().to_path_buf(),
            asset_dirs: Some(vec![dir.path().join("assets")]),
            debug_dump_html: dump,
            dump_dir: Some(dir.path().join("dumps")),
            ..QuoteConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn company_key_prefers_presets() {
        assert_eq!(company_key(&PLASTY.to_company()), "PLASTY");
        let other = Company {
            nome: "Acme Embalagens".into(),
            ..Company::default()
        };
        assert_eq!(company_key(&other), "ACME");
        assert_eq!(company_key(&Company::default()), "");
    }

    #[test]
    fn renders_without_logo_or_watermark() {
        let (_dir, config) = setup(false);
        let generator = QuoteGenerator::from_config(&config);
        let html = generator.render_html(&sample_quotation()).unwrap();
        assert!(html.contains("Cliente XYZ Ltda"));
        assert!(html.contains("R$ 1.050,00"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn embeds_resolved_logo() {
        let (dir, config) = setup(false);
        let assets = dir.path().join("assets");
        std::fs::create_dir(&assets).unwrap();
        std::fs::write(assets.join("logo_isoforma.png"), crate::images::tests::tiny_png()).unwrap();

        let generator = QuoteGenerator::from_config(&config);
        let prepared = generator.with_assets(&sample_quotation());
        let logo = prepared.empresa.logo_base64.unwrap();
        assert!(logo.starts_with("data:image/png;base64,"));
        assert!(prepared.watermark_datauri.is_none());
    }

    #[test]
    fn generate_dumps_html_and_returns_pdf() {
        let (dir, config) = setup(true);
        let generator = QuoteGenerator::from_config(&config);
        let pdf = generator.generate(&sample_quotation()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let dump = dir
            .path()
            .join("dumps")
            .join(format!("orcamento_debug_{}.html", std::process::id()));
        assert!(std::fs::read_to_string(dump).unwrap().contains("Cliente XYZ Ltda"));
    }

    #[test]
    fn invalid_quotation_stops_before_rendering() {
        let (_dir, mut config) = setup(false);
        config.template_name = "missing.html".into();
        let generator = QuoteGenerator::from_config(&config);
        let mut q = sample_quotation();
        q.itens.clear();
        assert!(matches!(generator.generate(&q), Err(QuoteError::InvalidQuotation(_))));
        assert!(matches!(
            generator.generate(&sample_quotation()),
            Err(QuoteError::TemplateNotFound { .. })
        ));
    }
}
