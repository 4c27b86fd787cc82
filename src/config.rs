//! Generator configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file.
//! Directory settings can be overridden from the environment.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::assets::AssetResolver;
use crate::catalog::{Catalog, JsonWorkbook};
use crate::error::{QuoteError, Result, StoreError};
use crate::pipeline::PipelineConfig;

pub const TEMPLATE_DIR_ENV: &str = "QUOTE_FORGE_TEMPLATE_DIR";
/// Search path list, separated like `PATH`.
pub const ASSET_DIR_ENV: &str = "QUOTE_FORGE_ASSET_DIR";

pub const DEFAULT_TEMPLATE: &str = "orcamento.html";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub template_dir: PathBuf,
    pub template_name: String,
    /// Logo and watermark search directories. When unset the template
    /// directory, its `assets/` child, the working directory and
    /// `./assets` are searched.
    pub asset_dirs: Option<Vec<PathBuf>>,
    pub pipeline: PipelineConfig,
    /// Write the rendered HTML next to the PDF pipeline for inspection.
    pub debug_dump_html: bool,
    /// Where HTML dumps go; the system temp directory when unset.
    pub dump_dir: Option<PathBuf>,
    /// Client/product workbook opened by [`QuoteConfig::open_catalog`].
    pub catalog_path: PathBuf,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            template_name: DEFAULT_TEMPLATE.to_string(),
            asset_dirs: None,
            pipeline: PipelineConfig::default(),
            debug_dump_html: false,
            dump_dir: None,
            catalog_path: PathBuf::from("catalogo.json"),
        }
    }
}

impl QuoteConfig {
    /// Read a JSON config file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| QuoteError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self = serde_json::from_str(&text)
            .map_err(|e| QuoteError::Config(format!("{}: {e}", path.display())))?;
        config.apply_env();
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var_os(key));
    }

    /// Apply directory overrides from `lookup`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<OsString>) {
        if let Some(dir) = lookup(TEMPLATE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.template_dir = PathBuf::from(dir);
        }
        if let Some(dirs) = lookup(ASSET_DIR_ENV).filter(|v| !v.is_empty()) {
            let dirs: Vec<PathBuf> = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !dirs.is_empty() {
                self.asset_dirs = Some(dirs);
            }
        }
    }

    pub fn dump_dir(&self) -> PathBuf {
        self.dump_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Open the catalog at `catalog_path`, creating its tabs if needed.
    pub fn open_catalog(&self) -> Result<Catalog<JsonWorkbook>, StoreError> {
        Catalog::open(&self.catalog_path)
    }

    pub fn asset_resolver(&self) -> AssetResolver {
        match &self.asset_dirs {
            Some(dirs) => AssetResolver::new(dirs.clone()),
            None => AssetResolver::with_defaults(&self.template_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PageOrientation;

    #[test]
    fn empty_object_yields_defaults() {
        let config: QuoteConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.template_dir, PathBuf::from("templates"));
        assert_eq!(config.template_name, DEFAULT_TEMPLATE);
        assert!(!config.debug_dump_html);
        assert!(config.pipeline.strict_lengths);
        assert_eq!(config.dump_dir(), std::env::temp_dir());
    }

    #[test]
    fn load_reads_nested_pipeline_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.json");
        std::fs::write(
            &path,
            r#"{ "template_name": "proposta.html",
                 "debug_dump_html": true,
                 "pipeline": { "orientation": "landscape", "page_margin": 20 } }"#,
        )
        .unwrap();
        let config = QuoteConfig::load(&path).unwrap();
        assert_eq!(config.template_name, "proposta.html");
        assert!(config.debug_dump_html);
        assert_eq!(config.pipeline.orientation, PageOrientation::Landscape);
        assert_eq!(config.pipeline.page_margin, 20.0);
    }

    #[test]
    fn load_failures_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(QuoteConfig::load(&missing), Err(QuoteError::Config(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ template_dir: ").unwrap();
        assert!(matches!(QuoteConfig::load(&broken), Err(QuoteError::Config(_))));
    }

    #[test]
    fn overrides_replace_directories() {
        let mut config = QuoteConfig::default();
        let joined = std::env::join_paths(["/srv/a", "/srv/b"]).unwrap();
        config.apply_overrides(|key| match key {
            TEMPLATE_DIR_ENV => Some(OsString::from("/srv/templates")),
            ASSET_DIR_ENV => Some(joined.clone()),
            _ => None,
        });
        assert_eq!(config.template_dir, PathBuf::from("/srv/templates"));
        assert_eq!(
            config.asset_resolver().dirs(),
            [PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );

        let mut untouched = QuoteConfig::default();
        untouched.apply_overrides(|_| Some(OsString::new()));
        assert_eq!(untouched.template_dir, PathBuf::from("templates"));
        assert!(untouched.asset_dirs.is_none());
    }

    #[test]
    fn catalog_opens_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados").join("clientes.json");
        let config: QuoteConfig = serde_json::from_value(serde_json::json!({
            "catalog_path": path,
        }))
        .unwrap();

        let mut catalog = config.open_catalog().unwrap();
        assert_eq!(catalog.workbook().path(), Some(path.as_path()));
        assert_eq!(catalog.workbook().sheet_names().count(), 2);
        assert!(catalog.list_clients().is_empty());
        assert!(path.is_file());
    }
}
