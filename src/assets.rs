//! Logo and watermark lookup.
//!
//! Assets are searched in an ordered list of directories and embedded as
//! base64 data URIs. A missing or unreadable asset is reported as `None`;
//! the document is then rendered without it.

use std::path::{Path, PathBuf};

use crate::images::{encode_data_uri, mime_for_path};

pub const WATERMARK_FILE: &str = "watermark.png";

/// An image file read from disk and encoded for inline embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedAsset {
    pub path: PathBuf,
    pub mime: &'static str,
    pub data_uri: String,
}

#[derive(Debug, Clone)]
pub struct AssetResolver {
    dirs: Vec<PathBuf>,
}

impl AssetResolver {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `<template dir>`, `<template dir>/assets`, cwd, `cwd/assets`.
    pub fn with_defaults(template_dir: &Path) -> Self {
        let mut dirs = vec![template_dir.to_path_buf(), template_dir.join("assets")];
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd.join("assets"));
            dirs.insert(2, cwd);
        }
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First existing `dir/name`, directories outermost, names innermost.
    fn find(&self, names: &[String]) -> Option<PathBuf> {
        self.dirs
            .iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
    }

    /// Locate a company logo. An absolute `hint` that exists wins; then the
    /// hint's file name, `logo_<key>.png` and `logo_<key>.jpg` are tried in
    /// every search directory.
    pub fn find_logo(&self, company_key: &str, hint: Option<&str>) -> Option<PathBuf> {
        let hint = hint.map(str::trim).filter(|h| !h.is_empty()).map(Path::new);
        if let Some(path) = hint {
            if path.is_absolute() && path.is_file() {
                return Some(path.to_path_buf());
            }
        }

        let base = format!("logo_{}", company_key.trim().to_lowercase());
        let mut names: Vec<String> = Vec::new();
        let hinted = hint
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        for name in hinted
            .into_iter()
            .chain([format!("{base}.png"), format!("{base}.jpg")])
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        self.find(&names)
    }

    pub fn resolve_logo(&self, company_key: &str, hint: Option<&str>) -> Option<EmbeddedAsset> {
        match self.find_logo(company_key, hint) {
            Some(path) => embed(&path),
            None => {
                log::info!("No logo found for company '{company_key}'");
                None
            }
        }
    }

    pub fn resolve_watermark(&self) -> Option<EmbeddedAsset> {
        match self.find(&[WATERMARK_FILE.to_string()]) {
            Some(path) => embed(&path),
            None => {
                log::debug!("No {WATERMARK_FILE} in {} search dir(s)", self.dirs.len());
                None
            }
        }
    }
}

/// Read `path` and encode it as a data URI. Read errors are logged.
pub fn embed(path: &Path) -> Option<EmbeddedAsset> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mime = mime_for_path(path);
            Some(EmbeddedAsset {
                path: path.to_path_buf(),
                mime,
                data_uri: encode_data_uri(mime, &bytes),
            })
        }
        Err(e) => {
            log::warn!("Cannot read asset {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_name_beats_conventional_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marca.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("logo_isoforma.png"), b"png").unwrap();
        let resolver = AssetResolver::new(vec![dir.path().to_path_buf()]);

        let asset = resolver
            .resolve_logo("ISOFORMA", Some("/somewhere/else/marca.jpg"))
            .unwrap();
        assert_eq!(asset.path, dir.path().join("marca.jpg"));
        assert_eq!(asset.mime, "image/jpeg");
        assert!(asset.data_uri.starts_with("data:image/jpeg;base64,"));

        let asset = resolver.resolve_logo("ISOFORMA", None).unwrap();
        assert_eq!(asset.mime, "image/png");
    }

    #[test]
    fn absolute_hint_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("custom.png");
        std::fs::write(&logo, b"png").unwrap();
        let resolver = AssetResolver::new(Vec::new());
        assert_eq!(
            resolver.find_logo("PLASTY", logo.to_str()),
            Some(logo.clone())
        );
    }

    #[test]
    fn directories_are_searched_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("logo_plasty.jpg"), b"2").unwrap();
        std::fs::write(second.path().join(WATERMARK_FILE), b"2").unwrap();
        std::fs::create_dir(first.path().join("assets")).unwrap();
        std::fs::write(first.path().join("assets").join(WATERMARK_FILE), b"1").unwrap();

        let resolver = AssetResolver::new(vec![
            first.path().to_path_buf(),
            first.path().join("assets"),
            second.path().to_path_buf(),
        ]);
        assert_eq!(
            resolver.resolve_watermark().unwrap().path,
            first.path().join("assets").join(WATERMARK_FILE)
        );
        assert_eq!(
            resolver.find_logo("plasty", None),
            Some(second.path().join("logo_plasty.jpg"))
        );
    }

    #[test]
    fn misses_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(vec![dir.path().to_path_buf()]);
        assert!(resolver.resolve_logo("ISOFORMA", Some("logo.png")).is_none());
        assert!(resolver.resolve_watermark().is_none());
    }

    #[test]
    fn default_dirs_start_with_template_dir() {
        let resolver = AssetResolver::with_defaults(Path::new("/tpl"));
        assert_eq!(resolver.dirs()[0], Path::new("/tpl"));
        assert_eq!(resolver.dirs()[1], Path::new("/tpl/assets"));
        assert_eq!(resolver.dirs().len(), 4);
    }
}
