//! Image sources referenced by a document: `<img src>` and CSS
//! `background-image: url(...)`.
//!
//! Sources are either `data:` URIs or paths resolved against the document's
//! base directory. Each distinct source is read and decoded once per render
//! and shared between layout (intrinsic size) and the PDF writer (embedding).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::style::StyledNode;

/// Raw bytes of a decodable image plus its pixel size.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Split a base64 `data:` URI into its MIME type and decoded payload.
pub fn parse_data_uri(src: &str) -> Option<(String, Vec<u8>)> {
    let rest = src.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64_STD.decode(cleaned).ok()?;
    Some((mime.to_string(), bytes))
}

/// `image/png` for `.png`, `image/jpeg` for everything else.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Encode bytes as a base64 `data:` URI.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64_STD.encode(bytes))
}

/// Read the bytes behind `src`. Relative paths resolve against `base_dir`.
/// Remote URLs are not fetched.
pub fn load_image_bytes(src: &str, base_dir: Option<&Path>) -> Option<Vec<u8>> {
    let src = src.trim();
    if src.starts_with("data:") {
        return parse_data_uri(src).map(|(_, bytes)| bytes);
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        log::warn!("Remote image {src} is not fetched");
        return None;
    }
    let path = PathBuf::from(src.strip_prefix("file://").unwrap_or(src));
    let path = match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    };
    match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("Cannot read image {}: {e}", path.display());
            None
        }
    }
}

/// Images of one document, keyed by their `src` string.
#[derive(Debug, Default)]
pub struct ImageStore {
    base_dir: Option<PathBuf>,
    images: HashMap<String, LoadedImage>,
}

impl ImageStore {
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
            images: HashMap::new(),
        }
    }

    /// Load every image referenced in a styled tree.
    pub fn collect(&mut self, nodes: &[StyledNode]) {
        for node in nodes {
            if let StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } = node
            {
                if *tag == crate::dom::Tag::Img {
                    if let Some(src) = attrs.get("src") {
                        self.load(src);
                    }
                }
                if let Some(src) = &style.background_image {
                    self.load(src);
                }
                self.collect(children);
            }
        }
    }

    /// Load and decode `src` unless already present. Undecodable sources are
    /// logged and skipped.
    pub fn load(&mut self, src: &str) {
        if self.images.contains_key(src) {
            return;
        }
        let Some(bytes) = load_image_bytes(src, self.base_dir.as_deref()) else {
            return;
        };
        match ::image::load_from_memory(&bytes) {
            Ok(img) => {
                let loaded = LoadedImage {
                    width: img.width(),
                    height: img.height(),
                    bytes,
                };
                self.images.insert(src.to_string(), loaded);
            }
            Err(e) => log::warn!("Cannot decode image {}: {e}", short_src(src)),
        }
    }

    pub fn get(&self, src: &str) -> Option<&LoadedImage> {
        self.images.get(src)
    }

    /// Pixel size as points (1px = 1pt).
    pub fn intrinsic_size(&self, src: &str) -> Option<(f32, f32)> {
        self.get(src)
            .filter(|img| img.width > 0 && img.height > 0)
            .map(|img| (img.width as f32, img.height as f32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LoadedImage)> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Data URIs are long; keep log lines readable.
fn short_src(src: &str) -> String {
    if src.chars().count() > 48 {
        let head: String = src.chars().take(48).collect();
        format!("{head}...")
    } else {
        src.to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 2x1 RGB PNG.
    pub(crate) fn tiny_png() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(2, 1, ::image::Rgb([200, 10, 10]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn data_uri_roundtrip_through_store() {
        let uri = encode_data_uri("image/png", &tiny_png());
        let (mime, bytes) = parse_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, tiny_png());

        let mut store = ImageStore::new(None);
        store.load(&uri);
        assert_eq!(store.intrinsic_size(&uri), Some((2.0, 1.0)));
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), tiny_png()).unwrap();
        let mut store = ImageStore::new(Some(dir.path()));
        store.load("logo.png");
        store.load("missing.png");
        assert_eq!(store.len(), 1);
        assert!(store.get("logo.png").is_some());
    }

    #[test]
    fn rejects_non_base64_uris_and_garbage() {
        assert!(parse_data_uri("data:image/png,rawbytes").is_none());
        let mut store = ImageStore::new(None);
        store.load(&encode_data_uri("image/png", b"not an image"));
        assert!(store.is_empty());
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("a/logo.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("logo.jpg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("logo")), "image/jpeg");
    }
}
