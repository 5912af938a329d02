//! Crawl output layout: URL → filesystem path mapping and artifact writes.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use docharvest_shared::{HarvestError, Result};

/// A file written during the crawl.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub url: String,
    pub content_type: String,
    pub size: u64,
}

/// Maps page/asset URLs into a crawl's output directory and records every
/// file written.
#[derive(Debug)]
pub struct OutputLayout {
    root: PathBuf,
    base: Url,
    files: Vec<DownloadedFile>,
}

impl OutputLayout {
    pub fn new(root: PathBuf, base: Url) -> Self {
        Self {
            root,
            base,
            files: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path for a URL: its path with the crawl base path stripped,
    /// any file extension removed, `index` for the root, and a short stable
    /// hash suffix when a query string distinguishes variants.
    pub fn rel_path(&self, url: &Url) -> String {
        let base_path = self.base.path();
        let path = url.path();

        let stripped = if base_path != "/" && path.starts_with(base_path) {
            &path[base_path.len()..]
        } else {
            path
        };

        let cleaned = strip_extension(stripped.trim_start_matches('/').trim_end_matches('/'));

        let mut rel = if cleaned.is_empty() {
            "index".to_string()
        } else {
            cleaned.to_string()
        };

        if let Some(query) = url.query() {
            rel.push_str(&format!("_{}", query_hash(query)));
        }

        rel
    }

    /// Absolute output path for a URL with the given extension.
    pub fn page_path(&self, url: &Url, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{extension}", self.rel_path(url)))
    }

    /// Write a per-page text artifact.
    pub fn save_text(
        &mut self,
        url: &Url,
        extension: &str,
        content: &str,
        content_type: &str,
    ) -> Result<PathBuf> {
        let path = self.page_path(url, extension);
        self.write(path, url.as_str(), content.as_bytes(), content_type)
    }

    /// Write a per-page binary artifact.
    pub fn save_bytes(
        &mut self,
        url: &Url,
        extension: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<PathBuf> {
        let path = self.page_path(url, extension);
        self.write(path, url.as_str(), bytes, content_type)
    }

    /// Write a site-level artifact directly under the output root.
    pub fn save_root_text(
        &mut self,
        file_name: &str,
        content: &str,
        content_type: &str,
    ) -> Result<PathBuf> {
        let path = self.root.join(file_name);
        let url = self.base.to_string();
        self.write(path, &url, content.as_bytes(), content_type)
    }

    fn write(
        &mut self,
        path: PathBuf,
        url: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| HarvestError::io(&path, e))?;

        debug!(path = %path.display(), size = bytes.len(), "artifact written");
        self.files.push(DownloadedFile {
            path: path.clone(),
            url: url.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
        });

        Ok(path)
    }

    pub fn files(&self) -> &[DownloadedFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<DownloadedFile> {
        self.files
    }
}

/// Short stable hash for query-string variants of the same path.
fn query_hash(query: &str) -> u16 {
    let digest = Sha256::digest(query.as_bytes());
    u16::from_le_bytes([digest[0], digest[1]]) % 10000
}

/// Drop a trailing file extension from the last path segment, so the output
/// extension is always derived from the artifact being written.
fn strip_extension(path: &str) -> &str {
    let segment_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..segment_start + dot],
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(base: &str) -> OutputLayout {
        OutputLayout::new(PathBuf::from("/tmp/out"), Url::parse(base).unwrap())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn root_url_maps_to_index() {
        let layout = layout("https://docs.example.com/");
        assert_eq!(layout.rel_path(&url("https://docs.example.com/")), "index");
    }

    #[test]
    fn page_extension_is_stripped() {
        let layout = layout("https://docs.example.com/");
        assert_eq!(
            layout.rel_path(&url("https://docs.example.com/guide/intro.html")),
            "guide/intro"
        );
        assert_eq!(
            layout.rel_path(&url("https://docs.example.com/assets/style.css")),
            "assets/style"
        );
        // Dotted directory names are left alone.
        assert_eq!(
            layout.rel_path(&url("https://docs.example.com/v1.2/guide")),
            "v1.2/guide"
        );
    }

    #[test]
    fn base_path_prefix_is_removed() {
        let layout = layout("https://example.com/docs");
        assert_eq!(
            layout.rel_path(&url("https://example.com/docs/api/auth")),
            "api/auth"
        );
    }

    #[test]
    fn query_variants_get_distinct_stable_names() {
        let layout = layout("https://docs.example.com/");
        let a1 = layout.rel_path(&url("https://docs.example.com/search?q=one"));
        let a2 = layout.rel_path(&url("https://docs.example.com/search?q=two"));
        let a1_again = layout.rel_path(&url("https://docs.example.com/search?q=one"));

        assert_ne!(a1, a2);
        assert_eq!(a1, a1_again);
        assert!(a1.starts_with("search_"));
    }

    #[test]
    fn page_path_appends_extension_under_root() {
        let layout = layout("https://docs.example.com/");
        let path = layout.page_path(&url("https://docs.example.com/guide/intro"), "md");
        assert_eq!(path, PathBuf::from("/tmp/out/guide/intro.md"));
    }

    #[test]
    fn writes_record_downloaded_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layout = OutputLayout::new(
            dir.path().to_path_buf(),
            Url::parse("https://docs.example.com/").unwrap(),
        );

        layout
            .save_text(
                &url("https://docs.example.com/guide"),
                "md",
                "# Guide\n",
                "text/markdown",
            )
            .unwrap();
        layout
            .save_root_text("llms.txt", "# Site\n", "text/plain")
            .unwrap();

        assert_eq!(layout.files().len(), 2);
        assert!(dir.path().join("guide.md").exists());
        assert!(dir.path().join("llms.txt").exists());
        assert_eq!(layout.files()[0].size, 8);
    }
}
