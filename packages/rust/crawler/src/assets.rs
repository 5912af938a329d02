//! Asset inclusion policy and discovery.

use scraper::{Html, Selector};
use url::Url;

use docharvest_shared::CrawlConfig;

/// Which asset classes a crawl persists. Each class toggles independently;
/// video/audio and unrecognized types are always dropped.
#[derive(Debug, Clone, Copy)]
pub struct AssetPolicy {
    pub images: bool,
    pub stylesheets: bool,
    pub scripts: bool,
    pub fonts: bool,
}

impl From<&CrawlConfig> for AssetPolicy {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            images: config.include_images,
            stylesheets: config.include_css,
            scripts: config.include_js,
            fonts: config.include_fonts,
        }
    }
}

impl AssetPolicy {
    /// Whether a fetched asset with this content type should be persisted.
    pub fn should_download(&self, content_type: &str) -> bool {
        let ct = content_type.to_lowercase();

        if ct.contains("video") || ct.contains("audio") {
            return false;
        }
        if ct.contains("text/css") {
            return self.stylesheets;
        }
        if ct.contains("javascript") {
            return self.scripts;
        }
        if ct.contains("image") {
            return self.images;
        }
        if ct.contains("font") {
            return self.fonts;
        }

        false
    }

    /// Whether any asset class is enabled at all.
    pub fn any_enabled(&self) -> bool {
        self.images || self.stylesheets || self.scripts || self.fonts
    }
}

/// File extension for a content type, `bin` when unrecognized.
pub fn extension_for(content_type: &str) -> &'static str {
    let ct = content_type.to_lowercase();

    if ct.contains("text/html") {
        "html"
    } else if ct.contains("text/css") {
        "css"
    } else if ct.contains("javascript") {
        "js"
    } else if ct.contains("image/png") {
        "png"
    } else if ct.contains("image/jpeg") || ct.contains("image/jpg") {
        "jpg"
    } else if ct.contains("image/svg") {
        "svg"
    } else if ct.contains("image/gif") {
        "gif"
    } else if ct.contains("font/woff2") {
        "woff2"
    } else if ct.contains("font/woff") {
        "woff"
    } else if ct.contains("font/ttf") {
        "ttf"
    } else if ct.contains("json") {
        "json"
    } else {
        "bin"
    }
}

/// Collect asset URLs referenced by a page, honoring the policy's toggles,
/// resolved against the page URL. Duplicates within the page are kept; the
/// caller deduplicates against its visited set on the full URL form.
pub fn discover_assets(doc: &Html, base_url: &Url, policy: &AssetPolicy) -> Vec<Url> {
    let mut assets = Vec::new();

    if policy.stylesheets {
        let sel = Selector::parse("link[rel=\"stylesheet\"][href]").unwrap();
        for el in doc.select(&sel) {
            if let Some(href) = el.value().attr("href") {
                if let Ok(resolved) = base_url.join(href) {
                    assets.push(resolved);
                }
            }
        }
    }

    if policy.scripts {
        let sel = Selector::parse("script[src]").unwrap();
        for el in doc.select(&sel) {
            if let Some(src) = el.value().attr("src") {
                if let Ok(resolved) = base_url.join(src) {
                    assets.push(resolved);
                }
            }
        }
    }

    if policy.images {
        let sel = Selector::parse("img[src]").unwrap();
        for el in doc.select(&sel) {
            if let Some(src) = el.value().attr("src") {
                if let Ok(resolved) = base_url.join(src) {
                    assets.push(resolved);
                }
            }
        }
    }

    assets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> AssetPolicy {
        AssetPolicy {
            images: true,
            stylesheets: true,
            scripts: true,
            fonts: true,
        }
    }

    #[test]
    fn policy_respects_toggles() {
        let mut policy = all_on();
        assert!(policy.should_download("text/css"));
        policy.stylesheets = false;
        assert!(!policy.should_download("text/css"));

        policy.images = false;
        assert!(!policy.should_download("image/png"));
        assert!(policy.should_download("font/woff2"));
    }

    #[test]
    fn media_is_always_dropped() {
        let policy = all_on();
        assert!(!policy.should_download("video/mp4"));
        assert!(!policy.should_download("audio/mpeg"));
        assert!(!policy.should_download("application/octet-stream"));
    }

    #[test]
    fn extensions_map_from_content_type() {
        assert_eq!(extension_for("text/css; charset=utf-8"), "css");
        assert_eq!(extension_for("application/javascript"), "js");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("font/woff2"), "woff2");
        assert_eq!(extension_for("application/wasm"), "bin");
    }

    #[test]
    fn discovery_honors_toggles_and_resolves() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <script src="app.js"></script>
        </head><body>
            <img src="logo.png">
        </body></html>"#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://docs.example.com/guide/").unwrap();

        let urls = discover_assets(&doc, &base, &all_on());
        let strings: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            strings,
            vec![
                "https://docs.example.com/style.css",
                "https://docs.example.com/guide/app.js",
                "https://docs.example.com/guide/logo.png",
            ]
        );

        let no_images = AssetPolicy {
            images: false,
            ..all_on()
        };
        let urls = discover_assets(&doc, &base, &no_images);
        assert!(urls.iter().all(|u| !u.as_str().ends_with(".png")));
    }
}
