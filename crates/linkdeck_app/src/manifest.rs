//! Page manifests
//!
//! A manifest describes one link-in-bio page and builds the markup the
//! enhancement layer expects:
//!
//! ```text
//! body
//! ├── h1.page-title
//! └── main.links
//!     ├── a.link-card[href]
//!     │   └── span.link-title
//!     └── ...
//! ```
//!
//! ```toml
//! title = "Ada Lovelace"
//! viewport_height = 640.0
//!
//! [[links]]
//! url = "https://example.com/notes"
//! label = "Notes"
//!
//! [[links]]
//! url = "https://example.com/no-label"
//! ```
//!
//! Cards are laid out as a vertical stack starting at `layout.top_offset`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use linkdeck_dom::{Document, ElementId, LayoutBox};

use crate::error::{AppError, Result};

/// A link-in-bio page
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PageManifest {
    pub title: String,
    /// Overrides the document's default viewport height
    #[serde(default)]
    pub viewport_height: Option<f32>,
    #[serde(default)]
    pub layout: StackLayout,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// One link card
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinkEntry {
    pub url: String,
    /// Cards without a label get no title element
    #[serde(default)]
    pub label: Option<String>,
}

/// Vertical stack geometry, in px
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StackLayout {
    pub top_offset: f32,
    pub card_height: f32,
    pub gap: f32,
}

impl Default for StackLayout {
    fn default() -> Self {
        Self {
            top_offset: 160.0,
            card_height: 64.0,
            gap: 16.0,
        }
    }
}

impl StackLayout {
    /// Box of the card at `index`
    pub fn card_box(&self, index: usize) -> LayoutBox {
        let top = self.top_offset + index as f32 * (self.card_height + self.gap);
        LayoutBox::new(top, self.card_height)
    }
}

impl PageManifest {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let manifest: PageManifest = toml::from_str(source)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(index) = self.links.iter().position(|l| l.url.trim().is_empty()) {
            return Err(AppError::InvalidManifest(format!(
                "link {} has an empty url",
                index
            )));
        }
        if self.layout.card_height <= 0.0 {
            return Err(AppError::InvalidManifest(
                "layout.card_height must be positive".to_string(),
            ));
        }
        if self.layout.gap < 0.0 || self.layout.top_offset < 0.0 {
            return Err(AppError::InvalidManifest(
                "layout offsets must not be negative".to_string(),
            ));
        }
        if self.viewport_height.is_some_and(|h| h <= 0.0) {
            return Err(AppError::InvalidManifest(
                "viewport_height must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the page markup into `document`, returning the cards in order
    pub fn build(&self, document: &Document) -> Result<Vec<ElementId>> {
        if let Some(height) = self.viewport_height {
            document.set_viewport_height(height);
        }

        let heading = document.create_element("h1");
        document.add_class(heading, "page-title")?;
        document.set_text(heading, self.title.clone())?;
        document.set_layout(heading, LayoutBox::new(self.layout.top_offset / 2.0, 40.0))?;
        document.append_child(document.body(), heading)?;

        let main = document.create_element("main");
        document.add_class(main, "links")?;
        document.append_child(document.body(), main)?;

        let mut cards = Vec::with_capacity(self.links.len());
        for (index, link) in self.links.iter().enumerate() {
            let card = document.create_element("a");
            document.add_class(card, "link-card")?;
            document.set_attribute(card, "href", link.url.clone())?;
            document.set_layout(card, self.layout.card_box(index))?;

            if let Some(label) = &link.label {
                let title = document.create_element("span");
                document.add_class(title, "link-title")?;
                document.set_text(title, label.clone())?;
                document.append_child(card, title)?;
            }

            document.append_child(main, card)?;
            cards.push(card);
        }

        let bottom = match cards.len() {
            0 => self.layout.top_offset,
            n => self.layout.card_box(n - 1).bottom(),
        };
        document.set_layout(
            main,
            LayoutBox::new(self.layout.top_offset, bottom - self.layout.top_offset),
        )?;

        tracing::debug!(title = %self.title, cards = cards.len(), "page built");
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
title = "Ada"
viewport_height = 400.0

[[links]]
url = "https://x.example/a"
label = "Alpha"

[[links]]
url = "https://x.example/b"
"#;

    #[test]
    fn test_parse_defaults() {
        let manifest = PageManifest::from_toml_str(PAGE).unwrap();
        assert_eq!(manifest.links.len(), 2);
        assert_eq!(manifest.links[1].label, None);
        assert_eq!(manifest.layout, StackLayout::default());
    }

    #[test]
    fn test_build_markup_contract() {
        let manifest = PageManifest::from_toml_str(PAGE).unwrap();
        let doc = Document::new();
        let cards = manifest.build(&doc).unwrap();

        assert_eq!(
            doc.query_selector_all("main.links > a.link-card[href]", None)
                .unwrap(),
            cards
        );
        let titles = doc.query_selector_all(".link-title", Some(cards[0])).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(doc.text_content(titles[0]).as_deref(), Some("Alpha"));
        assert!(doc
            .query_selector(".link-title", Some(cards[1]))
            .unwrap()
            .is_none());
        assert_eq!(doc.viewport().height, 400.0);
    }

    #[test]
    fn test_stacked_layout() {
        let manifest = PageManifest::from_toml_str(PAGE).unwrap();
        let doc = Document::new();
        let cards = manifest.build(&doc).unwrap();

        assert_eq!(doc.layout(cards[0]), Some(LayoutBox::new(160.0, 64.0)));
        assert_eq!(doc.layout(cards[1]), Some(LayoutBox::new(240.0, 64.0)));
    }

    #[test]
    fn test_rejects_empty_url() {
        let err = PageManifest::from_toml_str("title = \"x\"\n[[links]]\nurl = \" \"\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidManifest(_)));
    }

    #[test]
    fn test_rejects_missing_title() {
        let err = PageManifest::from_toml_str("[[links]]\nurl = \"https://x\"\n").unwrap_err();
        assert!(matches!(err, AppError::ManifestParse(_)));
    }
}
