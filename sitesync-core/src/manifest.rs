//! Template manifest: which files the template sync manages.
//!
//! Three disjoint lists:
//! - `tracked`: structural files overwritten from upstream when they differ
//! - `deprecated`: files removed by newer template versions; deleted if present
//! - `customization`: created once from upstream, never overwritten
//!
//! Any path on none of these lists is never touched by the sync.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_TRACKED: &[&str] = &[
    ".eleventy.js",
    ".eleventyignore",
    "README.md",
    "netlify.toml",
    "package.json",
    "package-lock.json",
    "vercel.json",
    "plugin-info.json",
    "src/helpers/constants.js",
    "src/helpers/linkUtils.js",
    "src/helpers/utils.js",
    "src/site/404.njk",
    "src/site/sitemap.njk",
    "src/site/feed.njk",
    "src/site/_data/eleventyComputed.js",
    "src/site/_data/meta.js",
    "src/site/_includes/layouts/note.njk",
    "src/site/_includes/layouts/index.njk",
    "src/site/_includes/components/pageheader.njk",
    "src/site/_includes/components/linkPreview.njk",
    "src/site/_includes/components/references.njk",
    "src/site/_includes/components/sidebar.njk",
    "src/site/_includes/components/graphScript.njk",
    "src/site/_includes/components/filetree.njk",
    "src/site/_includes/components/filetreeNavbar.njk",
    "src/site/_includes/components/navbar.njk",
    "src/site/_includes/components/searchButton.njk",
    "src/site/_includes/components/searchContainer.njk",
    "src/site/_includes/components/searchScript.njk",
    "src/site/_includes/components/calloutScript.njk",
    "src/site/_includes/components/lucideIcons.njk",
    "src/site/_includes/components/timestamps.njk",
    "src/site/lunr-index.js",
    "src/site/lunr.njk",
    "src/site/styles/style.scss",
    "src/site/styles/digital-garden-base.scss",
    "src/site/styles/obsidian-base.scss",
    "src/site/index.11tydata.js",
    "src/site/graph.njk",
    "api/search.js",
    "netlify/functions/search/search.js",
];

const DEFAULT_DEPRECATED: &[&str] = &[
    "src/site/styles/style.css",
    "src/site/index.njk",
    "src/site/versionednote.njk",
    "src/site/_includes/layouts/versionednote.njk",
    "src/site/_includes/components/notegrowthhistory.njk",
];

const DEFAULT_CUSTOMIZATION: &str = "src/site/styles/custom-style.scss";

/// Fixed lists of paths the template sync is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub tracked: Vec<String>,
    #[serde(default)]
    pub deprecated: Vec<String>,
    pub customization: String,
}

impl Default for TemplateManifest {
    fn default() -> Self {
        Self {
            tracked: DEFAULT_TRACKED.iter().map(|s| s.to_string()).collect(),
            deprecated: DEFAULT_DEPRECATED.iter().map(|s| s.to_string()).collect(),
            customization: DEFAULT_CUSTOMIZATION.to_string(),
        }
    }
}

impl TemplateManifest {
    /// Check the lists are usable: no empty paths, no duplicate tracked
    /// entries, and the customization file on neither of the other lists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.customization.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "manifest.customization must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for path in &self.tracked {
            if path.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "manifest.tracked contains an empty path".to_string(),
                ));
            }
            if !seen.insert(path.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "manifest.tracked lists '{path}' more than once"
                )));
            }
        }
        if let Some(empty) = self.deprecated.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "manifest.deprecated contains an empty path ({empty:?})"
            )));
        }

        if let Some(both) = self.deprecated.iter().find(|p| seen.contains(p.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "'{both}' is both tracked and deprecated"
            )));
        }

        if self.tracked.contains(&self.customization)
            || self.deprecated.contains(&self.customization)
        {
            return Err(ConfigError::Invalid(format!(
                "customization file '{}' must not be tracked or deprecated",
                self.customization
            )));
        }
        Ok(())
    }
}
