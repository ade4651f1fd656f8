// JSON-backed message catalog loader.
//
// The English catalog ships inside the binary. An optional override file
// (flat `{ "key": "template" }` object) is merged over it at startup.

use crate::core::localization::MessageCatalog;
use anyhow::{Context, Result};
use std::path::Path;

const BUNDLED_EN: &str = include_str!("../../../locales/en.json");

/// Parse a flat JSON object of key -> template.
pub fn parse_catalog(json: &str) -> Result<MessageCatalog> {
    serde_json::from_str(json).context("Catalog must be a flat JSON object of strings")
}

/// The bundled English catalog, optionally overlaid with `override_path`.
pub fn load_catalog(override_path: Option<&Path>) -> Result<MessageCatalog> {
    let mut catalog = parse_catalog(BUNDLED_EN).context("Bundled catalog is invalid")?;

    if let Some(path) = override_path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read locale file {}", path.display()))?;
        let overrides = parse_catalog(&raw)
            .with_context(|| format!("Failed to parse locale file {}", path.display()))?;
        tracing::info!(
            "Loaded {} translations from {}",
            overrides.len(),
            path.display()
        );
        catalog.merge(overrides);
    }

    Ok(catalog)
}
