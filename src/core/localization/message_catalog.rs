// Localized user-facing strings.
//
// A catalog maps message keys (e.g. "message_manager.no-channel") to
// templates with `{name}` placeholders. Loading and merging catalog files is
// an infra concern; this type only stores and renders.

use serde::Deserialize;
use std::collections::HashMap;

/// Deserializes from a flat `{ "key": "template" }` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
}

impl MessageCatalog {
    #[cfg(test)]
    pub fn new(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    /// Overlay `other` on top of this catalog; its keys win.
    pub fn merge(&mut self, other: MessageCatalog) {
        self.templates.extend(other.templates);
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Render `key`, substituting each `{name}` with its value.
    ///
    /// Unknown keys render as the key itself so a missing translation is
    /// visible rather than silent.
    pub fn render(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.templates.get(key) else {
            tracing::warn!("Missing translation for key {}", key);
            return key.to_string();
        };

        args.iter().fold(template.clone(), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
    }
}
