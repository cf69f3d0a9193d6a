use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::path_utils::PrefPath;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A single file at `path_pattern`.
    File,
    /// A whole directory tree, replaced in full on copy.
    Directory,
    /// Every regular file matching a wildcard pattern (`*`, `?`, `**`).
    GlobSet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceItem {
    pub id: String,
    pub label: String,
    pub path_pattern: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recommended: bool,
}

impl PreferenceItem {
    fn new(id: &str, label: &str, path_pattern: &str, kind: ItemKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            path_pattern: path_pattern.to_string(),
            kind,
            description: None,
            recommended: false,
        }
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog item has an empty id")]
    EmptyId,
    #[error("duplicate catalog item id '{0}'")]
    DuplicateId(String),
    #[error("catalog item '{id}' has an unsafe path pattern '{pattern}'")]
    UnsafePattern { id: String, pattern: String },
    #[error("catalog item '{id}' has an invalid wildcard pattern '{pattern}': {message}")]
    InvalidGlob {
        id: String,
        pattern: String,
        message: String,
    },
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, immutable registry of copyable preference items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<PreferenceItem>,
}

/// Items picked out of a catalog for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    /// Known items, in catalog order, without duplicates.
    pub items: Vec<&'a PreferenceItem>,
    /// Requested ids the catalog does not contain, in request order.
    pub unknown: Vec<String>,
}

impl Catalog {
    pub fn new(items: Vec<PreferenceItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(items.len());
        for mut item in items {
            if item.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(item.id.clone()) {
                return Err(CatalogError::DuplicateId(item.id));
            }
            let pattern = PrefPath::normalize(item.path_pattern.trim());
            let pattern = pattern.trim_end_matches('/').to_string();
            if pattern.is_empty() || !PrefPath::verify_safe(&pattern) {
                return Err(CatalogError::UnsafePattern {
                    id: item.id,
                    pattern: item.path_pattern,
                });
            }
            if item.kind == ItemKind::GlobSet {
                if let Err(e) = glob::Pattern::new(&pattern) {
                    return Err(CatalogError::InvalidGlob {
                        id: item.id,
                        pattern: item.path_pattern,
                        message: e.msg.to_string(),
                    });
                }
            }
            item.path_pattern = pattern;
            normalized.push(item);
        }
        Ok(Self { items: normalized })
    }

    /// Parse a JSON array of items and validate it like any other catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let items: Vec<PreferenceItem> = serde_json::from_str(json)?;
        Self::new(items)
    }

    /// The catalog shipped with the server.
    pub fn builtin() -> Self {
        Self {
            items: builtin_items(),
        }
    }

    pub fn items(&self) -> &[PreferenceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PreferenceItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Selection<'_> {
        let requested: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();

        let items = self
            .items
            .iter()
            .filter(|item| requested.contains(item.id.as_str()))
            .collect();

        let mut unknown: Vec<String> = Vec::new();
        for id in ids.iter().map(|s| s.as_ref()) {
            if self.get(id).is_none() && !unknown.iter().any(|u| u == id) {
                unknown.push(id.to_string());
            }
        }

        Selection { items, unknown }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_items() -> Vec<PreferenceItem> {
    vec![
        PreferenceItem::new("char_cfg", "Character config", "Char.cfg", ItemKind::File)
            .describe("Window positions, camera and general client settings")
            .recommended(),
        PreferenceItem::new("prefs_xml", "Character preferences", "Prefs.xml", ItemKind::File)
            .describe("Interface options and toggles")
            .recommended(),
        PreferenceItem::new(
            "shortcut_bars",
            "Shortcut bars",
            "Containers/ShortcutBar*.xml",
            ItemKind::GlobSet,
        )
        .describe("Hotbar layouts")
        .recommended(),
        PreferenceItem::new("containers", "Containers", "Containers", ItemKind::Directory)
            .describe("Bag and backpack layouts, including shortcut bars"),
        PreferenceItem::new("dock_areas", "Dock areas", "DockAreas", ItemKind::Directory)
            .describe("Docked panel arrangement"),
        PreferenceItem::new("chat_windows", "Chat windows", "Chat", ItemKind::Directory)
            .describe("Chat tabs, channels and filters"),
    ]
}
