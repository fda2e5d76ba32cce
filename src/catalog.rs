//! catalog.rs — The read-only inventory of registered tourist sites.
//!
//! Loaded once at startup from a JSON artifact and never mutated at request
//! time; everything downstream borrows from it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Closed set of catalog categories. Wire tags are the lowercase Spanish
/// names used by the admin tooling and the detection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ciudad,
    Cascada,
    Laguna,
    Playa,
    Parque,
    Monumento,
    Cultural,
    Otro,
}

impl Category {
    /// Stable lowercase tag, also used for deterministic tie-breaking.
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Ciudad => "ciudad",
            Category::Cascada => "cascada",
            Category::Laguna => "laguna",
            Category::Playa => "playa",
            Category::Parque => "parque",
            Category::Monumento => "monumento",
            Category::Cultural => "cultural",
            Category::Otro => "otro",
        }
    }
}

/// One registered tourist site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: u64,
    pub name: String,
    pub category: Category,
    pub province: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Reference photo for the similarity oracle, relative to the media dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read site catalog {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse site catalog {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory site catalog. Shared via `Arc` in the app state.
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    sites: Vec<Site>,
}

impl SiteCatalog {
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    /// Load the catalog from a JSON array of sites.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path_str = path.as_ref().display().to_string();
        let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path_str.clone(),
            source,
        })?;
        let sites: Vec<Site> = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path_str,
            source,
        })?;
        Ok(Self { sites })
    }

    /// Every site currently flagged active, in catalog order.
    pub fn active_sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|s| s.active)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_json_with_defaults() {
        let raw = r#"[
            {"id": 1, "name": "Malecón 2000", "category": "ciudad",
             "province": "Guayas", "lat": -2.1946, "lon": -79.8827,
             "reference_image": "sitios/guayas/malecon_2000/ref.jpg"},
            {"id": 2, "name": "Cascada de Peguche", "category": "cascada",
             "province": "Imbabura", "lat": 0.2347, "lon": -78.2443,
             "active": false}
        ]"#;
        let sites: Vec<Site> = serde_json::from_str(raw).unwrap();
        let catalog = SiteCatalog::new(sites);

        assert_eq!(catalog.len(), 2);
        // `active` defaults to true; the inactive one is filtered out.
        let active: Vec<_> = catalog.active_sites().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
        assert_eq!(active[0].category, Category::Ciudad);
        assert!(active[0].reference_image.is_some());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let raw = r#"[{"id": 1, "name": "X", "category": "volcán",
                       "province": "P", "lat": 0.0, "lon": -78.0}]"#;
        assert!(serde_json::from_str::<Vec<Site>>(raw).is_err());
    }

    #[test]
    fn category_tags_are_lowercase_wire_names() {
        assert_eq!(Category::Monumento.tag(), "monumento");
        assert_eq!(
            serde_json::to_string(&Category::Cultural).unwrap(),
            "\"cultural\""
        );
    }
}
