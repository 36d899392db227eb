//! Reagent catalog: static reagent prototypes loaded from data files.
//!
//! The catalog is the concrete [`ReagentLookup`] handed to mixture operations.
//! Solutions never hold on to it; it is passed in per call.
//!
//! # Layout
//! Catalog files are a list of prototypes, as JSON (`.json`) or YAML
//! (`.yml` / `.yaml`):
//! ```yaml
//! - id: water
//!   name: Water
//!   specific_heat: 4.18
//!   color: "#75B1F0"
//! ```

use chemix_common::Color;
use chemix_kernel::{ReagentLookup, ReagentProperties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Static data describing one reagent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReagentPrototype {
    pub id: String,
    /// Display name. Falls back to the id when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Heat capacity per unit of quantity.
    #[serde(default)]
    pub specific_heat: f32,
    #[serde(default = "default_color")]
    pub color: Color,
}

fn default_color() -> Color {
    Color::WHITE
}

impl ReagentPrototype {
    pub fn new(id: impl Into<String>, specific_heat: f32, color: Color) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            specific_heat,
            color,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// The subset of the prototype the mixture engine reads.
    pub fn properties(&self) -> ReagentProperties {
        ReagentProperties::new(self.specific_heat, self.color)
    }
}

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("duplicate reagent id: {0}")]
    DuplicateReagent(String),
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),
}

/// Reagent prototypes indexed by id.
///
/// BTreeMap keeps listing and saving order stable.
#[derive(Debug, Clone, Default)]
pub struct ReagentCatalog {
    reagents: BTreeMap<String, ReagentPrototype>,
}

impl ReagentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the stock reagents.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for proto in default_prototypes() {
            catalog.reagents.insert(proto.id.clone(), proto);
        }
        catalog
    }

    /// Build a catalog from prototypes, rejecting duplicate ids.
    pub fn from_prototypes(
        prototypes: impl IntoIterator<Item = ReagentPrototype>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for proto in prototypes {
            catalog.register(proto)?;
        }
        Ok(catalog)
    }

    /// Add a prototype. Ids must be unique.
    pub fn register(&mut self, proto: ReagentPrototype) -> Result<(), CatalogError> {
        if self.reagents.contains_key(&proto.id) {
            return Err(CatalogError::DuplicateReagent(proto.id));
        }
        self.reagents.insert(proto.id.clone(), proto);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ReagentPrototype> {
        self.reagents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.reagents.contains_key(id)
    }

    /// Number of registered reagents.
    pub fn len(&self) -> usize {
        self.reagents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
    }

    /// Reagent ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.reagents.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReagentPrototype> {
        self.reagents.values()
    }

    pub fn from_json_str(data: &str) -> Result<Self, CatalogError> {
        let prototypes: Vec<ReagentPrototype> = serde_json::from_str(data)?;
        Self::from_prototypes(prototypes)
    }

    pub fn from_yaml_str(data: &str) -> Result<Self, CatalogError> {
        let prototypes: Vec<ReagentPrototype> = serde_yaml::from_str(data)?;
        Self::from_prototypes(prototypes)
    }

    /// Load a catalog file, picking the format from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let data = std::fs::read_to_string(path)?;
        let catalog = match extension.as_deref() {
            Some("json") => Self::from_json_str(&data)?,
            Some("yml" | "yaml") => Self::from_yaml_str(&data)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        };
        tracing::debug!(path = %path.display(), reagents = catalog.len(), "loaded reagent catalog");
        Ok(catalog)
    }

    /// Save the catalog as a pretty-printed JSON list.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let file = std::fs::File::create(path)?;
        let prototypes: Vec<&ReagentPrototype> = self.reagents.values().collect();
        serde_json::to_writer_pretty(file, &prototypes)?;
        Ok(())
    }
}

impl ReagentLookup for ReagentCatalog {
    fn properties(&self, reagent_id: &str) -> Option<ReagentProperties> {
        self.reagents.get(reagent_id).map(ReagentPrototype::properties)
    }
}

fn default_prototypes() -> Vec<ReagentPrototype> {
    let hex = |s: &str| Color::from_hex(s).unwrap_or(Color::WHITE);
    vec![
        ReagentPrototype::new("water", 4.18, hex("#75B1F0AA")).with_name("Water"),
        ReagentPrototype::new("ethanol", 2.44, hex("#B0D8E8AA")).with_name("Ethanol"),
        ReagentPrototype::new("sugar", 1.24, hex("#FFFFFFFF")).with_name("Sugar"),
        ReagentPrototype::new("blood", 3.5, hex("#800000FF")).with_name("Blood"),
        ReagentPrototype::new("iron", 0.45, hex("#434B4DFF")).with_name("Iron"),
        ReagentPrototype::new("sodium", 1.23, hex("#C6C8CCFF")).with_name("Sodium"),
        ReagentPrototype::new("chlorine", 0.48, hex("#A2FF00FF")).with_name("Chlorine"),
        ReagentPrototype::new("oxygen", 0.92, hex("#808080AA")).with_name("Oxygen"),
    ]
}

pub fn crate_info() -> &'static str {
    "chemix-catalog v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemix_common::FixedPoint2;
    use chemix_kernel::Solution;

    #[test]
    fn register_and_lookup() {
        let mut catalog = ReagentCatalog::new();
        catalog
            .register(ReagentPrototype::new("water", 4.18, Color::rgb(0.0, 0.0, 1.0)))
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.specific_heat("water"), 4.18);
        assert_eq!(catalog.specific_heat("lava"), 0.0);
        assert_eq!(catalog.get("water").unwrap().display_name(), "water");
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut catalog = ReagentCatalog::new();
        catalog
            .register(ReagentPrototype::new("iron", 0.45, Color::BLACK))
            .unwrap();
        let err = catalog
            .register(ReagentPrototype::new("iron", 1.0, Color::WHITE))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateReagent(id) if id == "iron"));
        assert_eq!(catalog.get("iron").unwrap().specific_heat, 0.45);
    }

    #[test]
    fn defaults_cover_common_reagents() {
        let catalog = ReagentCatalog::with_defaults();
        for id in ["water", "iron", "blood", "ethanol"] {
            assert!(catalog.contains(id), "missing {id}");
        }
        assert_eq!(catalog.get("water").unwrap().display_name(), "Water");
        let ids: Vec<&str> = catalog.ids().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn yaml_fields_default() {
        let yaml = r##"
- id: water
  name: Water
  specific_heat: 4.18
  color: "#0000FF"
- id: slime
"##;
        let catalog = ReagentCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.len(), 2);
        let slime = catalog.get("slime").unwrap();
        assert_eq!(slime.specific_heat, 0.0);
        assert_eq!(slime.color, Color::WHITE);
        assert_eq!(
            catalog.substance_color("water"),
            Some(Color::rgb(0.0, 0.0, 1.0))
        );
    }

    #[test]
    fn duplicate_ids_in_file_are_rejected() {
        let json = r#"[{"id": "water"}, {"id": "water"}]"#;
        assert!(matches!(
            ReagentCatalog::from_json_str(json),
            Err(CatalogError::DuplicateReagent(_))
        ));
    }

    #[test]
    fn save_and_load_json() {
        let tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let catalog = ReagentCatalog::with_defaults();
        catalog.save(tmp.path()).unwrap();

        let loaded = ReagentCatalog::load(tmp.path()).unwrap();
        assert_eq!(loaded.len(), catalog.len());
        assert_eq!(loaded.get("blood"), catalog.get("blood"));
    }

    #[test]
    fn load_yaml_file() {
        let tmp = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(tmp.path(), "- id: iron\n  specific_heat: 0.45\n").unwrap();
        let loaded = ReagentCatalog::load(tmp.path()).unwrap();
        assert_eq!(loaded.specific_heat("iron"), 0.45);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(matches!(
            ReagentCatalog::load(tmp.path()),
            Err(CatalogError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn catalog_drives_solution_math() {
        let catalog = ReagentCatalog::with_defaults();
        let mut s = Solution::new();
        s.add_reagent(&catalog, "water", FixedPoint2::from_int(10), Some(300.0));
        s.add_reagent(&catalog, "mystery", FixedPoint2::from_int(5), None);
        assert!((s.heat_capacity(&catalog) - 41.8).abs() < 1e-3);
        assert_eq!(s.color(&catalog), catalog.get("water").unwrap().color);
    }
}
