//! Persistent user settings.
//!
//! Stored as pretty-printed JSON at `~/.gapfill/settings.json`.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GapfillError, Result};
use crate::index::{FieldLinks, MatchProfile};
use crate::session::{DEFAULT_COUNTRY, ReconciliationSession};
use crate::transform::TransformRules;

/// Source ids present in every settings file.
pub const DEFAULT_SOURCE_IDS: &[&str] = &["src2", "src3", "src4"];

/// Directory under the home directory holding the settings file.
const SETTINGS_DIR: &str = ".gapfill";
const SETTINGS_FILE: &str = "settings.json";

/// Composite-key fields for the primary table and each source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchFields {
    pub primary: Vec<String>,
    pub sources: IndexMap<String, Vec<String>>,
}

impl Default for MatchFields {
    fn default() -> Self {
        Self {
            primary: Vec::new(),
            sources: DEFAULT_SOURCE_IDS
                .iter()
                .map(|id| (id.to_string(), Vec::new()))
                .collect(),
        }
    }
}

/// Display preferences for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableView {
    /// Columns hidden from display.
    pub hidden: Vec<String>,
    /// Preferred column order; unlisted columns follow in dataset order.
    pub order: Vec<String>,
    /// Column colours, e.g. `"#ffcc00"`.
    pub colors: IndexMap<String, String>,
}

impl TableView {
    /// Visible columns of `headers`, in preferred order.
    pub fn arrange<'a>(&self, headers: &'a [String]) -> Vec<&'a str> {
        let mut out: Vec<&'a str> = self
            .order
            .iter()
            .filter_map(|name| headers.iter().find(|h| *h == name))
            .map(String::as_str)
            .collect();
        for header in headers {
            if !out.contains(&header.as_str()) {
                out.push(header);
            }
        }
        out.retain(|h| !self.hidden.iter().any(|hidden| hidden == h));
        out
    }
}

/// Everything remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "null_as_default")]
    pub match_fields: MatchFields,
    /// Primary column to secondary column links.
    #[serde(deserialize_with = "null_as_default")]
    pub links: FieldLinks,
    #[serde(deserialize_with = "null_as_default")]
    pub rules: TransformRules,
    #[serde(deserialize_with = "null_as_default_country")]
    pub country_default: String,
    /// View preferences keyed by table id (`primary`, `src2`, ...).
    #[serde(deserialize_with = "null_as_default")]
    pub views: IndexMap<String, TableView>,
}

/// Read a `null` field as its default instead of rejecting the file.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_country<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            match_fields: MatchFields::default(),
            links: FieldLinks::new(),
            rules: TransformRules::default(),
            country_default: DEFAULT_COUNTRY.to_string(),
            views: IndexMap::new(),
        }
    }
}

impl Settings {
    /// Settings file location, `None` if there is no home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No home directory; using default settings");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults when the file is absent,
    /// unreadable or malformed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!(file = %path.display(), "No settings file; using defaults");
            return Self::default();
        }
        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Ignoring unusable settings file");
                Self::default()
            }
        }
    }

    /// Strict load: any read or parse failure is an error.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| GapfillError::io(path, e))?;
        Self::from_json(&contents)
    }

    /// Parse settings JSON, completing partial files from defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.with_default_sources())
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| GapfillError::Config("No home directory for settings".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| GapfillError::io(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| GapfillError::io(path, e))?;
        info!(file = %path.display(), "Saved settings");
        Ok(())
    }

    /// Default source ids first, then any extra ones in file order.
    fn with_default_sources(mut self) -> Self {
        let mut sources: IndexMap<String, Vec<String>> = DEFAULT_SOURCE_IDS
            .iter()
            .map(|id| (id.to_string(), Vec::new()))
            .collect();
        for (id, fields) in self.match_fields.sources {
            sources.insert(id, fields);
        }
        self.match_fields.sources = sources;
        self
    }

    /// Composite-key profile for multi-source matching.
    pub fn match_profile(&self) -> MatchProfile {
        MatchProfile {
            primary_fields: self.match_fields.primary.clone(),
            source_fields: self.match_fields.sources.clone(),
        }
    }

    /// View preferences for a table (defaults when none are stored).
    pub fn view(&self, table: &str) -> TableView {
        self.views.get(table).cloned().unwrap_or_default()
    }

    /// Copy links, rules and the country default into a session.
    pub fn apply_to(&self, session: &mut ReconciliationSession) {
        session.set_links(self.links.clone());
        session.set_rules(self.rules);
        session.set_country_default(self.country_default.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Dataset;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.match_fields.primary.is_empty());
        let ids: Vec<&str> = settings.match_fields.sources.keys().map(String::as_str).collect();
        assert_eq!(ids, DEFAULT_SOURCE_IDS);
        assert!(settings.links.is_empty());
        assert_eq!(settings.rules, TransformRules::default());
        assert_eq!(settings.country_default, "Deutschland");
    }

    #[test]
    fn test_null_fields_fall_back_individually() {
        let json = r#"{
            "links": null,
            "country_default": null,
            "views": null,
            "rules": { "normalize_phone": false }
        }"#;
        let settings = Settings::from_json(json).unwrap();

        assert!(settings.links.is_empty());
        assert_eq!(settings.country_default, "Deutschland");
        assert!(settings.views.is_empty());
        assert!(!settings.rules.normalize_phone);
        assert_eq!(settings.match_fields.sources.len(), 3);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let json = r#"{
            "match_fields": { "sources": { "src3": ["email"], "extra": ["id"] } },
            "rules": { "fill_country_default": true }
        }"#;
        let settings = Settings::from_json(json).unwrap();

        let ids: Vec<&str> = settings.match_fields.sources.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["src2", "src3", "src4", "extra"]);
        assert_eq!(settings.match_fields.sources["src3"], vec!["email"]);
        assert!(settings.rules.fill_country_default);
        assert!(settings.rules.split_street_house);
        assert_eq!(settings.country_default, "Deutschland");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
        assert!(Settings::read(&path).is_err());
        assert_eq!(Settings::load_from(&dir.path().join("absent.json")), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.links.link("phone", "Tel");
        settings.match_fields.primary = vec!["first".into(), "last".into()];
        settings.views.insert(
            "primary".into(),
            TableView {
                hidden: vec!["notes".into()],
                ..TableView::default()
            },
        );
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::read(&path).unwrap(), settings);
    }

    #[test]
    fn test_view_arrange() {
        let headers: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let view = TableView {
            hidden: vec!["b".into()],
            order: vec!["c".into(), "missing".into(), "a".into()],
            colors: IndexMap::new(),
        };
        assert_eq!(view.arrange(&headers), vec!["c", "a", "d"]);
    }

    #[test]
    fn test_apply_to_session() {
        let mut settings = Settings::default();
        settings.links.link("phone", "Tel");
        settings.country_default = "Österreich".into();

        let mut session = ReconciliationSession::new(Dataset::default());
        settings.apply_to(&mut session);
        assert_eq!(session.links().target("phone"), Some("Tel"));
        assert_eq!(session.country_default(), "Österreich");
    }
}
