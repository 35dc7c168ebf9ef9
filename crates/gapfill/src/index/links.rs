//! Primary-to-secondary column links.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which secondary column feeds which primary column during auto-fill.
///
/// At most one secondary column per primary column; linking again replaces
/// the previous target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldLinks {
    links: IndexMap<String, String>,
}

impl FieldLinks {
    /// Create an empty link set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a primary column to a secondary column.
    pub fn link(&mut self, primary: impl Into<String>, secondary: impl Into<String>) {
        self.links.insert(primary.into(), secondary.into());
    }

    /// Builder form of [`FieldLinks::link`].
    pub fn with_link(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.link(primary, secondary);
        self
    }

    /// Remove a link, returning the secondary column it pointed at.
    pub fn unlink(&mut self, primary: &str) -> Option<String> {
        self.links.shift_remove(primary)
    }

    /// Secondary column linked to `primary`, if any.
    pub fn target(&self, primary: &str) -> Option<&str> {
        self.links.get(primary).map(String::as_str)
    }

    /// Check if no links are configured.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Iterate `(primary, secondary)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(p, s)| (p.as_str(), s.as_str()))
    }
}

impl FromIterator<(String, String)> for FieldLinks {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_link_wins() {
        let mut links = FieldLinks::new().with_link("phone", "Tel");
        links.link("phone", "Telefon");
        assert_eq!(links.len(), 1);
        assert_eq!(links.target("phone"), Some("Telefon"));
        assert_eq!(links.target("email"), None);
    }

    #[test]
    fn test_serializes_as_map() {
        let links = FieldLinks::new().with_link("street", "Strasse");
        let json = serde_json::to_string(&links).unwrap();
        assert_eq!(json, r#"{"street":"Strasse"}"#);
        let back: FieldLinks = serde_json::from_str(&json).unwrap();
        assert_eq!(back, links);
    }
}
