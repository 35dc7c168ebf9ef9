//! Postal-code to region lookups.
//!
//! Lookups are advisory: every failure degrades to `None`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{GapfillError, Result};

/// Default Zippopotam-compatible endpoint.
pub const DEFAULT_LOOKUP_URL: &str = "https://api.zippopotam.us";

/// Resolves a postal code to a region or state name.
pub trait RegionLookup {
    /// Region for `postal_code` within `country` (ISO 3166 alpha-2), if known.
    fn region_for(&self, postal_code: &str, country: &str) -> Option<String>;
}

/// Offline lookup backed by a GeoNames postal-code dump.
///
/// The dump is tab separated without a header: country code, postal code,
/// place name, admin name 1 (state), followed by further columns.
#[derive(Debug, Clone, Default)]
pub struct GeoNamesTable {
    regions: HashMap<(String, String), String>,
}

impl GeoNamesTable {
    /// Load a GeoNames dump from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| GapfillError::io(path, e))?;
        let table = Self::from_reader(bytes.as_slice())?;
        info!(file = %path.display(), entries = table.len(), "Loaded postal code table");
        Ok(table)
    }

    /// Parse a GeoNames dump.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut regions = HashMap::new();
        for record in csv_reader.records() {
            let record = record?;
            let (Some(country), Some(code), Some(state)) =
                (record.get(0), record.get(1), record.get(3))
            else {
                continue;
            };
            let state = state.trim();
            if state.is_empty() {
                continue;
            }
            // First entry wins; a code can span several places in the same state
            regions
                .entry((country.trim().to_uppercase(), code.trim().to_string()))
                .or_insert_with(|| state.to_string());
        }
        Ok(Self { regions })
    }

    /// Number of postal codes known.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl RegionLookup for GeoNamesTable {
    fn region_for(&self, postal_code: &str, country: &str) -> Option<String> {
        self.regions
            .get(&(country.to_uppercase(), postal_code.to_string()))
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
struct PostalResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    state: Option<String>,
}

/// Online lookup against a Zippopotam-compatible HTTP endpoint.
pub struct HttpRegionLookup {
    client: Client,
    base_url: String,
}

impl HttpRegionLookup {
    /// Create a lookup against the default endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_LOOKUP_URL)
    }

    /// Create a lookup against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GapfillError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn fetch(&self, postal_code: &str, country: &str) -> std::result::Result<Option<String>, String> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            country.to_lowercase(),
            postal_code
        );
        let response = self.client.get(&url).send().map_err(|e| e.to_string())?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(format!("lookup returned {}", response.status()));
        }

        let body: PostalResponse = response.json().map_err(|e| e.to_string())?;
        Ok(body
            .places
            .into_iter()
            .find_map(|p| p.state.filter(|s| !s.trim().is_empty())))
    }
}

impl RegionLookup for HttpRegionLookup {
    fn region_for(&self, postal_code: &str, country: &str) -> Option<String> {
        match self.fetch(postal_code, country) {
            Ok(region) => {
                debug!(postal_code, found = region.is_some(), "Postal code lookup");
                region
            }
            Err(e) => {
                warn!(postal_code, error = %e, "Postal code lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "DE\t10115\tBerlin\tBerlin\tBE\t\t\t\t\t52.5323\t13.3846\t4\n\
                        DE\t80331\tMünchen\tBayern\tBY\tOberbayern\t091\t\t\t48.1372\t11.5755\t4\n\
                        DE\t80331\tMünchen Altstadt\tBayern-Alt\tBY\n\
                        AT\t1010\tWien\tWien\tWI\n\
                        DE\t99999\tNowhere\t\n";

    #[test]
    fn test_geonames_lookup() {
        let table = GeoNamesTable::from_reader(DUMP.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.region_for("10115", "DE"), Some("Berlin".to_string()));
        assert_eq!(table.region_for("80331", "de"), Some("Bayern".to_string()));
        assert_eq!(table.region_for("1010", "AT"), Some("Wien".to_string()));
        assert_eq!(table.region_for("99999", "DE"), None);
        assert_eq!(table.region_for("10115", "AT"), None);
    }

    #[test]
    fn test_http_lookup_unreachable_is_none() {
        let lookup = HttpRegionLookup::with_base_url("http://127.0.0.1:9").unwrap();
        assert_eq!(lookup.region_for("10115", "DE"), None);
    }
}
