//! Value transforms and edit records used during auto-fill.

pub mod geocode;
mod operations;
pub mod pipeline;

pub use geocode::{GeoNamesTable, HttpRegionLookup, RegionLookup};
pub use operations::{ChangeRecord, FillOutcome, FillReport, TransformRule, TransformRules};
pub use pipeline::{fill_country_default, normalize_phone, split_street_house, state_from_postal_code};
