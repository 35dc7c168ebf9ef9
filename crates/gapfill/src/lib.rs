//! Gapfill: fill missing fields in a primary table from secondary tables.
//!
//! Rows are joined by a normalized key (or a composite key across several
//! sources), missing primary fields are flagged, and linked secondary columns
//! supply the values, passed through a small set of deterministic transforms.
//!
//! # Core Principles
//!
//! - **Never overwrite**: only missing fields are filled
//! - **Deterministic**: the first non-missing value in secondary row order wins
//! - **Traceable**: every write is reported as a [`ChangeRecord`]
//!
//! # Example
//!
//! ```no_run
//! use gapfill::{KeyConfig, Parser, ReconciliationSession, Settings, output};
//!
//! let parser = Parser::new();
//! let (primary, _) = parser.load("customers.xlsx", "Sheet1", 1)?;
//! let (secondary, _) = parser.load("crm_export.csv", "crm_export", 1)?;
//!
//! let mut session = ReconciliationSession::new(primary);
//! session.attach_secondary(secondary, KeyConfig::new("CustomerNo", "KundenNr"))?;
//! Settings::load().apply_to(&mut session);
//!
//! let report = session.autofill_all()?;
//! println!("Filled {} fields", report.fields_filled);
//!
//! output::save_in_place(session.primary(), "customers.xlsx".as_ref(), Some("Sheet1"), true)?;
//! # Ok::<(), gapfill::GapfillError>(())
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod input;
pub mod normalize;
pub mod output;
pub mod session;
pub mod transform;

pub use config::{Settings, TableView};
pub use error::{GapfillError, Result};
pub use index::{FieldLinks, FillCandidate, KeyConfig, KeyIndex, MatchProfile, MultiSourceIndex};
pub use input::{Dataset, Parser, ParserConfig, Row, SourceMetadata};
pub use session::{FlaggedKeyQueue, ReconciliationSession};
pub use transform::{
    ChangeRecord, FillOutcome, FillReport, GeoNamesTable, HttpRegionLookup, RegionLookup,
    TransformRule, TransformRules,
};
