//! User settings persisted between runs.

mod settings;

pub use settings::{DEFAULT_SOURCE_IDS, MatchFields, Settings, TableView};
