//! Persisting the edited primary dataset.

mod writer;

pub use writer::{
    DEFAULT_SHEET, TIMESTAMP_FORMAT, backup_path, save_as_new, save_as_new_at, save_as_path,
    save_in_place, save_in_place_at,
};
