//! Key indexes joining the primary dataset to secondary datasets.

mod key_index;
mod links;
mod multi;

pub use key_index::{FillCandidate, KeyConfig, KeyIndex};
pub use links::FieldLinks;
pub use multi::{KEY_SEPARATOR, MatchProfile, MultiSourceIndex, composite_key};
