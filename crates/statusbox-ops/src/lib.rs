//! Save, delete and saved-media operations for statusbox.
//!
//! Discovery is read-only and degrades quietly; the operations here act on
//! an explicit user request and report every fault. [`StatusLibrary`] ties
//! both halves together behind the surface presentation code calls.

mod delete;
mod error;
mod library;
mod save;
mod saved;

pub use delete::{delete_media, local_path_from_uri};
pub use error::OpsError;
pub use library::StatusLibrary;
pub use save::{SaveTarget, save_record};
pub use saved::list_saved;
