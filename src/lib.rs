//! Provider directory core: locality resolution, radius search over
//! providers, text search, and affiliate reconciliation across legacy tables.

pub mod config;
pub mod directory;
pub mod error;
pub mod geo;
pub mod locality;
pub mod mapping;
pub mod provider;
pub mod proximity;
pub mod reconcile;
pub mod store;
pub mod text;

pub use directory::Directory;
pub use error::{DirectoryError, StoreError};
