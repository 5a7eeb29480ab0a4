//! Pure domain logic for cinemap: locale validation and resolution, the
//! localized variant map, bulk-update planning and the error taxonomy.
//!
//! Nothing in this crate touches the database.

pub mod error;
pub mod locale;
pub mod localization;
pub mod metadata;
pub mod resolver;
pub mod types;
