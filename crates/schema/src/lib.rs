//! Controlled vocabularies for the gearbase dataset.
//!
//! The [`Registry`] holds the canonical categories (with their aliases),
//! formats, platforms and locales that record fields are validated against.
//! [`suggest`] provides the "did you mean" matching used in validation
//! messages.

pub mod error;
mod registry;
pub mod suggest;

pub use crate::registry::{CATEGORIES_FILE, FORMATS_FILE, LOCALES_FILE, Locale, PLATFORMS_FILE, Registry, Vocabulary};
