//! Record model for the gearbase dataset.
//!
//! A dataset is a tree of YAML files, one per record, grouped into three
//! collections (manufacturers, software, hardware). This crate defines:
//!
//! - the typed [`Record`] model and its nested structures ([`models`]),
//! - the [`Collection`] enumeration and its dependency order,
//! - slug rules ([`slug`]),
//! - YAML parsing that keeps node positions ([`Document`], [`source`]).

mod collection;
mod consts;
mod document;
pub mod error;
pub mod models;
mod record;
pub mod slug;
pub mod source;

pub use crate::collection::Collection;
pub use crate::document::Document;
pub use crate::record::{Record, RecordData};
pub use crate::source::{Position, SourceMap};
