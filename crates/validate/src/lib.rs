//! Validation engine for gearbase records.
//!
//! Each record is checked in passes that all run, so one report lists every
//! problem in a file:
//!
//! 1. structure: required fields, types, unknown fields and value formats,
//! 2. controlled vocabularies from the schema [`Registry`](gearbase_schema::Registry),
//! 3. references: manufacturers exist, categories are not repeated,
//! 4. markup in free-text fields,
//! 5. identifiers.
//!
//! Only a YAML syntax error stops a record early. Every finding is an
//! [`Issue`] with a stable [`ErrorCode`], a dotted field path and, where it can
//! be recovered, a source line and column.

mod codes;
mod context;
mod engine;
pub mod error;
mod identifiers;
mod issue;
mod markup;
mod references;
mod report;
mod structure;
mod vocabulary;

pub use crate::codes::{ErrorClass, ErrorCode};
pub use crate::context::Context;
pub use crate::engine::{validate_dataset, validate_record};
pub use crate::issue::Issue;
pub use crate::report::{RecordReport, Report};
