//! Placeholder fill engine for `.docx` templates.
//!
//! This crate holds everything that touches document content:
//! - `Document`: regions, paragraphs and runs read from a `.docx` package
//! - `text`: paragraph and whole-document text reconstruction
//! - `descriptor`: placeholder descriptors and extraction reply parsing
//! - `SubstitutionPlan`: descriptors reconciled against user answers
//! - `fill`: rewrites every paragraph according to a plan

mod error;
mod model;
mod package;

pub mod descriptor;
pub mod fill;
pub mod plan;
pub mod text;

pub use descriptor::{AnswerMap, PlaceholderDescriptor};
pub use error::{Error, Result};
pub use fill::{fill, FillReport};
pub use model::{Container, Document, Paragraph, Region, RegionKind, Row, Run, Table};
pub use plan::SubstitutionPlan;
