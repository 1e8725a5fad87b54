//! Parameter vector resolution.
//!
//! Turns a job's [`ParamsVector`](fleet_job::ParamsVector) into the flat list
//! of parameter records, one per call to dispatch.
//!
//! - [`cross_product`] lazily combines vectors of records, merging each
//!   combination with a pluggable function ([`merge_objects`] by default).
//! - [`matches_pattern`] and [`ObjectRepository`] select live fleet objects.
//! - [`Resolver`] evaluates the expression tree on top of both.

mod cross_product;
mod error;
mod query;
mod resolver;

pub use cross_product::{CrossProduct, cross_product, merge_objects};
pub use error::ResolveError;
pub use query::{InMemoryRepository, ObjectRepository, filter_objects, matches_pattern};
pub use resolver::{CallSource, Resolver, extract_properties};
