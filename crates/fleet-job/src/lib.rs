//! Fleet Job
//!
//! This crate contains the serializable job definitions for fleet-jobs.
//! A job names one control API method and, optionally, a parameter vector
//! describing how to expand that method into many calls.
//!
//! Jobs are stored and edited by the surrounding API as JSON. The parameter
//! vector is kept as raw JSON on the [`Job`] and parsed into the typed
//! [`ParamsVector`] expression tree when a run resolves it, so a job with an
//! unknown vector type can still be loaded and fails inside its run.

mod error;
mod job;
mod validate;
mod vector;

pub use error::{ValidationError, VectorError};
pub use job::{CALL_JOB_TYPE, Job};
pub use validate::validate_job;
pub use vector::{ParamsVector, Record};
