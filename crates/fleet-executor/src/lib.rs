//! Fleet Job Executor
//!
//! Runs one job: resolves its parameter vector, dispatches one API call per
//! resolved record, and reports every call's outcome.
//!
//! # Run lifecycle
//!
//! ```text
//! Started ──► Resolving ──► Dispatching ──► Joining ──► Terminated
//!   │            │              │              │            │
//!   job.start    │              jobCall.start  jobCall.end  job:terminated event
//!                │              (one per call) (per call)   job.end
//!                │
//!                └── unsupported type / resolve error ──► job.end (error), no event
//! ```
//!
//! A failing call is recorded on its [`CallRecord`] and never aborts its
//! siblings or the run.
//!
//! # Usage
//!
//! ```ignore
//! use fleet_executor::{JobExecutor, LocalIdentityProvider, RunOutcome, TracingJobLog};
//! use fleet_vector::InMemoryRepository;
//!
//! let executor = JobExecutor::new(
//!     Arc::new(my_api),
//!     Arc::new(LocalIdentityProvider::new()),
//!     Arc::new(InMemoryRepository::new(objects)),
//!     Arc::new(TracingJobLog),
//! );
//!
//! match executor.exec(&job).await {
//!     RunOutcome::Terminated(status) => println!("{} calls", status.calls.len()),
//!     RunOutcome::Failed { error, .. } => eprintln!("run failed: {}", error),
//! }
//! ```

mod api;
mod error;
mod events;
mod executor;
mod log;
mod status;

pub use api::{Api, CallError, Identity, IdentityProvider, LocalIdentityProvider};
pub use error::JobError;
pub use events::{ChannelNotifier, ExecutionNotifier, JobEvent, NoopNotifier};
pub use executor::JobExecutor;
pub use log::{JobLog, TracingJobLog};
pub use status::{CallRecord, ExecutionStatus, RunOutcome};
