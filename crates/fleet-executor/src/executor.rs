//! Job executor implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_job::{Job, Record};
use fleet_vector::{CallSource, ObjectRepository, ResolveError, Resolver};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::api::{Api, CallError, Identity, IdentityProvider};
use crate::error::JobError;
use crate::events::{ExecutionNotifier, JobEvent, NoopNotifier};
use crate::log::JobLog;
use crate::status::{CallRecord, ExecutionStatus, RunOutcome};

/// A dispatched call waiting to settle.
struct PendingCall {
  call_id: String,
  handle: JoinHandle<Result<Value, CallError>>,
}

/// The job executor.
///
/// Generic over `N: ExecutionNotifier` so callers choose where
/// `job:terminated` events go. Use `JobExecutor::new()` to discard them or
/// `JobExecutor::with_notifier()` to observe them.
pub struct JobExecutor<N: ExecutionNotifier = NoopNotifier> {
  api: Arc<dyn Api>,
  identities: Arc<dyn IdentityProvider>,
  resolver: Resolver,
  log: Arc<dyn JobLog>,
  notifier: N,
}

impl JobExecutor<NoopNotifier> {
  /// Create an executor whose run events are discarded.
  pub fn new(
    api: Arc<dyn Api>,
    identities: Arc<dyn IdentityProvider>,
    repository: Arc<dyn ObjectRepository>,
    log: Arc<dyn JobLog>,
  ) -> Self {
    Self::with_notifier(api, identities, repository, log, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> JobExecutor<N> {
  /// Create an executor reporting run events to `notifier`.
  pub fn with_notifier(
    api: Arc<dyn Api>,
    identities: Arc<dyn IdentityProvider>,
    repository: Arc<dyn ObjectRepository>,
    log: Arc<dyn JobLog>,
    notifier: N,
  ) -> Self {
    Self {
      api,
      identities,
      resolver: Resolver::new(repository),
      log,
      notifier,
    }
  }

  /// Run a job to completion.
  ///
  /// Never fails: a run that cannot dispatch is logged and returned as
  /// [`RunOutcome::Failed`], and failed calls are kept on their records.
  #[instrument(
    name = "job_exec",
    skip(self, job),
    fields(
      job_id = %job.id,
      key = %job.key,
    )
  )]
  pub async fn exec(&self, job: &Job) -> RunOutcome {
    let run_job_id = self.log.notice(
      &format!("job {} started", job.id),
      json!({
        "event": "job.start",
        "userId": job.user_id,
        "jobId": job.id,
        "key": job.key,
      }),
    );

    match self.run(job, &run_job_id).await {
      Ok(status) => {
        info!(
          run_job_id = %run_job_id,
          calls = status.calls.len(),
          failed = status.failed_calls().count(),
          "job_terminated"
        );
        self.notifier.notify(JobEvent::Terminated(status.clone()));
        self.log.notice(
          &format!("job {} terminated", job.id),
          json!({ "event": "job.end", "runJobId": run_job_id }),
        );
        RunOutcome::Terminated(status)
      }
      Err(error) => {
        self.log.error(
          &format!("job {} failed", job.id),
          json!({
            "event": "job.end",
            "runJobId": run_job_id,
            "error": error.to_string(),
          }),
        );
        RunOutcome::Failed { run_job_id, error }
      }
    }
  }

  /// Run jobs one after another; each run is fully joined before the next starts.
  pub async fn exec_sequence(&self, jobs: &[Job]) -> Vec<RunOutcome> {
    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
      outcomes.push(self.exec(job).await);
    }
    outcomes
  }

  /// Resolve a job's parameter records without dispatching anything.
  pub async fn resolve_params(&self, job: &Job) -> Result<Vec<Record>, JobError> {
    let vector = job.parsed_params_vector().map_err(ResolveError::from)?;

    match vector {
      Some(vector) if vector.contains_call() => {
        // `call` nodes run under their own identity, released before dispatch.
        let identity = self.identities.open(&job.user_id);
        let calls: &dyn CallSource = &IdentityCalls {
          api: self.api.as_ref(),
          identity: &identity,
        };
        let resolved = self
          .resolver
          .resolve_params(Some(&vector), Some(calls))
          .await;
        self.identities.close(&identity);

        Ok(resolved?)
      }
      vector => Ok(self.resolver.resolve_params(vector.as_ref(), None).await?),
    }
  }

  async fn run(&self, job: &Job, run_job_id: &str) -> Result<ExecutionStatus, JobError> {
    let mut status = ExecutionStatus::new(run_job_id);

    if !job.is_call() {
      return Err(JobError::UnsupportedJobType {
        job_type: job.job_type.clone(),
      });
    }

    let params = self.resolve_params(job).await?;
    info!(run_job_id = %run_job_id, calls = params.len(), "params_resolved");

    let pending = self.dispatch(job, run_job_id, params, &mut status);
    self.join(job, run_job_id, pending, &mut status).await;

    status.end = Some(chrono::Utc::now());
    Ok(status)
  }

  /// Start one call per record without waiting on any of them.
  ///
  /// The identity is closed as soon as every call has been issued, before
  /// the calls settle. Each call keeps its own copy of the identity.
  fn dispatch(
    &self,
    job: &Job,
    run_job_id: &str,
    params: Vec<Record>,
    status: &mut ExecutionStatus,
  ) -> Vec<PendingCall> {
    let identity = self.identities.open(&job.user_id);
    let mut pending = Vec::with_capacity(params.len());

    for params in params {
      let logged_id = self.log.notice(
        &format!("job {} calling {}", job.id, job.method),
        json!({
          "event": "jobCall.start",
          "runJobId": run_job_id,
          "method": job.method,
          "params": params,
        }),
      );
      let call_id = unused_call_id(&status.calls, logged_id);
      status
        .calls
        .insert(call_id.clone(), CallRecord::started(&job.method, params.clone()));

      let api = self.api.clone();
      let identity = identity.clone();
      let method = job.method.clone();
      let handle = tokio::spawn(async move { api.invoke(&identity, &method, params).await });

      pending.push(PendingCall { call_id, handle });
    }

    self.identities.close(&identity);
    pending
  }

  /// Wait for every call, recording each outcome as it settles.
  async fn join(
    &self,
    job: &Job,
    run_job_id: &str,
    pending: Vec<PendingCall>,
    status: &mut ExecutionStatus,
  ) {
    let mut settling: FuturesUnordered<_> = pending
      .into_iter()
      .map(|PendingCall { call_id, handle }| async move { (call_id, handle.await) })
      .collect();

    while let Some((call_id, joined)) = settling.next().await {
      let outcome = joined.unwrap_or_else(|e| {
        Err(CallError::Aborted {
          message: e.to_string(),
        })
      });

      let Some(call) = status.calls.get_mut(&call_id) else {
        warn!(run_job_id = %run_job_id, call_id = %call_id, "settled call has no record");
        continue;
      };

      match outcome {
        Ok(value) => {
          self.log.notice(
            &format!("job {} call {} succeeded", job.id, call_id),
            json!({
              "event": "jobCall.end",
              "runJobId": run_job_id,
              "runCallId": call_id,
              "returnedValue": value,
            }),
          );
          call.succeed(value);
        }
        Err(error) => {
          self.log.error(
            &format!("job {} call {} failed", job.id, call_id),
            json!({
              "event": "jobCall.end",
              "runJobId": run_job_id,
              "runCallId": call_id,
              "error": error.to_string(),
            }),
          );
          call.fail(error.to_string());
        }
      }
    }
  }
}

/// Key a new call under `logged_id`, or `logged_id-N` when the log handed out
/// an id already used by this run.
fn unused_call_id(calls: &BTreeMap<String, CallRecord>, logged_id: String) -> String {
  if !calls.contains_key(&logged_id) {
    return logged_id;
  }

  let call_id = (2..)
    .map(|n| format!("{}-{}", logged_id, n))
    .find(|candidate| !calls.contains_key(candidate))
    .unwrap_or_default();
  warn!(logged_id = %logged_id, call_id = %call_id, "duplicate_call_id");
  call_id
}

/// Routes a resolution's `call` nodes through the API under one identity.
struct IdentityCalls<'a> {
  api: &'a dyn Api,
  identity: &'a Identity,
}

#[async_trait]
impl CallSource for IdentityCalls<'_> {
  async fn call(&self, method: &str, params: Record) -> Result<Value, ResolveError> {
    self
      .api
      .invoke(self.identity, method, params)
      .await
      .map_err(|e| ResolveError::Call {
        method: method.to_string(),
        message: e.to_string(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unused_call_id_suffixes_repeats() {
    let mut calls = BTreeMap::new();

    let first = unused_call_id(&calls, "evt".to_string());
    calls.insert(first.clone(), CallRecord::started("vm.start", Record::new()));
    let second = unused_call_id(&calls, "evt".to_string());
    calls.insert(second.clone(), CallRecord::started("vm.start", Record::new()));
    let third = unused_call_id(&calls, "evt".to_string());

    assert_eq!(first, "evt");
    assert_eq!(second, "evt-2");
    assert_eq!(third, "evt-3");
  }
}
