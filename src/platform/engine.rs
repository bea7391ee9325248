//! Execution engine
//!
//! Drives one script from submission to a terminal outcome: submit the
//! source plus metadata to the job endpoint, poll the job's expanded view
//! on a fixed cadence under a global deadline, and hand back the terminal
//! process with any classified failure. There is no cancellation anywhere
//! in the protocol - a job that outlives the deadline is abandoned, not
//! killed, and stays fetchable by href.

use crate::error::{Classifier, Error, Result};
use crate::platform::process::{Process, ProcessStatus};
use crate::platform::session::Session;
use crate::script::params::NamedParameter;
use crate::script::synth::SynthesizedScript;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Fixed poll cadence while a job is non-terminal
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Global per-job deadline; mirrors the bounded-timeout block every
/// synthesized script runs under
pub const JOB_DEADLINE: Duration = Duration::from_secs(60 * 60);
/// Extra polls granted when a terminal job's declared outputs lag its status
pub const OUTPUT_GRACE_TICKS: u32 = 5;

/// Language tag sent with every submission
pub const LANGUAGE_VERSION: &str = "flow-2.1";
/// Application tag identifying this adapter in the platform's audit trail
pub const APPLICATION_TAG: &str = "flowbridge";

/// Poll bounds. The public entry points pin the reference constants;
/// tests drive the internal variant with compressed bounds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollBounds {
    pub interval: Duration,
    pub deadline: Duration,
    pub grace_ticks: u32,
}

impl PollBounds {
    pub(crate) fn reference() -> Self {
        Self {
            interval: POLL_INTERVAL,
            deadline: JOB_DEADLINE,
            grace_ticks: OUTPUT_GRACE_TICKS,
        }
    }
}

/// Terminal result of one execution: the observed process plus the
/// classified failure when the job did not complete.
#[derive(Debug)]
pub struct Outcome {
    pub process: Process,
    pub failure: Option<Error>,
}

/// Execute a script and require completion. Any non-completed terminal
/// status becomes the classified, diagnostics-wrapped error.
pub async fn execute(
    session: &Session,
    classifier: &Classifier,
    script: &SynthesizedScript,
    params: &[NamedParameter],
) -> Result<Process> {
    let outcome = execute_lenient(session, classifier, script, params).await?;
    match outcome.failure {
        None => Ok(outcome.process),
        Some(err) => Err(err),
    }
}

/// Execute a script and surface the terminal process even when the job
/// failed. Used where the caller needs the failed job's outputs, e.g. to
/// compensate a partially created composite resource.
pub async fn execute_lenient(
    session: &Session,
    classifier: &Classifier,
    script: &SynthesizedScript,
    params: &[NamedParameter],
) -> Result<Outcome> {
    execute_with(session, classifier, script, params, PollBounds::reference()).await
}

pub(crate) async fn execute_with(
    session: &Session,
    classifier: &Classifier,
    script: &SynthesizedScript,
    params: &[NamedParameter],
    bounds: PollBounds,
) -> Result<Outcome> {
    for param in params {
        param.validate()?;
    }

    let correlation = Uuid::new_v4();
    let submitted_at = Utc::now();
    let href = submit(session, script, params).await?;
    tracing::info!(%correlation, job = %href, entry_point = %script.entry_point, "job submitted");

    let status_url = session.href_url(&href);
    let started = Instant::now();

    let mut process = fetch(session, &status_url, &href).await?;
    while !process.status.is_terminal() {
        if started.elapsed() >= bounds.deadline {
            // Abandon the job; the protocol has no cancellation to send.
            tracing::warn!(job = %href, "job deadline elapsed; abandoning");
            return Err(Error::Timeout {
                waiting_for: format!("job {} to reach a terminal status", href),
                limit: bounds.deadline,
            });
        }
        tokio::time::sleep(bounds.interval).await;
        process = fetch(session, &status_url, &href).await?;
    }

    // Outputs can lag the terminal status by a tick on the remote side.
    // Grant a bounded number of extra polls before judging them missing,
    // but only for the two ordinary terminal statuses - an aborted or
    // canceled job will never fill its outputs.
    let expects_outputs = script.expects_outputs();
    if expects_outputs
        && process.outputs.is_empty()
        && matches!(
            process.status,
            ProcessStatus::Completed | ProcessStatus::Failed
        )
    {
        for tick in 0..bounds.grace_ticks {
            tokio::time::sleep(bounds.interval).await;
            process = fetch(session, &status_url, &href).await?;
            if !process.outputs.is_empty() {
                tracing::debug!(job = %href, tick, "outputs arrived after status");
                break;
            }
        }
    }

    let ended_at = Utc::now();
    match process.status {
        ProcessStatus::Completed => {
            if expects_outputs && process.outputs.is_empty() {
                let err = Error::MalformedResponse(format!(
                    "job {} completed but its declared outputs never arrived",
                    href
                ));
                return Err(with_diagnostics(err, session, submitted_at, ended_at));
            }
            tracing::info!(%correlation, job = %href, "job completed");
            Ok(Outcome {
                process,
                failure: None,
            })
        }
        _ => {
            // Failed jobs legitimately may have no outputs; the task error
            // (when present) is the message worth classifying.
            let message = process.error.clone().unwrap_or_else(|| {
                format!("job ended with status '{}'", process.status.as_str())
            });
            let failure = with_diagnostics(
                classifier.classify(&message),
                session,
                submitted_at,
                ended_at,
            );
            tracing::info!(%correlation, job = %href, status = %process.status.as_str(), "job did not complete");
            Ok(Outcome {
                process,
                failure: Some(failure),
            })
        }
    }
}

/// Fetch a process by href through the expanded status view.
pub async fn fetch_process(session: &Session, href: &str) -> Result<Process> {
    fetch(session, &session.href_url(href), href).await
}

/// Delete a process record by href.
pub async fn delete_process(session: &Session, href: &str) -> Result<()> {
    session.http().delete(&session.href_url(href)).await?;
    Ok(())
}

async fn submit(
    session: &Session,
    script: &SynthesizedScript,
    params: &[NamedParameter],
) -> Result<String> {
    let body = json!({
        "source": script.source,
        "entryPointName": script.entry_point,
        "languageVersion": LANGUAGE_VERSION,
        "parameters": params.iter().map(NamedParameter::to_wire).collect::<Vec<_>>(),
        "applicationTag": APPLICATION_TAG,
        "createdBy": {
            "id": session.user(),
            "name": session.user(),
            "email": session.email(),
        },
        "credential": {
            "user": session.user(),
            "secret": session.secret(),
        },
    });

    let response = session.http().post(&session.processes_url(), &body).await?;
    response
        .get("href")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| {
            Error::MalformedResponse("job submission response carries no href".into())
        })
}

async fn fetch(session: &Session, url: &str, href: &str) -> Result<Process> {
    let body = session.http().get(url, &[("view", "expanded")]).await?;
    Process::from_expanded(href, &body)
}

/// Wrap a job failure with enough context to find it in the platform's own
/// audit trail: tenant, host, and the window bracketing the job's lifetime.
/// The variant is preserved so callers can still match on the kind.
fn with_diagnostics(
    err: Error,
    session: &Session,
    started: DateTime<Utc>,
    ended: DateTime<Utc>,
) -> Error {
    let context = format!(
        "[tenant {}, host {}, between {} and {}]",
        session.tenant(),
        session.host(),
        started.to_rfc3339_opts(SecondsFormat::Secs, true),
        ended.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    match err {
        Error::NotFound(msg) => Error::NotFound(format!("{} {}", msg, context)),
        Error::DependencyConflict(msg) => Error::DependencyConflict(format!("{} {}", msg, context)),
        Error::Platform(msg) => Error::Platform(format!("{} {}", msg, context)),
        Error::MalformedResponse(msg) => Error::MalformedResponse(format!("{} {}", msg, context)),
        other => other,
    }
}
