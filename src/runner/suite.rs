//! Suite orchestrator: runs every test case of a suite on one device

use super::case::run_case;
use super::context::{CasePolicy, RunContext};
use super::events::{EventEmitter, TestEvent};
use super::state::SuiteReport;
use crate::commands::CommandRegistry;
use crate::driver::traits::SessionFactory;
use crate::error::{RunError, SessionLost};
use crate::parser::types::TestCase;
use crate::utils::config::DeviceConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Connect to `device`, run `cases` on it and release the session.
///
/// The session is closed exactly once, whether the run completes or is
/// aborted by a disconnect. If the session cannot be created no case runs.
pub async fn run_device(
    factory: &dyn SessionFactory,
    device: &DeviceConfig,
    registry: Arc<CommandRegistry>,
    cases: &[TestCase],
    policy: CasePolicy,
    emitter: EventEmitter,
) -> Result<SuiteReport, RunError> {
    let session = factory.connect(device).await.map_err(|source| {
        log::error!("Could not start session on '{}': {}", device.id(), source);
        RunError::Session {
            device_id: device.id().to_string(),
            source,
        }
    })?;

    let mut ctx = RunContext::new(session, registry, policy, emitter);
    let outcome = run_cases(&mut ctx, cases).await;

    if let Err(e) = ctx.session.close().await {
        log::warn!("Failed to close session on '{}': {}", ctx.device_id, e);
    }

    outcome
}

/// Run `cases` in order against an open session
pub async fn run_cases(ctx: &mut RunContext, cases: &[TestCase]) -> Result<SuiteReport, RunError> {
    let session_id = Uuid::new_v4().to_string();
    log::info!(
        "Session {} started on '{}' with {} test case(s)",
        session_id,
        ctx.device_id,
        cases.len()
    );
    ctx.emitter.emit(TestEvent::SessionStarted {
        session_id,
        device_id: ctx.device_id.clone(),
        case_count: cases.len(),
    });

    let mut report = SuiteReport::new();
    report.set_device_counters(&ctx.device_id, ctx.counters);

    let mut lost: Option<String> = None;
    for (i, case) in cases.iter().enumerate() {
        match run_case(ctx, case).await {
            Ok(result) => {
                ctx.counters.record(result.passed);
                report.record_case(case.id(), result);
            }
            Err(SessionLost(reason)) => {
                log::error!(
                    "Driver session lost during test case {}: {}. {} test case(s) not run",
                    case.id(),
                    reason,
                    cases.len() - i
                );
                lost = Some(reason);
                break;
            }
        }
    }

    report.set_device_counters(&ctx.device_id, ctx.counters);

    if !cases.is_empty() {
        log_summary(ctx);
    }
    ctx.emitter.emit(TestEvent::SessionFinished {
        device_id: ctx.device_id.clone(),
        counters: ctx.counters,
        aborted: lost.clone(),
    });

    match lost {
        None => Ok(report),
        Some(reason) => Err(RunError::SessionLost {
            device_id: ctx.device_id.clone(),
            reason,
            partial: Box::new(report),
        }),
    }
}

fn log_summary(ctx: &RunContext) {
    log::info!("Results for Device: {}", ctx.device_id);
    log::info!("Total Test Cases: {}", ctx.counters.total);
    log::info!("Passed Test Cases: {}", ctx.counters.passed);
    log::info!("Failed Test Cases: {}", ctx.counters.failed);
    log::info!("Test suite execution completed.");
}
