//! Step executor: runs one statement and turns every statement-level error
//! into a failed `StatementResult`.

use super::context::RunContext;
use super::events::TestEvent;
use super::state::StatementResult;
use crate::commands::Element;
use crate::error::{DriverError, SessionLost, StepError};
use crate::parser::types::TestStatement;
use std::time::Instant;

/// Why a statement did not produce a result
enum Interrupted {
    Step(StepError),
    Lost(String),
}

impl From<DriverError> for Interrupted {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::SessionLost(reason) => Interrupted::Lost(reason),
            other => Interrupted::Step(other.into()),
        }
    }
}

impl From<StepError> for Interrupted {
    fn from(e: StepError) -> Self {
        Interrupted::Step(e)
    }
}

/// Execute one statement.
///
/// Statement failures (missing element, unknown command, assertion mismatch,
/// driver errors) come back as `Ok` with `passed == false`. Only a lost
/// session is returned as an error.
pub async fn execute_statement(
    ctx: &RunContext,
    index: usize,
    statement: &TestStatement,
) -> Result<StatementResult, SessionLost> {
    let name = statement.display_name();
    log::info!("Executing Test Statement: {} - {}", name, statement.action);
    ctx.emitter.emit(TestEvent::StatementStarted {
        device_id: ctx.device_id.clone(),
        index,
        name: name.clone(),
        action: statement.action.clone(),
    });

    let started = Instant::now();
    let outcome = run_statement(ctx, statement).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(result) => result,
        Err(Interrupted::Step(err)) => StatementResult::failed(&statement.action, &err),
        Err(Interrupted::Lost(reason)) => {
            log::error!(
                "Test Statement {} aborted, driver session lost: {}",
                name,
                reason
            );
            ctx.emitter.emit(TestEvent::StatementFailed {
                device_id: ctx.device_id.clone(),
                index,
                error: format!("Session lost: {}", reason),
                duration_ms,
            });
            return Err(SessionLost(reason));
        }
    };

    match result.failure_message() {
        None => {
            log::info!("Test Statement {} passed", name);
            ctx.emitter.emit(TestEvent::StatementPassed {
                device_id: ctx.device_id.clone(),
                index,
                duration_ms,
            });
        }
        Some(message) => {
            log::error!("Test Statement {} failed: {}", name, message);
            ctx.emitter.emit(TestEvent::StatementFailed {
                device_id: ctx.device_id.clone(),
                index,
                error: message,
                duration_ms,
            });
        }
    }

    Ok(result)
}

async fn run_statement(
    ctx: &RunContext,
    statement: &TestStatement,
) -> Result<StatementResult, Interrupted> {
    let handle = ctx
        .session
        .locate(&statement.locator_type, &statement.locator_value)
        .await?;
    let handler = ctx.registry.resolve(&statement.action)?;

    let args: Vec<String> = if statement.test_data.is_empty() {
        Vec::new()
    } else {
        vec![statement.test_data.clone()]
    };

    let element = Element::new(&*ctx.session, handle);
    let observed = handler.execute(&element, &args).await?;

    if ctx.registry.is_assertion(&statement.action) {
        let expected = expected_value(statement);
        let actual = observed.unwrap_or_default();
        if actual != expected {
            return Err(StepError::AssertionMismatch {
                actual,
                expected: expected.to_string(),
            }
            .into());
        }
        return Ok(StatementResult::passed(&statement.action, actual, expected));
    }

    Ok(StatementResult::passed(
        &statement.action,
        observed.unwrap_or_default(),
        statement.expected_result.as_str(),
    ))
}

/// Assertions compare against `Expected Result`, or `Test Data` when the
/// expected column is empty
fn expected_value(statement: &TestStatement) -> &str {
    if statement.expected_result.is_empty() {
        &statement.test_data
    } else {
        &statement.expected_result
    }
}
