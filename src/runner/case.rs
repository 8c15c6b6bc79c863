//! Test case runner

use super::context::RunContext;
use super::events::TestEvent;
use super::executor::execute_statement;
use super::state::CaseResult;
use crate::error::SessionLost;
use crate::parser::types::TestCase;
use std::time::Instant;

/// Run the statements of one test case in order.
///
/// With the default policy every statement runs even after an earlier one
/// failed, and the case is judged at the end. With `fail_fast` the remaining
/// statements are skipped and left out of the result.
pub async fn run_case(ctx: &RunContext, case: &TestCase) -> Result<CaseResult, SessionLost> {
    log::info!("Executing Test Case: {}", case.id());
    ctx.emitter.emit(TestEvent::CaseStarted {
        device_id: ctx.device_id.clone(),
        case_id: case.id().to_string(),
        statement_count: case.len(),
    });

    let started = Instant::now();
    let mut result = CaseResult::new();

    for (i, statement) in case.statements().iter().enumerate() {
        let statement_result = execute_statement(ctx, i, statement).await?;
        let failed = !statement_result.passed;
        result.record(&statement.display_name(), statement_result);

        if failed && !ctx.policy.continue_on_failure {
            skip_remaining(ctx, case, i + 1);
            break;
        }
    }

    if result.passed {
        log::info!("Test Case {} PASSED", case.id());
    } else {
        log::error!("Test Case {} FAILED", case.id());
    }
    ctx.emitter.emit(TestEvent::CaseFinished {
        device_id: ctx.device_id.clone(),
        case_id: case.id().to_string(),
        passed: result.passed,
        duration_ms: started.elapsed().as_millis() as u64,
    });

    Ok(result)
}

fn skip_remaining(ctx: &RunContext, case: &TestCase, from: usize) {
    let remaining = &case.statements()[from..];
    if remaining.is_empty() {
        return;
    }

    log::info!(
        "Skipping {} remaining statement(s) of {} after failure",
        remaining.len(),
        case.id()
    );
    for (offset, statement) in remaining.iter().enumerate() {
        ctx.emitter.emit(TestEvent::StatementSkipped {
            device_id: ctx.device_id.clone(),
            index: from + offset,
            name: statement.display_name(),
            reason: "Previous statement failed".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandRegistry;
    use crate::driver::mock::MockSession;
    use crate::parser::types::TestStatement;
    use crate::runner::context::CasePolicy;
    use crate::runner::events::EventEmitter;
    use std::sync::Arc;

    fn statement(name: &str, action: &str, locator: &str) -> TestStatement {
        TestStatement {
            test_case_id: "TC1".into(),
            test_case_name: name.into(),
            action: action.into(),
            locator_type: "id".into(),
            locator_value: locator.into(),
            test_data: String::new(),
            expected_result: String::new(),
        }
    }

    fn login_case() -> TestCase {
        TestCase::new(
            "TC1",
            vec![
                statement("open menu", "click", "menu"),
                statement("tap broken", "click", "broken"),
                statement("tap missing", "click", "missing"),
                statement("tap ok", "click", "ok"),
            ],
        )
    }

    fn session() -> MockSession {
        MockSession::new("emu")
            .with_element("menu", "")
            .with_element("broken", "")
            .with_element("ok", "")
            .with_failing_click("broken")
    }

    #[tokio::test]
    async fn test_continues_after_failures() {
        let session = session();
        let state = session.state();
        let ctx = RunContext::new(
            Box::new(session),
            Arc::new(CommandRegistry::new()),
            CasePolicy::default(),
            EventEmitter::default(),
        );

        let result = run_case(&ctx, &login_case()).await.unwrap();
        assert!(!result.passed);

        let keys: Vec<&str> = result.statements.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["open menu", "tap broken", "tap missing", "tap ok"]);
        assert!(result.statements["tap ok"].passed);
        assert!(state.lock().unwrap().calls.contains(&"click:ok".to_string()));

        let all_passed = result.statements.values().all(|s| s.passed);
        assert_eq!(result.passed, all_passed);
    }

    #[tokio::test]
    async fn test_fail_fast_policy() {
        let session = session();
        let state = session.state();
        let ctx = RunContext::new(
            Box::new(session),
            Arc::new(CommandRegistry::new()),
            CasePolicy::fail_fast(),
            EventEmitter::default(),
        );

        let result = run_case(&ctx, &login_case()).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.statements.len(), 2);
        assert!(!state.lock().unwrap().calls.contains(&"click:ok".to_string()));
    }

    #[tokio::test]
    async fn test_events_follow_statement_order() {
        let (emitter, mut rx) = EventEmitter::new();
        let ctx = RunContext::new(
            Box::new(session()),
            Arc::new(CommandRegistry::new()),
            CasePolicy::default(),
            emitter,
        );

        run_case(&ctx, &login_case()).await.unwrap();

        let mut started = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TestEvent::StatementStarted { index, .. } = event {
                started.push(index);
            }
        }
        assert_eq!(started, vec![0, 1, 2, 3]);
    }
}
