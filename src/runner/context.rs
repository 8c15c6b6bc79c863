use super::events::EventEmitter;
use super::state::DeviceCounters;
use crate::commands::CommandRegistry;
use crate::driver::traits::DriverSession;
use std::sync::Arc;

/// How a test case reacts to a failed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasePolicy {
    /// Run the remaining statements of a case after one fails
    pub continue_on_failure: bool,
}

impl Default for CasePolicy {
    fn default() -> Self {
        Self {
            continue_on_failure: true,
        }
    }
}

impl CasePolicy {
    pub fn fail_fast() -> Self {
        Self {
            continue_on_failure: false,
        }
    }
}

/// Everything one device run needs, built once per device and passed
/// explicitly to the executor, the case runner and the orchestrator
pub struct RunContext {
    pub device_id: String,

    /// Live driver session. Only this device run ever touches it.
    pub session: Box<dyn DriverSession>,

    pub registry: Arc<CommandRegistry>,

    /// Completed test cases on this device
    pub counters: DeviceCounters,

    pub policy: CasePolicy,

    pub emitter: EventEmitter,
}

impl RunContext {
    pub fn new(
        session: Box<dyn DriverSession>,
        registry: Arc<CommandRegistry>,
        policy: CasePolicy,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            device_id: session.device_id().to_string(),
            session,
            registry,
            counters: DeviceCounters::default(),
            policy,
            emitter,
        }
    }
}
