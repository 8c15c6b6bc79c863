use super::state::DeviceCounters;
use tokio::sync::broadcast;

/// Test execution events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Session events
    SessionStarted {
        session_id: String,
        device_id: String,
        case_count: usize,
    },
    SessionFinished {
        device_id: String,
        counters: DeviceCounters,
        aborted: Option<String>,
    },

    // Test case events
    CaseStarted {
        device_id: String,
        case_id: String,
        statement_count: usize,
    },
    CaseFinished {
        device_id: String,
        case_id: String,
        passed: bool,
        duration_ms: u64,
    },

    // Statement events
    StatementStarted {
        device_id: String,
        index: usize,
        name: String,
        action: String,
    },
    StatementPassed {
        device_id: String,
        index: usize,
        duration_ms: u64,
    },
    StatementFailed {
        device_id: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StatementSkipped {
        device_id: String,
        index: usize,
        name: String,
        reason: String,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting test events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Render events until every emitter is dropped
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Create MultiProgress with appropriate draw target based on TTY detection
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            // When not a TTY (piped output), use hidden target to avoid terminal escape codes
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        // One running statement per device
        let mut spinners: HashMap<String, (ProgressBar, String)> = HashMap::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::SessionStarted {
                    session_id,
                    device_id,
                    case_count,
                } => {
                    multi
                        .println(format!(
                            "\n{} Session {} started on {} ({} test cases)",
                            "▶".green().bold(),
                            session_id.dimmed(),
                            device_id.cyan(),
                            case_count
                        ))
                        .ok();
                }

                TestEvent::SessionFinished {
                    device_id,
                    counters,
                    aborted,
                } => {
                    if let Some((pb, _)) = spinners.remove(&device_id) {
                        pb.finish();
                    }
                    println!("\n{} Results for Device: {}", "■".blue().bold(), device_id.cyan());
                    println!("  Total Test Cases: {}", counters.total);
                    println!(
                        "  {} passed, {} failed",
                        counters.passed.to_string().green(),
                        counters.failed.to_string().red()
                    );
                    if let Some(reason) = aborted {
                        println!("  {} Run aborted: {}", "✗".red().bold(), reason);
                    }
                }

                TestEvent::CaseStarted {
                    case_id,
                    statement_count,
                    ..
                } => {
                    println!(
                        "\n  {} Test Case: {} ({} statements)",
                        "→".blue(),
                        case_id.white().bold(),
                        statement_count
                    );
                }

                TestEvent::CaseFinished {
                    case_id,
                    passed,
                    duration_ms,
                    ..
                } => {
                    let status_str = if passed {
                        "PASSED".green().bold()
                    } else {
                        "FAILED".red().bold()
                    };
                    println!(
                        "  {} Test Case {} [{}] ({}ms)",
                        "←".blue(),
                        case_id,
                        status_str,
                        duration_ms
                    );
                }

                TestEvent::StatementStarted {
                    device_id,
                    index,
                    name,
                    action,
                } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("      {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }

                    let body = format!("[{}] {} - {}... ", index, name, action.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinners.insert(device_id, (pb, body));
                }

                TestEvent::StatementPassed {
                    device_id,
                    duration_ms,
                    ..
                } => {
                    if let Some((pb, body)) = spinners.remove(&device_id) {
                        pb.finish_and_clear();
                        println!("      {} {}({}ms)", "✓".green(), body, duration_ms);
                    }
                }

                TestEvent::StatementFailed {
                    device_id,
                    error,
                    duration_ms,
                    ..
                } => {
                    if let Some((pb, body)) = spinners.remove(&device_id) {
                        pb.finish_and_clear();
                        println!("      {} {}({}ms)", "✗".red(), body, duration_ms);
                    }
                    println!("          {}", error.red());
                }

                TestEvent::StatementSkipped {
                    index, name, reason, ..
                } => {
                    println!(
                        "      {} [{}] {} ({})",
                        "○".yellow(),
                        index,
                        name,
                        reason.dimmed()
                    );
                }

                TestEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }

        for (_, (pb, _)) in spinners.drain() {
            pb.finish_and_clear();
        }
    }
}
