//! Scripted in-memory driver for tests

use super::traits::{DriverResult, DriverSession, ElementHandle, SessionFactory};
use crate::error::DriverError;
use crate::utils::config::DeviceConfig;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// What the mock saw, shared with the test
#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<String>,
    pub closed: usize,
    pub locates: usize,
}

#[derive(Clone)]
pub struct MockSession {
    device_id: String,
    /// locator value -> element text
    elements: HashMap<String, String>,
    failing_clicks: HashSet<String>,
    /// Clicking one of these drops the session
    lost_clicks: HashSet<String>,
    /// Number of successful locates before the session drops
    lose_after: Option<usize>,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            elements: HashMap::new(),
            failing_clicks: HashSet::new(),
            lost_clicks: HashSet::new(),
            lose_after: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn with_element(mut self, locator_value: &str, text: &str) -> Self {
        self.elements
            .insert(locator_value.to_string(), text.to_string());
        self
    }

    pub fn with_failing_click(mut self, locator_value: &str) -> Self {
        self.failing_clicks.insert(locator_value.to_string());
        self
    }

    pub fn lose_session_on_click(mut self, locator_value: &str) -> Self {
        self.lost_clicks.insert(locator_value.to_string());
        self
    }

    pub fn lose_session_after(mut self, locates: usize) -> Self {
        self.lose_after = Some(locates);
        self
    }

    pub fn state(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl DriverSession for MockSession {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn locate(&self, locator_type: &str, locator_value: &str) -> DriverResult<ElementHandle> {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(limit) = self.lose_after {
                if state.locates >= limit {
                    return Err(DriverError::SessionLost("device disconnected".into()));
                }
            }
            state.locates += 1;
        }
        self.record(format!("locate:{}", locator_value));

        if self.elements.contains_key(locator_value) {
            Ok(ElementHandle::new(locator_value, locator_type, locator_value))
        } else {
            Err(DriverError::element_not_found(locator_type, locator_value))
        }
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(format!("click:{}", element.id));
        if self.lost_clicks.contains(&element.id) {
            return Err(DriverError::SessionLost("device disconnected".into()));
        }
        if self.failing_clicks.contains(&element.id) {
            return Err(DriverError::Invocation(format!(
                "click rejected by {}",
                element.id
            )));
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(format!("scroll:{}", element.id));
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.record(format!("setValue:{}={}", element.id, text));
        Ok(())
    }

    async fn get_text(&self, element: &ElementHandle) -> DriverResult<String> {
        self.record(format!("getText:{}", element.id));
        Ok(self.elements.get(&element.id).cloned().unwrap_or_default())
    }

    async fn screenshot(&self, element: &ElementHandle) -> DriverResult<Vec<u8>> {
        self.record(format!("screenshot:{}", element.id));
        Ok(b"\x89PNG".to_vec())
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Hands out clones of a template session, one per device
pub struct MockFactory {
    template: MockSession,
    refuse: bool,
    pub sessions: Mutex<Vec<Arc<Mutex<MockState>>>>,
}

impl MockFactory {
    pub fn new(template: MockSession) -> Self {
        Self {
            template,
            refuse: false,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Every connect attempt fails
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(MockSession::new("unreachable"))
        }
    }

    pub fn states(&self) -> Vec<Arc<Mutex<MockState>>> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn connect(&self, device: &DeviceConfig) -> DriverResult<Box<dyn DriverSession>> {
        if self.refuse {
            return Err(DriverError::Connect("connection refused".into()));
        }

        let mut session = self.template.clone();
        session.device_id = device.id().to_string();
        session.state = Arc::new(Mutex::new(MockState::default()));
        self.sessions.lock().unwrap().push(session.state());
        Ok(Box::new(session))
    }
}
