use crate::error::DriverError;
use crate::utils::config::DeviceConfig;
use async_trait::async_trait;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opaque handle to a resolved UI element
///
/// Only meaningful to the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub id: String,
    /// Locator that produced this element, kept for error messages
    pub locator: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, locator_type: &str, locator_value: &str) -> Self {
        Self {
            id: id.into(),
            locator: format!("{}={}", locator_type, locator_value),
        }
    }
}

/// Live connection to one UI-automatable device or app
///
/// All operations are awaited one at a time by the engine; implementations
/// never see concurrent calls from the same device run.
#[async_trait]
pub trait DriverSession: Send + Sync {
    /// Identifier of the device this session drives
    fn device_id(&self) -> &str;

    /// Resolve a locator to an element
    ///
    /// # Errors
    /// `DriverError::ElementNotFound` when nothing matches.
    async fn locate(&self, locator_type: &str, locator_value: &str) -> DriverResult<ElementHandle>;

    /// Tap/click the element
    async fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Scroll until the element is visible
    async fn scroll_into_view(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Type text into the element
    async fn set_value(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    /// Visible text of the element
    async fn get_text(&self, element: &ElementHandle) -> DriverResult<String>;

    /// PNG screenshot of the element
    async fn screenshot(&self, _element: &ElementHandle) -> DriverResult<Vec<u8>> {
        Err(DriverError::Unsupported("Element screenshot".to_string()))
    }

    /// Release the session. Called exactly once per device run.
    async fn close(&self) -> DriverResult<()>;
}

/// Establishes driver sessions from device configuration
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self, device: &DeviceConfig) -> DriverResult<Box<dyn DriverSession>>;
}
