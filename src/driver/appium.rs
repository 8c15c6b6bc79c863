//! Appium / W3C WebDriver HTTP session
//!
//! Talks to an Appium server (default `http://localhost:4723/wd/hub`) using
//! the W3C WebDriver protocol. One `AppiumDriver` wraps one remote session.

use super::traits::{DriverResult, DriverSession, ElementHandle, SessionFactory};
use crate::error::DriverError;
use crate::utils::config::DeviceConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Default HTTP timeout. Session creation installs the app, so it is generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Creates Appium sessions against one server
pub struct AppiumFactory {
    server_url: String,
    timeout: Duration,
}

impl AppiumFactory {
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SessionFactory for AppiumFactory {
    async fn connect(&self, device: &DeviceConfig) -> DriverResult<Box<dyn DriverSession>> {
        let driver = AppiumDriver::connect(&self.server_url, device, self.timeout).await?;
        Ok(Box::new(driver))
    }
}

/// Session creation response (W3C nests the id in `value`, JSONWP puts it on top)
#[derive(Debug, Deserialize)]
struct SessionResponse {
    value: SessionValue,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionValue {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Error payload returned by the server
#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WdResponse<T> {
    value: T,
}

/// Failure reported by the WebDriver server
#[derive(Debug, Clone, PartialEq)]
struct WebDriverFailure {
    code: String,
    message: String,
}

impl WebDriverFailure {
    fn parse(status: u16, body: &str) -> Self {
        match serde_json::from_str::<WdResponse<ErrorValue>>(body) {
            Ok(resp) => Self {
                code: resp.value.error,
                message: resp.value.message,
            },
            Err(_) => Self {
                code: format!("http {}", status),
                message: body.trim().to_string(),
            },
        }
    }

    fn is_no_such_element(&self) -> bool {
        self.code == "no such element"
    }

    fn into_driver_error(self) -> DriverError {
        if self.code == "invalid session id" {
            DriverError::SessionLost(self.message)
        } else if self.message.is_empty() {
            DriverError::Invocation(self.code)
        } else {
            DriverError::Invocation(format!("{}: {}", self.code, self.message))
        }
    }
}

/// W3C WebDriver session backed by an Appium server
pub struct AppiumDriver {
    base_url: String,
    client: reqwest::Client,
    session_id: String,
    device_id: String,
}

impl AppiumDriver {
    /// Create a remote session for `device`
    pub async fn connect(
        server_url: &str,
        device: &DeviceConfig,
        timeout: Duration,
    ) -> DriverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriverError::Connect(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = server_url.trim_end_matches('/').to_string();
        let body = json!({
            "capabilities": {
                "alwaysMatch": build_capabilities(device),
                "firstMatch": [{}],
            }
        });

        log::info!(
            "Creating session for device '{}' at {}",
            device.id(),
            base_url
        );

        let resp = client
            .post(format!("{}/session", base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        if !status.is_success() {
            let failure = WebDriverFailure::parse(status.as_u16(), &text);
            return Err(DriverError::Connect(format!(
                "{}: {}",
                failure.code, failure.message
            )));
        }

        let session: SessionResponse = serde_json::from_str(&text)
            .map_err(|e| DriverError::Connect(format!("Invalid session response: {}", e)))?;
        let session_id = session
            .value
            .session_id
            .or(session.session_id)
            .ok_or_else(|| DriverError::Connect("No session ID in response".to_string()))?;

        Ok(Self {
            base_url,
            client,
            session_id,
            device_id: device.id().to_string(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    fn element_url(&self, element: &ElementHandle, path: &str) -> String {
        self.url(&format!("/element/{}{}", element.id, path))
    }

    /// Send a request and return the `value` of the response body
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, WebDriverCallError> {
        let resp = request.send().await.map_err(WebDriverCallError::Transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(WebDriverCallError::Transport)?;

        if !status.is_success() {
            return Err(WebDriverCallError::Server(WebDriverFailure::parse(
                status.as_u16(),
                &text,
            )));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let body: WdResponse<Value> = serde_json::from_str(&text).map_err(|e| {
            WebDriverCallError::Server(WebDriverFailure {
                code: "invalid response".to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(body.value)
    }

    async fn post(&self, url: String, body: Value) -> DriverResult<Value> {
        self.send(self.client.post(url).json(&body))
            .await
            .map_err(WebDriverCallError::into_driver_error)
    }

    async fn get(&self, url: String) -> DriverResult<Value> {
        self.send(self.client.get(url))
            .await
            .map_err(WebDriverCallError::into_driver_error)
    }
}

/// Outcome of a failed HTTP round trip
#[derive(Debug)]
enum WebDriverCallError {
    Transport(reqwest::Error),
    Server(WebDriverFailure),
}

impl WebDriverCallError {
    fn into_driver_error(self) -> DriverError {
        match self {
            WebDriverCallError::Transport(e) if e.is_timeout() => {
                DriverError::Invocation(format!("Request timed out: {}", e))
            }
            WebDriverCallError::Transport(e) => DriverError::SessionLost(e.to_string()),
            WebDriverCallError::Server(failure) => failure.into_driver_error(),
        }
    }
}

#[async_trait]
impl DriverSession for AppiumDriver {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn locate(&self, locator_type: &str, locator_value: &str) -> DriverResult<ElementHandle> {
        let body = json!({
            "using": locator_strategy(locator_type),
            "value": locator_value,
        });

        let value = match self.send(self.client.post(self.url("/element")).json(&body)).await {
            Ok(value) => value,
            Err(WebDriverCallError::Server(failure)) if failure.is_no_such_element() => {
                return Err(DriverError::element_not_found(locator_type, locator_value));
            }
            Err(e) => return Err(e.into_driver_error()),
        };

        let id = element_id(&value).ok_or_else(|| {
            DriverError::Invocation(format!("No element reference in response: {}", value))
        })?;
        Ok(ElementHandle::new(id, locator_type, locator_value))
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.post(self.element_url(element, "/click"), json!({}))
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> DriverResult<()> {
        let body = json!({
            "script": "mobile: scroll",
            "args": [{ "elementId": element.id, "toVisible": true }],
        });
        self.post(self.url("/execute/sync"), body).await?;
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        let chars: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let body = json!({ "text": text, "value": chars });
        self.post(self.element_url(element, "/value"), body).await?;
        Ok(())
    }

    async fn get_text(&self, element: &ElementHandle) -> DriverResult<String> {
        let value = self.get(self.element_url(element, "/text")).await?;
        text_value(&value)
    }

    async fn screenshot(&self, element: &ElementHandle) -> DriverResult<Vec<u8>> {
        use base64::Engine;
        let value = self.get(self.element_url(element, "/screenshot")).await?;
        let data = value
            .as_str()
            .ok_or_else(|| DriverError::Invocation("Screenshot response is not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| DriverError::Invocation(format!("Failed to decode screenshot: {}", e)))
    }

    async fn close(&self) -> DriverResult<()> {
        log::info!("Deleting session {} on '{}'", self.session_id, self.device_id);
        self.send(self.client.delete(self.url("")))
            .await
            .map_err(WebDriverCallError::into_driver_error)?;
        Ok(())
    }
}

/// W3C capabilities for a device. Vendor keys get the `appium:` prefix.
pub fn build_capabilities(device: &DeviceConfig) -> Value {
    let mut caps = serde_json::Map::new();
    caps.insert("platformName".into(), json!(device.platform_name));
    caps.insert("appium:deviceName".into(), json!(device.device_name));
    caps.insert("appium:automationName".into(), json!(device.automation_name));
    if let Some(ref app) = device.app {
        caps.insert("appium:app".into(), json!(app));
    }
    if let Some(ref udid) = device.udid {
        caps.insert("appium:udid".into(), json!(udid));
    }

    for (key, value) in &device.capabilities {
        let key = if key.contains(':') || is_w3c_capability(key) {
            key.clone()
        } else {
            format!("appium:{}", key)
        };
        caps.insert(key, value.clone());
    }

    Value::Object(caps)
}

fn is_w3c_capability(key: &str) -> bool {
    matches!(
        key,
        "platformName"
            | "browserName"
            | "browserVersion"
            | "acceptInsecureCerts"
            | "pageLoadStrategy"
            | "proxy"
            | "timeouts"
            | "unhandledPromptBehavior"
    )
}

/// Map a sheet locator type onto a WebDriver location strategy
pub fn locator_strategy(locator_type: &str) -> String {
    let normalized: String = locator_type
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase();

    match normalized.as_str() {
        "id" | "resourceid" => "id",
        "xpath" => "xpath",
        "accessibilityid" | "aid" | "contentdesc" => "accessibility id",
        "class" | "classname" => "class name",
        "name" => "name",
        "css" | "cssselector" => "css selector",
        "uiautomator" | "androiduiautomator" => "-android uiautomator",
        "predicate" | "iospredicate" | "iospredicatestring" => "-ios predicate string",
        "classchain" | "iosclasschain" => "-ios class chain",
        _ => return locator_type.to_string(),
    }
    .to_string()
}

/// Element text from a `/text` response; anything but a string is a driver fault
fn text_value(value: &Value) -> DriverResult<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| DriverError::Invocation(format!("Text response is not a string: {}", value)))
}

fn element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_trims_server_url() {
        let factory = AppiumFactory::new("http://localhost:4723/wd/hub/");
        assert_eq!(factory.server_url, "http://localhost:4723/wd/hub");
    }

    #[test]
    fn test_build_capabilities() {
        let mut device = DeviceConfig {
            app: Some("/path/to/app.apk".into()),
            udid: Some("emulator-5554".into()),
            ..Default::default()
        };
        device
            .capabilities
            .insert("noReset".into(), json!(true));
        device
            .capabilities
            .insert("appium:newCommandTimeout".into(), json!(300));

        let caps = build_capabilities(&device);
        assert_eq!(caps["platformName"], "Android");
        assert_eq!(caps["appium:automationName"], "UiAutomator2");
        assert_eq!(caps["appium:app"], "/path/to/app.apk");
        assert_eq!(caps["appium:udid"], "emulator-5554");
        assert_eq!(caps["appium:noReset"], true);
        assert_eq!(caps["appium:newCommandTimeout"], 300);
    }

    #[test]
    fn test_locator_strategy() {
        assert_eq!(locator_strategy("id"), "id");
        assert_eq!(locator_strategy("XPath"), "xpath");
        assert_eq!(locator_strategy("accessibilityId"), "accessibility id");
        assert_eq!(locator_strategy("className"), "class name");
        assert_eq!(locator_strategy("androidUIAutomator"), "-android uiautomator");
        assert_eq!(locator_strategy("-custom strategy"), "-custom strategy");
    }

    #[test]
    fn test_element_id() {
        let w3c = json!({ "element-6066-11e4-a52e-4f735466cecf": "abc" });
        assert_eq!(element_id(&w3c).as_deref(), Some("abc"));
        let legacy = json!({ "ELEMENT": "def" });
        assert_eq!(element_id(&legacy).as_deref(), Some("def"));
        assert_eq!(element_id(&json!({})), None);
    }

    #[test]
    fn test_text_value_requires_string() {
        assert_eq!(text_value(&json!("Welcome")).unwrap(), "Welcome");
        assert_eq!(text_value(&json!("")).unwrap(), "");

        let err = text_value(&Value::Null).unwrap_err();
        assert_eq!(err, DriverError::Invocation("Text response is not a string: null".into()));
        assert!(text_value(&json!({ "text": "Welcome" })).is_err());
    }

    #[test]
    fn test_failure_classification() {
        let body = r#"{"value":{"error":"no such element","message":"not found","stacktrace":""}}"#;
        let failure = WebDriverFailure::parse(404, body);
        assert!(failure.is_no_such_element());

        let body = r#"{"value":{"error":"invalid session id","message":"session deleted"}}"#;
        let err = WebDriverFailure::parse(404, body).into_driver_error();
        assert_eq!(err, DriverError::SessionLost("session deleted".into()));

        let err = WebDriverFailure::parse(500, "Bad Gateway").into_driver_error();
        assert_eq!(err, DriverError::Invocation("http 500: Bad Gateway".into()));
    }
}
