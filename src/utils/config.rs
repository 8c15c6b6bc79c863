//! Run configuration (devices and Appium server), loaded from JSON

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:4723/wd/hub";
pub const DEFAULT_LOG_FILE: &str = "testResults.log";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Single target device (legacy layout)
    #[serde(default)]
    pub device: Option<DeviceConfig>,

    /// Target devices, one session each
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub test_environment: TestEnvironment,

    /// Keep executing a test case after one of its statements fails
    #[serde(default = "default_continue_on_failure")]
    pub continue_on_failure: bool,

    /// Log file name, relative to the output directory
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestEnvironment {
    #[serde(default, alias = "serverUrl")]
    pub server_url: Option<String>,
}

/// Connection parameters for one device session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_platform", alias = "platform_name")]
    pub platform_name: String,

    #[serde(default = "default_device_name", alias = "device_name")]
    pub device_name: String,

    /// Path to the app under test (.apk / .app / .ipa)
    #[serde(default)]
    pub app: Option<String>,

    #[serde(default = "default_automation", alias = "automation_name")]
    pub automation_name: String,

    #[serde(default)]
    pub udid: Option<String>,

    /// Extra capabilities passed through to the server as-is
    #[serde(default)]
    pub capabilities: serde_json::Map<String, serde_json::Value>,
}

fn default_continue_on_failure() -> bool {
    true
}

fn default_platform() -> String {
    "Android".to_string()
}

fn default_device_name() -> String {
    "Android Emulator".to_string()
}

fn default_automation() -> String {
    "UiAutomator2".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device: None,
            devices: Vec::new(),
            test_environment: TestEnvironment::default(),
            continue_on_failure: default_continue_on_failure(),
            log_file: None,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: None,
            model: None,
            platform_name: default_platform(),
            device_name: default_device_name(),
            app: None,
            automation_name: default_automation(),
            udid: None,
            capabilities: serde_json::Map::new(),
        }
    }
}

impl DeviceConfig {
    /// Stable identifier used for counters and report keys
    pub fn id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.udid.as_deref())
            .or(self.model.as_deref())
            .unwrap_or(&self.device_name)
    }
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: RunConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn server_url(&self) -> &str {
        self.test_environment
            .server_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Every configured device; a single default device when none is set
    pub fn devices(&self) -> Vec<DeviceConfig> {
        let mut devices = self.devices.clone();
        if let Some(ref device) = self.device {
            if !devices.iter().any(|d| d.id() == device.id()) {
                devices.insert(0, device.clone());
            }
        }
        if devices.is_empty() {
            devices.push(DeviceConfig::default());
        }
        devices
    }

    /// Devices selected on the command line.
    ///
    /// Known ids pick the configured device; unknown ids reuse the first
    /// configured device as a template with the id as its udid.
    pub fn select_devices(&self, ids: &[String]) -> Vec<DeviceConfig> {
        let configured = self.devices();
        if ids.is_empty() {
            return configured;
        }

        ids.iter()
            .map(|id| {
                configured
                    .iter()
                    .find(|d| d.id() == id)
                    .cloned()
                    .unwrap_or_else(|| {
                        let mut device = configured[0].clone();
                        device.id = Some(id.clone());
                        device.udid = Some(id.clone());
                        device
                    })
            })
            .collect()
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }
}
