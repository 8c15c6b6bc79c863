pub mod appium;
#[cfg(test)]
pub mod mock;
pub mod traits;

pub use appium::{AppiumDriver, AppiumFactory};
pub use traits::{DriverResult, DriverSession, ElementHandle, SessionFactory};

use crate::utils::config::RunConfig;
use colored::Colorize;

/// List the devices a run would target
pub fn list_devices(config: &RunConfig) {
    let devices = config.devices();
    if devices.is_empty() {
        println!("  No devices configured");
        return;
    }

    println!(
        "  {} device(s) via {}:",
        devices.len(),
        config.server_url().cyan()
    );
    for device in devices {
        println!(
            "    {} {} ({}, {})",
            "•".green(),
            device.id().white().bold(),
            device.platform_name,
            device.automation_name.dimmed()
        );
    }
}
