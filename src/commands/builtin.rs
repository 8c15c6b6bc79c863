//! Built-in commands

use super::{CommandHandler, CommandKind, CommandRegistry, Element};
use crate::driver::traits::DriverResult;
use crate::error::DriverError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) fn register_builtins(registry: &mut CommandRegistry, output_dir: &Path) {
    registry.register_builtin("click", Arc::new(Click));
    registry.register_builtin("scroll", Arc::new(Scroll));
    registry.register_builtin("inputText", Arc::new(InputText));
    registry.register_builtin("getText", Arc::new(GetText));
    registry.register_builtin("verifyText", Arc::new(VerifyText));
    registry.register_builtin("assert", Arc::new(VerifyText));
    registry.register_builtin(
        "takeScreenshot",
        Arc::new(TakeScreenshot {
            output_dir: output_dir.to_path_buf(),
        }),
    );
}

fn first_arg(args: &[String]) -> &str {
    args.first().map(|s| s.as_str()).unwrap_or_default()
}

pub struct Click;

#[async_trait]
impl CommandHandler for Click {
    async fn execute(&self, element: &Element<'_>, _args: &[String]) -> DriverResult<Option<String>> {
        element.click().await?;
        log::debug!("Element clicked: {}", element.handle().locator);
        Ok(None)
    }
}

pub struct Scroll;

#[async_trait]
impl CommandHandler for Scroll {
    async fn execute(&self, element: &Element<'_>, _args: &[String]) -> DriverResult<Option<String>> {
        element.scroll_into_view().await?;
        log::debug!("Scrolled to element: {}", element.handle().locator);
        Ok(None)
    }
}

pub struct InputText;

#[async_trait]
impl CommandHandler for InputText {
    async fn execute(&self, element: &Element<'_>, args: &[String]) -> DriverResult<Option<String>> {
        let text = first_arg(args);
        element.set_value(text).await?;
        log::debug!("Text \"{}\" entered into element", text);
        Ok(None)
    }
}

pub struct GetText;

#[async_trait]
impl CommandHandler for GetText {
    async fn execute(&self, element: &Element<'_>, _args: &[String]) -> DriverResult<Option<String>> {
        let text = element.get_text().await?;
        log::debug!("Text retrieved from element: \"{}\"", text);
        Ok(Some(text))
    }
}

/// Reads the element text for comparison; the step executor does the check
pub struct VerifyText;

#[async_trait]
impl CommandHandler for VerifyText {
    fn kind(&self) -> CommandKind {
        CommandKind::Assertion
    }

    async fn execute(&self, element: &Element<'_>, _args: &[String]) -> DriverResult<Option<String>> {
        Ok(Some(element.get_text().await?))
    }
}

/// Saves an element screenshot to the path given as test data
pub struct TakeScreenshot {
    output_dir: PathBuf,
}

#[async_trait]
impl CommandHandler for TakeScreenshot {
    async fn execute(&self, element: &Element<'_>, args: &[String]) -> DriverResult<Option<String>> {
        let target = first_arg(args);
        let path = if target.is_empty() {
            self.output_dir
                .join(format!("screenshot_{}.png", chrono::Local::now().format("%H%M%S%3f")))
        } else if Path::new(target).is_absolute() {
            PathBuf::from(target)
        } else {
            self.output_dir.join(target)
        };

        let png = element.screenshot().await?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DriverError::Invocation(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        std::fs::write(&path, png)
            .map_err(|e| DriverError::Invocation(format!("Failed to write {}: {}", path.display(), e)))?;

        let saved = path.display().to_string();
        log::info!("Saved screenshot: {}", saved);
        Ok(Some(saved))
    }
}
