//! Run log: every record goes to the log file in the output directory, and
//! to stderr as well when running verbose.
//!
//! The level comes from `RUST_LOG` and defaults to `info`.

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target, WriteStyle};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes each line to the log file and optionally mirrors it to stderr
struct TeeWriter {
    file: File,
    echo: bool,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.echo {
            // A broken stderr must not stop the file log
            let _ = io::stderr().write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.echo {
            let _ = io::stderr().flush();
        }
        Ok(())
    }
}

/// Format used for every log line: `<RFC 3339 timestamp> [LEVEL]: message`
pub fn format_line(level: log::Level, message: &std::fmt::Arguments<'_>) -> String {
    format!("{} [{}]: {}", chrono::Local::now().to_rfc3339(), level, message)
}

/// Open (append) the log file and install the global logger.
///
/// Returns the path of the log file. Calling this twice keeps the first
/// logger.
pub fn init(output_dir: &Path, log_file: &Path, verbose: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let path = output_dir.join(log_file);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let result = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", format_line(record.level(), record.args())))
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(TeeWriter {
            file,
            echo: verbose,
        })))
        .try_init();

    if let Err(e) = result {
        eprintln!("Warning: logger already initialized: {}", e);
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = format_line(log::Level::Info, &format_args!("Executing Test Case: TC1"));
        let (timestamp, rest) = line.split_once(' ').unwrap();

        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert_eq!(rest, "[INFO]: Executing Test Case: TC1");
    }

    #[test]
    fn test_tee_writer_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();

        let mut writer = TeeWriter { file, echo: false };
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
