use std::{collections::VecDeque, sync::Mutex};

use anyhow::Result;
use log::{Level, LevelFilter, Log, Metadata, Record};

const CAPACITY: usize = 200;

/// Keeps recent log records in memory so the UI can draw them.
/// Writing to stderr would corrupt the alternate screen.
struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
}

static LOG_BUFFER: LogBuffer = LogBuffer {
    lines: Mutex::new(VecDeque::new()),
};

impl Log for LogBuffer {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() == CAPACITY {
                lines.pop_front();
            }
            lines.push_back(format!("{:<5} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Installs the in-memory logger.
pub fn init() -> Result<()> {
    log::set_logger(&LOG_BUFFER).map_err(|err| anyhow::anyhow!("{err}"))?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

/// The most recent `count` lines, oldest first.
pub fn recent(count: usize) -> Vec<String> {
    match LOG_BUFFER.lines.lock() {
        Ok(lines) => lines
            .iter()
            .skip(lines.len().saturating_sub(count))
            .cloned()
            .collect(),
        Err(_) => Vec::new(),
    }
}
