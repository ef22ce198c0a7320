use std::{
    fmt,
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
};

use chrono::{format::DelayedFormat, DateTime, Local};
use once_cell::sync::Lazy;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// Flush threshold for the buffered writer thread.
const LINE_CAPACITY: usize = 2048;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warn => "Warn",
            Level::Error => "Error",
        };
        f.write_str(name)
    }
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

/// A named file logger.
///
/// Messages are handed to a background thread over a channel so callers on the
/// async runtime never block on file I/O. Each logger appends to
/// `log/{yyyy-mm-dd}_{name}.log`. When the log directory cannot be created the
/// logger falls back to the console.
pub struct Logger {
    writer: Option<UnboundedSender<LogMessage>>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let log_path = match Self::get_log_path(log_name) {
            Some(path) => path,
            None => {
                error_console(format!(
                    "Failed to create log directory, {} falls back to console",
                    log_name
                ));
                return Logger { writer: None };
            }
        };

        let (tx, rx) = unbounded_channel::<LogMessage>();

        // 寫入檔案的操作使用另一個線程處理
        let spawned = thread::Builder::new()
            .name(format!("log-{}", log_name))
            .spawn(move || write_loop(log_path, rx));

        match spawned {
            Ok(_) => Logger { writer: Some(tx) },
            Err(why) => {
                error_console(format!("Failed to spawn log writer because {:?}", why));
                Logger { writer: None }
            }
        }
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    fn send(&self, level: Level, msg: String) {
        let Some(writer) = &self.writer else {
            console(level, msg);
            return;
        };

        if let Err(why) = writer.send(LogMessage::new(level, msg)) {
            let returned = why.0;
            console(returned.level, returned.msg);
        }
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = Path::new("log");

        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", Local::now().format("%Y-%m-%d"), name));

        Some(log_path)
    }
}

fn write_loop(log_path: PathBuf, mut rx: UnboundedReceiver<LogMessage>) {
    let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => file,
        Err(why) => {
            error_console(format!(
                "Failed to open log file {:?} because {:?}",
                log_path, why
            ));
            while let Some(received) = rx.blocking_recv() {
                console(received.level, received.msg);
            }
            return;
        }
    };

    let mut writer = BufWriter::new(file);
    let mut line = String::with_capacity(LINE_CAPACITY);

    while let Some(received) = rx.blocking_recv() {
        if writeln!(
            &mut line,
            "{} {} {}",
            received.created_at.format("%F %X%.6f"),
            received.level,
            received.msg
        )
        .is_err()
        {
            continue;
        }

        if rx.is_empty() || line.len() >= LINE_CAPACITY {
            if let Err(why) = writer.write_all(line.as_bytes()) {
                error_console(format!(
                    "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                    why, line
                ));
            }

            if let Err(why) = writer.flush() {
                error_console(format!("Failed to flush log file. because:{:#?}", why));
            }

            line.clear();
        }
    }
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

fn console(level: Level, log: String) {
    println!(
        "{} {} {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        level,
        log
    );
}

pub fn info_console(log: String) {
    console(Level::Info, log);
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
