//! Daily-file logging for cliprig.
//!
//! Installs a `log` sink that appends every record to one file per calendar
//! day and mirrors it to stderr. Lines are formatted as
//! `[<HH:MM:SS>] <icon> <LEVEL> | <message>` with levels INFO/WARN/ERR/OK/DBG.
//! Success records use the `OK` level, emitted via the [`ok`] macro which
//! tags the record with the `"ok"` target.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};

/// Target string that promotes an info record to the OK level.
pub const OK_TARGET: &str = "ok";

/// Log a success message (OK level, green check icon).
#[macro_export]
macro_rules! ok {
    ($($arg:tt)*) => {
        log::info!(target: $crate::logging::OK_TARGET, $($arg)*)
    };
}

/// A `log::Log` implementation writing one append-only file per day.
pub struct DailyLogger {
    dir: PathBuf,
    debug: bool,
    file: Mutex<()>,
}

impl DailyLogger {
    pub fn new(dir: PathBuf, debug: bool) -> Self {
        Self {
            dir,
            debug,
            file: Mutex::new(()),
        }
    }

    /// Install the logger as the global `log` sink.
    ///
    /// `debug` controls whether DBG records reach stderr; they are always
    /// written to the file.
    pub fn init(dir: PathBuf, debug: bool) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(DailyLogger::new(dir, debug)))?;
        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }

    fn label_and_icon(level: Level, target: &str) -> (&'static str, &'static str) {
        if level == Level::Info && target == OK_TARGET {
            return ("OK", "\u{2705}");
        }
        match level {
            Level::Error => ("ERR", "\u{274c}"),
            Level::Warn => ("WARN", "\u{26a0}\u{fe0f}"),
            Level::Info => ("INFO", "\u{2139}\u{fe0f}"),
            Level::Debug | Level::Trace => ("DBG", "\u{1f41e}"),
        }
    }
}

impl log::Log for DailyLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Local::now();
        let (label, icon) = Self::label_and_icon(record.level(), record.target());
        let line = format!(
            "[{}] {} {:<5} | {}",
            now.format("%H:%M:%S"),
            icon,
            label,
            record.args()
        );

        // One lock around the append keeps concurrent lines intact.
        let guard = self.file.lock();
        let _ = std::fs::create_dir_all(&self.dir);
        let path = self.dir.join(format!("{}.log", now.format("%Y-%m-%d")));
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = writeln!(file, "{}", line);
        }
        drop(guard);

        if label != "DBG" || self.debug {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {}
}
