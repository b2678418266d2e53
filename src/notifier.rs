//! Unified logging and progress UI.
//!
//! [`Notifier`] puts `env_logger` (text logs) and an `indicatif` spinner under a
//! single verbosity switch:
//! - [`VerbosityLevel::Quiet`] → warnings only; `info` messages drive a spinner
//!   on stderr so the changelog on stdout stays clean.
//! - [`VerbosityLevel::Info`]/[`VerbosityLevel::Debug`]/[`VerbosityLevel::Trace`]
//!   → plain log lines, no spinner.
//!
//! The logger is installed process-wide the first time a notifier is built, so
//! `log` macros used across the crate follow the same level.

use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, trace, warn, LevelFilter};
use std::cell::RefCell;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerbosityLevel {
    Quiet = 0, // Spinner, warnings only
    Info = 1,
    Debug = 2,
    Trace = 3,
}

impl From<u8> for VerbosityLevel {
    fn from(level: u8) -> Self {
        match level {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Info,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }
}

impl VerbosityLevel {
    fn to_log_level(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet => LevelFilter::Warn,
            VerbosityLevel::Info => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
            VerbosityLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub struct Notifier {
    verbosity: VerbosityLevel,
    active_spinner: RefCell<Option<ProgressBar>>,
}

impl Notifier {
    pub fn new(verbosity_level: u8) -> Self {
        let verbosity = VerbosityLevel::from(verbosity_level);

        // A second notifier in the same process keeps the first logger.
        let _ = env_logger::Builder::from_env(Env::default())
            .filter_level(verbosity.to_log_level())
            .try_init();

        Self {
            verbosity,
            active_spinner: RefCell::new(None),
        }
    }

    pub fn info(&self, message: &str) {
        match self.verbosity {
            VerbosityLevel::Quiet => {
                if self.active_spinner.borrow().is_none() {
                    *self.active_spinner.borrow_mut() = Some(Self::spinner());
                }
                if let Some(spinner) = self.active_spinner.borrow().as_ref() {
                    spinner.set_message(message.to_string());
                }
            }
            _ => info!("{}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", message);
    }

    pub fn warn(&self, message: &str) {
        self.suspend(|| warn!("{}", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", message);
    }

    /// Clears the spinner, if one was shown.
    pub fn finish(&self) {
        if let Some(spinner) = self.active_spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }

    pub fn verbosity_level(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn suspend<F: FnOnce()>(&self, f: F) {
        match self.active_spinner.borrow().as_ref() {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    fn spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.finish();
    }
}
