//! Minimal CLI parsing for run mode overrides.

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Serve the REST API (with the optional interval scheduler)
    Server,
    /// Run a single cleanup pass and exit
    Once,
}

impl RunMode {
    pub fn from_env() -> Self {
        match env::var("RUN_MODE").ok().as_deref() {
            Some("once") => RunMode::Once,
            Some("server") => RunMode::Server,
            _ => RunMode::Server,
        }
    }

    pub fn from_arg(value: &str) -> Option<Self> {
        match value {
            "once" => Some(RunMode::Once),
            "server" => Some(RunMode::Server),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CliOptions {
    pub run_mode_override: Option<RunMode>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        let mut options = CliOptions::default();
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => options.run_mode_override = Some(RunMode::Once),
                "--server" => options.run_mode_override = Some(RunMode::Server),
                "--run-mode" => {
                    if let Some(value) = args.next() {
                        options.run_mode_override = RunMode::from_arg(&value);
                    }
                }
                _ if arg.starts_with("--run-mode=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.run_mode_override = RunMode::from_arg(value);
                    }
                }
                _ => {}
            }
        }
        options
    }
}
