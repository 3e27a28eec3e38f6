//! Startup options and server runtime info.
//!
//! These are installed once at startup and never persisted.

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// HAProxy-facing options.
#[derive(Debug, Clone, Args)]
pub struct HaproxyOptions {
    /// Path to the haproxy configuration file
    #[arg(short = 'c', long = "config-file", default_value = "/etc/haproxy/haproxy.cfg")]
    pub config_file: PathBuf,

    /// Userlist in HAProxy configuration to use for API Basic Authentication
    #[arg(short = 'u', long, default_value = "controller")]
    pub userlist: String,

    /// Path to the haproxy binary file
    #[arg(short = 'b', long = "haproxy-bin", default_value = "haproxy")]
    pub haproxy_bin: String,

    /// Minimum delay between two reloads (in s)
    #[arg(short = 'd', long = "reload-delay", default_value_t = 5)]
    pub reload_delay: u64,

    /// Reload command
    #[arg(short = 'r', long = "reload-cmd")]
    pub reload_cmd: Option<String>,

    /// Restart command
    #[arg(short = 's', long = "restart-cmd")]
    pub restart_cmd: Option<String>,

    /// Reload retention in days, every older reload id will be deleted
    #[arg(long = "reload-retention", default_value_t = 1)]
    pub reload_retention: u32,

    /// Path to the transaction directory
    #[arg(short = 't', long = "transaction-dir", default_value = "/tmp/haproxy")]
    pub transaction_dir: PathBuf,

    /// Number of backup configuration files to keep, stored in the config dir with version number suffix
    #[arg(short = 'n', long = "backups-number", default_value_t = 0)]
    pub backups_number: u32,

    /// Path to the master Runtime API socket
    #[arg(short = 'm', long = "master-runtime")]
    pub master_runtime: Option<PathBuf>,

    /// Show system info on info endpoint
    #[arg(short = 'i', long = "show-system-info")]
    pub show_system_info: bool,

    /// Run in git mode, without running haproxy and with the ability to push to Git
    #[arg(short = 'g', long = "git-mode")]
    pub git_mode: bool,

    /// Path to the git settings file
    #[arg(long = "git-settings-file", default_value = "/etc/haproxy/git.settings")]
    pub git_settings_file: PathBuf,

    /// Path to the dataplane configuration file (cluster identity snapshot)
    #[arg(short = 'f', value_name = "FILE")]
    pub dataplane_config: Option<PathBuf>,
}

impl Default for HaproxyOptions {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("/etc/haproxy/haproxy.cfg"),
            userlist: "controller".to_string(),
            haproxy_bin: "haproxy".to_string(),
            reload_delay: 5,
            reload_cmd: None,
            restart_cmd: None,
            reload_retention: 1,
            transaction_dir: PathBuf::from("/tmp/haproxy"),
            backups_number: 0,
            master_runtime: None,
            show_system_info: false,
            git_mode: false,
            git_settings_file: PathBuf::from("/etc/haproxy/git.settings"),
            dataplane_config: None,
        }
    }
}

impl HaproxyOptions {
    /// Snapshot path, if persistence is enabled. An empty path counts as unset.
    pub fn snapshot_path(&self) -> Option<&PathBuf> {
        self.dataplane_config
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Stdout,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    #[value(alias = "JSON")]
    Json,
}

/// Logging options.
#[derive(Debug, Clone, Args)]
pub struct LoggingOptions {
    /// Log target
    #[arg(long = "log-to", value_enum, default_value_t = LogTarget::Stdout)]
    pub log_to: LogTarget,

    /// Location of the log file
    #[arg(long = "log-file", default_value = "/var/log/dataplaneapi/dataplaneapi.log")]
    pub log_file: PathBuf,

    /// Logging level
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Warning)]
    pub log_level: LogLevel,

    /// Logging format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_to: LogTarget::Stdout,
            log_file: PathBuf::from("/var/log/dataplaneapi/dataplaneapi.log"),
            log_level: LogLevel::Warning,
            log_format: LogFormat::Text,
        }
    }
}

/// Facts about this service's own listener, derived at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRuntimeInfo {
    pub host: String,
    pub port: u16,
    pub api_base_path: String,
}
