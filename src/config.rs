//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "countdown-keeper")]
#[command(about = "A persisted countdown timer daemon with halfway and completion notifications")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Directory holding the persisted timer state
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep timer state in memory only (lost on restart)
    #[arg(long)]
    pub in_memory: bool,

    /// Smallest selectable countdown, in hours
    #[arg(long, default_value = "6")]
    pub min_hours: u32,

    /// Largest selectable countdown, in hours
    #[arg(long, default_value = "12")]
    pub max_hours: u32,

    /// Length of one selectable hour in seconds (lower it for a demo run)
    #[arg(long, default_value = "3600")]
    pub seconds_per_hour: u64,

    /// Program used to show notifications
    #[arg(long, default_value = "notify-send")]
    pub notify_command: String,

    /// Program used when alarm delivery is enabled
    #[arg(long)]
    pub alarm_command: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Check the values clap cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_hours == 0 || self.min_hours > self.max_hours {
            return Err(ConfigError::InvalidHourRange {
                min: self.min_hours,
                max: self.max_hours,
            });
        }
        if self.seconds_per_hour == 0 {
            return Err(ConfigError::InvalidHourLength);
        }
        Ok(())
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Resolve where the storage file lives
    pub fn storage_path(&self) -> PathBuf {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => match std::env::var_os("HOME") {
                Some(home) => PathBuf::from(home).join(".local/share/countdown-keeper"),
                None => PathBuf::from(".countdown-keeper"),
            },
        };
        dir.join("store.json")
    }

    /// Hour selection limits shared with the API layer
    pub fn hour_range(&self) -> HourRange {
        HourRange {
            min: self.min_hours,
            max: self.max_hours,
            seconds_per_hour: self.seconds_per_hour,
        }
    }
}

/// Selectable countdown range, in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    pub min: u32,
    pub max: u32,
    pub seconds_per_hour: u64,
}

impl HourRange {
    pub fn contains(&self, hours: u32) -> bool {
        (self.min..=self.max).contains(&hours)
    }

    pub fn to_seconds(&self, hours: u32) -> u64 {
        u64::from(hours) * self.seconds_per_hour
    }

    /// Whole hours in a duration, for notification texts
    pub fn to_hours(&self, seconds: u64) -> u64 {
        seconds / self.seconds_per_hour
    }
}

impl Default for HourRange {
    fn default() -> Self {
        Self { min: 6, max: 12, seconds_per_hour: 3600 }
    }
}
