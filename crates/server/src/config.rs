// crates/server/src/config.rs
//! Command-line / environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use ytgrab_core::OutputDir;

use crate::downloader::RunnerConfig;
use crate::tool::ToolCommand;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Web front-end for fetching videos through yt-dlp.
#[derive(Debug, Clone, Parser)]
#[command(name = "ytgrab", version, about)]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "YTGRAB_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to bind. Falls back to `PORT`, then 5000.
    #[arg(long, env = "YTGRAB_PORT")]
    pub port: Option<u16>,

    /// Where downloaded files are written and served from.
    #[arg(long, env = "YTGRAB_OUTPUT_DIR", default_value = "downloads")]
    pub output_dir: PathBuf,

    /// Directory with the web UI. API-only when unset.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Downloader executable.
    #[arg(long, env = "YTGRAB_TOOL_PROGRAM", default_value = "yt-dlp")]
    pub tool_program: String,

    /// Arguments placed before everything else, e.g. `-m,yt_dlp` for `python`.
    #[arg(
        long = "tool-arg",
        env = "YTGRAB_TOOL_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub tool_args: Vec<String>,

    /// Files in the output directory older than this are swept before each job.
    #[arg(long, env = "YTGRAB_MAX_FILE_AGE_SECS", default_value_t = 3600)]
    pub max_file_age_secs: u64,

    /// How long shutdown waits for running downloads before killing them.
    #[arg(long, env = "YTGRAB_SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Fail a job whose process succeeded but left no output file,
    /// instead of completing it with a placeholder name.
    #[arg(long, env = "YTGRAB_STRICT_OUTPUT")]
    pub strict_output: bool,

    #[arg(long, env = "YTGRAB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn tool(&self) -> ToolCommand {
        ToolCommand::new(&self.tool_program).with_base_args(self.tool_args.clone())
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            tool: self.tool(),
            output_dir: OutputDir::new(&self.output_dir),
            max_file_age: Duration::from_secs(self.max_file_age_secs),
            strict_output: self.strict_output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["ytgrab"]).unwrap();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
        assert_eq!(config.tool_program, "yt-dlp");
        assert!(config.tool_args.is_empty());
        assert_eq!(config.max_file_age_secs, 3600);
        assert!(!config.strict_output);
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_python_module_invocation() {
        let config = Config::try_parse_from([
            "ytgrab",
            "--tool-program",
            "python",
            "--tool-arg",
            "-m,yt_dlp",
            "--port",
            "8080",
        ])
        .unwrap();
        assert_eq!(config.tool_args, vec!["-m".to_string(), "yt_dlp".to_string()]);
        assert_eq!(config.port(), 8080);
        assert_eq!(config.tool().program(), "python");
    }

    #[test]
    fn test_runner_config_conversion() {
        let config = Config::try_parse_from([
            "ytgrab",
            "--output-dir",
            "/tmp/out",
            "--max-file-age-secs",
            "60",
            "--strict-output",
        ])
        .unwrap();
        let runner = config.runner_config();
        assert_eq!(runner.output_dir.path(), std::path::Path::new("/tmp/out"));
        assert_eq!(runner.max_file_age, Duration::from_secs(60));
        assert!(runner.strict_output);
    }
}
