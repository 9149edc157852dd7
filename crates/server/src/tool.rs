// crates/server/src/tool.rs
//! Invocation of the external yt-dlp downloader.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// How long the availability probe waits for `--version`.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:91.0) Gecko/20100101 Firefox/91.0";

/// Fixed download policy: up to 720p mp4 with fallbacks, mp4 container,
/// relaxed certificate checks, spoofed UA, bounded retries and timeouts,
/// geo bypass, and one progress line per update.
const POLICY_ARGS: &[&str] = &[
    "-f",
    "best[height<=720][ext=mp4]/best[ext=mp4]/best",
    "--merge-output-format",
    "mp4",
    "--no-check-certificates",
    "--user-agent",
    USER_AGENT,
    "--extractor-retries",
    "3",
    "--fragment-retries",
    "3",
    "--retry-sleep",
    "1",
    "--socket-timeout",
    "30",
    "--geo-bypass",
    "--newline",
];

/// The downloader executable plus any leading arguments
/// (`python -m yt_dlp` is `program = "python"`, `base_args = ["-m", "yt_dlp"]`).
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    base_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_base_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector for downloading `url` into `output_template`.
    ///
    /// `--` precedes the URL so a value starting with `-` is never taken
    /// as an option.
    pub fn download_args(&self, output_template: &Path, url: &str) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(POLICY_ARGS.iter().map(|s| s.to_string()));
        args.push("-o".to_string());
        args.push(output_template.to_string_lossy().into_owned());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Ready-to-spawn download process with piped stdout/stderr.
    pub fn download(&self, output_template: &Path, url: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.download_args(output_template, url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Whether the downloader runs at all: `--version` exits 0 within `timeout`.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let status = Command::new(&self.program)
            .args(&self.base_args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(timeout, status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::warn!(program = %self.program, error = %e, "downloader probe: failed to spawn");
                false
            }
            Err(_) => {
                tracing::warn!(program = %self.program, timeout_secs = timeout.as_secs(), "downloader probe: timed out");
                false
            }
        }
    }
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_download_args_layout() {
        let tool = ToolCommand::new("python").with_base_args(["-m", "yt_dlp"]);
        let args = tool.download_args(Path::new("/out/%(title)s.%(ext)s"), "https://v.example/1");

        assert_eq!(&args[..2], &["-m", "yt_dlp"]);
        assert_eq!(
            &args[args.len() - 4..],
            &["-o", "/out/%(title)s.%(ext)s", "--", "https://v.example/1"]
        );
    }

    #[test]
    fn test_download_args_policy() {
        let args = ToolCommand::default().download_args(Path::new("/o/t"), "u");
        let joined = args.join(" ");
        assert!(joined.contains("-f best[height<=720][ext=mp4]/best[ext=mp4]/best"));
        assert!(joined.contains("--merge-output-format mp4"));
        assert!(joined.contains("--no-check-certificates"));
        assert!(joined.contains("--extractor-retries 3"));
        assert!(joined.contains("--fragment-retries 3"));
        assert!(joined.contains("--retry-sleep 1"));
        assert!(joined.contains("--socket-timeout 30"));
        assert!(joined.contains("--geo-bypass"));
        assert!(joined.contains("--newline"));
        let ua = args.iter().position(|a| a == "--user-agent").unwrap();
        assert_eq!(args[ua + 1], USER_AGENT);
    }

    #[test]
    fn test_url_cannot_inject_options() {
        let args = ToolCommand::default().download_args(Path::new("/o/t"), "--exec=rm -rf /");
        let dashdash = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[dashdash + 1], "--exec=rm -rf /");
        assert_eq!(dashdash + 2, args.len());
    }

    #[tokio::test]
    async fn test_probe_missing_program() {
        let tool = ToolCommand::new("/nonexistent/ytgrab-no-such-tool");
        assert!(!tool.probe(PROBE_TIMEOUT).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_exit_code() {
        assert!(ToolCommand::new("true").probe(PROBE_TIMEOUT).await);
        assert!(!ToolCommand::new("false").probe(PROBE_TIMEOUT).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_times_out() {
        let tool = ToolCommand::new("sh").with_base_args(["-c", "sleep 5", "probe"]);
        assert!(!tool.probe(Duration::from_millis(100)).await);
    }
}
