// crates/core/src/output/mod.rs
//! Extraction of job state from the external downloader's output.
//!
//! The downloader has no structured progress channel in the mode we run it,
//! so state is scraped from its human-readable text. That coupling lives
//! entirely behind [`OutputParser`]; the runner only sees [`ParsedOutput`].

pub mod line_buffer;
pub mod ytdlp;

pub use line_buffer::LineBuffer;
pub use ytdlp::{parse_filename, parse_progress, YtDlpTextParser};

/// What one block of output told us. Both fields empty is the normal case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Last progress percentage seen, rounded into `0..=100`.
    pub progress: Option<u8>,
    /// Last output file named, without directory components.
    pub filename: Option<String>,
}

/// Stateless extraction over a block of text that may hold several lines.
///
/// Implementations never fail: unmatched input yields `None`.
pub trait OutputParser: Send + Sync + 'static {
    fn progress(&self, text: &str) -> Option<u8>;

    fn filename(&self, text: &str) -> Option<String>;

    fn parse(&self, text: &str) -> ParsedOutput {
        ParsedOutput {
            progress: self.progress(text),
            filename: self.filename(text),
        }
    }
}
