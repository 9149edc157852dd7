// crates/core/src/output/ytdlp.rs
//! Text scraper for yt-dlp's `--newline` console output.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::OutputParser;

static PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("valid progress regex"));

/// `[download] Destination: /out/Title.mp4`
static DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\] Destination: (.+)").expect("valid destination regex")
});

/// `[download] /out/Title.mp4 has already been downloaded`
static ALREADY_DOWNLOADED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\] (.+?) has already been downloaded")
        .expect("valid already-downloaded regex")
});

/// `[Merger] Merging formats into "/out/Title.mp4"`
static MERGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[Merger\] Merging formats into "(.+)""#).expect("valid merger regex")
});

/// [`OutputParser`] for yt-dlp's human-readable output.
#[derive(Debug, Clone, Copy, Default)]
pub struct YtDlpTextParser;

impl OutputParser for YtDlpTextParser {
    fn progress(&self, text: &str) -> Option<u8> {
        parse_progress(text)
    }

    fn filename(&self, text: &str) -> Option<String> {
        parse_filename(text)
    }
}

/// Last `<digits>[.<digits>]%` in `text`, rounded and clamped to `0..=100`.
pub fn parse_progress(text: &str) -> Option<u8> {
    PROGRESS
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .last()
        .map(|pct| pct.round().clamp(0.0, 100.0) as u8)
}

/// Last output file named in `text`, stripped to its bare file name.
pub fn parse_filename(text: &str) -> Option<String> {
    text.split(['\n', '\r'])
        .filter_map(|line| {
            [&*DESTINATION, &*ALREADY_DOWNLOADED, &*MERGER]
                .into_iter()
                .find_map(|re| re.captures(line)?.get(1).map(|m| m.as_str()))
        })
        .filter_map(base_name)
        .last()
}

fn base_name(path: &str) -> Option<String> {
    let path = path.trim().trim_matches('"');
    let name = path.rsplit(['/', '\\']).next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}
