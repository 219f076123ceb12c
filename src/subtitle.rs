use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, SubbatchError};

/// Standard extension of the subtitle format handled by this crate
pub const SUBTITLE_EXTENSION: &str = "srt";

static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{3})")
        .expect("timing regex is valid")
});

/// One timed subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleUnit {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl SubtitleUnit {
    /// Same timing and index, different text
    pub fn with_text(&self, text: String) -> Self {
        Self {
            index: self.index,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            text,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Read and parse an SRT file. Unreadable and malformed files are both
/// reported as parse errors.
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleUnit>> {
    let path = path.as_ref();
    let parse_err = |reason: String| SubbatchError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path)
        .await
        .map_err(|e| parse_err(format!("read failed: {}", e)))?;
    let content = String::from_utf8(bytes)
        .map_err(|e| parse_err(format!("not valid UTF-8: {}", e)))?;

    let units = parse_srt(&content).map_err(parse_err)?;
    debug!("Parsed {} subtitle units from {}", units.len(), path.display());
    Ok(units)
}

/// Parse SRT content into units, keeping indices as written
pub fn parse_srt(content: &str) -> std::result::Result<Vec<SubtitleUnit>, String> {
    let content = content.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = content.lines().collect();

    let mut units = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }

        let index = lines[i].trim().parse::<usize>().map_err(|_| {
            format!("line {}: expected subtitle index, found {:?}", i + 1, lines[i])
        })?;
        let timing = lines
            .get(i + 1)
            .ok_or_else(|| format!("line {}: missing timing line for entry {}", i + 2, index))?;
        let (start_ms, end_ms) = parse_timing(timing)
            .ok_or_else(|| format!("line {}: invalid timing line {:?}", i + 2, timing))?;
        i += 2;

        let mut text_lines: Vec<&str> = Vec::new();
        while i < lines.len() {
            if lines[i].trim().is_empty() {
                // Blank lines end the entry only when a new entry or EOF follows
                let mut next = i;
                while next < lines.len() && lines[next].trim().is_empty() {
                    next += 1;
                }
                if next >= lines.len() || starts_entry(&lines, next) {
                    i = next;
                    break;
                }
                text_lines.extend_from_slice(&lines[i..next]);
                i = next;
                continue;
            }
            text_lines.push(lines[i]);
            i += 1;
        }

        units.push(SubtitleUnit {
            index,
            start_ms,
            end_ms,
            text: text_lines.join("\n"),
        });
    }

    Ok(units)
}

fn starts_entry(lines: &[&str], at: usize) -> bool {
    lines[at].trim().parse::<usize>().is_ok()
        && lines.get(at + 1).is_some_and(|l| parse_timing(l).is_some())
}

fn parse_timing(line: &str) -> Option<(u64, u64)> {
    let caps = TIMING_REGEX.captures(line)?;
    let field = |n: usize| caps.get(n).and_then(|m| m.as_str().parse::<u64>().ok());

    let start = to_millis(field(1)?, field(2)?, field(3)?, field(4)?);
    let end = to_millis(field(5)?, field(6)?, field(7)?, field(8)?);
    Some((start, end))
}

fn to_millis(hours: u64, minutes: u64, seconds: u64, millis: u64) -> u64 {
    hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis
}

/// Compose units into SRT text in the given order
pub fn compose_srt(units: &[SubtitleUnit]) -> String {
    let mut srt_content = String::new();

    for unit in units {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            unit.index,
            format_srt_time(unit.start_ms),
            format_srt_time(unit.end_ms),
            unit.text
        ));
    }

    srt_content
}

/// Compose units and replace `output_path` atomically: the document is written
/// to a temporary file next to it and then renamed over it.
pub async fn write_srt<P: AsRef<Path>>(units: &[SubtitleUnit], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref().to_path_buf();
    let content = compose_srt(units);

    let target = output_path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&target, content.as_bytes()))
        .await
        .map_err(|e| SubbatchError::Write {
            path: output_path.clone(),
            source: std::io::Error::other(e),
        })??;

    debug!("Wrote {} subtitle units to {}", units.len(), output_path.display());
    Ok(())
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| SubbatchError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".subbatch-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(data).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Format milliseconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(total_milliseconds: u64) -> String {
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
