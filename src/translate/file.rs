use std::path::Path;

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::error::{Result, SubbatchError};
use crate::language::Language;
use crate::subtitle::{read_srt, write_srt, SubtitleUnit};
use super::backend::{translate_unit, TranslationBackend};

/// What happened to the units of one translated file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub units: usize,
    pub translated: usize,
    pub blank: usize,
    pub kept_original: usize,
}

/// Translate one subtitle file into `target_path`.
///
/// Units are translated one after another in document order. A unit whose
/// backend call yields no result keeps its original text; only unreadable
/// input, an empty document or a failed write fail the file.
pub async fn translate_file(
    backend: &dyn TranslationBackend,
    job_name: &str,
    source_path: &Path,
    target_path: &Path,
    source: &Language,
    target: &Language,
    progress: &ProgressBar,
) -> Result<FileReport> {
    let file_name = display_name(source_path);
    let units = read_srt(source_path).await?;
    if units.is_empty() {
        return Err(SubbatchError::EmptySubtitle(source_path.to_path_buf()));
    }

    info!(
        "[{}] Translating {} ({} units) to {}",
        job_name,
        file_name,
        units.len(),
        target.name
    );
    progress.set_length(units.len() as u64);
    progress.set_position(0);
    progress.set_message(job_name.to_string());

    let mut report = FileReport {
        units: units.len(),
        ..FileReport::default()
    };
    let mut translated_units: Vec<SubtitleUnit> = Vec::with_capacity(units.len());

    for unit in units {
        if unit.is_blank() {
            report.blank += 1;
            translated_units.push(unit);
            progress.inc(1);
            continue;
        }

        debug!("[{}] ┌─ Unit {} source: {}", job_name, unit.index, unit.text);
        match translate_unit(backend, &unit.text, source, target).await {
            Some(translation) => {
                debug!("[{}] └─ Unit {} target: {}", job_name, unit.index, translation);
                report.translated += 1;
                translated_units.push(unit.with_text(translation));
            }
            None => {
                warn!(
                    "[{}] Failed to translate unit {} of {} ({:?}), keeping original",
                    job_name,
                    unit.index,
                    file_name,
                    preview(&unit.text)
                );
                report.kept_original += 1;
                translated_units.push(unit);
            }
        }
        progress.inc(1);
    }

    write_srt(&translated_units, target_path).await?;
    info!(
        "[{}] Saved {} ({} translated, {} blank, {} kept original)",
        job_name,
        target_path.display(),
        report.translated,
        report.blank,
        report.kept_original
    );

    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}
