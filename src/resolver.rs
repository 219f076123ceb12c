//! Per-folder resolution: decide whether a media folder needs translation,
//! which subtitle file to translate from, and where the result goes.
//!
//! A folder reaches its completed state when `sub_<code>.srt` exists. A
//! correctly labelled file under another name (`movie.fr.srt`) is renamed into
//! place instead of being translated again.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::language::Language;
use crate::subtitle::SUBTITLE_EXTENSION;

/// Separators that must precede a language token in a file name. The token
/// itself must be followed by a dot.
const TOKEN_PREFIXES: [&str; 4] = [".", "-", "sub_", "sub."];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Language code guessed from the file name, not the content
    pub language_hint: Option<String>,
}

impl SubtitleFile {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let language_hint = language_hint(&file_name);

        Self {
            path,
            file_name,
            language_hint,
        }
    }

    pub fn matches(&self, token: &str) -> bool {
        matches_language_token(&self.file_name, token)
    }
}

/// Policy flags of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePolicy {
    pub force: bool,
    pub skip_if_target_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPair {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Result of resolving one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The folder holds no subtitle files
    NoSubtitles,
    /// The canonical target file is already present
    TargetExists,
    /// A file already in the target language was renamed to the canonical path
    Renamed { from: PathBuf },
    /// No file qualifies as translation source
    NoSource,
    /// The only source is the target itself and translation is not forced
    SourceIsTarget,
    Translate(TranslationPair),
}

/// Whether `file_name` carries `token` as a delimited language label, e.g.
/// `movie.fr.srt`, `movie-fr.srt`, `sub_fr.srt` or `sub.fr.srt` for `fr`.
/// Case-insensitive. `africa.srt` does not match `fr`.
pub fn matches_language_token(file_name: &str, token: &str) -> bool {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return false;
    }

    let name = file_name.to_lowercase();
    TOKEN_PREFIXES
        .iter()
        .any(|prefix| name.contains(&format!("{}{}.", prefix, token)))
}

/// Short alphabetic token right before the extension, lowercased
pub fn language_hint(file_name: &str) -> Option<String> {
    let (stem, _) = file_name.rsplit_once('.')?;
    let token = stem.rsplit(&['.', '-', '_'][..]).next()?;

    if token != stem && (2..=3).contains(&token.len()) && token.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(token.to_lowercase())
    } else {
        None
    }
}

pub fn canonical_target_path(folder: &Path, target_code: &str) -> PathBuf {
    folder.join(format!("sub_{}.{}", target_code, SUBTITLE_EXTENSION))
}

/// Subtitle files directly inside `folder`, sorted by file name
pub async fn list_subtitle_files(folder: &Path) -> Result<Vec<SubtitleFile>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(folder).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_subtitle = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SUBTITLE_EXTENSION));
        if !is_subtitle {
            continue;
        }
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => files.push(SubtitleFile::new(path)),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// Pick the translation source.
///
/// Files labelled with the source code win, then any file not labelled with
/// the target code. The canonical target itself is only considered when
/// `force` is set and nothing else qualifies.
pub fn select_source<'a>(
    files: &'a [SubtitleFile],
    target_path: &Path,
    source: &Language,
    target: &Language,
    force: bool,
) -> Option<&'a SubtitleFile> {
    let eligible = || files.iter().filter(|f| !f.matches(&target.code));

    eligible()
        .find(|f| f.matches(&source.code))
        .or_else(|| eligible().next())
        .or_else(|| {
            if force {
                files.iter().find(|f| f.path == target_path)
            } else {
                None
            }
        })
}

/// Resolve one folder to the action needed to complete it
pub async fn resolve_folder(
    folder: &Path,
    job_name: &str,
    target: &Language,
    source: &Language,
    policy: ResolvePolicy,
) -> Result<Resolution> {
    let mut files = list_subtitle_files(folder).await?;
    if files.is_empty() {
        info!("[{}] No subtitle files found", job_name);
        return Ok(Resolution::NoSubtitles);
    }
    debug!(
        "[{}] Subtitle files: {:?}",
        job_name,
        files
            .iter()
            .map(|f| (f.file_name.as_str(), f.language_hint.as_deref()))
            .collect::<Vec<_>>()
    );

    let target_path = canonical_target_path(folder, &target.code);
    let target_name = target_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut target_exists = fs::try_exists(&target_path).await.unwrap_or(false);

    if target_exists {
        if policy.force {
            info!("[{}] {} exists, but force is set. Re-translating", job_name, target_name);
        } else if policy.skip_if_target_exists {
            info!("[{}] {} already exists. Skipping", job_name, target_name);
            return Ok(Resolution::TargetExists);
        }
    }

    let candidates: Vec<SubtitleFile> = files
        .iter()
        .filter(|f| f.path != target_path && (f.matches(&target.code) || f.matches(&target.name)))
        .cloned()
        .collect();

    match candidates.as_slice() {
        [] => {}
        [candidate] => {
            info!(
                "[{}] Found subtitle likely in {}: {}",
                job_name, target.name, candidate.file_name
            );
            if target_exists {
                if policy.force {
                    info!(
                        "[{}] {} also exists. Not renaming, translating because force is set",
                        job_name, target_name
                    );
                } else {
                    info!(
                        "[{}] {} also exists. Not renaming {}",
                        job_name, target_name, candidate.file_name
                    );
                }
            } else {
                match fs::rename(&candidate.path, &target_path).await {
                    Ok(()) => {
                        info!("[{}] Renamed {} to {}", job_name, candidate.file_name, target_name);
                        if !policy.force {
                            return Ok(Resolution::Renamed {
                                from: candidate.path.clone(),
                            });
                        }
                        info!("[{}] Force is set, looking for a source to re-translate", job_name);
                        target_exists = true;
                        files = list_subtitle_files(folder).await?;
                    }
                    Err(e) => {
                        warn!(
                            "[{}] Could not rename {} to {}: {}",
                            job_name, candidate.file_name, target_name, e
                        );
                    }
                }
            }
        }
        many => {
            warn!(
                "[{}] {} files look like {} subtitles ({}). Ambiguous, not renaming",
                job_name,
                many.len(),
                target.name,
                many.iter()
                    .map(|f| f.file_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    if target_exists && !policy.force {
        info!(
            "[{}] {} is present and force is not set. Skipping translation",
            job_name, target_name
        );
        return Ok(Resolution::TargetExists);
    }

    let Some(source_file) = select_source(&files, &target_path, source, target, policy.force) else {
        info!(
            "[{}] No suitable source subtitle found (to {}, from {})",
            job_name, target.name, source.name
        );
        return Ok(Resolution::NoSource);
    };

    if source_file.path == target_path && !policy.force {
        info!(
            "[{}] Source {} is the target itself and force is not set. Skipping",
            job_name, source_file.file_name
        );
        return Ok(Resolution::SourceIsTarget);
    }

    info!(
        "[{}] Translating {} to {}",
        job_name, source_file.file_name, target_name
    );
    Ok(Resolution::Translate(TranslationPair {
        source: source_file.path.clone(),
        target: target_path,
    }))
}
