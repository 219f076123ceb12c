use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SubbatchError};
use crate::language::Language;
use crate::resolver::{resolve_folder, ResolvePolicy, Resolution};
use crate::translate::{translate_file, FileReport, TranslationBackend};

/// One media folder to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub path: PathBuf,
    pub name: String,
}

impl Job {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

/// How one job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    NoSubtitles,
    TargetExists,
    Renamed,
    NoSource,
    SourceIsTarget,
    Translated(FileReport),
    Failed(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSubtitles => write!(f, "no subtitles"),
            Self::TargetExists => write!(f, "skipped, target present"),
            Self::Renamed => write!(f, "renamed existing subtitle"),
            Self::NoSource => write!(f, "no source subtitle"),
            Self::SourceIsTarget => write!(f, "source is target"),
            Self::Translated(report) => write!(
                f,
                "translated {}/{} units",
                report.translated,
                report.units - report.blank
            ),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Aggregate counts of a run. `skipped` includes `renamed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs: usize,
    pub translated: usize,
    pub skipped: usize,
    pub renamed: usize,
    pub no_op: usize,
    pub failed: usize,
    pub units_kept_original: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &JobOutcome) {
        self.jobs += 1;
        match outcome {
            JobOutcome::TargetExists => self.skipped += 1,
            JobOutcome::Renamed => {
                self.skipped += 1;
                self.renamed += 1;
            }
            JobOutcome::NoSubtitles | JobOutcome::NoSource | JobOutcome::SourceIsTarget => {
                self.no_op += 1
            }
            JobOutcome::Translated(report) => {
                self.translated += 1;
                self.units_kept_original += report.kept_original;
            }
            JobOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} folder(s): {} translated, {} skipped ({} by rename), {} no-op, {} failed; {} unit(s) left untranslated",
            self.jobs,
            self.translated,
            self.skipped,
            self.renamed,
            self.no_op,
            self.failed,
            self.units_kept_original
        )
    }
}

/// Everything a job task needs, owned so the task can be spawned
#[derive(Clone)]
struct JobContext {
    backend: Arc<dyn TranslationBackend>,
    source: Language,
    target: Language,
    policy: ResolvePolicy,
}

pub struct Workflow {
    config: Config,
    target: Language,
    backend: Arc<dyn TranslationBackend>,
}

impl Workflow {
    pub fn new(config: Config, target: Language, backend: Arc<dyn TranslationBackend>) -> Self {
        Self {
            config,
            target,
            backend,
        }
    }

    /// Translate every media folder directly under `root`.
    ///
    /// Folders are processed by at most `workers` concurrent tasks. A folder
    /// that fails, or whose task panics, is counted and does not affect the
    /// others.
    pub async fn run<P: AsRef<Path>>(&self, root: P) -> Result<RunSummary> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SubbatchError::RootNotFound(root.to_path_buf()));
        }
        let root = root.canonicalize()?;

        let jobs = discover_jobs(&root);
        if jobs.is_empty() {
            info!("No media folders found in {}", root.display());
            return Ok(RunSummary::default());
        }

        let workers = self.config.batch.workers.max(1);
        info!(
            "Found {} media folders. Processing up to {} in parallel",
            jobs.len(),
            workers
        );

        let multi = if self.config.batch.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let overall = multi.add(ProgressBar::new(jobs.len() as u64));
        overall.set_style(bar_style());
        overall.set_message("folders");

        let context = JobContext {
            backend: Arc::clone(&self.backend),
            source: self.config.batch.source.clone(),
            target: self.target.clone(),
            policy: ResolvePolicy {
                force: self.config.batch.force,
                skip_if_target_exists: self.config.batch.skip_if_target_exists,
            },
        };

        let outcomes: Vec<(String, JobOutcome)> = stream::iter(jobs)
            .map(|job| {
                let context = context.clone();
                let progress = multi.insert_before(&overall, ProgressBar::new(0));
                progress.set_style(bar_style());
                async move {
                    let name = job.name.clone();
                    let outcome = match tokio::spawn(process_job(job, context, progress)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("[{}] Processing task aborted: {}", name, e);
                            JobOutcome::Failed(format!("task aborted: {}", e))
                        }
                    };
                    (name, outcome)
                }
            })
            .buffer_unordered(workers)
            .inspect(|_| overall.inc(1))
            .collect()
            .await;
        overall.finish_and_clear();

        let mut summary = RunSummary::default();
        for (name, outcome) in &outcomes {
            if let JobOutcome::Failed(reason) = outcome {
                warn!("[{}] Failed: {}", name, reason);
            }
            summary.record(outcome);
        }

        info!("Finished: {}", summary);
        Ok(summary)
    }
}

/// Immediate subdirectories of `root`, sorted by name
pub fn discover_jobs(root: &Path) -> Vec<Job> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| Job::new(entry.into_path()))
        .collect()
}

async fn process_job(job: Job, context: JobContext, progress: ProgressBar) -> JobOutcome {
    info!("[{}] --- Starting processing ---", job.name);

    let resolution = resolve_folder(
        &job.path,
        &job.name,
        &context.target,
        &context.source,
        context.policy,
    )
    .await;

    let outcome = match resolution {
        Ok(Resolution::NoSubtitles) => JobOutcome::NoSubtitles,
        Ok(Resolution::TargetExists) => JobOutcome::TargetExists,
        Ok(Resolution::Renamed { .. }) => JobOutcome::Renamed,
        Ok(Resolution::NoSource) => JobOutcome::NoSource,
        Ok(Resolution::SourceIsTarget) => JobOutcome::SourceIsTarget,
        Ok(Resolution::Translate(pair)) => {
            match translate_file(
                context.backend.as_ref(),
                &job.name,
                &pair.source,
                &pair.target,
                &context.source,
                &context.target,
                &progress,
            )
            .await
            {
                Ok(report) => JobOutcome::Translated(report),
                Err(e) => {
                    error!("[{}] {}", job.name, e);
                    JobOutcome::Failed(e.to_string())
                }
            }
        }
        Err(e) => {
            error!("[{}] Could not resolve folder: {}", job.name, e);
            JobOutcome::Failed(e.to_string())
        }
    };

    progress.finish_and_clear();
    info!("[{}] --- Finished processing ({}) ---", job.name, outcome);
    outcome
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}
