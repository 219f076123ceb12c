use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::language::Language;

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch translate subtitle files in media subfolders using ollama", long_about = None)]
pub struct Args {
    /// Root directory containing one subfolder per media item
    pub root: PathBuf,

    /// Full target language name used in prompts (e.g. French)
    pub target_language_name: String,

    /// Short target language code used in file names (e.g. fr for sub_fr.srt)
    pub target_language_code: String,

    /// Full source language name [default: English]
    #[arg(long)]
    pub source_language_name: Option<String>,

    /// Short source language code used to find source files [default: en]
    #[arg(long)]
    pub source_language_code: Option<String>,

    /// Ollama model [default: qwen3:30b-a3b]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama URL, server root or full /api/generate URL [default: http://127.0.0.1:11434]
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Timeout of one translation request in seconds [default: 180]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Translate even if the target subtitle file already exists
    #[arg(long)]
    pub force: bool,

    /// Do not stop early for folders whose target subtitle file already exists
    #[arg(long)]
    pub no_skip_if_target_exists: bool,

    /// Number of media folders processed in parallel [default: 3]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Do not check that the model is available before starting
    #[arg(long)]
    pub skip_backend_check: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

impl Args {
    pub fn target_language(&self) -> Language {
        Language::new(&self.target_language_name, &self.target_language_code)
    }

    /// Override configuration values with the ones given on the command line
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(name) = &self.source_language_name {
            config.batch.source.name = name.clone();
        }
        if let Some(code) = &self.source_language_code {
            config.batch.source.code = code.clone();
        }
        if let Some(model) = &self.model {
            config.translate.model = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.translate.endpoint = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.translate.timeout_secs = timeout;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if self.force {
            config.batch.force = true;
        }
        if self.no_skip_if_target_exists {
            config.batch.skip_if_target_exists = false;
        }
        if self.no_progress {
            config.batch.show_progress = false;
        }
        if self.skip_backend_check {
            config.batch.check_backend = false;
        }
    }
}
