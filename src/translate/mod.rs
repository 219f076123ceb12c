// Translation of subtitle files through a text-generation backend
//
// - backend: backend trait, response classification and per-unit translation
// - ollama: backend implementation for the ollama generate API
// - sanitize: cleanup of raw completions into subtitle text
// - file: per-file translation of subtitle units

pub mod backend;
pub mod file;
pub mod ollama;
pub mod sanitize;

pub use backend::{translate_unit, BackendResponse, TranslationBackend};
pub use file::{translate_file, FileReport};
pub use ollama::OllamaBackend;
pub use sanitize::sanitize_response;
