//! Subbatch - Batch Subtitle Translation
//!
//! Translates the subtitle files of a media library, one folder per media
//! item, into a single target language using an ollama model. Each folder
//! ends with a `sub_<code>.srt` file, produced by renaming an already
//! translated file when one exists, or by translating a source file unit by
//! unit otherwise.

pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod resolver;
pub mod subtitle;
pub mod translate;
pub mod workflow;
