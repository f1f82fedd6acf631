//! Ingestion feed: discovers source files and splits them into chunks.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::IngestSettings;
use crate::types::{ChunkMetadata, DocumentChunk};

/// Tails shorter than this past the overlap point are not re-emitted.
const MIN_TAIL_CHARS: usize = 50;

const SENTENCE_ENDS: [&str; 3] = [". ", "! ", "? "];

#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    settings: IngestSettings,
}

impl DataProcessor {
    pub fn new(settings: IngestSettings) -> Self { Self { settings } }

    pub fn settings(&self) -> &IngestSettings { &self.settings }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        self.process_files(data_dir, self.list_matching_files(data_dir)?)
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<DocumentChunk>> {
        let mut files = self.list_matching_files(data_dir)?;
        if files.len() > limit {
            files.truncate(limit);
            tracing::info!(limit, "limited ingestion to first files");
        }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<DocumentChunk>> {
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), pattern = %self.settings.pattern, "no matching files");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!("processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let content = self.read_file_content(file_path)?;
            all_chunks.extend(self.chunk_file(data_dir, file_path, &content));
        }
        tracing::info!(files = files.len(), chunks = all_chunks.len(), "processed source files");
        Ok(all_chunks)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(file_path).with_context(|| format!("reading {}", file_path.display()))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
        }
    }

    /// Chunks one file's content and attaches metadata. Ids are
    /// `<path relative to data_dir>:<chunk index>`.
    pub fn chunk_file(&self, data_dir: &Path, file_path: &Path, content: &str) -> Vec<DocumentChunk> {
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        let pieces = chunk_text(content, self.settings.chunk_size, self.settings.chunk_overlap);
        let total_chunks = pieces.len();
        let filename = file_path.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let extension = file_path.extension().map(|s| format!(".{}", s.to_string_lossy())).unwrap_or_default();
        let directory = file_path.parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                id: format!("{}:{}", relative_path.display(), chunk_index),
                content,
                metadata: ChunkMetadata {
                    source: file_path.to_string_lossy().to_string(),
                    filename: filename.clone(),
                    extension: extension.clone(),
                    directory: directory.clone(),
                    chunk_index,
                    total_chunks,
                },
            })
            .collect()
    }

    fn list_matching_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let pattern = glob::Pattern::new(&self.settings.pattern)
            .with_context(|| format!("invalid file pattern '{}'", self.settings.pattern))?;
        let options = glob::MatchOptions { require_literal_separator: true, ..glob::MatchOptions::default() };
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            let relative_path = path.strip_prefix(root).unwrap_or(path);
            if pattern.matches_path_with(relative_path, options) { files.push(path.to_path_buf()); }
        }
        files.sort();
        Ok(files)
    }
}

/// Splits `text` into windows of at most `size` characters overlapping by
/// `overlap`. A window is cut at the last paragraph break or sentence end in
/// its second half, otherwise at its last space.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= size {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let window_end = (start + size).min(len);
        let mut end = window_end;
        let half = start + size / 2;
        if end < len {
            if let Some(pos) = rfind(&chars, "\n\n", start, end).filter(|&p| p > half) {
                end = pos + 2;
            }
        }
        if end < len && end == window_end {
            let sentence_end = SENTENCE_ENDS.iter().filter_map(|pat| rfind(&chars, pat, start, end)).max();
            if let Some(pos) = sentence_end.filter(|&p| p > half) {
                end = pos + 2;
            }
        }
        if end < len && end == window_end {
            if let Some(pos) = rfind(&chars, " ", start, end).filter(|&p| p > start) {
                end = pos + 1;
            }
        }
        chunks.push(chars[start..end].iter().collect());
        if end >= len {
            break;
        }
        start = (start + 1).max(end.saturating_sub(overlap));
        if start > end.saturating_sub(MIN_TAIL_CHARS) {
            start = end;
        }
    }
    chunks
}

/// Last index `i` in `[start, end)` where `pat` occurs entirely before `end`.
fn rfind(chars: &[char], pat: &str, start: usize, end: usize) -> Option<usize> {
    let pat: Vec<char> = pat.chars().collect();
    if end < start + pat.len() {
        return None;
    }
    (start..=end - pat.len()).rev().find(|&i| chars[i..i + pat.len()] == pat[..])
}
