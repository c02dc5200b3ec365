//! Course material loading.
//!
//! Reads `.txt` / `.md` files (or a directory of them) into [`ContentChunk`]s,
//! splitting long documents at paragraph boundaries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::ContentChunk;

const CONTENT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Default upper bound on characters per chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 6000;

/// Load a file, or every content file directly inside a directory.
///
/// Directory entries are visited in file-name order so chunk ids are stable.
pub fn load_content(path: &Path, max_chunk_chars: usize) -> Result<Vec<ContentChunk>> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .with_context(|| format!("failed to read directory: {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_content_file(p))
            .collect();
        files.sort();

        let mut chunks = Vec::new();
        for file in &files {
            chunks.extend(load_file(file, max_chunk_chars)?);
        }
        if chunks.is_empty() {
            tracing::warn!("no content files found in {}", path.display());
        }
        Ok(chunks)
    } else {
        load_file(path, max_chunk_chars)
    }
}

/// Load every path in order, concatenating the chunks.
pub fn load_all(paths: &[PathBuf], max_chunk_chars: usize) -> Result<Vec<ContentChunk>> {
    let mut chunks = Vec::new();
    for path in paths {
        chunks.extend(load_content(path, max_chunk_chars)?);
    }
    Ok(chunks)
}

fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CONTENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

fn load_file(path: &Path, max_chunk_chars: usize) -> Result<Vec<ContentChunk>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file: {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("content");
    Ok(chunk_document(&slug(stem), &text, max_chunk_chars))
}

/// Split a document into chunks of roughly `max_chars` characters.
///
/// Paragraphs (blank-line separated, `\n` or `\r\n` line endings) are kept
/// whole unless a single paragraph is itself longer than the limit, in which
/// case it is split at word boundaries. Words are never cut, so a single word
/// longer than `max_chars` becomes an oversized chunk of its own. A single
/// resulting chunk keeps `id` as is; several are numbered `id-1`, `id-2`, ...
pub fn chunk_document(id: &str, text: &str, max_chars: usize) -> Vec<ContentChunk> {
    let text = text.replace("\r\n", "\n");
    let text = text.as_str();
    let topic = first_heading(text);
    let max_chars = max_chars.max(1);

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        for part in split_long(paragraph, max_chars) {
            let extra = if current.is_empty() { 0 } else { 2 };
            if !current.is_empty() && char_len(&current) + extra + char_len(&part) > max_chars {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&part);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    let numbered = pieces.len() > 1;
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            let chunk_id = if numbered {
                format!("{id}-{}", i + 1)
            } else {
                id.to_string()
            };
            let chunk = ContentChunk::new(chunk_id, piece);
            match &topic {
                Some(t) => chunk.with_topic(t.clone()),
                None => chunk,
            }
        })
        .collect()
}

fn split_long(paragraph: &str, max_chars: usize) -> Vec<String> {
    if char_len(paragraph) <= max_chars {
        return vec![paragraph.to_string()];
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        if !current.is_empty() && char_len(&current) + 1 + char_len(word) > max_chars {
            parts.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn first_heading(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| l.starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
}

fn slug(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "content".to_string()
    } else {
        trimmed.to_string()
    }
}
