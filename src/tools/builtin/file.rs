//! File tools: read, list and edit.
//!
//! Paths are taken as given and resolved against the process working
//! directory. New files are written with mode 0644 and new directories with
//! mode 0755.

use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::diff::{diff_lines, diff_text};
use crate::error::ToolError;
use crate::tools::tool::ToolOutput;

/// Maximum file size for reading (1MB).
const MAX_READ_SIZE: u64 = 1024 * 1024;

/// Maximum directory listing entries.
const MAX_DIR_ENTRIES: usize = 1000;

/// Directories that are listed but never descended into.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

// ── read_file ───────────────────────────────────────────────────────

pub const READ_FILE_DESCRIPTION: &str = "Read the contents of a given relative file path. Use this \
when you want to see what's inside a file. Do not use this with directory names.";

#[derive(Debug, Deserialize)]
pub struct ReadFileInput {
    pub path: String,
}

pub fn read_file_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "The relative path of a file in the working directory."
            }
        },
        "required": ["path"]
    })
}

pub async fn read_file(input: ReadFileInput) -> Result<ToolOutput, ToolError> {
    if input.path.is_empty() {
        return Err(ToolError::invalid("read_file", "path must not be empty"));
    }

    let metadata = fs::metadata(&input.path)
        .await
        .map_err(|e| ToolError::io(format!("cannot access {}", input.path), e))?;

    if metadata.len() > MAX_READ_SIZE {
        return Err(ToolError::TooLarge {
            path: input.path,
            size: metadata.len(),
            limit: MAX_READ_SIZE,
        });
    }

    let content = fs::read_to_string(&input.path)
        .await
        .map_err(|e| ToolError::io(format!("failed to read {}", input.path), e))?;

    Ok(ToolOutput::text(content))
}

// ── list_files ──────────────────────────────────────────────────────

pub const LIST_FILES_DESCRIPTION: &str = "List files and directories at a given path. If no path \
is provided, lists files in the current directory. Directories end with a slash.";

#[derive(Debug, Default, Deserialize)]
pub struct ListFilesInput {
    #[serde(default)]
    pub path: Option<String>,
}

pub fn list_files_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "Optional relative path to list files from. Defaults to current directory if not provided."
            }
        }
    })
}

pub async fn list_files(input: ListFilesInput) -> Result<ToolOutput, ToolError> {
    let root = input
        .path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let root = Path::new(&root);

    let mut entries = Vec::new();
    let truncated = walk(root, root, &mut entries).await?;

    let mut listing = serde_json::to_string(&entries)
        .map_err(|e| ToolError::io("failed to encode listing", e.into()))?;
    if truncated {
        listing.push_str(&format!(
            "\n\nListing truncated after {} entries. List a subdirectory to see more.",
            MAX_DIR_ENTRIES
        ));
    }
    Ok(ToolOutput::text(listing))
}

/// Depth-first walk in name order. Returns true when the entry cap was hit.
async fn walk(base: &Path, dir: &Path, entries: &mut Vec<String>) -> Result<bool, ToolError> {
    let mut reader = fs::read_dir(dir)
        .await
        .map_err(|e| ToolError::io(format!("failed to read directory {}", dir.display()), e))?;

    let mut children = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| ToolError::io(format!("failed to read entry in {}", dir.display()), e))?
    {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        children.push((entry.path(), is_dir));
    }
    children.sort();

    for (path, is_dir) in children {
        if entries.len() >= MAX_DIR_ENTRIES {
            return Ok(true);
        }

        let relative = path.strip_prefix(base).unwrap_or(&path).to_string_lossy();
        if !is_dir {
            entries.push(relative.into_owned());
            continue;
        }

        entries.push(format!("{}/", relative));
        let skipped = path
            .file_name()
            .is_some_and(|name| SKIPPED_DIRS.iter().any(|s| name == *s));
        if !skipped && Box::pin(walk(base, &path, entries)).await? {
            return Ok(true);
        }
    }

    Ok(false)
}

// ── edit_file ───────────────────────────────────────────────────────

pub const EDIT_FILE_DESCRIPTION: &str = "Make edits to a text file.\n\n\
Replaces every occurrence of 'old_str' with 'new_str' in the given file. 'old_str' and 'new_str' \
MUST be different from each other.\n\n\
If the file specified with path doesn't exist (or exists but is empty) and 'old_str' is empty, it \
will be given 'new_str' as its content.";

#[derive(Debug, Deserialize)]
pub struct EditFileInput {
    pub path: String,
    #[serde(default)]
    pub old_str: String,
    pub new_str: String,
}

pub fn edit_file_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "The path to the file"
            },
            "old_str": {
                "type": "string",
                "description": "Text to search for - must match exactly. Every occurrence is replaced. Leave empty to create a new file."
            },
            "new_str": {
                "type": "string",
                "description": "Text to replace old_str with"
            }
        },
        "required": ["path", "old_str", "new_str"]
    })
}

pub async fn edit_file(input: EditFileInput) -> Result<ToolOutput, ToolError> {
    if input.path.is_empty() {
        return Err(ToolError::invalid("edit_file", "path must not be empty"));
    }
    if input.old_str == input.new_str {
        return Err(ToolError::invalid(
            "edit_file",
            "old_str and new_str must be different",
        ));
    }

    let metadata = match fs::metadata(&input.path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound && input.old_str.is_empty() => {
            return create_file(&input.path, &input.new_str).await;
        }
        Err(e) => return Err(ToolError::io(format!("cannot access {}", input.path), e)),
    };

    // The diff table grows with the product of both line counts.
    if metadata.len() > MAX_READ_SIZE {
        return Err(ToolError::TooLarge {
            path: input.path,
            size: metadata.len(),
            limit: MAX_READ_SIZE,
        });
    }

    let old_content = fs::read_to_string(&input.path)
        .await
        .map_err(|e| ToolError::io(format!("failed to read {}", input.path), e))?;

    if input.old_str.is_empty() {
        if !old_content.is_empty() {
            return Err(ToolError::invalid(
                "edit_file",
                format!("old_str must not be empty when {} already has content", input.path),
            ));
        }
        return fill_empty_file(&input.path, &input.new_str).await;
    }

    let new_content = old_content.replace(&input.old_str, &input.new_str);
    if new_content == old_content {
        return Err(ToolError::NoMatch { path: input.path });
    }

    fs::write(&input.path, &new_content)
        .await
        .map_err(|e| ToolError::io(format!("failed to write {}", input.path), e))?;

    tracing::debug!(
        path = %input.path,
        replacements = old_content.matches(input.old_str.as_str()).count(),
        "Edited file"
    );

    Ok(ToolOutput::with_diff(
        "File updated successfully.",
        diff_text(&old_content, &new_content),
    ))
}

async fn create_file(path: &str, content: &str) -> Result<ToolOutput, ToolError> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dirs(parent)
            .await
            .map_err(|e| ToolError::io(format!("failed to create directory {}", parent.display()), e))?;
    }

    write_new_file(path, content)
        .await
        .map_err(|e| ToolError::io(format!("failed to create {}", path), e))?;

    tracing::debug!(path, bytes = content.len(), "Created file");

    let added: Vec<&str> = content.split('\n').collect();
    Ok(ToolOutput::with_diff(
        format!("Successfully created file {}", path),
        diff_lines(&[], &added),
    ))
}

/// An existing empty file takes `content` as a whole, like a new file.
async fn fill_empty_file(path: &str, content: &str) -> Result<ToolOutput, ToolError> {
    fs::write(path, content)
        .await
        .map_err(|e| ToolError::io(format!("failed to write {}", path), e))?;

    tracing::debug!(path, bytes = content.len(), "Filled empty file");

    let added: Vec<&str> = content.split('\n').collect();
    Ok(ToolOutput::with_diff(
        "File updated successfully.",
        diff_lines(&[], &added),
    ))
}

#[cfg(unix)]
async fn create_dirs(dir: &Path) -> std::io::Result<()> {
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir).await
}

#[cfg(not(unix))]
async fn create_dirs(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir).await
}

async fn write_new_file(path: &str, content: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}
