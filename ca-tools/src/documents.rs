use crate::error::{Result, ToolError};
use crate::fuzzy;
use crate::traits::{RiskLevel, Tool, ToolSpec, require_i64, require_string};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const DEFAULT_MATCH_CUTOFF: f64 = 0.5;

/// Read-only access to the policy PDFs under a root directory.
pub struct DocumentsTool {
    root_dir: PathBuf,
    match_cutoff: f64,
}

impl DocumentsTool {
    pub fn new(root_dir: impl AsRef<Path>, match_cutoff: f64) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        if root_dir.as_os_str().is_empty() {
            return Err(ToolError::InvalidArguments(
                "root_dir is required".to_string(),
            ));
        }
        if !(match_cutoff > 0.0 && match_cutoff <= 1.0) {
            return Err(ToolError::InvalidArguments(format!(
                "match_cutoff must be in (0, 1], got {match_cutoff}"
            )));
        }
        Ok(Self {
            root_dir,
            match_cutoff,
        })
    }

    /// PDF filenames directly under the root, sorted.
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        let mut rd = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(format!(
                    "documents folder '{}' does not exist",
                    self.root_dir.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.to_lowercase().ends_with(".pdf") {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => out.push(name),
                _ => {}
            }
        }
        out.sort();
        Ok(out)
    }

    /// Case-insensitive closest PDF name for a loose hint.
    pub async fn resolve_filename(&self, hint: &str) -> Result<Option<String>> {
        let files = match self.list_documents().await {
            Ok(files) => files,
            Err(ToolError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let lowered: Vec<String> = files.iter().map(|f| f.to_lowercase()).collect();
        let hint = hint.trim().to_lowercase();
        let Some(best) = fuzzy::close_match(&hint, lowered.iter().map(String::as_str), self.match_cutoff)
        else {
            return Ok(None);
        };
        Ok(lowered
            .iter()
            .position(|f| f == best)
            .map(|i| files[i].clone()))
    }

    pub async fn get_page_content(&self, page_number: i64, filename_hint: &str) -> Result<String> {
        let Some(file) = self.resolve_filename(filename_hint).await? else {
            return Ok(format!("No matching file found for '{filename_hint}'."));
        };
        let path = self.root_dir.join(&file);
        let pages = tokio::task::spawn_blocking(move || load_page_texts(&path))
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("pdf reader panicked: {e}")))??;

        let count = pages.len();
        let index = usize::try_from(page_number).ok().filter(|n| (1..=count).contains(n));
        let Some(n) = index else {
            return Ok(format!(
                "Page {page_number} is out of range. This document has {count} pages."
            ));
        };
        tracing::debug!(file = %file, page = n, pages = count, "page resolved");
        Ok(format!(
            "Content from '{file}' page {n}:\n\n{}",
            pages[n - 1]
        ))
    }
}

fn load_page_texts(path: &Path) -> Result<Vec<String>> {
    let doc = lopdf::Document::load(path)?;
    let mut out = Vec::new();
    for page in doc.get_pages().keys() {
        let text = doc.extract_text(&[*page]).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), page = *page, error = %e, "text extraction failed");
            String::new()
        });
        out.push(text);
    }
    Ok(out)
}

#[async_trait]
impl Tool for DocumentsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "documents".to_string(),
            description: "List company policy PDFs and read a page by fuzzy filename.".to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "action": { "type": "string", "enum": ["list_documents", "get_page_content"] },
                    "page_number": { "type": "integer", "minimum": 1 },
                    "filename_hint": { "type": "string" }
                },
                "required": ["action"]
            }),
            risk_level: RiskLevel::Low,
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let action = require_string(&arguments, "action")?;

        match action.as_str() {
            "list_documents" => {
                let documents = self.list_documents().await?;
                Ok(serde_json::json!({ "documents": documents }))
            }
            "get_page_content" => {
                let page_number = require_i64(&arguments, "page_number")?;
                let hint = require_string(&arguments, "filename_hint")?;
                let content = self.get_page_content(page_number, &hint).await?;
                Ok(serde_json::json!({ "content": content }))
            }
            other => Err(ToolError::InvalidArguments(format!(
                "unknown action: {other}"
            ))),
        }
    }
}
