//! Office document and certificate generation with content-addressed reuse.

mod certificate;
mod excel;
mod fingerprint;
mod generator;
mod helvetica;
mod memo;
mod naming;
mod ooxml;
mod outcome;
mod slides;
mod word;

pub use certificate::{CertificateRecord, CertificateRequest};
pub use fingerprint::ContentFingerprint;
pub use generator::{
    DEFAULT_ISSUER, DocGenSettings, DocumentGenerator, MANAGED_EXTENSIONS, default_output_dir,
};
pub use naming::{DEFAULT_STEM_MAX_LEN, sanitize_stem};
pub use outcome::{Generated, PartialFailure, SweepReport};
pub use slides::{Slide, SlideTemplate};

use crate::error::{Result, ToolError};
use crate::traits::{RiskLevel, Tool, ToolSpec, optional_string, require_string};
use async_trait::async_trait;
use std::sync::Arc;

pub struct DocGenTool {
    generator: Arc<DocumentGenerator>,
}

impl DocGenTool {
    pub fn new(generator: Arc<DocumentGenerator>) -> Self {
        Self { generator }
    }
}

fn parse_slides(arguments: &serde_json::Value) -> Result<Vec<Slide>> {
    let Some(raw) = arguments.get("slides") else {
        return Err(ToolError::InvalidArguments("missing key: slides".to_string()));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| ToolError::InvalidArguments(format!("invalid slides: {e}")))
}

#[async_trait]
impl Tool for DocGenTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "document_generation".to_string(),
            description: "Generate Word, Excel, PowerPoint and bonafide certificate files, and clean up generated files.".to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["generate_word_doc", "generate_excel", "generate_ppt", "generate_certificate", "cleanup_temp_files"]
                    },
                    "content": { "type": "string" },
                    "csv_data": { "type": "string" },
                    "slides": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "layout": { "type": "integer" },
                                "placeholders": { "type": "array", "items": { "type": "string" } }
                            },
                            "required": ["layout"]
                        }
                    },
                    "name": { "type": "string" },
                    "program": { "type": "string" },
                    "issue_date": { "type": "string" },
                    "certificate_id": { "type": "string" }
                },
                "required": ["action"]
            }),
            risk_level: RiskLevel::Medium,
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let action = require_string(&arguments, "action")?;

        match action.as_str() {
            "generate_word_doc" => {
                let content = require_string(&arguments, "content")?;
                let generated = self.generator.generate_word_doc(&content).await?;
                Ok(generated.to_json())
            }
            "generate_excel" => {
                let csv_data = require_string(&arguments, "csv_data")?;
                let generated = self.generator.generate_excel(&csv_data).await?;
                Ok(generated.to_json())
            }
            "generate_ppt" => {
                let slides = parse_slides(&arguments)?;
                let generated = self.generator.generate_ppt(&slides).await?;
                Ok(generated.to_json())
            }
            "generate_certificate" => {
                let request = CertificateRequest {
                    name: require_string(&arguments, "name")?,
                    program: require_string(&arguments, "program")?,
                    issue_date: optional_string(&arguments, "issue_date")?,
                    certificate_id: optional_string(&arguments, "certificate_id")?,
                };
                let (generated, record) = self.generator.generate_certificate(request).await?;
                let mut out = generated.to_json();
                out["certificate_id"] = serde_json::Value::String(record.certificate_id);
                out["issue_date"] = serde_json::Value::String(record.issue_date);
                Ok(out)
            }
            "cleanup_temp_files" => {
                let report = self.generator.cleanup().await?;
                Ok(serde_json::json!({
                    "deleted": report.deleted,
                    "skipped_in_flight": report.skipped_in_flight,
                    "memo_entries_cleared": report.memo_entries_cleared,
                    "failures": report.failures,
                    "message": report.message(),
                }))
            }
            other => Err(ToolError::InvalidArguments(format!(
                "unknown action: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(dir: &std::path::Path) -> DocGenTool {
        let generator = DocumentGenerator::new(DocGenSettings {
            output_dir: dir.to_path_buf(),
            ..DocGenSettings::default()
        })
        .expect("generator");
        DocGenTool::new(Arc::new(generator))
    }

    #[tokio::test]
    async fn word_action_returns_path_and_cache_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool(tmp.path());
        let args = serde_json::json!({ "action": "generate_word_doc", "content": "Hello team" });

        let first = tool.execute(args.clone()).await.unwrap();
        let second = tool.execute(args).await.unwrap();
        assert_eq!(first["cached"], false);
        assert_eq!(second["cached"], true);
        assert_eq!(first["path"], second["path"]);
        let path = first["path"].as_str().unwrap();
        assert!(std::path::Path::new(path).exists());
    }

    #[tokio::test]
    async fn ppt_action_rejects_malformed_slides() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool(tmp.path());
        let err = tool
            .execute(serde_json::json!({ "action": "generate_ppt", "slides": [{ "layout": "big" }] }))
            .await
            .expect_err("bad layout type");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(err.to_string().contains("invalid slides"));
    }

    #[tokio::test]
    async fn ppt_action_surfaces_partial_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool(tmp.path());
        let out = tool
            .execute(serde_json::json!({
                "action": "generate_ppt",
                "slides": [
                    { "layout": 1, "placeholders": ["Agenda", "Intro", "Demo"] },
                    { "layout": -1, "placeholders": ["Ghost"] }
                ]
            }))
            .await
            .unwrap();
        let failures = out["partial_failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["kind"], "slide_skipped");
        assert_eq!(failures[0]["slide"], 1);
    }

    #[tokio::test]
    async fn certificate_action_reports_resolved_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool(tmp.path());
        let out = tool
            .execute(serde_json::json!({
                "action": "generate_certificate",
                "name": "Asha Rao",
                "program": "Graduate Engineering"
            }))
            .await
            .unwrap();
        assert!(out["certificate_id"].as_str().unwrap().starts_with("BON-"));
        assert!(!out["issue_date"].as_str().unwrap().is_empty());
        assert!(out["path"].as_str().unwrap().ends_with(".pdf"));
    }

    #[tokio::test]
    async fn cleanup_action_reports_message() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool(tmp.path());
        tool.execute(serde_json::json!({ "action": "generate_excel", "csv_data": "x,y\n1,2\n" }))
            .await
            .unwrap();
        let out = tool
            .execute(serde_json::json!({ "action": "cleanup_temp_files" }))
            .await
            .unwrap();
        assert_eq!(out["deleted"], 1);
        assert_eq!(out["message"], "Deleted 1 temporary files.");
    }

    #[tokio::test]
    async fn unknown_action_is_invalid_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let err = tool(tmp.path())
            .execute(serde_json::json!({ "action": "generate_fax" }))
            .await
            .expect_err("unknown");
        assert!(err.to_string().contains("unknown action: generate_fax"));
    }
}
