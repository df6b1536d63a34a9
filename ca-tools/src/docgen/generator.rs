use super::certificate::{self, CertificateRecord, CertificateRequest};
use super::fingerprint::{ContentFingerprint, Fingerprinter};
use super::memo::{MemoEntry, MemoStore};
use super::naming::{self, DEFAULT_STEM_MAX_LEN};
use super::outcome::{Generated, PartialFailure, SweepReport};
use super::slides::{self, Slide, SlideTemplate};
use super::{excel, word};
use crate::error::{Result, ToolError};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Extensions the sweep is allowed to delete.
pub const MANAGED_EXTENSIONS: [&str; 4] = ["docx", "pptx", "xlsx", "pdf"];
pub const DEFAULT_ISSUER: &str = "Company Assistant";
const DEFAULT_OUTPUT_SUBDIR: &str = "company-assistant-docs";

#[derive(Debug, Clone)]
pub struct DocGenSettings {
    pub output_dir: PathBuf,
    pub stem_max_len: usize,
    pub certificate_issuer: String,
}

impl Default for DocGenSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            stem_max_len: DEFAULT_STEM_MAX_LEN,
            certificate_issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_OUTPUT_SUBDIR)
}

#[derive(Debug, Default)]
struct GeneratorState {
    memo: MemoStore,
    /// Paths reserved by renders that have not been recorded yet. The sweep
    /// leaves these alone.
    in_flight: HashSet<PathBuf>,
}

/// Bytes plus whatever the builder skipped along the way.
struct Rendered {
    bytes: Vec<u8>,
    partial_failures: Vec<PartialFailure>,
}

/// Owns the memo store and output directory for every builder.
///
/// Memo lookups, path reservation, recording and the cleanup sweep all take
/// the same lock; rendering runs on the blocking pool and, like file writes,
/// happens outside it.
pub struct DocumentGenerator {
    output_dir: PathBuf,
    stem_max_len: usize,
    certificate_issuer: String,
    template: Arc<SlideTemplate>,
    state: Mutex<GeneratorState>,
}

impl DocumentGenerator {
    pub fn new(settings: DocGenSettings) -> Result<Self> {
        if settings.output_dir.as_os_str().is_empty() {
            return Err(ToolError::InvalidArguments(
                "output_dir is required".to_string(),
            ));
        }
        if settings.stem_max_len == 0 {
            return Err(ToolError::InvalidArguments(
                "stem_max_len must be > 0".to_string(),
            ));
        }
        let output_dir = std::path::absolute(&settings.output_dir)?;
        Ok(Self {
            output_dir,
            stem_max_len: settings.stem_max_len,
            certificate_issuer: settings.certificate_issuer,
            template: Arc::new(SlideTemplate::built_in()),
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn memo_len(&self) -> usize {
        self.state.lock().await.memo.len()
    }

    #[tracing::instrument(level = "info", skip_all, fields(content_len = content.len()))]
    pub async fn generate_word_doc(&self, content: &str) -> Result<Generated> {
        let fingerprint = Fingerprinter::new(word::EXTENSION).field(content).finish();
        let stem = naming::sanitize_stem(content, self.stem_max_len);
        let content = content.to_string();
        self.produce(fingerprint, &stem, word::EXTENSION, move || {
            Ok(Rendered {
                bytes: word::render_docx(&content)?,
                partial_failures: Vec::new(),
            })
        })
        .await
    }

    #[tracing::instrument(level = "info", skip_all, fields(csv_len = csv_data.len()))]
    pub async fn generate_excel(&self, csv_data: &str) -> Result<Generated> {
        let fingerprint = Fingerprinter::new(excel::EXTENSION)
            .field(csv_data)
            .finish();
        let stem = naming::sanitize_stem(excel::stem_source(csv_data), self.stem_max_len);
        let csv_data = csv_data.to_string();
        self.produce(fingerprint, &stem, excel::EXTENSION, move || {
            let table = excel::parse_csv(&csv_data)?;
            Ok(Rendered {
                bytes: excel::render_xlsx(&table)?,
                partial_failures: Vec::new(),
            })
        })
        .await
    }

    #[tracing::instrument(level = "info", skip_all, fields(slide_count = slide_list.len()))]
    pub async fn generate_ppt(&self, slide_list: &[Slide]) -> Result<Generated> {
        let fingerprint = slides::fingerprint(slide_list);
        let stem = naming::sanitize_stem(&slides::stem_source(slide_list), self.stem_max_len);
        let template = Arc::clone(&self.template);
        let slide_list = slide_list.to_vec();
        self.produce(fingerprint, &stem, slides::EXTENSION, move || {
            let rendered = slides::render_pptx(&template, &slide_list)?;
            tracing::info!(
                slides_requested = slide_list.len(),
                slides_rendered = rendered.slides_rendered,
                partial_failures = rendered.partial_failures.len(),
                "presentation rendered"
            );
            Ok(Rendered {
                bytes: rendered.bytes,
                partial_failures: rendered.partial_failures,
            })
        })
        .await
    }

    /// Returns the resolved record alongside the artifact so callers can show
    /// the id and date that were filled in.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn generate_certificate(
        &self,
        request: CertificateRequest,
    ) -> Result<(Generated, CertificateRecord)> {
        let today = Utc::now().date_naive();
        let record = CertificateRecord::resolve(request, today, &mut rand::thread_rng())?;
        let fingerprint = record.fingerprint();
        let stem = certificate::filename_stem(&record, self.stem_max_len);
        let owned = record.clone();
        let issuer = self.certificate_issuer.clone();
        let generated = self
            .produce(fingerprint, &stem, certificate::EXTENSION, move || {
                Ok(Rendered {
                    bytes: certificate::render_certificate(&owned, &issuer)?,
                    partial_failures: Vec::new(),
                })
            })
            .await?;
        tracing::info!(
            certificate_id = %record.certificate_id,
            cached = generated.cached,
            "certificate ready"
        );
        Ok((generated, record))
    }

    /// Deletes managed artifacts in the output directory and clears the memo
    /// store, even when some deletions fail.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn cleanup(&self) -> Result<SweepReport> {
        self.cleanup_with(|path| tokio::fs::remove_file(path)).await
    }

    async fn cleanup_with<R, Fut>(&self, remove: R) -> Result<SweepReport>
    where
        R: Fn(PathBuf) -> Fut,
        Fut: Future<Output = std::io::Result<()>>,
    {
        let mut state = self.state.lock().await;
        let mut report = SweepReport::default();

        let listing = sweep_dir(&self.output_dir, &state.in_flight, &mut report, remove).await;
        report.memo_entries_cleared = state.memo.clear();
        drop(state);

        listing?;
        tracing::info!(
            deleted = report.deleted,
            skipped_in_flight = report.skipped_in_flight,
            failures = report.failures.len(),
            memo_entries_cleared = report.memo_entries_cleared,
            "cleanup sweep completed"
        );
        Ok(report)
    }

    async fn produce<F>(
        &self,
        fingerprint: ContentFingerprint,
        stem: &str,
        ext: &str,
        render: F,
    ) -> Result<Generated>
    where
        F: FnOnce() -> Result<Rendered> + Send + 'static,
    {
        let path = {
            let mut state = self.state.lock().await;
            if let Some(entry) = state.memo.lookup(&fingerprint) {
                tracing::debug!(%fingerprint, path = %entry.path.display(), "memo hit");
                return Ok(Generated {
                    path: entry.path.clone(),
                    fingerprint,
                    cached: true,
                    partial_failures: entry.partial_failures.clone(),
                });
            }
            let path = self.reserve_path(&mut state, stem, ext);
            state.in_flight.insert(path.clone());
            path
        };

        let span = tracing::Span::current();
        let rendered = tokio::task::spawn_blocking(move || span.in_scope(render))
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("render task failed: {e}")))
            .and_then(|r| r);
        let written = match rendered {
            Ok(rendered) => self.write_artifact(&path, &rendered.bytes).await.map(|()| rendered),
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        state.in_flight.remove(&path);
        let rendered = written?;
        state.memo.record(
            fingerprint.clone(),
            MemoEntry {
                path: path.clone(),
                partial_failures: rendered.partial_failures.clone(),
            },
        );
        drop(state);

        tracing::info!(
            %fingerprint,
            path = %path.display(),
            bytes = rendered.bytes.len(),
            partial_failures = rendered.partial_failures.len(),
            "artifact generated"
        );
        Ok(Generated {
            path,
            fingerprint,
            cached: false,
            partial_failures: rendered.partial_failures,
        })
    }

    /// Timestamped path for `stem`, with a numeric suffix when another render
    /// already holds or wrote that name this second.
    fn reserve_path(&self, state: &mut GeneratorState, stem: &str, ext: &str) -> PathBuf {
        let base = naming::timestamped_filename(stem, ext, Utc::now());
        let mut candidate = self.output_dir.join(&base);
        let mut n = 2;
        while state.in_flight.contains(&candidate) || candidate.exists() {
            let base_stem = base.trim_end_matches(&format!(".{ext}"));
            candidate = self.output_dir.join(format!("{base_stem}_{n}.{ext}"));
            n += 1;
        }
        candidate
    }

    async fn write_artifact(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    #[cfg(test)]
    async fn hold_in_flight(&self, path: PathBuf) {
        self.state.lock().await.in_flight.insert(path);
    }
}

async fn sweep_dir<R, Fut>(
    dir: &Path,
    in_flight: &HashSet<PathBuf>,
    report: &mut SweepReport,
    remove: R,
) -> Result<()>
where
    R: Fn(PathBuf) -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut rd = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        let managed = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| MANAGED_EXTENSIONS.contains(&e));
        if !managed {
            continue;
        }
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {}
            _ => continue,
        }
        if in_flight.contains(&path) {
            report.skipped_in_flight += 1;
            continue;
        }
        match remove(path.clone()).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete artifact");
                report.failures.push(PartialFailure::DeleteFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(())
}
