//! Company assistant configuration loader.

use ca_tools::docgen::{DEFAULT_ISSUER, DEFAULT_STEM_MAX_LEN, default_output_dir};
use ca_tools::{DEFAULT_MATCH_CUTOFF, DocGenSettings};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub docgen: DocGenConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_http_max_in_flight")]
    pub http_max_in_flight: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8010".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    60
}

fn default_http_max_in_flight() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            http_timeout_seconds: default_http_timeout_seconds(),
            http_max_in_flight: default_http_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocGenConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Default: `<temp>/company-assistant-docs`
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default = "default_stem_max_len")]
    pub stem_max_len: usize,
    /// Organisation name printed in the certificate header band.
    #[serde(default = "default_certificate_issuer")]
    pub certificate_issuer: String,
}

fn default_true() -> bool {
    true
}

fn default_stem_max_len() -> usize {
    DEFAULT_STEM_MAX_LEN
}

fn default_certificate_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

impl Default for DocGenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: None,
            stem_max_len: default_stem_max_len(),
            certificate_issuer: default_certificate_issuer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_documents_root")]
    pub root_dir: String,
    #[serde(default = "default_match_cutoff")]
    pub match_cutoff: f64,
}

fn default_documents_root() -> String {
    "./documents/Policies".to_string()
}

fn default_match_cutoff() -> f64 {
    DEFAULT_MATCH_CUTOFF
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root_dir: default_documents_root(),
            match_cutoff: default_match_cutoff(),
        }
    }
}

impl AppConfig {
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        Ok(Self::load_with_path(path).await?.0)
    }

    /// Loads the file if present, applies env overrides and validates.
    /// A missing file yields defaults.
    pub async fn load_with_path(path: Option<PathBuf>) -> anyhow::Result<(Self, PathBuf)> {
        let path = path.unwrap_or_else(default_config_path);
        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::parse(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(config_path = %path.display(), "config file not found; using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok((cfg, path))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = var("COMPANY_ASSISTANT_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("GEN_DOC_OUTPUT_DIR") {
            self.docgen.output_dir = Some(v);
        }
        if let Some(v) = var("DOCUMENTS_DIR") {
            self.documents.root_dir = v;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.bind_addr()?;
        if self.server.http_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("server.http_timeout_seconds must be > 0"));
        }
        if self.server.http_max_in_flight == 0 {
            return Err(anyhow::anyhow!("server.http_max_in_flight must be > 0"));
        }
        if self.docgen.stem_max_len == 0 {
            return Err(anyhow::anyhow!("docgen.stem_max_len must be > 0"));
        }
        if self.docgen.certificate_issuer.trim().is_empty() {
            return Err(anyhow::anyhow!("docgen.certificate_issuer is required"));
        }
        let cutoff = self.documents.match_cutoff;
        if !(cutoff > 0.0 && cutoff <= 1.0) {
            return Err(anyhow::anyhow!(
                "documents.match_cutoff must be in (0, 1], got {cutoff}"
            ));
        }
        if self.documents.enabled && self.documents.root_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("documents.root_dir is required"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server.bind_addr.trim().parse().map_err(|e| {
            anyhow::anyhow!("server.bind_addr {:?} is invalid: {e}", self.server.bind_addr)
        })
    }

    pub fn docgen_settings(&self) -> anyhow::Result<DocGenSettings> {
        let output_dir = match self.docgen.output_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => expand_home(dir)?,
            _ => default_output_dir(),
        };
        Ok(DocGenSettings {
            output_dir,
            stem_max_len: self.docgen.stem_max_len,
            certificate_issuer: self.docgen.certificate_issuer.trim().to_string(),
        })
    }

    pub fn documents_root(&self) -> anyhow::Result<PathBuf> {
        expand_home(&self.documents.root_dir)
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".company-assistant").join("config.toml")
}

fn expand_home(path: &str) -> anyhow::Result<PathBuf> {
    let trimmed = path.trim();
    if !trimmed.starts_with("~/") {
        return Ok(PathBuf::from(trimmed));
    }
    let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
    Ok(PathBuf::from(trimmed.replacen('~', &home, 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::parse("").expect("parse");
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:8010");
        assert_eq!(cfg.server.http_timeout_seconds, 60);
        assert_eq!(cfg.server.http_max_in_flight, 64);
        assert!(cfg.docgen.enabled);
        assert_eq!(cfg.docgen.stem_max_len, 50);
        assert_eq!(cfg.documents.root_dir, "./documents/Policies");
        assert_eq!(cfg.documents.match_cutoff, 0.5);
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = AppConfig::parse(
            r#"
[docgen]
output_dir = "/srv/docs"

[documents]
match_cutoff = 0.8
"#,
        )
        .expect("parse");
        assert_eq!(cfg.docgen.output_dir.as_deref(), Some("/srv/docs"));
        assert_eq!(cfg.docgen.stem_max_len, 50);
        assert_eq!(cfg.documents.match_cutoff, 0.8);
        assert!(cfg.documents.enabled);
        let settings = cfg.docgen_settings().expect("settings");
        assert_eq!(settings.output_dir, PathBuf::from("/srv/docs"));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = AppConfig::parse("[channels]\nwebchat = true\n").expect_err("unknown");
        assert!(err.to_string().contains("channels"), "{err}");
    }

    #[test]
    fn misspelled_section_keys_are_rejected() {
        let err = AppConfig::parse("[docgen]\nstem_max_length = 20\n").expect_err("typo");
        assert!(err.to_string().contains("stem_max_length"), "{err}");

        let err = AppConfig::parse("[server]\nbind = \"0.0.0.0:1\"\n").expect_err("typo");
        assert!(err.to_string().contains("bind"), "{err}");

        let err = AppConfig::parse("[documents]\nroot = \"/srv\"\n").expect_err("typo");
        assert!(err.to_string().contains("root"), "{err}");
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut cfg = AppConfig::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("COMPANY_ASSISTANT_BIND_ADDR", "0.0.0.0:9000"),
            ("GEN_DOC_OUTPUT_DIR", "/tmp/generated"),
            ("DOCUMENTS_DIR", "   "),
        ]);
        cfg.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.docgen.output_dir.as_deref(), Some("/tmp/generated"));
        assert_eq!(cfg.documents.root_dir, "./documents/Policies");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.docgen.stem_max_len = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.documents.match_cutoff = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.server.http_max_in_flight = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.server.bind_addr = "not-an-addr".to_string();
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        let (cfg, resolved) = AppConfig::load_with_path(Some(path.clone()))
            .await
            .expect("load");
        assert_eq!(resolved, path);
        assert_eq!(cfg.docgen.stem_max_len, 50);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[server\nbind_addr = 1").unwrap();
        let err = AppConfig::load(Some(path)).await.expect_err("malformed");
        assert!(err.to_string().contains("parse config"), "{err}");
    }
}
