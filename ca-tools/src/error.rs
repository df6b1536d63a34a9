use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("malformed csv: {0}")]
    Csv(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("io error: {0}")]
    Io(String),
}

impl ToolError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::NotFound(_) => "not_found",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::Csv(_) => "malformed_csv",
            Self::Render(_) => "render_failed",
            Self::Io(_) => "io_error",
        }
    }
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for ToolError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<zip::result::ZipError> for ToolError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Render(e.to_string())
    }
}

impl From<lopdf::Error> for ToolError {
    fn from(e: lopdf::Error) -> Self {
        Self::Render(e.to_string())
    }
}
