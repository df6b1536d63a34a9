//! Company assistant tools: office document generation and policy PDF lookup.
//!
//! Tools are exposed to agents over HTTP by `ca-app`.

pub mod docgen;
mod documents;
mod error;
mod fuzzy;
mod traits;

pub use docgen::{DocGenSettings, DocGenTool, DocumentGenerator, SweepReport};
pub use documents::{DEFAULT_MATCH_CUTOFF, DocumentsTool};
pub use error::{Result, ToolError};
pub use fuzzy::{close_match, ratio};
pub use traits::{RiskLevel, Tool, ToolSpec, to_tool_descriptor};
