//! Sherpack Engine - Jinja2 templating for Kubernetes
//!
//! This crate provides a MiniJinja-based template engine with:
//! - Kubernetes-specific filters (toYaml, b64encode, etc.)
//! - Human-readable error messages with suggestions
//! - Full Jinja2 syntax support

pub mod engine;
pub mod error;
pub mod files_object;
pub mod filters;
pub mod functions;
pub mod pack_renderer;
pub mod secrets;
pub mod subchart;
pub mod suggestions;

pub use engine::{Engine, EngineBuilder, RenderResult};
pub use error::{
    EngineError, IssueSeverity, RenderIssue, RenderReport, RenderResultWithReport, TemplateError,
};
pub use files_object::{create_files_value, create_files_value_from_provider, FilesObject};
pub use pack_renderer::{
    PackRenderResult, PackRenderResultWithReport, PackRenderer, PackRendererBuilder,
};
pub use secrets::SecretFunctionState;
pub use subchart::{DiscoveryResult, SubchartConfig, SubchartInfo};
