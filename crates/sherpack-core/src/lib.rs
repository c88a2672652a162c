//! Sherpack Core - Core types and utilities for the Kubernetes package manager
//!
//! This crate provides the foundational types used throughout Sherpack:
//! - `Pack`: The package definition (equivalent to Helm Chart)
//! - `Values`: Configuration values with deep merge support
//! - `Release`: Deployment state tracking
//! - `Context`: Template rendering context

pub mod archive;
pub mod context;
pub mod error;
pub mod files;
pub mod manifest;
pub mod pack;
pub mod release;
pub mod schema;
pub mod secrets;
pub mod values;

pub use archive::{
    create_archive, default_archive_name, extract_archive, list_archive,
    read_file_from_archive, read_manifest_from_archive, verify_archive, ArchiveEntry,
};
pub use context::TemplateContext;
pub use error::CoreError;
pub use files::{FileEntry, FileProvider, Files, MockFileProvider, SandboxedFileProvider};
pub use manifest::{Manifest, MismatchedFile, VerificationResult, MANIFEST_VERSION};
pub use pack::{Dependency, LoadedPack, Pack, PackKind, PackMetadata};
pub use release::{Release, ReleaseInfo, ReleaseStatus};
pub use schema::{Schema, SchemaFormat, SchemaValidator, ValidationResult};
pub use secrets::{SecretCharset, SecretEntry, SecretGenerator, SecretState};
pub use values::{parse_set_values, Values};
