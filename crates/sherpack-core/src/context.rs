//! Template rendering context

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::pack::PackMetadata;
use crate::release::ReleaseInfo;
use crate::values::Values;

/// Context available to all templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    /// User values (merged)
    pub values: JsonValue,

    /// Release information
    pub release: ReleaseInfo,

    /// Pack metadata
    pub pack: PackInfo,

    /// Cluster capabilities
    pub capabilities: Capabilities,

    /// Current template info
    pub template: TemplateInfo,

    /// Each enabled dependency's own render context, keyed by its
    /// effective (possibly aliased) name, so a parent template can
    /// reach into `.Subcharts.<name>`.
    #[serde(default)]
    pub subcharts: IndexMap<String, TemplateContext>,
}

/// Pack information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackInfo {
    /// Pack name
    pub name: String,

    /// Pack version
    pub version: String,

    /// App version
    pub app_version: Option<String>,
}

impl From<&PackMetadata> for PackInfo {
    fn from(meta: &PackMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            version: meta.version.to_string(),
            app_version: meta.app_version.clone(),
        }
    }
}

/// Cluster capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Kubernetes version
    pub kube_version: KubeVersion,

    /// Available API versions
    pub api_versions: Vec<String>,

    /// The rendering engine's own version, filling the role Helm's
    /// `.Capabilities.HelmVersion` plays for templates that gate on it.
    #[serde(default = "default_engine_version")]
    pub engine_version: String,
}

fn default_engine_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            kube_version: KubeVersion::default(),
            api_versions: Vec::new(),
            engine_version: default_engine_version(),
        }
    }
}

/// Kubernetes version info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl Default for KubeVersion {
    fn default() -> Self {
        // Default to a recent stable Kubernetes version for lint/template modes
        Self {
            version: "v1.28.0".to_string(),
            major: "1".to_string(),
            minor: "28".to_string(),
        }
    }
}

impl KubeVersion {
    pub fn new(version: &str) -> Self {
        let version = version.trim_start_matches('v');
        let parts: Vec<&str> = version.split('.').collect();

        Self {
            version: format!("v{}", version),
            major: parts.first().unwrap_or(&"1").to_string(),
            minor: parts.get(1).unwrap_or(&"28").to_string(),
        }
    }
}

/// Current template information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    /// Template name (filename)
    pub name: String,

    /// Base path
    pub base_path: String,
}

impl TemplateContext {
    /// Create a new template context
    pub fn new(values: Values, release: ReleaseInfo, pack: &PackMetadata) -> Self {
        Self {
            values: values.into_inner(),
            release,
            pack: PackInfo::from(pack),
            capabilities: Capabilities::default(),
            template: TemplateInfo::default(),
            subcharts: IndexMap::new(),
        }
    }

    /// Attach a subchart's own render context, keyed by its effective
    /// (possibly aliased) name.
    pub fn with_subchart(mut self, name: &str, context: TemplateContext) -> Self {
        self.subcharts.insert(name.to_string(), context);
        self
    }

    /// Set the current template info
    pub fn with_template(mut self, name: &str, base_path: &str) -> Self {
        self.template = TemplateInfo {
            name: name.to_string(),
            base_path: base_path.to_string(),
        };
        self
    }

    /// Set capabilities
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Convert to minijinja-compatible context
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}
