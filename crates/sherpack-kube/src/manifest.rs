//! Manifest post-processing: splits a rendered pack's output into hook
//! artifacts and primary manifests, then orders each for apply.
//!
//! Hooks are recognized by the same `sherpack.io/hook` / `helm.sh/hook`
//! annotation convention as [`crate::hooks`] and are excluded from the
//! primary manifest string — they are applied separately by the
//! `HookExecutor` at their matching lifecycle event, never as part of the
//! regular resource apply.

use std::collections::HashMap;

use serde_yaml::Value;

use crate::crd::ResourceCategory;
use crate::error::{KubeError, Result};
use crate::hooks::{classify_document, Hook, HookClassification};

/// The parsed head of one generic (non-hook) manifest document.
#[derive(Debug, Clone)]
pub struct ManifestDoc {
    /// Template path this document was rendered from.
    pub source: String,
    /// Full YAML text of the document.
    pub content: String,
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

/// Output of [`split_and_sort`].
#[derive(Debug, Clone, Default)]
pub struct SplitResult {
    /// Generic manifests concatenated with `---` separators, each
    /// preceded by a `# Source: <path>` comment, sorted by kind order
    /// then name.
    pub manifest: String,
    /// Hooks sorted by weight then name. Phase membership lives on
    /// each `Hook` itself; callers filter by phase via
    /// `Hook::runs_in_phase`.
    pub hooks: Vec<Hook>,
}

/// Split a rendered pack's `path -> text` map into YAML documents,
/// classify each as a hook or a generic manifest, and sort both groups.
///
/// Template files are visited in path order (matching the render
/// engine's own deterministic ordering) so that, for a fixed chart,
/// values and capabilities, the result is byte-identical across runs.
pub fn split_and_sort(rendered: &HashMap<String, String>) -> Result<SplitResult> {
    let mut generic = Vec::new();
    let mut hooks = Vec::new();

    let mut sources: Vec<&String> = rendered.keys().collect();
    sources.sort();

    for source in sources {
        let text = &rendered[source];
        for raw_doc in text.split("---") {
            let doc = raw_doc.trim();
            if doc.is_empty() {
                continue;
            }
            if doc
                .lines()
                .all(|l| l.trim().is_empty() || l.trim().starts_with('#'))
            {
                continue;
            }

            match classify_document(doc) {
                HookClassification::Hook(hook) => {
                    hooks.push(hook);
                    continue;
                }
                // Unrecognized event name: the whole hook is dropped, not
                // demoted to a generic manifest (spec.md §4.6 step 2).
                HookClassification::Discarded => continue,
                HookClassification::NotAHook => {}
            }

            let yaml: Value = serde_yaml::from_str(doc).map_err(|e| {
                KubeError::Serialization(format!("{}: {}", source, e))
            })?;

            let metadata = yaml.get("metadata");
            let name = metadata
                .and_then(|m| m.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string();
            let namespace = metadata
                .and_then(|m| m.get("namespace"))
                .and_then(|n| n.as_str())
                .map(String::from);
            let kind = yaml
                .get("kind")
                .and_then(|k| k.as_str())
                .unwrap_or_default()
                .to_string();
            let api_version = yaml
                .get("apiVersion")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            generic.push(ManifestDoc {
                source: source.clone(),
                content: doc.to_string(),
                api_version,
                kind,
                name,
                namespace,
            });
        }
    }

    sort_manifests(&mut generic);
    sort_hooks(&mut hooks);

    let manifest = generic
        .iter()
        .map(|d| format!("# Source: {}\n{}", d.source, d.content))
        .collect::<Vec<_>>()
        .join("\n---\n");

    Ok(SplitResult { manifest, hooks })
}

/// Sort generic manifests by kind order (CRDs/namespaces first,
/// workloads late), then by name ascending.
pub fn sort_manifests(docs: &mut [ManifestDoc]) {
    docs.sort_by(|a, b| {
        let ca = ResourceCategory::from_resource(&a.kind, &a.api_version);
        let cb = ResourceCategory::from_resource(&b.kind, &b.api_version);
        ca.cmp(&cb).then_with(|| a.name.cmp(&b.name))
    });
}

/// Sort manifests in the reverse of install order, for uninstall.
pub fn sort_manifests_for_uninstall(docs: &mut [ManifestDoc]) {
    sort_manifests(docs);
    docs.reverse();
}

/// Sort hooks by weight ascending, then name ascending. Hooks are
/// grouped by event/phase by the caller (each `Hook` may run in
/// several phases); within one phase this ordering is what the
/// controller executes.
pub fn sort_hooks(hooks: &mut [Hook]) {
    hooks.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));
}
