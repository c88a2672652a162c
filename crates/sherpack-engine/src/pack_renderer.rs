//! Pack renderer with subchart support
//!
//! This module provides `PackRenderer`, which orchestrates the rendering
//! of a pack and all its subcharts with proper value scoping.

use std::collections::HashMap;
use indexmap::IndexMap;

use serde_json::Value as JsonValue;
use sherpack_core::{LoadedPack, TemplateContext, Values, Dependency};

use crate::engine::Engine;
use crate::error::{EngineError, RenderReport, RenderIssue, TemplateError};
use crate::subchart::{SubchartConfig, SubchartInfo, DiscoveryResult};

/// Result of rendering a pack (with or without subcharts)
#[derive(Debug)]
pub struct PackRenderResult {
    /// Rendered manifests by filename (IndexMap preserves insertion order)
    /// Subchart manifests are prefixed: "redis/deployment.yaml"
    pub manifests: IndexMap<String, String>,

    /// Post-install notes (from parent pack only)
    pub notes: Option<String>,

    /// Discovery information about subcharts
    pub discovery: DiscoveryResult,
}

/// Orchestrates rendering of a pack and its subcharts
pub struct PackRenderer {
    engine: Engine,
    config: SubchartConfig,
}

impl PackRenderer {
    /// Create a new PackRenderer with default config
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            config: SubchartConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(engine: Engine, config: SubchartConfig) -> Self {
        Self { engine, config }
    }

    /// Create a builder for more options
    pub fn builder() -> PackRendererBuilder {
        PackRendererBuilder::default()
    }

    /// Get a reference to the underlying engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Get a reference to the config
    pub fn config(&self) -> &SubchartConfig {
        &self.config
    }

    /// Discover subcharts in a pack
    ///
    /// This scans the subcharts directory (default: `charts/`) for valid packs
    /// and evaluates their conditions against the provided values.
    pub fn discover_subcharts(
        &self,
        pack: &LoadedPack,
        values: &JsonValue,
    ) -> DiscoveryResult {
        let mut result = DiscoveryResult::new();
        let subcharts_dir = pack.root.join(&self.config.subcharts_dir);

        // Check if subcharts directory exists
        if !subcharts_dir.exists() {
            // Not an error - pack may not have subcharts
            return result;
        }

        // Scan the subcharts directory, loading each directory's pack once.
        // A single directory may back several dependency entries (aliases),
        // so packs are cloned per dependency rather than consumed in place.
        let entries = match std::fs::read_dir(&subcharts_dir) {
            Ok(e) => e,
            Err(e) => {
                result.warnings.push(format!(
                    "Failed to read subcharts directory '{}': {}",
                    subcharts_dir.display(),
                    e
                ));
                return result;
            }
        };

        let mut loaded: HashMap<String, (std::path::PathBuf, LoadedPack)> = HashMap::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    result.warnings.push(format!("Failed to read directory entry: {}", e));
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let dir_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };

            let subchart_pack = match LoadedPack::load(&path) {
                Ok(p) => p,
                Err(e) => {
                    result.warnings.push(format!(
                        "Failed to load subchart '{}': {}",
                        dir_name, e
                    ));
                    continue;
                }
            };

            loaded.insert(dir_name, (path, subchart_pack));
        }

        // One SubchartInfo per declared dependency, so two dependency entries
        // pointing at the same directory with different aliases both render.
        let mut matched_dirs: std::collections::HashSet<String> = std::collections::HashSet::new();
        for dep in &pack.pack.dependencies {
            let Some((path, subchart_pack)) = loaded.get(&dep.name) else {
                if dep.enabled {
                    result.missing.push(dep.effective_name().to_string());
                }
                continue;
            };
            matched_dirs.insert(dep.name.clone());

            let (enabled, disabled_reason) = self.evaluate_dependency(dep, values);

            result.subcharts.push(SubchartInfo {
                name: dep.effective_name().to_string(),
                path: path.clone(),
                pack: subchart_pack.clone(),
                enabled,
                dependency: Some(dep.clone()),
                disabled_reason,
            });
        }

        // Directories present under charts/ but not declared in Pack.yaml:
        // always enabled under their own directory name, same as Helm does
        // for undeclared subcharts.
        for (dir_name, (path, subchart_pack)) in &loaded {
            if matched_dirs.contains(dir_name) {
                continue;
            }
            result.subcharts.push(SubchartInfo {
                name: dir_name.clone(),
                path: path.clone(),
                pack: subchart_pack.clone(),
                enabled: true,
                dependency: None,
                disabled_reason: None,
            });
        }

        // Sort by name for deterministic output
        result.subcharts.sort_by(|a, b| a.name.cmp(&b.name));

        result
    }

    /// Evaluate whether a dependency is enabled.
    ///
    /// Two phases, tags then condition:
    /// 1. Tags: if any listed tag resolves `true` under `values.tags`, the
    ///    dependency is enabled; if none resolve `true` but at least one
    ///    resolves `false`, it is disabled; otherwise tags leave it enabled.
    /// 2. Condition: a comma-separated list of dot-paths. The first path
    ///    that resolves to any value overrides whatever the tag phase
    ///    decided.
    fn evaluate_dependency(&self, dep: &Dependency, values: &JsonValue) -> (bool, Option<String>) {
        if !dep.enabled {
            return (false, Some("Statically disabled (enabled: false)".to_string()));
        }

        let mut enabled = true;
        let mut reason: Option<String> = None;

        if !dep.tags.is_empty() {
            let mut any_true = false;
            let mut any_false = false;
            for tag in &dep.tags {
                let tag_path = format!("tags.{}", tag);
                match tag_condition_bool(&tag_path, values) {
                    TagConditionValue::Bool(true) => any_true = true,
                    TagConditionValue::Bool(false) => any_false = true,
                    TagConditionValue::Missing => {}
                    TagConditionValue::NonBool => {
                        tracing::warn!(
                            dependency = %dep.name,
                            path = %tag_path,
                            "tag path resolved to a non-bool value, ignoring"
                        );
                    }
                }
            }
            if any_true {
                enabled = true;
            } else if any_false {
                enabled = false;
                reason = Some(format!("Tags {:?} all explicitly disabled", dep.tags));
            }
        }

        if let Some(condition) = &dep.condition {
            for path in condition.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match tag_condition_bool(path, values) {
                    TagConditionValue::Bool(value) => {
                        enabled = value;
                        reason = if value {
                            None
                        } else {
                            Some(format!("Condition '{}' evaluated to false", path))
                        };
                        break;
                    }
                    TagConditionValue::Missing => continue,
                    TagConditionValue::NonBool => {
                        tracing::warn!(
                            dependency = %dep.name,
                            path = %path,
                            "condition path resolved to a non-bool value, ignoring"
                        );
                        continue;
                    }
                }
            }
        }

        if !enabled && reason.is_none() {
            reason = Some("Disabled by tags".to_string());
        }

        (enabled, reason)
    }

    /// Mutate `pack` in place so its declared-dependency list contains only
    /// entries that resolve as enabled against `values`.
    ///
    /// `pack.pack.dependencies` is this port's `Metadata.Dependencies`; spec.md
    /// §4.3 requires a disabled subchart removed from both `Dependencies` and
    /// `Metadata.Dependencies`, not merely skipped when rendering. Callers
    /// that render subcharts (discovery, which reads the directory tree) are
    /// unaffected by this pass; it exists so the chart's own declared
    /// dependency list reflects resolution, for anything that inspects it
    /// afterward (CLI inspection, a later `Metadata.Dependencies` read).
    pub fn resolve_dependencies(&self, pack: &mut LoadedPack, values: &JsonValue) {
        pack.pack
            .dependencies
            .retain(|dep| self.evaluate_dependency(dep, values).0);
    }

    /// Render a pack and all enabled subcharts
    ///
    /// This is the main entry point. It:
    /// 1. Discovers all subcharts
    /// 2. Evaluates conditions against values
    /// 3. Renders enabled subcharts with scoped values
    /// 4. Renders the parent pack
    /// 5. Combines all manifests
    pub fn render(
        &self,
        pack: &LoadedPack,
        context: &TemplateContext,
    ) -> Result<PackRenderResult, EngineError> {
        let result = self.render_collect_errors(pack, context);

        if result.report.has_errors() {
            // Return first error
            let first_error = result
                .report
                .errors_by_template
                .into_values()
                .next()
                .and_then(|errors| errors.into_iter().next());

            return Err(match first_error {
                Some(err) => EngineError::Template(err),
                None => EngineError::Template(TemplateError::simple(
                    "Unknown template error during subchart rendering",
                )),
            });
        }

        Ok(PackRenderResult {
            manifests: result.manifests,
            notes: result.notes,
            discovery: result.discovery,
        })
    }

    /// Render with full error collection
    pub fn render_collect_errors(
        &self,
        pack: &LoadedPack,
        context: &TemplateContext,
    ) -> PackRenderResultWithReport {
        self.render_recursive(pack, context, 0)
    }

    /// Internal recursive renderer
    fn render_recursive(
        &self,
        pack: &LoadedPack,
        context: &TemplateContext,
        depth: usize,
    ) -> PackRenderResultWithReport {
        let mut report = RenderReport::new();
        let mut all_manifests = IndexMap::new();
        let mut notes = None;

        // Resolve dependencies against this scope's values before discovery,
        // so a disabled subchart is gone from `pack.pack.dependencies`
        // itself (spec.md §4.3), not just skipped when rendering.
        let resolved_pack = {
            let mut p = pack.clone();
            self.resolve_dependencies(&mut p, &context.values);
            p
        };
        let pack = &resolved_pack;

        // Check depth limit
        if depth > self.config.max_depth {
            report.add_warning(
                "subchart",
                format!(
                    "Maximum subchart depth ({}) exceeded, stopping recursion",
                    self.config.max_depth
                ),
            );
            return PackRenderResultWithReport {
                manifests: all_manifests,
                notes,
                report,
                discovery: DiscoveryResult::new(),
            };
        }

        // Discover subcharts
        let discovery = self.discover_subcharts(pack, &context.values);

        // Add discovery warnings to report
        for warning in &discovery.warnings {
            report.add_warning("subchart_discovery", warning.clone());
        }

        // Values visible to the parent template: starts as the incoming
        // values, grown by each enabled subchart's import-values entries.
        let mut parent_values = context.values.clone();
        let mut parent_context = context.clone();

        // Handle missing subcharts
        for missing in &discovery.missing {
            if self.config.strict {
                report.add_error(
                    format!("<subchart:{}>", missing),
                    TemplateError::simple(format!(
                        "Missing subchart '{}' referenced in dependencies",
                        missing
                    )),
                );
            } else {
                report.add_warning(
                    "subchart_missing",
                    format!("Subchart '{}' not found in {}/", missing, self.config.subcharts_dir),
                );
            }
        }

        // Render each enabled subchart
        for subchart in &discovery.subcharts {
            if !subchart.enabled {
                // Log why it was skipped
                if let Some(reason) = &subchart.disabled_reason {
                    report.add_issue(RenderIssue::warning(
                        "subchart_disabled",
                        format!("Subchart '{}' disabled: {}", subchart.name, reason),
                    ));
                }
                continue;
            }

            // Load subchart's default values
            let subchart_defaults = if subchart.pack.values_path.exists() {
                match Values::from_file(&subchart.pack.values_path) {
                    Ok(v) => v,
                    Err(e) => {
                        report.add_warning(
                            "subchart_values",
                            format!(
                                "Failed to load values.yaml for '{}': {}",
                                subchart.name, e
                            ),
                        );
                        Values::new()
                    }
                }
            } else {
                Values::new()
            };

            // Scope values for this subchart
            let scoped_values = Values::for_subchart_json(
                subchart_defaults,
                &context.values,
                &subchart.name,
            );

            // Create context for subchart
            let subchart_context = TemplateContext::new(
                scoped_values.clone(),
                context.release.clone(),
                &subchart.pack.pack.metadata,
            );

            // Recursively render subchart (handles its own subcharts)
            let subchart_result = self.render_recursive(
                &subchart.pack,
                &subchart_context,
                depth + 1,
            );

            // Make the subchart's own render context reachable from the
            // parent as `.Subcharts.<name>`, and propagate any
            // `import-values` entries back up before the parent renders.
            parent_context = parent_context.with_subchart(&subchart.name, subchart_context);
            if let Some(dep) = &subchart.dependency
                && !dep.import_values.is_empty()
            {
                parent_values = apply_import_values(
                    &parent_values,
                    scoped_values.inner(),
                    &dep.import_values,
                );
            }

            // Merge subchart manifests with prefix
            for (name, manifest) in subchart_result.manifests {
                let prefixed_name = format!("{}/{}", subchart.name, name);
                all_manifests.insert(prefixed_name, manifest);
            }

            // Merge subchart errors with prefix
            for (template, errors) in subchart_result.report.errors_by_template {
                let prefixed = format!("{}/{}", subchart.name, template);
                for error in errors {
                    report.add_error(prefixed.clone(), error);
                }
            }

            // Merge issues
            for issue in subchart_result.report.issues {
                report.add_issue(issue);
            }

            // Subchart notes are typically not shown (only parent's notes)
        }

        // Render parent pack with any imported subchart values folded in and
        // each enabled subchart's context reachable as `.Subcharts.<name>`.
        parent_context.values = parent_values;
        let parent_result = self.engine.render_pack_collect_errors(pack, &parent_context);

        // Merge parent manifests (after subcharts for proper ordering)
        all_manifests.extend(parent_result.manifests);
        notes = parent_result.notes;

        // Merge parent report
        for (template, errors) in parent_result.report.errors_by_template {
            for error in errors {
                report.add_error(template.clone(), error);
            }
        }
        for issue in parent_result.report.issues {
            report.add_issue(issue);
        }
        for success in parent_result.report.successful_templates {
            report.add_success(success);
        }

        PackRenderResultWithReport {
            manifests: all_manifests,
            notes,
            report,
            discovery,
        }
    }
}

/// Result type that includes discovery info and error report
#[derive(Debug)]
pub struct PackRenderResultWithReport {
    /// Rendered manifests (may be partial if errors occurred)
    pub manifests: IndexMap<String, String>,

    /// Post-install notes
    pub notes: Option<String>,

    /// Error and warning report
    pub report: RenderReport,

    /// Subchart discovery results
    pub discovery: DiscoveryResult,
}

impl PackRenderResultWithReport {
    /// Check if rendering was fully successful (no errors)
    pub fn is_success(&self) -> bool {
        !self.report.has_errors()
    }
}

/// Builder for PackRenderer
#[derive(Default)]
pub struct PackRendererBuilder {
    strict_mode: bool,
    max_depth: Option<usize>,
    subcharts_dir: Option<String>,
}

impl PackRendererBuilder {
    /// Enable strict mode for the engine (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Set maximum depth for nested subcharts
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the subcharts directory name (default: "charts")
    pub fn subcharts_dir(mut self, dir: impl Into<String>) -> Self {
        self.subcharts_dir = Some(dir.into());
        self
    }

    /// Build the PackRenderer
    pub fn build(self) -> PackRenderer {
        let engine = if self.strict_mode {
            Engine::strict()
        } else {
            Engine::lenient()
        };

        let mut config = SubchartConfig::default();
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(dir) = self.subcharts_dir {
            config.subcharts_dir = dir;
        }
        if self.strict_mode {
            config.strict = true;
        }

        PackRenderer { engine, config }
    }
}

/// Evaluate a dot-path condition against values
///
/// Supports paths like "redis.enabled", "features.cache.memory"
fn evaluate_condition_path(condition: &str, values: &serde_json::Value) -> bool {
    condition_path_value(condition, values).unwrap_or(false)
}

/// Outcome of resolving a tag/condition dot-path: distinguishes "not set"
/// from "set to a non-bool value" from "set to a bool". Tags and conditions
/// (spec.md §4.3 step 3) only ever act on an actual bool; a non-bool value
/// is logged and otherwise ignored rather than coerced to truthy/falsy.
enum TagConditionValue {
    Missing,
    Bool(bool),
    NonBool,
}

/// Resolve a dot-path against values for tag/condition evaluation. Unlike
/// `condition_path_value`, this never coerces a non-bool leaf to a truthy
/// value — the caller decides what to do with `NonBool` (warn and ignore).
fn tag_condition_bool(path: &str, values: &serde_json::Value) -> TagConditionValue {
    let parts: Vec<&str> = path.split('.').collect();

    let mut current = values;
    for part in &parts {
        match current.get(part) {
            Some(v) => current = v,
            None => return TagConditionValue::Missing,
        }
    }

    match current {
        serde_json::Value::Bool(b) => TagConditionValue::Bool(*b),
        _ => TagConditionValue::NonBool,
    }
}

/// Resolve a dot-path against values, returning `None` if any segment along
/// the path is missing rather than coercing a missing path to `false`. This
/// distinction matters for tags/condition evaluation, where "not set" and
/// "set to a falsy value" are handled differently.
fn condition_path_value(path: &str, values: &serde_json::Value) -> Option<bool> {
    let parts: Vec<&str> = path.split('.').collect();

    let mut current = values;
    for part in &parts {
        current = current.get(part)?;
    }

    Some(match current {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    })
}

/// Apply a dependency's `import-values` paths: copy each listed subtree from
/// the child's resolved values into the parent at the same dotted path,
/// without overwriting anything the parent already set there.
fn apply_import_values(parent_json: &JsonValue, child_json: &JsonValue, import_paths: &[String]) -> JsonValue {
    if import_paths.is_empty() {
        return parent_json.clone();
    }

    let child_values = Values(child_json.clone());
    let mut overlay = Values::new();
    for path in import_paths {
        if let Some(value) = child_values.get(path) {
            let _ = overlay.set(path, value.clone());
        }
    }

    let parent_values = Values(parent_json.clone());
    parent_values.coalesce(&overlay).into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_condition_path_bool() {
        let values = serde_json::json!({
            "redis": {
                "enabled": true
            },
            "postgresql": {
                "enabled": false
            }
        });

        assert!(evaluate_condition_path("redis.enabled", &values));
        assert!(!evaluate_condition_path("postgresql.enabled", &values));
    }

    #[test]
    fn test_evaluate_condition_path_missing() {
        let values = serde_json::json!({
            "redis": {}
        });

        assert!(!evaluate_condition_path("redis.enabled", &values));
        assert!(!evaluate_condition_path("nonexistent.path", &values));
    }

    #[test]
    fn test_evaluate_condition_path_truthy() {
        let values = serde_json::json!({
            "string_yes": "yes",
            "string_empty": "",
            "number_one": 1,
            "number_zero": 0,
            "array_full": [1, 2],
            "array_empty": []
        });

        assert!(evaluate_condition_path("string_yes", &values));
        assert!(!evaluate_condition_path("string_empty", &values));
        assert!(evaluate_condition_path("number_one", &values));
        assert!(!evaluate_condition_path("number_zero", &values));
        assert!(evaluate_condition_path("array_full", &values));
        assert!(!evaluate_condition_path("array_empty", &values));
    }

    fn test_dependency(name: &str) -> Dependency {
        Dependency {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            repository: String::new(),
            condition: None,
            tags: vec![],
            alias: None,
            import_values: vec![],
            enabled: true,
        }
    }

    #[test]
    fn test_evaluate_dependency_tag_enables() {
        let renderer = PackRenderer::new(Engine::lenient());
        let mut dep = test_dependency("redis");
        dep.tags = vec!["caching".to_string()];

        let values = serde_json::json!({ "tags": { "caching": true } });
        let (enabled, reason) = renderer.evaluate_dependency(&dep, &values);
        assert!(enabled);
        assert!(reason.is_none());
    }

    #[test]
    fn test_evaluate_dependency_tag_all_false_disables() {
        let renderer = PackRenderer::new(Engine::lenient());
        let mut dep = test_dependency("redis");
        dep.tags = vec!["caching".to_string(), "optional".to_string()];

        let values = serde_json::json!({ "tags": { "caching": false, "optional": false } });
        let (enabled, reason) = renderer.evaluate_dependency(&dep, &values);
        assert!(!enabled);
        assert!(reason.is_some());
    }

    #[test]
    fn test_evaluate_dependency_tag_unset_defaults_enabled() {
        let renderer = PackRenderer::new(Engine::lenient());
        let mut dep = test_dependency("redis");
        dep.tags = vec!["caching".to_string()];

        let values = serde_json::json!({});
        let (enabled, _) = renderer.evaluate_dependency(&dep, &values);
        assert!(enabled);
    }

    #[test]
    fn test_evaluate_dependency_condition_overrides_tags() {
        let renderer = PackRenderer::new(Engine::lenient());
        let mut dep = test_dependency("redis");
        dep.tags = vec!["caching".to_string()];
        dep.condition = Some("redis.enabled".to_string());

        let values = serde_json::json!({
            "tags": { "caching": true },
            "redis": { "enabled": false }
        });
        let (enabled, reason) = renderer.evaluate_dependency(&dep, &values);
        assert!(!enabled, "condition should override the tag-enabled result");
        assert!(reason.unwrap().contains("redis.enabled"));
    }

    #[test]
    fn test_evaluate_dependency_condition_comma_list_first_match_wins() {
        let renderer = PackRenderer::new(Engine::lenient());
        let mut dep = test_dependency("redis");
        dep.condition = Some("missing.path, redis.enabled, other.path".to_string());

        let values = serde_json::json!({ "redis": { "enabled": true } });
        let (enabled, _) = renderer.evaluate_dependency(&dep, &values);
        assert!(enabled);
    }

    fn test_loaded_pack(dependencies: Vec<Dependency>) -> LoadedPack {
        use sherpack_core::{Pack, PackKind, PackMetadata};

        LoadedPack {
            pack: Pack {
                api_version: "sherpack/v1".to_string(),
                kind: PackKind::Application,
                metadata: PackMetadata {
                    name: "parent".to_string(),
                    version: semver::Version::new(1, 0, 0),
                    description: None,
                    app_version: None,
                    kube_version: None,
                    home: None,
                    icon: None,
                    sources: vec![],
                    keywords: vec![],
                    maintainers: vec![],
                    annotations: Default::default(),
                },
                dependencies,
                engine: Default::default(),
            },
            root: std::path::PathBuf::new(),
            templates_dir: std::path::PathBuf::new(),
            values_path: std::path::PathBuf::new(),
            schema_path: None,
        }
    }

    #[test]
    fn test_resolve_dependencies_removes_disabled_from_collection() {
        // Mirrors spec scenario S6: a parent declaring two tag-gated
        // subcharts, both disabled by a single top-level tag override.
        let renderer = PackRenderer::new(Engine::lenient());
        let mut b = test_dependency("b");
        b.tags = vec!["front".to_string()];
        let mut c = test_dependency("c");
        c.tags = vec!["front".to_string()];
        let kept = test_dependency("kept");

        let mut pack = test_loaded_pack(vec![b, c, kept]);
        let values = serde_json::json!({ "tags": { "front": false } });

        renderer.resolve_dependencies(&mut pack, &values);

        let names: Vec<&str> = pack
            .pack
            .dependencies
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["kept"]);
        assert!(
            !pack.pack.dependencies.iter().any(|d| d.name == "b" || d.name == "c"),
            "disabled dependencies must be absent from the collection itself, not just from rendering"
        );
    }

    #[test]
    fn test_apply_import_values_parent_wins_on_conflict() {
        let parent = serde_json::json!({ "service": { "port": 9999 } });
        let child = serde_json::json!({ "service": { "port": 6379, "type": "ClusterIP" } });

        let result = apply_import_values(&parent, &child, &["service".to_string()]);
        assert_eq!(result["service"]["port"], 9999);
        assert_eq!(result["service"]["type"], "ClusterIP");
    }

    #[test]
    fn test_apply_import_values_no_paths_is_noop() {
        let parent = serde_json::json!({ "a": 1 });
        let child = serde_json::json!({ "b": 2 });
        let result = apply_import_values(&parent, &child, &[]);
        assert_eq!(result, parent);
    }

    #[test]
    fn test_pack_renderer_builder() {
        let renderer = PackRenderer::builder()
            .strict(true)
            .max_depth(5)
            .subcharts_dir("deps")
            .build();

        assert_eq!(renderer.config.max_depth, 5);
        assert_eq!(renderer.config.subcharts_dir, "deps");
        assert!(renderer.config.strict);
    }

    #[test]
    fn test_pack_render_result_with_report_success() {
        let result = PackRenderResultWithReport {
            manifests: IndexMap::new(),
            notes: None,
            report: RenderReport::new(),
            discovery: DiscoveryResult::new(),
        };

        assert!(result.is_success());
    }

    #[test]
    fn test_discover_subcharts_with_fixture() {
        use std::path::PathBuf;

        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("fixtures/pack-with-subcharts");

        if !fixture_path.exists() {
            // Skip if fixture doesn't exist
            return;
        }

        let pack = LoadedPack::load(&fixture_path).expect("Failed to load fixture");
        let renderer = PackRenderer::new(Engine::lenient());

        let values = serde_json::json!({
            "redis": { "enabled": true },
            "postgresql": { "enabled": false }
        });

        let discovery = renderer.discover_subcharts(&pack, &values);

        // Should find both subcharts
        assert_eq!(discovery.subcharts.len(), 2);

        // Redis should be enabled
        let redis = discovery.subcharts.iter().find(|s| s.name == "redis");
        assert!(redis.is_some());
        assert!(redis.unwrap().enabled);

        // PostgreSQL should be disabled (statically disabled in Pack.yaml)
        let pg = discovery.subcharts.iter().find(|s| s.name == "postgresql");
        assert!(pg.is_some());
        assert!(!pg.unwrap().enabled);
    }

    #[test]
    fn test_render_pack_with_subcharts() {
        use std::path::PathBuf;
        use sherpack_core::ReleaseInfo;

        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("fixtures/pack-with-subcharts");

        if !fixture_path.exists() {
            return;
        }

        let pack = LoadedPack::load(&fixture_path).expect("Failed to load fixture");
        let renderer = PackRenderer::new(Engine::lenient());

        let values = Values::from_yaml(r#"
global:
  imageRegistry: docker.io
  pullPolicy: IfNotPresent
app:
  name: my-application
  replicas: 2
  image:
    repository: myapp
    tag: "1.0.0"
redis:
  enabled: true
  replicas: 3
  auth:
    enabled: true
    password: secret123
postgresql:
  enabled: false
"#).expect("Failed to parse values");

        let release = ReleaseInfo::for_install("test-release", "default");
        let context = TemplateContext::new(values, release, &pack.pack.metadata);

        let result = renderer.render(&pack, &context).expect("Render failed");

        // Should have parent manifest
        assert!(result.manifests.contains_key("deployment.yaml"));

        // Should have redis subchart manifest (prefixed)
        assert!(result.manifests.contains_key("redis/deployment.yaml"));

        // Should NOT have postgresql manifest (disabled)
        let has_postgresql = result.manifests.keys().any(|k| k.starts_with("postgresql/"));
        assert!(!has_postgresql, "PostgreSQL should be disabled");

        // Verify redis manifest uses scoped values
        let redis_manifest = result.manifests.get("redis/deployment.yaml").unwrap();
        assert!(redis_manifest.contains("replicas: 3"), "Should use parent's redis.replicas=3");
        assert!(redis_manifest.contains("REDIS_PASSWORD"), "Auth should be enabled");

        // Verify parent manifest has correct content
        let parent_manifest = result.manifests.get("deployment.yaml").unwrap();
        assert!(parent_manifest.contains("test-release-my-application"));
        assert!(parent_manifest.contains("REDIS_HOST"));
        assert!(!parent_manifest.contains("DATABASE_HOST"), "PostgreSQL env should not be present");
    }

    #[test]
    fn test_subchart_global_values_passed() {
        use std::path::PathBuf;
        use sherpack_core::ReleaseInfo;

        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("fixtures/pack-with-subcharts");

        if !fixture_path.exists() {
            return;
        }

        let pack = LoadedPack::load(&fixture_path).expect("Failed to load fixture");
        let renderer = PackRenderer::new(Engine::lenient());

        let values = Values::from_yaml(r#"
global:
  imageRegistry: my-registry.io
  pullPolicy: Always
app:
  name: my-app
  replicas: 1
  image:
    repository: myapp
    tag: "1.0"
redis:
  enabled: true
postgresql:
  enabled: false
"#).expect("Failed to parse values");

        let release = ReleaseInfo::for_install("test", "default");
        let context = TemplateContext::new(values, release, &pack.pack.metadata);

        let result = renderer.render(&pack, &context).expect("Render failed");

        // Redis manifest should use global.imageRegistry
        let redis_manifest = result.manifests.get("redis/deployment.yaml").unwrap();
        assert!(redis_manifest.contains("my-registry.io"), "Should use global imageRegistry");
    }
}
