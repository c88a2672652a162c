//! High-level Kubernetes client for Sherpack operations
//!
//! This module provides a unified interface for all Sherpack Kubernetes operations,
//! combining storage, rendering, hooks, health checks, and resource management.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use sherpack_core::{LoadedPack, ReleaseInfo, TemplateContext, Values};
use sherpack_engine::{Engine, PackRenderer};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::actions::{InstallOptions, RollbackOptions, UninstallOptions, UpgradeOptions};
use crate::diff::{DiffEngine, DiffResult};
use crate::error::{KubeError, Result};
use crate::health::{HealthCheckConfig, HealthChecker, HealthStatus};
use crate::hooks::{HookExecutor, HookPhase};
use crate::manifest::split_and_sort;
use crate::release::{ReleaseState, StoredRelease};
use crate::resources::ResourceManager;
use crate::storage::StorageDriver;

/// Per-(namespace, name) mutex registry enforcing the at-most-one-in-progress
/// invariant for install/upgrade/rollback/uninstall (see spec §5, §4.8).
/// Two different release names proceed fully in parallel; the same name is
/// serialized for the entire orchestration, not just the state check.
#[derive(Default)]
struct NameLocks {
    inner: StdMutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>,
}

impl NameLocks {
    fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, namespace: &str, name: &str) -> OwnedMutexGuard<()> {
        let key = (namespace.to_string(), name.to_string());
        let lock = {
            let mut map = self.inner.lock().unwrap();
            map.entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// High-level Kubernetes client for Sherpack
pub struct KubeClient<S: StorageDriver> {
    /// Kubernetes client
    client: kube::Client,

    /// Storage driver
    storage: S,

    /// Pack renderer (handles subchart discovery, value coalescing and recursive rendering)
    renderer: PackRenderer,

    /// Diff engine
    diff_engine: DiffEngine,

    /// At-most-one-in-progress lock registry, keyed by (namespace, name)
    locks: NameLocks,
}

impl<S: StorageDriver> KubeClient<S> {
    /// Create a new KubeClient with the given storage driver
    pub async fn new(storage: S) -> Result<Self> {
        let client = kube::Client::try_default().await?;
        let renderer = PackRenderer::new(Engine::builder().strict(true).build());
        let diff_engine = DiffEngine::new();

        Ok(Self {
            client,
            storage,
            renderer,
            diff_engine,
            locks: NameLocks::new(),
        })
    }

    /// Create with an existing Kubernetes client
    pub fn with_client(client: kube::Client, storage: S) -> Self {
        let renderer = PackRenderer::new(Engine::builder().strict(true).build());
        let diff_engine = DiffEngine::new();

        Self {
            client,
            storage,
            renderer,
            diff_engine,
            locks: NameLocks::new(),
        }
    }

    /// Get the underlying Kubernetes client
    pub fn kube_client(&self) -> &kube::Client {
        &self.client
    }

    /// Get the storage driver
    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========== Install ==========

    /// Install a pack as a new release
    pub async fn install(
        &self,
        pack: &LoadedPack,
        values: Values,
        options: &InstallOptions,
    ) -> Result<StoredRelease> {
        let _guard = self.locks.acquire(&options.namespace, &options.name).await;
        self.install_locked(pack, values, options).await
    }

    /// Install body, run while the caller already holds the per-name lock
    /// (or is acquiring it itself via `install`). Never call this directly
    /// from outside the lock — it would violate at-most-one-in-progress.
    async fn install_locked(
        &self,
        pack: &LoadedPack,
        values: Values,
        options: &InstallOptions,
    ) -> Result<StoredRelease> {
        // Check if a release with this name already has history. Reuse
        // (spec.md §4.8 Install step 1) is only permitted when the latest
        // row is `uninstalled` or `failed` and the caller opted in via
        // `reuse_name`; anything else (deployed, superseded, or any
        // pending-*/recovering state) rejects the install outright.
        let previous = match self.storage.get_latest(&options.namespace, &options.name).await {
            Ok(r) => Some(r),
            Err(KubeError::ReleaseNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let reused_version = if let Some(existing) = &previous {
            Self::reject_if_pending(existing)?;

            let reusable = matches!(
                existing.state,
                ReleaseState::Uninstalled | ReleaseState::Failed { .. }
            );
            if !reusable || !options.reuse_name {
                return Err(KubeError::ReleaseAlreadyExists {
                    name: options.name.clone(),
                    namespace: options.namespace.clone(),
                });
            }
            Some(existing.version + 1)
        } else {
            None
        };

        // Create template context
        let release_info = ReleaseInfo::for_install(&options.name, &options.namespace);
        let context = TemplateContext::new(values.clone(), release_info, &pack.pack.metadata);

        // Render templates, discovering and rendering any subcharts along the way
        let render_result = self
            .renderer
            .render(pack, &context)
            .map_err(|e| KubeError::Template(e.to_string()))?;

        // Split hook resources out of the rendered output and order both groups
        let manifests: HashMap<String, String> = render_result.manifests.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let split = split_and_sort(&manifests)?;

        // Create release
        let mut release = StoredRelease::for_install(
            options.name.clone(),
            options.namespace.clone(),
            pack.pack.metadata.clone(),
            values,
            split.manifest,
        );
        if let Some(version) = reused_version {
            // Revision numbers are strictly increasing per name even when
            // reusing a name (spec.md §4.7 invariant); a reused name does
            // not restart at revision 1.
            release.version = version;
        }
        release.notes = render_result.notes;
        release.hooks = split.hooks;

        // Add custom labels
        for (k, v) in &options.labels {
            release.labels.insert(k.clone(), v.clone());
        }

        // Dry run - just return what would be created
        if options.dry_run {
            return Ok(release);
        }

        // Show diff if requested
        if options.show_diff {
            // For install, show all resources as additions
            println!("Resources to be created:");
            for manifest in render_result.manifests.keys() {
                println!("  + {}", manifest);
            }
        }

        // Store the pending release
        self.storage.create(&release).await?;

        let resource_manager = self.resource_manager().await?;

        // Execute pre-install hooks
        let mut hook_executor = HookExecutor::new();
        if let Err(e) = hook_executor
            .execute_phase(
                &release.hooks,
                HookPhase::PreInstall,
                &release.name,
                &release.namespace,
                release.version,
                &resource_manager,
            )
            .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;
            return Err(e);
        }

        // Apply manifests to cluster
        if let Err(e) = self
            .apply_manifest(&release.namespace, &release.manifest, &release.name)
            .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;

            if options.atomic {
                // Cleanup on failure
                let _ = self.cleanup_release(&release).await;
            }

            return Err(e);
        }

        // Execute during-install hooks
        let _ = hook_executor
            .execute_phase(
                &release.hooks,
                HookPhase::DuringInstall,
                &release.name,
                &release.namespace,
                release.version,
                &resource_manager,
            )
            .await;

        // Wait for resources if requested
        if options.wait {
            let timeout = options.timeout.unwrap_or(chrono::Duration::minutes(5));
            let mut health_config = options.health_check.clone().unwrap_or_default();
            health_config.timeout = timeout;
            let checker = HealthChecker::new(health_config);

            let status = checker.check(&release, &self.client).await?;
            if !status.healthy {
                let err_msg = status.summary();
                release.mark_failed(err_msg.clone(), true);
                self.storage.update(&release).await?;

                if options.atomic {
                    let _ = self.cleanup_release(&release).await;
                }

                return Err(KubeError::HealthCheckFailed {
                    name: release.name.clone(),
                    message: err_msg,
                });
            }
        }

        // Execute post-install hooks
        if let Err(e) = hook_executor
            .execute_phase(
                &release.hooks,
                HookPhase::PostInstall,
                &release.name,
                &release.namespace,
                release.version,
                &resource_manager,
            )
            .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;

            if options.atomic {
                let _ = self.cleanup_release(&release).await;
            }

            return Err(e);
        }

        // Mark as deployed
        release.mark_deployed();
        self.storage.update(&release).await?;

        Ok(release)
    }

    // ========== Upgrade ==========

    /// Upgrade an existing release
    pub async fn upgrade(
        &self,
        pack: &LoadedPack,
        values: Values,
        options: &UpgradeOptions,
    ) -> Result<StoredRelease> {
        let _guard = self.locks.acquire(&options.namespace, &options.name).await;
        self.upgrade_locked(pack, values, options).await
    }

    async fn upgrade_locked(
        &self,
        pack: &LoadedPack,
        values: Values,
        options: &UpgradeOptions,
    ) -> Result<StoredRelease> {
        // Get existing release
        let existing = match self
            .storage
            .get_latest(&options.namespace, &options.name)
            .await
        {
            Ok(r) => Some(r),
            Err(KubeError::ReleaseNotFound { .. }) if options.install => None,
            Err(e) => return Err(e),
        };

        // If no existing release and install flag set, do install
        if existing.is_none() {
            let install_opts = InstallOptions {
                name: options.name.clone(),
                namespace: options.namespace.clone(),
                wait: options.wait,
                timeout: options.timeout,
                health_check: options.health_check.clone(),
                atomic: options.atomic,
                dry_run: options.dry_run,
                show_diff: options.show_diff,
                labels: options.labels.clone(),
                description: options.description.clone(),
                ..Default::default()
            };
            return self.install_locked(pack, values, &install_opts).await;
        }

        let existing = existing.unwrap();

        // Check for stuck/in-progress state
        Self::reject_if_pending(&existing)?;

        // Merge values
        let final_values = if options.reset_values {
            values
        } else if options.reuse_values {
            let mut merged = existing.values.clone();
            merged.merge(&values);
            merged
        } else {
            values
        };

        // Create template context
        let release_info =
            ReleaseInfo::for_upgrade(&options.name, &options.namespace, existing.version + 1);
        let context = TemplateContext::new(final_values.clone(), release_info, &pack.pack.metadata);

        // Render templates, discovering and rendering any subcharts along the way
        let render_result = self
            .renderer
            .render(pack, &context)
            .map_err(|e| KubeError::Template(e.to_string()))?;

        // Split hook resources out of the rendered output and order both groups
        let manifests: HashMap<String, String> = render_result.manifests.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let split = split_and_sort(&manifests)?;

        // Create new release
        let mut release = StoredRelease::for_upgrade(&existing, final_values, split.manifest);
        release.notes = render_result.notes;
        release.hooks = split.hooks;

        // Add custom labels
        for (k, v) in &options.labels {
            release.labels.insert(k.clone(), v.clone());
        }

        // Show diff if requested
        if options.show_diff {
            let diff = self.diff_engine.diff_releases(&existing, &release);
            println!("Changes: {}", self.diff_engine.summary(&diff));
            // TODO: Print detailed diff
        }

        // Dry run
        if options.dry_run {
            return Ok(release);
        }

        // Store the pending release
        self.storage.create(&release).await?;

        // Mark previous as superseded
        let mut prev = existing;
        prev.mark_superseded();
        self.storage.update(&prev).await?;

        let resource_manager = self.resource_manager().await?;

        // Execute pre-upgrade hooks
        let mut hook_executor = HookExecutor::new();
        if !options.no_hooks
            && let Err(e) = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::PreUpgrade,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;

            if options.atomic {
                return self.rollback_to_locked(&release, prev.version).await;
            }
            return Err(e);
        }

        // Apply manifests
        if let Err(e) = self
            .apply_manifest(&release.namespace, &release.manifest, &release.name)
            .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;

            if options.atomic {
                return self.rollback_to_locked(&release, prev.version).await;
            }
            return Err(e);
        }

        // Execute during-upgrade hooks
        if !options.no_hooks {
            let _ = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::DuringUpgrade,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await;
        }

        // Wait for resources
        if options.wait {
            let mut health_config = options.health_check.clone().unwrap_or_default();
            if let Some(timeout) = options.timeout {
                health_config.timeout = timeout;
            }
            let checker = HealthChecker::new(health_config);

            let status = checker.check(&release, &self.client).await?;
            if !status.healthy {
                let err_msg = status.summary();
                release.mark_failed(err_msg.clone(), true);
                self.storage.update(&release).await?;

                if options.atomic {
                    return self.rollback_to_locked(&release, prev.version).await;
                }

                return Err(KubeError::HealthCheckFailed {
                    name: release.name.clone(),
                    message: err_msg,
                });
            }
        }

        // Execute post-upgrade hooks
        if !options.no_hooks
            && let Err(e) = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::PostUpgrade,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;

            if options.atomic {
                return self.rollback_to_locked(&release, prev.version).await;
            }
            return Err(e);
        }

        // Mark as deployed
        release.mark_deployed();
        self.storage.update(&release).await?;

        // Cleanup old releases
        if let Some(max_history) = options.max_history {
            self.cleanup_history(&release.namespace, &release.name, max_history)
                .await?;
        }

        Ok(release)
    }

    // ========== Uninstall ==========

    /// Uninstall a release
    pub async fn uninstall(&self, options: &UninstallOptions) -> Result<StoredRelease> {
        let _guard = self.locks.acquire(&options.namespace, &options.name).await;
        self.uninstall_locked(options).await
    }

    async fn uninstall_locked(&self, options: &UninstallOptions) -> Result<StoredRelease> {
        // Get existing release
        let mut release = self
            .storage
            .get_latest(&options.namespace, &options.name)
            .await?;

        // Reject if another operation (install/upgrade/rollback) is still
        // in flight on this release — NameLocks alone doesn't catch this,
        // it only serializes concurrent callers against each other.
        Self::reject_if_pending(&release)?;

        // Update state
        release.state = ReleaseState::PendingUninstall {
            started_at: chrono::Utc::now(),
            timeout: options.timeout.unwrap_or(chrono::Duration::minutes(5)),
        };
        self.storage.update(&release).await?;

        // Dry run
        if options.dry_run {
            return Ok(release);
        }

        let resource_manager = self.resource_manager().await?;

        // Execute pre-delete hooks
        let mut hook_executor = HookExecutor::new();
        if !options.no_hooks {
            let _ = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::PreDelete,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await;
        }

        // Delete resources
        if let Err(e) = self
            .delete_manifest(&release.namespace, &release.manifest)
            .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;
            return Err(e);
        }

        // Execute post-delete hooks
        if !options.no_hooks {
            let _ = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::PostDelete,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await;
        }

        // Mark as uninstalled
        release.mark_uninstalled();
        self.storage.update(&release).await?;

        // Delete history unless keep_history
        if !options.keep_history {
            self.storage
                .delete_all(&options.namespace, &options.name)
                .await?;
        }

        Ok(release)
    }

    // ========== Rollback ==========

    /// Rollback to a previous revision
    pub async fn rollback(&self, options: &RollbackOptions) -> Result<StoredRelease> {
        let _guard = self.locks.acquire(&options.namespace, &options.name).await;
        self.rollback_locked(options).await
    }

    async fn rollback_locked(&self, options: &RollbackOptions) -> Result<StoredRelease> {
        // Get history
        let history = self
            .storage
            .history(&options.namespace, &options.name)
            .await?;

        if history.is_empty() {
            return Err(KubeError::ReleaseNotFound {
                name: options.name.clone(),
                namespace: options.namespace.clone(),
            });
        }

        // Determine target revision
        let target_version = if options.revision == 0 {
            // Rollback to previous
            if history.len() < 2 {
                return Err(KubeError::RollbackNotPossible {
                    name: options.name.clone(),
                    reason: "no previous revision available".to_string(),
                });
            }
            history[1].version
        } else {
            options.revision
        };

        // Find target release
        let target = history
            .iter()
            .find(|r| r.version == target_version)
            .ok_or_else(|| KubeError::RollbackNotPossible {
                name: options.name.clone(),
                reason: format!("revision {} not found", target_version),
            })?;

        let current = &history[0];

        // Reject if another operation is still in flight on this release.
        Self::reject_if_pending(current)?;

        // Show diff if requested
        if options.show_diff {
            let diff = self.diff_engine.diff_releases(current, target);
            println!("Rollback changes: {}", self.diff_engine.summary(&diff));
        }

        // Dry run
        if options.dry_run {
            return Ok(target.clone());
        }

        // Create new release based on target
        let mut release =
            StoredRelease::for_upgrade(current, target.values.clone(), target.manifest.clone());
        // `for_upgrade` defaults hooks to the previous (current) release's —
        // rollback must run the hooks of the revision being rolled back to.
        release.hooks = target.hooks.clone();
        release.state = ReleaseState::PendingRollback {
            started_at: chrono::Utc::now(),
            timeout: options.timeout.unwrap_or(chrono::Duration::minutes(5)),
            target_version,
        };

        // Store pending release
        self.storage.create(&release).await?;

        // Mark current as superseded
        let mut prev = current.clone();
        prev.mark_superseded();
        self.storage.update(&prev).await?;

        let resource_manager = self.resource_manager().await?;

        // Execute pre-rollback hooks
        let mut hook_executor = HookExecutor::new();
        if !options.no_hooks
            && let Err(e) = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::PreRollback,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;
            return Err(e);
        }

        // Apply target manifest
        if let Err(e) = self
            .apply_manifest(&release.namespace, &release.manifest, &release.name)
            .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;
            return Err(e);
        }

        // Wait for resources
        if options.wait {
            let mut health_config = options.health_check.clone().unwrap_or_default();
            if let Some(timeout) = options.timeout {
                health_config.timeout = timeout;
            }
            let checker = HealthChecker::new(health_config);

            let status = checker.check(&release, &self.client).await?;
            if !status.healthy {
                let err_msg = status.summary();
                release.mark_failed(err_msg.clone(), true);
                self.storage.update(&release).await?;
                return Err(KubeError::HealthCheckFailed {
                    name: release.name.clone(),
                    message: err_msg,
                });
            }
        }

        // Execute post-rollback hooks
        if !options.no_hooks
            && let Err(e) = hook_executor
                .execute_phase(
                    &release.hooks,
                    HookPhase::PostRollback,
                    &release.name,
                    &release.namespace,
                    release.version,
                    &resource_manager,
                )
                .await
        {
            release.mark_failed(e.to_string(), true);
            self.storage.update(&release).await?;
            return Err(e);
        }

        // Mark as deployed
        release.mark_deployed();
        self.storage.update(&release).await?;

        // Cleanup old releases
        if let Some(max_history) = options.max_history {
            self.cleanup_history(&release.namespace, &release.name, max_history)
                .await?;
        }

        Ok(release)
    }

    // ========== Query Operations ==========

    /// List releases
    pub async fn list(
        &self,
        namespace: Option<&str>,
        all_namespaces: bool,
    ) -> Result<Vec<StoredRelease>> {
        let ns = if all_namespaces { None } else { namespace };
        self.storage.list(ns, None, false).await
    }

    /// Get release history
    pub async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        self.storage.history(namespace, name).await
    }

    /// Get release status
    pub async fn status(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        self.storage.get_latest(namespace, name).await
    }

    /// Get health status
    pub async fn health(
        &self,
        namespace: &str,
        name: &str,
        config: Option<HealthCheckConfig>,
    ) -> Result<HealthStatus> {
        let release = self.storage.get_latest(namespace, name).await?;
        let checker = HealthChecker::new(config.unwrap_or_default());
        checker.check_once(&release, &self.client).await
    }

    /// Diff between two revisions
    pub async fn diff(
        &self,
        namespace: &str,
        name: &str,
        revision1: u32,
        revision2: u32,
    ) -> Result<DiffResult> {
        let r1 = self.storage.get(namespace, name, revision1).await?;
        let r2 = self.storage.get(namespace, name, revision2).await?;
        Ok(self.diff_engine.diff_releases(&r1, &r2))
    }

    /// Recover a stuck release
    pub async fn recover(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        let mut release = self.storage.get_latest(namespace, name).await?;

        if !release.state.is_pending() {
            return Err(KubeError::InvalidConfig(format!(
                "release '{}' is not in a pending state",
                name
            )));
        }

        release.mark_failed("Manually recovered from stuck state".to_string(), true);
        self.storage.update(&release).await?;

        Ok(release)
    }

    // ========== Internal Helpers ==========

    /// Enforce the at-most-one-in-progress invariant (spec.md §5, §4.8):
    /// reject the operation if `existing` is mid pending-* / recovering.
    /// `NameLocks` alone only serializes operations against each other; it
    /// does nothing to stop a *new* operation from starting against a
    /// release that's already mid-flight, which is what this checks.
    fn reject_if_pending(existing: &StoredRelease) -> Result<()> {
        if !existing.state.is_pending() {
            return Ok(());
        }

        if existing.is_stuck() {
            Err(KubeError::StuckRelease {
                name: existing.name.clone(),
                status: existing.state.status_name().to_string(),
                elapsed: existing
                    .state
                    .elapsed()
                    .map(|d| format!("{} seconds", d.num_seconds()))
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        } else {
            Err(KubeError::OperationInProgress {
                name: existing.name.clone(),
                status: existing.state.to_string(),
            })
        }
    }

    /// Create a ResourceManager for Kubernetes operations
    async fn resource_manager(&self) -> Result<ResourceManager> {
        ResourceManager::new(self.client.clone()).await
    }

    /// Apply a manifest to the cluster using Server-Side Apply
    async fn apply_manifest(&self, namespace: &str, manifest: &str, release_name: &str) -> Result<()> {
        let manager = self.resource_manager().await?;
        let summary = manager
            .apply_manifest(namespace, manifest, release_name, false)
            .await?;

        if !summary.is_success() {
            let errors: Vec<String> = summary
                .failed
                .iter()
                .map(|(name, err)| format!("{}: {}", name, err))
                .collect();
            return Err(KubeError::InvalidConfig(format!(
                "Failed to apply resources: {}",
                errors.join("; ")
            )));
        }

        Ok(())
    }

    /// Apply a manifest in dry-run mode (validate without applying)
    #[allow(dead_code)]
    async fn apply_manifest_dry_run(
        &self,
        namespace: &str,
        manifest: &str,
        release_name: &str,
    ) -> Result<crate::resources::OperationSummary> {
        let manager = self.resource_manager().await?;
        manager
            .apply_manifest(namespace, manifest, release_name, true)
            .await
    }

    /// Delete resources from a manifest
    async fn delete_manifest(&self, namespace: &str, manifest: &str) -> Result<()> {
        let manager = self.resource_manager().await?;
        let summary = manager.delete_manifest(namespace, manifest, false).await?;

        if !summary.is_success() {
            let errors: Vec<String> = summary
                .failed
                .iter()
                .map(|(name, err)| format!("{}: {}", name, err))
                .collect();
            return Err(KubeError::InvalidConfig(format!(
                "Failed to delete resources: {}",
                errors.join("; ")
            )));
        }

        Ok(())
    }

    /// Cleanup failed release resources
    async fn cleanup_release(&self, release: &StoredRelease) -> Result<()> {
        // Delete all resources from the manifest
        self.delete_manifest(&release.namespace, &release.manifest)
            .await
    }

    /// Rollback to a specific version (internal, used for atomic operations).
    /// Called only from within `upgrade_locked`, which already holds this
    /// release name's lock — must not reacquire it.
    async fn rollback_to_locked(
        &self,
        current: &StoredRelease,
        target_version: u32,
    ) -> Result<StoredRelease> {
        // Verify the target release exists
        let _target = self
            .storage
            .get(&current.namespace, &current.name, target_version)
            .await?;

        // Create rollback options
        let options = RollbackOptions {
            name: current.name.clone(),
            namespace: current.namespace.clone(),
            revision: target_version,
            wait: true,
            timeout: Some(chrono::Duration::minutes(5)),
            ..Default::default()
        };

        // Perform the rollback
        self.rollback_locked(&options).await
    }

    /// Cleanup old releases beyond max_history
    async fn cleanup_history(&self, namespace: &str, name: &str, max_history: u32) -> Result<()> {
        let history = self.storage.history(namespace, name).await?;

        if history.len() as u32 <= max_history {
            return Ok(());
        }

        // Delete oldest releases beyond max_history
        for release in history.iter().skip(max_history as usize) {
            self.storage
                .delete(namespace, name, release.version)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would go here
    // They require a running Kubernetes cluster
}
