//! Higher-level release store built on top of a [`StorageDriver`].
//!
//! `StorageDriver` exposes the raw per-revision CRUD operations; the
//! operations here combine those into the read patterns the release
//! controller actually needs (latest revision regardless of status, the
//! one `deployed` revision, history-bounded creation) without requiring
//! every driver implementation to duplicate that logic.

use crate::error::Result;
use crate::release::{ReleaseState, StoredRelease};
use crate::storage::StorageDriver;

/// Wraps a [`StorageDriver`] with the higher-level queries the release
/// controller needs.
pub struct ReleaseStore<S: StorageDriver> {
    driver: S,
}

impl<S: StorageDriver> ReleaseStore<S> {
    pub fn new(driver: S) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &S {
        &self.driver
    }

    /// The highest-revision release for `name`, regardless of status.
    /// This is what `get_latest` already returns on most drivers, but is
    /// named here to make the "any status" distinction from [`Self::deployed`]
    /// explicit at call sites.
    pub async fn last(&self, namespace: &str, name: &str) -> Result<Option<StoredRelease>> {
        match self.driver.get_latest(namespace, name).await {
            Ok(release) => Ok(Some(release)),
            Err(crate::KubeError::ReleaseNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The release currently in `Deployed` state, if any.
    ///
    /// At most one revision of a release should ever be `Deployed` at a
    /// time; install/upgrade/rollback all supersede the prior deployed
    /// revision before marking the new one deployed. The debug assertion
    /// below catches a driver or controller bug that left more than one
    /// revision deployed rather than silently returning an arbitrary one.
    pub async fn deployed(&self, namespace: &str, name: &str) -> Result<Option<StoredRelease>> {
        let history = match self.driver.history(namespace, name).await {
            Ok(history) => history,
            Err(crate::KubeError::ReleaseNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut deployed: Vec<&StoredRelease> = history
            .iter()
            .filter(|r| matches!(r.state, ReleaseState::Deployed))
            .collect();

        debug_assert!(
            deployed.len() <= 1,
            "release '{}' has {} revisions marked Deployed, expected at most one",
            name,
            deployed.len()
        );

        Ok(deployed.pop().cloned())
    }

    /// Create `release`, then purge the oldest non-deployed, non-pending
    /// revisions once the history for its name exceeds `max_history`.
    ///
    /// A `max_history` of `0` disables pruning, matching Helm's own
    /// `--history-max 0` convention.
    pub async fn create_with_history_limit(
        &self,
        release: &StoredRelease,
        max_history: u32,
    ) -> Result<()> {
        self.driver.create(release).await?;

        if max_history == 0 {
            return Ok(());
        }

        let mut history = self
            .driver
            .history(&release.namespace, &release.name)
            .await?;
        history.sort_by_key(|r| r.version);

        let prunable: Vec<&StoredRelease> = history
            .iter()
            .filter(|r| !matches!(r.state, ReleaseState::Deployed) && !r.state.is_pending())
            .collect();

        let excess = history.len().saturating_sub(max_history as usize);
        if excess == 0 {
            return Ok(());
        }

        for r in prunable.into_iter().take(excess) {
            self.driver
                .delete(&r.namespace, &r.name, r.version)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockStorageDriver;
    use sherpack_core::{PackMetadata, Values};
    use std::collections::HashMap;

    fn release(namespace: &str, name: &str, version: u32, state: ReleaseState) -> StoredRelease {
        let mut release = StoredRelease::for_install(
            name.to_string(),
            namespace.to_string(),
            PackMetadata {
                name: name.to_string(),
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
            Values::new(),
            String::new(),
        );
        release.version = version;
        release.state = state;
        release
    }

    #[tokio::test]
    async fn last_returns_none_when_absent() {
        let store = ReleaseStore::new(MockStorageDriver::new());
        assert!(store.last("default", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deployed_finds_the_one_deployed_revision() {
        let driver = MockStorageDriver::new();
        driver
            .create(&release("default", "app", 1, ReleaseState::Superseded))
            .await
            .unwrap();
        driver
            .create(&release("default", "app", 2, ReleaseState::Deployed))
            .await
            .unwrap();
        let store = ReleaseStore::new(driver);

        let deployed = store.deployed("default", "app").await.unwrap().unwrap();
        assert_eq!(deployed.version, 2);
    }

    #[tokio::test]
    async fn create_with_history_limit_prunes_oldest_non_deployed() {
        let driver = MockStorageDriver::new();
        let store = ReleaseStore::new(driver);

        for v in 1..=3 {
            store
                .create_with_history_limit(
                    &release("default", "app", v, ReleaseState::Superseded),
                    2,
                )
                .await
                .unwrap();
        }
        store
            .create_with_history_limit(&release("default", "app", 4, ReleaseState::Deployed), 2)
            .await
            .unwrap();

        let remaining = store.driver().history("default", "app").await.unwrap();
        let versions: HashMap<u32, ReleaseState> = remaining
            .into_iter()
            .map(|r| (r.version, r.state))
            .collect();
        assert!(!versions.contains_key(&1), "oldest revision should be pruned");
        assert!(versions.contains_key(&4));
    }
}
