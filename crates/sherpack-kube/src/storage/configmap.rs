//! Kubernetes ConfigMap storage driver
//!
//! An alternative to `SecretsDriver` for clusters/teams that prefer release
//! state to be readable without Secret-read RBAC. Less secure (anyone who can
//! read ConfigMaps in the namespace can read release values), but otherwise
//! behaves the same: same compression, same encoding, same labels.
//!
//! Unlike `SecretsDriver`, this driver does not implement chunked storage for
//! oversized releases — `ChunkedStorage` is built specifically around
//! Secrets. A release exceeding `MAX_RESOURCE_SIZE` always fails here
//! regardless of the configured `LargeReleaseStrategy`; use `SecretsDriver`
//! for releases that may grow past the single-object limit.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;

use super::{
    decode_from_storage, encode_for_storage, storage_labels, CompressionMethod, StorageConfig,
    StorageDriver, MAX_RESOURCE_SIZE,
};
use crate::error::{KubeError, Result};
use crate::release::StoredRelease;

/// Kubernetes ConfigMap storage driver
pub struct ConfigMapDriver {
    client: Client,
    config: StorageConfig,
}

impl ConfigMapDriver {
    /// Create a new ConfigMap driver
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client, config })
    }

    /// Create with an existing client
    pub fn with_client(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    /// Get the ConfigMap API for a namespace
    fn configmaps_api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Build a ConfigMap from a release
    fn build_configmap(&self, release: &StoredRelease) -> Result<ConfigMap> {
        let encoded = encode_for_storage(release, &self.config)?;

        if encoded.len() > MAX_RESOURCE_SIZE {
            return Err(KubeError::ReleaseTooLarge {
                size: encoded.len(),
                max: MAX_RESOURCE_SIZE,
            });
        }

        let mut labels = storage_labels(release);
        labels.insert("sherpack.io/storage-driver".to_string(), "configmap".to_string());

        let compression_type = match self.config.compression {
            CompressionMethod::None => "none",
            CompressionMethod::Gzip { .. } => "gzip",
            CompressionMethod::Zstd { .. } => "zstd",
        };
        labels.insert("sherpack.io/compression".to_string(), compression_type.to_string());

        let mut data = BTreeMap::new();
        data.insert("release".to_string(), encoded);

        Ok(ConfigMap {
            metadata: ObjectMeta {
                name: Some(release.storage_key()),
                namespace: Some(release.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        })
    }

    /// Parse a release from a ConfigMap
    fn read_configmap(&self, cm: &ConfigMap) -> Result<StoredRelease> {
        let encoded = cm
            .data
            .as_ref()
            .and_then(|d| d.get("release"))
            .ok_or_else(|| KubeError::Storage("ConfigMap missing 'release' data".to_string()))?;

        let compression = cm
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get("sherpack.io/compression"))
            .map(|c| match c.as_str() {
                "none" => CompressionMethod::None,
                "gzip" => CompressionMethod::Gzip { level: 6 },
                "zstd" => CompressionMethod::Zstd { level: 3 },
                _ => self.config.compression,
            })
            .unwrap_or(self.config.compression);

        decode_from_storage(encoded, compression)
    }
}

#[async_trait]
impl StorageDriver for ConfigMapDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let api = self.configmaps_api(namespace);
        let key = format!("sh.sherpack.release.v1.{}.v{}", name, version);

        match api.get(&key).await {
            Ok(cm) => self.read_configmap(&cm),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        let history = self.history(namespace, name).await?;
        history.into_iter().next().ok_or_else(|| KubeError::ReleaseNotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }

    async fn list(
        &self,
        namespace: Option<&str>,
        name: Option<&str>,
        include_superseded: bool,
    ) -> Result<Vec<StoredRelease>> {
        let mut label_selector = "app.kubernetes.io/managed-by=sherpack".to_string();
        if let Some(n) = name {
            label_selector.push_str(&format!(",sherpack.io/release-name={}", n));
        }

        let lp = ListParams::default().labels(&label_selector);

        let configmaps = if let Some(ns) = namespace {
            self.configmaps_api(ns).list(&lp).await?
        } else {
            let api: Api<ConfigMap> = Api::all(self.client.clone());
            api.list(&lp).await?
        };

        let mut releases: Vec<StoredRelease> = Vec::new();
        for cm in &configmaps.items {
            if let Ok(r) = self.read_configmap(cm) {
                releases.push(r);
            }
        }

        releases.sort_by(|a, b| b.version.cmp(&a.version));

        if !include_superseded {
            let mut seen = std::collections::HashSet::new();
            releases.retain(|r| {
                let key = format!("{}/{}", r.namespace, r.name);
                seen.insert(key)
            });
        }

        Ok(releases)
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        let label_selector = format!(
            "app.kubernetes.io/managed-by=sherpack,sherpack.io/release-name={}",
            name
        );
        let lp = ListParams::default().labels(&label_selector);

        let configmaps = self.configmaps_api(namespace).list(&lp).await?;

        let mut releases: Vec<StoredRelease> = Vec::new();
        for cm in &configmaps.items {
            if let Ok(r) = self.read_configmap(cm) {
                releases.push(r);
            }
        }

        releases.sort_by(|a, b| b.version.cmp(&a.version));

        if releases.is_empty() {
            return Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }

        Ok(releases)
    }

    async fn create(&self, release: &StoredRelease) -> Result<()> {
        let api = self.configmaps_api(&release.namespace);

        match api.get(&release.storage_key()).await {
            Ok(_) => {
                return Err(KubeError::ReleaseAlreadyExists {
                    name: release.name.clone(),
                    namespace: release.namespace.clone(),
                });
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {}
            Err(e) => return Err(e.into()),
        }

        let cm = self.build_configmap(release)?;
        api.create(&PostParams::default(), &cm).await?;
        Ok(())
    }

    async fn update(&self, release: &StoredRelease) -> Result<()> {
        let api = self.configmaps_api(&release.namespace);
        let key = release.storage_key();
        let cm = self.build_configmap(release)?;
        api.replace(&key, &PostParams::default(), &cm).await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let release = self.get(namespace, name, version).await?;
        let key = format!("sh.sherpack.release.v1.{}.v{}", name, version);

        self.configmaps_api(namespace)
            .delete(&key, &DeleteParams::default())
            .await?;
        Ok(release)
    }

    async fn delete_all(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        let releases = self.history(namespace, name).await?;
        let api = self.configmaps_api(namespace);

        for release in &releases {
            let _ = api.delete(&release.storage_key(), &DeleteParams::default()).await;
        }

        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let release = StoredRelease::for_install(
            "myapp".to_string(),
            "default".to_string(),
            sherpack_core::PackMetadata {
                name: "test".to_string(),
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
            sherpack_core::Values::new(),
            "".to_string(),
        );

        assert_eq!(release.storage_key(), "sh.sherpack.release.v1.myapp.v1");
    }
}
