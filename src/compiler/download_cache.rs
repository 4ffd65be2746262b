use super::{
    fetcher::{FetchError, Fetcher},
    version::Version,
};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tracing::Instrument;

/// Process-wide cache of fetched compiler binaries, keyed by exact version.
///
/// Entries are populated under a per-version write lock, so concurrent
/// requests for the same version wait for the in-flight fetch instead of
/// downloading twice, while requests for other versions proceed unaffected.
/// A request cancelled mid-fetch leaves the entry unpopulated and the next
/// caller repeats the fetch.
pub struct DownloadCache {
    cache: parking_lot::Mutex<HashMap<Version, Arc<tokio::sync::RwLock<Option<PathBuf>>>>>,
}

impl Default for DownloadCache {
    fn default() -> Self {
        Self {
            cache: parking_lot::Mutex::new(HashMap::new()),
        }
    }
}

impl DownloadCache {
    pub fn new() -> Self {
        Default::default()
    }

    async fn try_get(&self, ver: &Version) -> Option<PathBuf> {
        let entry = {
            let cache = self.cache.lock();
            cache.get(ver).cloned()
        };
        match entry {
            Some(lock) => {
                let file = lock.read().await;
                file.as_ref().cloned()
            }
            None => None,
        }
    }

    pub async fn get<D: Fetcher + ?Sized>(
        &self,
        fetcher: &D,
        ver: &Version,
    ) -> Result<PathBuf, FetchError> {
        match self.try_get(ver).await {
            Some(file) => Ok(file),
            None => {
                let span = tracing::debug_span!("fetch compiler", ver = ver.to_string());
                self.fetch(fetcher, ver).instrument(span).await
            }
        }
    }

    async fn fetch<D: Fetcher + ?Sized>(
        &self,
        fetcher: &D,
        ver: &Version,
    ) -> Result<PathBuf, FetchError> {
        let lock = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(ver.clone()).or_default())
        };
        let mut entry = lock.write().await;
        match entry.as_ref() {
            Some(file) => Ok(file.clone()),
            None => {
                tracing::info!(target: "compiler_cache", "installing compiler version {}", ver);
                let file = fetcher.fetch(ver).await?;
                *entry = Some(file.clone());
                Ok(file)
            }
        }
    }

    pub async fn load_from_dir(&self, dir: &PathBuf) -> std::io::Result<()> {
        let paths = read_dir_paths(dir)?;
        let versions = filter_versions(paths);
        self.add_versions(versions).await;
        Ok(())
    }

    async fn add_versions(&self, versions: HashMap<Version, PathBuf>) {
        for (version, path) in versions {
            let solc_path = path.join("solc");
            if solc_path.exists() {
                tracing::info!("found local compiler version {}", version);
                let lock = {
                    let mut cache = self.cache.lock();
                    Arc::clone(cache.entry(version.clone()).or_default())
                };
                *lock.write().await = Some(solc_path);
            } else {
                tracing::warn!(
                    "found version {} but file {:?} doesn't exist",
                    version,
                    solc_path
                );
            }
        }
    }
}

fn read_dir_paths(dir: &PathBuf) -> std::io::Result<impl Iterator<Item = PathBuf>> {
    let paths = std::fs::read_dir(dir)?.filter_map(|r| r.ok().map(|e| e.path()));
    Ok(paths)
}

fn filter_versions(dirs: impl Iterator<Item = PathBuf>) -> HashMap<Version, PathBuf> {
    dirs.filter_map(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .and_then(|n| n.parse().ok())
            .map(|v| (v, path))
    })
    .collect()
}
