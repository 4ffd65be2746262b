use super::{
    fetcher::{write_executable, FetchError, Fetcher},
    version::Version,
};
use crate::scheduler;
use async_trait::async_trait;
use cron::Schedule;
use primitive_types::H256;
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};
use thiserror::Error;
use url::Url;

mod json {
    use super::Version;
    use primitive_types::H256;
    use serde::Deserialize;
    use serde_with::{serde_as, DisplayFromStr};
    use url::Url;

    #[derive(Debug, Deserialize, PartialEq)]
    pub struct List {
        pub builds: Vec<CompilerInfo>,
    }

    #[serde_as]
    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct CompilerInfo {
        pub path: DownloadPath,
        #[serde_as(as = "DisplayFromStr")]
        pub long_version: Version,
        pub sha256: H256,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(untagged)]
    pub enum DownloadPath {
        Url(Url),
        Filename(String),
    }
}

type VersionsMap = HashMap<Version, CompilerInfo>;

#[derive(Debug, PartialEq, Clone)]
struct CompilerInfo {
    pub url: Url,
    pub sha256: H256,
}

#[derive(Error, Debug)]
pub enum ListError {
    #[error("fetching list json returned error: {0}")]
    ListJsonFetch(reqwest::Error),
    #[error("cannot parse list json file: {0}")]
    ParseListJson(reqwest::Error),
    #[error("error parsing 'path' field: {0}")]
    Path(url::ParseError),
}

async fn try_fetch_versions(
    client: &reqwest::Client,
    versions_list_url: &Url,
) -> Result<VersionsMap, ListError> {
    let list_json_file: json::List = client
        .get(versions_list_url.as_str())
        .send()
        .await
        .map_err(ListError::ListJsonFetch)?
        .json()
        .await
        .map_err(ListError::ParseListJson)?;
    try_parse_json_file(list_json_file, versions_list_url)
}

fn try_parse_json_file(
    list_json_file: json::List,
    versions_list_url: &Url,
) -> Result<VersionsMap, ListError> {
    let mut compiler_versions = HashMap::default();
    for json_compiler_info in list_json_file.builds {
        let version = json_compiler_info.long_version.clone();
        let compiler_info = CompilerInfo::try_from((json_compiler_info, versions_list_url))
            .map_err(ListError::Path)?;
        compiler_versions.insert(version, compiler_info);
    }
    Ok(compiler_versions)
}

impl TryFrom<(json::CompilerInfo, &Url)> for CompilerInfo {
    type Error = url::ParseError;

    fn try_from(
        (compiler_info, download_url): (json::CompilerInfo, &Url),
    ) -> Result<Self, Self::Error> {
        let url = match compiler_info.path {
            json::DownloadPath::Url(url) => url,
            // download_url ends with `.../list.json` but join() will replace this with `filename`
            json::DownloadPath::Filename(filename) => download_url.join(&filename)?,
        };
        Ok(Self {
            url,
            sha256: compiler_info.sha256,
        })
    }
}

#[derive(Default, Clone)]
struct Versions(Arc<parking_lot::RwLock<VersionsMap>>);

impl Versions {
    fn spawn_refresh_job(self, client: reqwest::Client, list_url: Url, cron_schedule: Schedule) {
        tracing::info!("spawn version refresh job");
        scheduler::spawn_job(cron_schedule, "refresh compiler versions", move || {
            let client = client.clone();
            let list_url = list_url.clone();
            let versions = self.clone();
            async move {
                let refresh_result = versions.refresh_versions(&client, &list_url).await;
                if let Err(err) = refresh_result {
                    tracing::error!("error during version refresh: {}", err);
                };
            }
        });
    }

    async fn refresh_versions(
        &self,
        client: &reqwest::Client,
        list_url: &Url,
    ) -> anyhow::Result<()> {
        tracing::info!("looking for new compiler versions");
        let fetched_versions = try_fetch_versions(client, list_url)
            .await
            .map_err(anyhow::Error::msg)?;
        let need_to_update = {
            let versions = self.0.read();
            fetched_versions != *versions
        };
        if need_to_update {
            let (old_len, new_len) = {
                let mut versions = self.0.write();
                let old_len = versions.len();
                *versions = fetched_versions;
                (old_len, versions.len())
            };
            tracing::info!(
                "found new compiler versions. old length: {}, new length: {}",
                old_len,
                new_len,
            );
        } else {
            tracing::info!("no new versions found")
        }
        Ok(())
    }
}

pub struct ListFetcher {
    client: reqwest::Client,
    compiler_versions: Versions,
    folder: PathBuf,
}

impl ListFetcher {
    /// Initializes the fetcher from a `list.json` document at `list_url`.
    ///
    /// All list and binary downloads are bounded by `fetch_timeout`; the
    /// version list is optionally refreshed on a cron schedule.
    pub async fn new(
        list_url: Url,
        folder: PathBuf,
        fetch_timeout: Duration,
        refresh_versions_schedule: Option<Schedule>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        let compiler_versions = try_fetch_versions(&client, &list_url)
            .await
            .map_err(anyhow::Error::msg)?;
        let compiler_versions = Versions(Arc::new(parking_lot::RwLock::new(compiler_versions)));
        if let Some(cron_schedule) = refresh_versions_schedule {
            compiler_versions
                .clone()
                .spawn_refresh_job(client.clone(), list_url, cron_schedule)
        }
        Ok(Self {
            client,
            compiler_versions,
            folder,
        })
    }
}

#[async_trait]
impl Fetcher for ListFetcher {
    async fn fetch(&self, ver: &Version) -> Result<PathBuf, FetchError> {
        let compiler_info = {
            let compiler_versions = self.compiler_versions.0.read();
            let compiler_info = compiler_versions
                .get(ver)
                .ok_or_else(|| FetchError::NotFound(ver.clone()))?;
            (*compiler_info).clone()
        };

        let response = self
            .client
            .get(compiler_info.url.to_string())
            .send()
            .await
            .map_err(anyhow::Error::msg)?;
        let bytes = response.bytes().await.map_err(anyhow::Error::msg)?;

        write_executable(bytes, compiler_info.sha256, &self.folder, ver).await
    }

    fn all_versions(&self) -> Vec<Version> {
        let compiler_versions = self.compiler_versions.0.read();
        compiler_versions
            .iter()
            .map(|(ver, _)| ver.clone())
            .collect()
    }
}
