use super::{
    download_cache::DownloadCache,
    fetcher::{FetchError, Fetcher},
    version::Version,
};
use ethers_solc::{artifacts::Severity, error::SolcError, CompilerInput, CompilerOutput, Solc};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum Error {
    #[error("compiler version not found: {0}")]
    VersionNotFound(Version),
    #[error("error while fetching compiler: {0:#}")]
    Fetch(#[from] FetchError),
    #[error("internal error while compiling: {0}")]
    Internal(#[from] SolcError),
    #[error("compilation error: {0:?}")]
    Compilation(Vec<String>),
}

#[async_trait::async_trait]
pub trait EvmCompiler: Send + Sync {
    async fn compile(
        &self,
        path: &Path,
        ver: &Version,
        input: &CompilerInput,
    ) -> Result<CompilerOutput, SolcError>;
}

/// Invokes an exact pinned compiler build on disk.
pub struct SolidityCompiler;

impl SolidityCompiler {
    pub fn new() -> Self {
        SolidityCompiler
    }
}

impl Default for SolidityCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EvmCompiler for SolidityCompiler {
    async fn compile(
        &self,
        path: &Path,
        _ver: &Version,
        input: &CompilerInput,
    ) -> Result<CompilerOutput, SolcError> {
        Solc::from(path).compile(input)
    }
}

pub struct Compilers<C> {
    cache: DownloadCache,
    fetcher: Arc<dyn Fetcher>,
    evm_compiler: C,
}

impl<C> Compilers<C>
where
    C: EvmCompiler,
{
    pub fn new(fetcher: Arc<dyn Fetcher>, evm_compiler: C) -> Self {
        Self {
            cache: DownloadCache::new(),
            fetcher,
            evm_compiler,
        }
    }

    /// Resolves the pinned compiler build and compiles `input` with it.
    ///
    /// There is no fallback to another version: reproducibility requires the
    /// exact pin, so an unknown version fails the request. All diagnostics of
    /// error severity are collected into [`Error::Compilation`]; warnings
    /// alone never fail a compilation.
    #[instrument(name = "download_and_compile", skip(self, input), level = "debug")]
    pub async fn compile(
        &self,
        compiler_version: &Version,
        input: &CompilerInput,
    ) -> Result<CompilerOutput, Error> {
        let path_result = self.cache.get(self.fetcher.as_ref(), compiler_version).await;
        let path = match path_result {
            Err(FetchError::NotFound(version)) => return Err(Error::VersionNotFound(version)),
            res => res?,
        };
        let output = {
            let span = tracing::debug_span!("compile contract", ver = compiler_version.to_string());
            let _guard = span.enter();
            self.evm_compiler
                .compile(&path, compiler_version, input)
                .await?
        };

        // Compilation errors, warnings and info messages are returned in `CompilerOutput.errors`
        let mut errors = Vec::new();
        for err in &output.errors {
            if err.severity == Severity::Error {
                errors.push(
                    err.formatted_message
                        .as_ref()
                        .unwrap_or(&err.message)
                        .clone(),
                )
            }
        }
        if !errors.is_empty() {
            return Err(Error::Compilation(errors));
        }

        Ok(output)
    }

    pub fn all_versions(&self) -> Vec<Version> {
        self.fetcher.all_versions()
    }

    pub async fn load_from_dir(&self, dir: &PathBuf) {
        match self.cache.load_from_dir(dir).await {
            Ok(_) => {}
            Err(e) => {
                tracing::error!("error during local compilers loading: {}", e)
            }
        };
    }
}
