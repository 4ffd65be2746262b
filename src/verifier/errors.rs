use crate::{
    compiler::{CompilersError, FetchError, Version},
    constructor_args::EncodeError,
    linker::LinkError,
    rpc,
};

/// Errors terminating a verification request.
///
/// A bytecode mismatch is not among them: it is a legitimate outcome reported
/// through [`VerificationStatus`], so that callers never confuse "could not
/// verify" with "verified as non-matching".
///
/// [`VerificationStatus`]: super::VerificationStatus
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error while fetching on-chain bytecode: {0:#}")]
    Network(#[from] rpc::Error),
    #[error("compiler version not found: {0}")]
    VersionNotFound(Version),
    #[error("error while fetching compiler: {0:#}")]
    CompilerLoad(FetchError),
    #[error("compilation error: {0:?}")]
    Compilation(Vec<String>),
    #[error("contract '{0}' is missing from the compiler output")]
    ContractNotFound(String),
    #[error("contract '{0}' has no deployed bytecode in the compiler output")]
    MissingBytecode(String),
    #[error("{0}")]
    UnresolvedLinkReference(#[from] LinkError),
    #[error("constructor arguments encoding failed: {0}")]
    ArgumentEncoding(#[from] EncodeError),
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<CompilersError> for Error {
    fn from(error: CompilersError) -> Self {
        match error {
            CompilersError::VersionNotFound(version) => Error::VersionNotFound(version),
            CompilersError::Fetch(err) => Error::CompilerLoad(err),
            CompilersError::Compilation(details) => Error::Compilation(details),
            err => Error::Internal(anyhow::anyhow!(err)),
        }
    }
}
