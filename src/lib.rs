mod compiler;
mod constructor_args;
mod consts;
mod linker;
mod metadata;
mod rpc;
mod scheduler;
mod settings;
mod verifier;

pub use ethers_core::types::Bytes as DisplayBytes;

pub use compiler::{
    Compilers, CompilersError, DownloadCache, EvmCompiler, FetchError, Fetcher, ListFetcher,
    SolidityCompiler, Version,
};
pub use consts::DEFAULT_COMPILER_LIST;
pub use constructor_args::EncodeError;
pub use linker::LinkError;
pub use metadata::normalize;
pub use rpc::{Client as RpcClient, Error as RpcError};
pub use settings::Settings;
pub use verifier::{
    CompilerSettings, ContractVerifier, Error as VerificationError, Success as VerificationSuccess,
    VerificationRequest, VerificationStatus,
};
