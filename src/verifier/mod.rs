mod contract_verifier;
mod errors;

pub use contract_verifier::{
    CompilerSettings, ContractVerifier, Success, VerificationRequest, VerificationStatus,
};
pub use errors::Error;
