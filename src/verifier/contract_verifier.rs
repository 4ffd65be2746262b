use super::errors::Error;
use crate::{
    compiler::{Compilers, EvmCompiler, Version},
    constructor_args, linker, metadata, rpc, DisplayBytes,
};
use ethers_core::types::Address;
use ethers_solc::{
    artifacts::{
        output_selection::OutputSelection, BytecodeObject, Contract, Settings, Source,
    },
    CompilerInput, CompilerOutput, EvmVersion,
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::instrument;

/// Compiler configuration supplied with a verification request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerSettings {
    pub optimizer_enabled: bool,
    pub optimizer_runs: usize,
    pub evm_version: Option<EvmVersion>,
}

/// All inputs of a single verification request. Requests are independent
/// units of work: nothing besides the compiler-binary cache is shared
/// between them.
#[derive(Clone, Debug)]
pub struct VerificationRequest {
    pub contract_address: Address,
    pub compiler_version: Version,
    pub sources: BTreeMap<PathBuf, String>,
    pub settings: CompilerSettings,
    /// Name of the compiled contract to extract and compare.
    pub contract_name: String,
    /// Library qualified names (or placeholder identifiers) mapped to
    /// deployed addresses.
    pub libraries: BTreeMap<String, Address>,
    /// Ordered `(type name, value)` pairs for the constructor.
    pub constructor_arguments: Vec<(String, String)>,
}

impl From<&VerificationRequest> for CompilerInput {
    fn from(request: &VerificationRequest) -> Self {
        let mut settings = Settings::default();
        settings.optimizer.enabled = Some(request.settings.optimizer_enabled);
        settings.optimizer.runs = Some(request.settings.optimizer_runs);
        settings.evm_version = request.settings.evm_version;
        settings.output_selection = OutputSelection(BTreeMap::from([(
            "*".to_string(),
            BTreeMap::from([(
                "*".to_string(),
                vec!["abi".to_string(), "evm.deployedBytecode".to_string()],
            )]),
        )]));

        CompilerInput {
            language: "Solidity".to_string(),
            sources: request
                .sources
                .iter()
                .map(|(name, content)| (name.clone(), Source::new(content.clone())))
                .collect(),
            settings,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Normalized bytecodes are byte-identical.
    Verified,
    /// Bytecodes differ beyond the metadata section. A legitimate outcome,
    /// not an error.
    Mismatched,
}

/// The structure returned when a verification request runs to completion.
#[derive(Clone, Debug)]
pub struct Success {
    pub status: VerificationStatus,
    pub file_path: String,
    pub contract_name: String,
    pub compiler_version: Version,
    pub abi: ethabi::Contract,
    pub abi_json: serde_json::Value,
    pub constructor_args: Option<DisplayBytes>,
    /// Normalized bytecode produced from the submitted sources.
    pub local_bytecode: String,
    /// Normalized bytecode fetched from the chain.
    pub on_chain_bytecode: String,
}

impl Success {
    /// Writes the ABI and the normalized local bytecode next to each other
    /// under `dir`, for callers that keep verification artifacts on disk.
    pub fn write_artifacts(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(
            dir.join(format!("{}_abi.json", self.contract_name)),
            serde_json::to_string_pretty(&self.abi_json)?,
        )?;
        std::fs::write(
            dir.join(format!("{}_bytecode.txt", self.contract_name)),
            &self.local_bytecode,
        )?;
        Ok(())
    }
}

/// Sequences one verification request: fetch the on-chain code and compile
/// the sources concurrently, link libraries into the compiled bytecode,
/// append the encoded constructor arguments, normalize both byte strings and
/// compare them.
pub struct ContractVerifier<C> {
    compilers: Compilers<C>,
    rpc_client: rpc::Client,
}

impl<C: EvmCompiler> ContractVerifier<C> {
    pub fn new(compilers: Compilers<C>, rpc_client: rpc::Client) -> Self {
        Self {
            compilers,
            rpc_client,
        }
    }

    #[instrument(
        skip(self, request),
        fields(contract = %request.contract_name, address = ?request.contract_address),
        level = "debug"
    )]
    pub async fn verify(&self, request: VerificationRequest) -> Result<Success, Error> {
        let compiler_input = CompilerInput::from(&request);

        // The two suspension points have no data dependency on each other.
        let (on_chain_code, compiler_output) = futures::join!(
            self.rpc_client.fetch_code(request.contract_address),
            self.compilers
                .compile(&request.compiler_version, &compiler_input)
        );
        let on_chain_code = on_chain_code?;
        let compiler_output = compiler_output?;

        let (file_path, contract) = find_contract(&compiler_output, &request.contract_name)
            .ok_or_else(|| Error::ContractNotFound(request.contract_name.clone()))?;
        let raw_bytecode = deployed_bytecode_object(contract)
            .filter(|object| !object.is_empty())
            .ok_or_else(|| Error::MissingBytecode(request.contract_name.clone()))?;
        let abi = contract
            .abi
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("abi is missing for contract '{}'", file_path))?;

        let linked = linker::link(&raw_bytecode, &request.libraries)?;
        let encoded_args = constructor_args::encode(&abi.abi, &request.constructor_arguments)?;
        let local_bytecode = format!("{}{}", linked, hex::encode(&encoded_args));

        let local_normalized = metadata::normalize(&local_bytecode).to_string();
        let on_chain_normalized = metadata::normalize(&on_chain_code).to_string();

        let status = if local_normalized == on_chain_normalized {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Mismatched
        };
        tracing::debug!(
            status = ?status,
            local_len = local_normalized.len(),
            on_chain_len = on_chain_normalized.len(),
            "verification finished"
        );

        Ok(Success {
            status,
            file_path,
            contract_name: request.contract_name,
            compiler_version: request.compiler_version,
            abi: abi.abi.clone(),
            abi_json: abi.abi_value.clone(),
            constructor_args: (!encoded_args.is_empty())
                .then(|| DisplayBytes::from(encoded_args)),
            local_bytecode: local_normalized,
            on_chain_bytecode: on_chain_normalized,
        })
    }
}

fn find_contract<'a>(
    output: &'a CompilerOutput,
    contract_name: &str,
) -> Option<(String, &'a Contract)> {
    output
        .contracts
        .iter()
        .find_map(|(path, contracts)| contracts.get(contract_name).map(|c| (path.clone(), c)))
}

/// Extracts the deployed-bytecode object as a `0x`-less hex string. The
/// object may still contain library placeholders; resolving them is the
/// linker's job.
fn deployed_bytecode_object(contract: &Contract) -> Option<String> {
    let bytecode = contract
        .evm
        .as_ref()?
        .deployed_bytecode
        .as_ref()?
        .bytecode
        .as_ref()?;
    let object = match &bytecode.object {
        BytecodeObject::Bytecode(bytes) => hex::encode(bytes),
        BytecodeObject::Unlinked(unlinked) => {
            unlinked.strip_prefix("0x").unwrap_or(unlinked).to_string()
        }
    };
    Some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn request() -> VerificationRequest {
        VerificationRequest {
            contract_address: Address::from_str("0x04C8E2582fb0f276EBDc79E6e5b30C3C881D0Fff")
                .unwrap(),
            compiler_version: Version::from_str("v0.8.24+commit.e11b9ed9").unwrap(),
            sources: BTreeMap::from([(
                PathBuf::from("HelloWorld.sol"),
                "contract HelloWorld {}".to_string(),
            )]),
            settings: CompilerSettings {
                optimizer_enabled: true,
                optimizer_runs: 200,
                evm_version: Some(EvmVersion::London),
            },
            contract_name: "HelloWorld".to_string(),
            libraries: BTreeMap::new(),
            constructor_arguments: vec![],
        }
    }

    #[test]
    fn builds_compiler_input() {
        let input = CompilerInput::from(&request());
        assert_eq!(input.language, "Solidity");
        assert_eq!(input.settings.optimizer.enabled, Some(true));
        assert_eq!(input.settings.optimizer.runs, Some(200));
        assert_eq!(input.settings.evm_version, Some(EvmVersion::London));
        let selection = serde_json::to_value(&input.settings.output_selection).unwrap();
        assert_eq!(
            selection,
            serde_json::json!({"*": {"*": ["abi", "evm.deployedBytecode"]}})
        );
        assert_eq!(
            input.sources.keys().collect::<Vec<_>>(),
            vec![&PathBuf::from("HelloWorld.sol")]
        );
    }

    #[test]
    fn extracts_linked_and_unlinked_bytecode_objects() {
        let contract: Contract = serde_json::from_value(serde_json::json!({
            "abi": [],
            "evm": {"deployedBytecode": {"object": "0x6001600255"}}
        }))
        .unwrap();
        assert_eq!(
            deployed_bytecode_object(&contract).unwrap(),
            "6001600255".to_string()
        );

        let unlinked = "6080__$1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e$__00";
        let contract: Contract = serde_json::from_value(serde_json::json!({
            "abi": [],
            "evm": {"deployedBytecode": {"object": unlinked}}
        }))
        .unwrap();
        assert_eq!(deployed_bytecode_object(&contract).unwrap(), unlinked);
    }
}
