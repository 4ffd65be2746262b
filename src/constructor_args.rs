use ethabi::{
    param_type::Reader,
    token::{LenientTokenizer, Token, Tokenizer},
    ParamType,
};
use mismatch::Mismatch;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum EncodeError {
    #[error("constructor argument count mismatch: {0}")]
    ArityMismatch(Mismatch<usize>),
    #[error("constructor parameter '{name}' type mismatch: {types}")]
    TypeMismatch { name: String, types: Mismatch<String> },
    #[error("invalid type name '{0}': {1}")]
    InvalidType(String, String),
    #[error("value '{value}' cannot be encoded as {type_name}: {message}")]
    InvalidValue {
        type_name: String,
        value: String,
        message: String,
    },
}

/// ABI-encodes constructor arguments against the constructor declared in the
/// contract ABI.
///
/// Argument count and declared parameter types must match the constructor
/// signature exactly. A contract without a constructor accepts only an empty
/// argument list and encodes to an empty byte string.
///
/// The result is appended by the caller as raw hex after the compiled
/// bytecode; this function itself is metadata-agnostic.
pub fn encode(
    abi: &ethabi::Contract,
    arguments: &[(String, String)],
) -> Result<Vec<u8>, EncodeError> {
    let params = abi
        .constructor()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();
    if params.len() != arguments.len() {
        return Err(EncodeError::ArityMismatch(Mismatch::new(
            params.len(),
            arguments.len(),
        )));
    }

    let mut tokens = Vec::with_capacity(arguments.len());
    for (param, (type_name, value)) in params.iter().zip(arguments) {
        let param_type = Reader::read(type_name)
            .map_err(|err| EncodeError::InvalidType(type_name.clone(), err.to_string()))?;
        if param_type != param.kind {
            return Err(EncodeError::TypeMismatch {
                name: param.name.clone(),
                types: Mismatch::new(param.kind.to_string(), param_type.to_string()),
            });
        }
        tokens.push(tokenize(&param_type, type_name, value)?);
    }

    Ok(ethabi::encode(&tokens))
}

fn tokenize(param_type: &ParamType, type_name: &str, value: &str) -> Result<Token, EncodeError> {
    LenientTokenizer::tokenize(param_type, value).map_err(|err| EncodeError::InvalidValue {
        type_name: type_name.to_string(),
        value: value.to_string(),
        message: err.to_string(),
    })
}
