use ethers_core::{types::Address, utils::keccak256};
use std::collections::BTreeMap;
use thiserror::Error;

const PLACEHOLDER_PREFIX: &str = "__$";
const PLACEHOLDER_SUFFIX: &str = "$__";
/// Length of the library identifier between the placeholder delimiters.
const PLACEHOLDER_ID_LENGTH: usize = 34;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    #[error("unresolved link reference '__${0}$__' remains in bytecode")]
    UnresolvedLinkReference(String),
}

/// Substitutes library placeholders inside a hex bytecode string with
/// concrete addresses.
///
/// Placeholders have the form `__$<34 hex chars>$__`, where the identifier is
/// the prefix of the keccak-256 hash of the fully qualified library name.
/// Map keys may be the qualified name itself (`file.sol:Library`), the raw
/// 34-character identifier, or the delimited placeholder. All libraries are
/// applied as one substitution pass over the map; each placeholder is replaced
/// globally and substitutions never overlap, as every identifier is distinct.
///
/// Fails if any placeholder pattern remains after all substitutions.
pub fn link(
    bytecode: &str,
    libraries: &BTreeMap<String, Address>,
) -> Result<String, LinkError> {
    let mut linked = bytecode.to_string();
    for (library, address) in libraries {
        let placeholder = format!(
            "{}{}{}",
            PLACEHOLDER_PREFIX,
            placeholder_id(library),
            PLACEHOLDER_SUFFIX
        );
        linked = linked.replace(&placeholder, &format!("{address:x}"));
    }

    match find_placeholder(&linked) {
        Some(id) => Err(LinkError::UnresolvedLinkReference(id.to_string())),
        None => Ok(linked),
    }
}

/// Derives the 34-character placeholder identifier for a library map key.
///
/// A key that is already a (possibly delimited) identifier is used as is;
/// anything else is treated as a fully qualified name and hashed the way the
/// compiler computes placeholders.
fn placeholder_id(library: &str) -> String {
    let trimmed = library
        .strip_prefix(PLACEHOLDER_PREFIX)
        .and_then(|rest| rest.strip_suffix(PLACEHOLDER_SUFFIX))
        .unwrap_or(library);
    if trimmed.len() == PLACEHOLDER_ID_LENGTH
        && trimmed.chars().all(|c| c.is_ascii_hexdigit())
    {
        return trimmed.to_lowercase();
    }

    let hash = keccak256(trimmed.as_bytes());
    hex::encode(hash)[..PLACEHOLDER_ID_LENGTH].to_string()
}

/// Returns the identifier of the first placeholder occurring in `bytecode`,
/// if any.
fn find_placeholder(bytecode: &str) -> Option<&str> {
    let mut search_start = 0;
    while let Some(offset) = bytecode[search_start..].find(PLACEHOLDER_PREFIX) {
        let id_start = search_start + offset + PLACEHOLDER_PREFIX.len();
        let id_end = id_start + PLACEHOLDER_ID_LENGTH;
        if bytecode.len() >= id_end + PLACEHOLDER_SUFFIX.len() {
            let id = &bytecode[id_start..id_end];
            if id.chars().all(|c| c.is_ascii_hexdigit())
                && &bytecode[id_end..id_end + PLACEHOLDER_SUFFIX.len()] == PLACEHOLDER_SUFFIX
            {
                return Some(id);
            }
        }
        search_start += offset + PLACEHOLDER_PREFIX.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const LIB1_ID: &str = "1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e";
    const LIB2_ID: &str = "ffeeddccbbaa99887766554433221100ff";

    fn address(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    #[test]
    fn links_multiple_libraries_at_original_offsets() {
        let bytecode = format!(
            "6080__${LIB1_ID}$__6001__${LIB2_ID}$__6002__${LIB1_ID}$__00"
        );
        let libraries = BTreeMap::from([
            (
                LIB1_ID.to_string(),
                address("0xe821ce713c06049aee02778eacfb25af6171a27f"),
            ),
            (
                LIB2_ID.to_string(),
                address("0x4c7c7ac2774f617f132eedc40f9718ee0830872f"),
            ),
        ]);

        let linked = link(&bytecode, &libraries).unwrap();
        assert_eq!(
            linked,
            "6080e821ce713c06049aee02778eacfb25af6171a27f\
             60014c7c7ac2774f617f132eedc40f9718ee0830872f\
             6002e821ce713c06049aee02778eacfb25af6171a27f00"
        );
        assert!(find_placeholder(&linked).is_none());
    }

    #[test]
    fn fails_on_unknown_library() {
        let bytecode = format!("6080__${LIB1_ID}$__6001__${LIB2_ID}$__");
        let libraries = BTreeMap::from([(
            LIB1_ID.to_string(),
            address("0xe821ce713c06049aee02778eacfb25af6171a27f"),
        )]);

        let err = link(&bytecode, &libraries).unwrap_err();
        assert_eq!(err, LinkError::UnresolvedLinkReference(LIB2_ID.to_string()));
    }

    #[test]
    fn accepts_delimited_and_qualified_keys() {
        let qualified_id = placeholder_id("contracts/math.sol:AddLib");
        let bytecode = format!("__${LIB1_ID}$__ff__${qualified_id}$__");
        let libraries = BTreeMap::from([
            (
                format!("__${LIB1_ID}$__"),
                address("0xe821ce713c06049aee02778eacfb25af6171a27f"),
            ),
            (
                "contracts/math.sol:AddLib".to_string(),
                address("0x4c7c7ac2774f617f132eedc40f9718ee0830872f"),
            ),
        ]);

        let linked = link(&bytecode, &libraries).unwrap();
        assert_eq!(
            linked,
            "e821ce713c06049aee02778eacfb25af6171a27fff4c7c7ac2774f617f132eedc40f9718ee0830872f"
        );
    }

    #[test]
    fn qualified_name_hashing_matches_keccak_prefix() {
        // keccak256("abc") == 4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45
        assert_eq!(placeholder_id("abc"), "4e03657aea45a94fc7d47ba826c8d667c0");
    }

    #[test]
    fn bytecode_without_placeholders_is_returned_unchanged() {
        let bytecode = "6080604052600080fd";
        assert_eq!(link(bytecode, &BTreeMap::new()).unwrap(), bytecode);
    }

    #[test]
    fn identifier_keys_are_case_insensitive() {
        // solc emits lowercase identifiers; keys are normalized to match.
        let bytecode = format!("6080__${LIB1_ID}$__");
        let libraries = BTreeMap::from([(
            LIB1_ID.to_uppercase(),
            address("0xe821ce713c06049aee02778eacfb25af6171a27f"),
        )]);
        let linked = link(&bytecode, &libraries).unwrap();
        assert_eq!(linked, "6080e821ce713c06049aee02778eacfb25af6171a27f");
    }
}
