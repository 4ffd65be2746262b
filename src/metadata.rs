/// Hex encoding of the first bytes of the CBOR metadata map appended by solc,
/// i.e. a two-element map whose first key is `"ipfs"`.
pub const METADATA_MARKER: &str = "a2646970667358";

/// Strips the trailing metadata section from a hex bytecode string.
///
/// An optional `0x` prefix is removed, then the string is truncated at the
/// first occurrence of [`METADATA_MARKER`]. The metadata together with its
/// two-byte length suffix is dropped as a whole, since nothing semantic
/// follows the metadata in deployed bytecode. A string without the marker is
/// returned unchanged.
///
/// The marker bytes could in principle occur inside genuine code before the
/// real metadata block; truncating at the first occurrence is a deliberate
/// heuristic, since tightening it would change verification outcomes for
/// contracts whose code happens to contain the marker bytes.
pub fn normalize(bytecode: &str) -> &str {
    let bytecode = bytecode.strip_prefix("0x").unwrap_or(bytecode);
    match bytecode.find(METADATA_MARKER) {
        Some(index) => &bytecode[..index],
        None => bytecode,
    }
}
