//! Chunk manifest codec.
//!
//! A manifest is an ordinary object whose payload reads
//! `tgstate-blob <filename> <ref1> <ref2> ...`. Concatenating the referenced
//! objects in order yields the original file. There is no escaping and no
//! checksum: a filename containing whitespace cannot be represented, and a
//! corrupted chunk is only noticed when reading it fails.

use thiserror::Error;

/// Fixed 12-byte token every manifest starts with.
pub const MAGIC: &[u8; 12] = b"tgstate-blob";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Manifest must reference at least one chunk")]
    Empty,
    #[error("Manifest token must be non-empty and free of whitespace: {0:?}")]
    InvalidToken(String),
    #[error("Malformed manifest: expected at least 2 tokens, found {0}")]
    Malformed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub file_name: String,
    pub chunks: Vec<String>,
}

/// Encode a manifest payload for `file_name` made of `chunks`, in order.
pub fn encode<S: AsRef<str>>(file_name: &str, chunks: &[S]) -> Result<String, ManifestError> {
    if chunks.is_empty() {
        return Err(ManifestError::Empty);
    }

    let mut payload = String::from_utf8_lossy(MAGIC).into_owned();
    for token in std::iter::once(file_name).chain(chunks.iter().map(|c| c.as_ref())) {
        check_token(token)?;
        payload.push(' ');
        payload.push_str(token);
    }
    Ok(payload)
}

/// True iff `window` starts with the manifest token. Prefix-only.
pub fn is_manifest(window: &[u8]) -> bool {
    window.starts_with(MAGIC)
}

/// Decode a manifest payload. The first token is taken to be the magic token
/// and is not re-checked.
pub fn decode(payload: &str) -> Result<Manifest, ManifestError> {
    let tokens: Vec<&str> = payload.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(ManifestError::Malformed(tokens.len()));
    }

    Ok(Manifest {
        file_name: tokens[1].to_string(),
        chunks: tokens[2..].iter().map(|t| t.to_string()).collect(),
    })
}

fn check_token(token: &str) -> Result<(), ManifestError> {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(ManifestError::InvalidToken(token.to_string()));
    }
    Ok(())
}
