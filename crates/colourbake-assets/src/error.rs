use std::path::PathBuf;

/// Errors that can occur while importing and baking a model.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load glTF file '{0}': {1}")]
    GltfLoadFailed(PathBuf, String),

    #[error("I/O error on '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed colour metadata: {0}")]
    MetadataParse(#[source] serde_json::Error),

    #[error("failed to serialize colour metadata: {0}")]
    MetadataSerialize(#[source] serde_json::Error),

    #[error("mesh '{mesh}': {attribute} has {actual} entries, expected {expected}")]
    AttributeLengthMismatch {
        mesh: String,
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("mesh '{mesh}': submesh {submesh} index range {start}..{end} exceeds {len} indices")]
    SubmeshOutOfBounds {
        mesh: String,
        submesh: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("mesh '{mesh}': submesh index ranges leave a gap or overlap at index {offset} of {len}")]
    SubmeshRangesInvalid {
        mesh: String,
        offset: usize,
        len: usize,
    },

    #[error("mesh '{mesh}': submesh {submesh} vertex range {start}..{end} exceeds {len} vertices")]
    VertexRangeOutOfBounds {
        mesh: String,
        submesh: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("mesh '{mesh}': index {index} refers past the end of {len} vertices")]
    VertexIndexOutOfBounds { mesh: String, index: u32, len: usize },

    #[error("mesh '{0}': vertex count does not fit in 32-bit indices")]
    TooManyVertices(String),
}
