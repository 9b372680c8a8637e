use rig::embeddings::Embedding;

/// Conversion from rig embeddings to the little-endian `f32` blobs stored
/// in `F32_BLOB` columns
pub trait EmbeddingConversion {
    fn to_f32(&self) -> Vec<f32>;
    fn to_blob(&self) -> Vec<u8>;
}

impl EmbeddingConversion for Embedding {
    fn to_f32(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn to_blob(&self) -> Vec<u8> {
        f32_blob(&self.to_f32())
    }
}

/// Encode a vector as a little-endian `f32` blob
pub fn f32_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}
