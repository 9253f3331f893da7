use thiserror::Error;

/// Failures while decoding an output envelope payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("input shorter than the declared layout")]
    ShortInput,
    #[error("bad magic")]
    BadMagic,
    #[error("region length out of bounds: {region} = {len}")]
    LengthOutOfBounds { region: &'static str, len: u64 },
}

/// Failures while loading a baseline nametable cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed cache file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("page data is not base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("page for area {aid:#06x} page {page} has {len} bytes, expected 1024")]
    BadPageLen { aid: u16, page: i32, len: usize },
}
