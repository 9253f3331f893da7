use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("envelope frame too large: {0}")]
    FrameTooLarge(usize),
    #[error("seat name frame too large: {0}")]
    NameTooLarge(usize),
    #[error("seat name is not utf-8")]
    NameNotUtf8,
}
