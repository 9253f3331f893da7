use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("already recording to {0}")]
    AlreadyRecording(String),
    #[error("not recording")]
    NotRecording,
    #[error("worker is shut down")]
    WorkerGone,
    #[error("protocol error: {0}")]
    Proto(#[from] racetap_proto::error::ProtoError),
}
