/// Baud rate of the NESceptor UART.
pub const DEFAULT_BAUD: u32 = 4_000_000;

/// Maximum number of data bytes a single wire message can carry.
pub const MAX_MESSAGE_DATA: usize = 4;

/// Topic frame of every broadcast envelope.
pub const BROADCAST_TOPIC: &[u8] = b"smb";

/// Length prefix of each envelope frame (u32 LE).
pub const FRAME_LEN_PREFIX: usize = 4;

/// Upper bound on a single envelope frame. An encoded output for a busy
/// frame is tens of kilobytes; anything near this limit is corruption.
pub const MAX_ENVELOPE_FRAME: usize = 1 << 20;

/// Upper bound on the seat-name frame.
pub const MAX_SEAT_NAME: usize = 256;
