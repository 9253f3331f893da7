//! Byte-level state machine for the NESceptor framing.
//!
//! A frame is 2 to 6 bytes: a type byte (high bit set, low 7 bits the type
//! code), a size byte (high bit clear, bits 6..4 the data count, bits 3..0
//! the high bit of each potential data byte) and 0..4 data bytes (high bit
//! clear, low 7 bits OR'd under the seeded high bit). Only the type byte
//! ever has its high bit set, which is the sole resynchronization primitive:
//! any framing error drops back to `Waiting` and bytes are ignored until the
//! next type byte.

use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Waiting,
    ExpectingType,
    ExpectingSize,
    ExpectingData,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// Byte consumed, frame incomplete.
    Again,
    /// Frame complete; `Parser::message()` is valid until the next byte.
    Success,
    /// Non-framed byte skipped while resynchronizing.
    ByteIgnored,
    /// Framing violation; the parser has reset itself.
    Error(ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("type byte without high bit")]
    InvalidTypeNoHighBit,
    #[error("size byte with high bit set")]
    InvalidSizeHighBitSet,
    #[error("size field exceeds four data bytes")]
    InvalidSizeTooLarge,
    #[error("data byte with high bit set")]
    InvalidDataHighBitSet,
}

impl ParseStatus {
    pub fn is_error(self) -> bool {
        matches!(self, ParseStatus::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct Parser {
    state: ParserState,
    index: u8,
    kind: u8,
    size: u8,
    data: [u8; 4],
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Waiting,
            index: 0,
            kind: 0,
            size: 0,
            data: [0; 4],
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Drop any partial frame and wait for the next type byte.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The completed message. Only meaningful directly after `feed`
    /// returned [`ParseStatus::Success`].
    pub fn message(&self) -> Message {
        Message {
            kind: self.kind,
            size: self.size,
            data: self.data,
        }
    }

    pub fn feed(&mut self, byte: u8) -> ParseStatus {
        let high = byte & 0x80 != 0;
        match self.state {
            ParserState::Waiting => {
                if !high {
                    return ParseStatus::ByteIgnored;
                }
                // A type byte ends resynchronization.
                self.begin_frame(byte)
            }
            ParserState::ExpectingType => {
                if !high {
                    self.reset();
                    return ParseStatus::Error(ParseError::InvalidTypeNoHighBit);
                }
                self.begin_frame(byte)
            }
            ParserState::ExpectingSize => {
                if high {
                    self.reset();
                    return ParseStatus::Error(ParseError::InvalidSizeHighBitSet);
                }
                let size = (byte >> 4) & 0x07;
                if size > 4 {
                    self.reset();
                    return ParseStatus::Error(ParseError::InvalidSizeTooLarge);
                }
                self.size = size;
                // Bits 3..0 seed the high bit of data[0]..data[3].
                for i in 0..4 {
                    self.data[i] = ((byte >> (3 - i)) & 0x01) << 7;
                }
                self.index = 0;
                if size == 0 {
                    self.state = ParserState::ExpectingType;
                    ParseStatus::Success
                } else {
                    self.state = ParserState::ExpectingData;
                    ParseStatus::Again
                }
            }
            ParserState::ExpectingData => {
                if high {
                    self.reset();
                    return ParseStatus::Error(ParseError::InvalidDataHighBitSet);
                }
                self.data[self.index as usize] |= byte;
                self.index += 1;
                if self.index == self.size {
                    self.state = ParserState::ExpectingType;
                    ParseStatus::Success
                } else {
                    ParseStatus::Again
                }
            }
        }
    }

    fn begin_frame(&mut self, type_byte: u8) -> ParseStatus {
        self.kind = type_byte & 0x7f;
        self.size = 0;
        self.index = 0;
        self.data = [0; 4];
        self.state = ParserState::ExpectingSize;
        ParseStatus::Again
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed_all(parser: &mut Parser, bytes: &[u8]) -> Vec<ParseStatus> {
        bytes.iter().map(|&b| parser.feed(b)).collect()
    }

    #[test]
    fn size_only_message() {
        let mut p = Parser::new();
        let statuses = feed_all(&mut p, &[0x8a, 0x00]);
        assert_eq!(statuses, vec![ParseStatus::Again, ParseStatus::Success]);
        let msg = p.message();
        assert_eq!(msg.kind, 0x0a);
        assert_eq!(msg.size, 0);
        assert_eq!(msg.data, [0, 0, 0, 0]);
    }

    #[test]
    fn single_data_byte_with_seeded_high_bit() {
        let mut p = Parser::new();
        let statuses = feed_all(&mut p, &[0xa1, 0x18, 0x7f]);
        assert_eq!(
            statuses,
            vec![ParseStatus::Again, ParseStatus::Again, ParseStatus::Success]
        );
        let msg = p.message();
        assert_eq!(msg.kind, 0x21);
        assert_eq!(msg.size, 1);
        assert_eq!(msg.data[0], 0xff);
    }

    #[test]
    fn resync_on_high_bit_in_data() {
        let mut p = Parser::new();
        let statuses = feed_all(&mut p, &[0xa9, 0x3a, 0x0f, 0x8f]);
        assert_eq!(
            statuses,
            vec![
                ParseStatus::Again,
                ParseStatus::Again,
                ParseStatus::Again,
                ParseStatus::Error(ParseError::InvalidDataHighBitSet),
            ]
        );
        assert_eq!(p.state(), ParserState::Waiting);
    }

    #[test]
    fn waiting_ignores_unframed_bytes() {
        let mut p = Parser::new();
        assert_eq!(p.feed(0x12), ParseStatus::ByteIgnored);
        assert_eq!(p.feed(0x7f), ParseStatus::ByteIgnored);
        // First high-bit byte starts a frame.
        assert_eq!(p.feed(0x85), ParseStatus::Again);
        assert_eq!(p.state(), ParserState::ExpectingSize);
    }

    #[test]
    fn low_byte_after_success_is_a_type_error() {
        let mut p = Parser::new();
        feed_all(&mut p, &[0x8a, 0x00]);
        // Post-success state expects a type byte, not resynchronization.
        assert_eq!(
            p.feed(0x00),
            ParseStatus::Error(ParseError::InvalidTypeNoHighBit)
        );
        assert_eq!(p.state(), ParserState::Waiting);
    }

    #[test]
    fn oversized_size_field_resets() {
        let mut p = Parser::new();
        assert_eq!(p.feed(0x85), ParseStatus::Again);
        // Bits 6..4 = 5: more data bytes than a frame can carry.
        assert_eq!(
            p.feed(0x50),
            ParseStatus::Error(ParseError::InvalidSizeTooLarge)
        );
        assert_eq!(p.state(), ParserState::Waiting);
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
            let mut p = Parser::new();
            for b in bytes {
                let status = p.feed(b);
                if status == ParseStatus::Success {
                    let msg = p.message();
                    prop_assert!(msg.kind < 0x80);
                    prop_assert!(msg.size <= 4);
                }
            }
        }

        #[test]
        fn well_formed_frames_round_trip(
            kind in 1u8..0x80,
            data in prop::collection::vec(any::<u8>(), 0..=4),
        ) {
            let size = data.len() as u8;
            let mut highs = 0u8;
            for (i, d) in data.iter().enumerate() {
                if d & 0x80 != 0 {
                    highs |= 1 << (3 - i);
                }
            }
            let mut bytes = vec![kind | 0x80, (size << 4) | highs];
            bytes.extend(data.iter().map(|d| d & 0x7f));

            let mut p = Parser::new();
            let mut messages = Vec::new();
            for b in bytes {
                if p.feed(b) == ParseStatus::Success {
                    messages.push(p.message());
                }
            }
            prop_assert_eq!(messages.len(), 1);
            let msg = messages[0];
            prop_assert_eq!(msg.kind, kind);
            prop_assert_eq!(msg.size, size);
            prop_assert_eq!(&msg.data[..data.len()], &data[..]);
        }
    }
}
