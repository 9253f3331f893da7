use strum::FromRepr;

/// Wire message identifiers emitted by the NESceptor bus observer.
///
/// Codes 0x03 and 0x06 are reserved on the wire and never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum MessageType {
    /// Connected/idle marker while the console is held in reset or off.
    RstLow = 0x01,
    /// Running m2 cycle count since power on, pre-divided by 256.
    M2Count = 0x02,
    /// Read/write activity on `$4016`.
    ControllerInfo = 0x04,
    /// CPU write into internal RAM (value + 11-bit address).
    RamWrite = 0x05,
    /// `$2000` write.
    PpuCtrlWrite = 0x07,
    /// `$2001` write.
    PpuMaskWrite = 0x08,
    /// `$2002` read; clears the shared address/scroll write latches.
    PpuStatusRead = 0x09,
    /// `$2003` write.
    OamAddrWrite = 0x0a,
    /// `$2004` write.
    OamDataWrite = 0x0b,
    /// `$2004` read.
    OamDataRead = 0x0c,
    /// `$2005` write.
    PpuScrollWrite = 0x0d,
    /// `$2006` write.
    PpuAddrWrite = 0x0e,
    /// `$2007` write.
    PpuDataWrite = 0x0f,
    /// `$2007` read.
    PpuDataRead = 0x10,
    /// `$4014` write.
    OamDmaWrite = 0x11,
}

/// Bit layout of the `ControllerInfo` data byte.
pub mod controller_info {
    /// The data line level during the access.
    pub const BUTTON_PRESSED: u8 = 0b0000_0001;
    /// Set for reads of `$4016`, clear for strobe writes.
    pub const READ_WRITE: u8 = 0b0000_0010;
}

/// A complete decoded wire message.
///
/// `kind` is the raw 7-bit type code; codes the registry does not know are
/// still parsed (the framing is type-agnostic) and skipped by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub kind: u8,
    pub size: u8,
    pub data: [u8; 4],
}

impl Message {
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_repr(self.kind)
    }

    /// Data bytes actually present on the wire.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message_type() {
            Some(kind) => write!(f, "{kind:?}")?,
            None => write!(f, "Unknown({:#04x})", self.kind)?,
        }
        write!(f, " [")?;
        for (i, b) in self.payload().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02x}")?;
        }
        write!(f, "]")
    }
}

/// `RamWrite` carries `data[0] = value`, `data[1]` low address bits and
/// `data[2]` the high three. Internal RAM is 2 KiB so 11 bits suffice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamWrite {
    pub address: u16,
    pub value: u8,
}

impl RamWrite {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            value: msg.data[0],
            address: u16::from(msg.data[1]) | (u16::from(msg.data[2] & 0x07) << 8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_are_locked() {
        assert_eq!(MessageType::from_repr(0x01), Some(MessageType::RstLow));
        assert_eq!(MessageType::from_repr(0x02), Some(MessageType::M2Count));
        assert_eq!(MessageType::from_repr(0x03), None);
        assert_eq!(
            MessageType::from_repr(0x04),
            Some(MessageType::ControllerInfo)
        );
        assert_eq!(MessageType::from_repr(0x05), Some(MessageType::RamWrite));
        assert_eq!(MessageType::from_repr(0x06), None);
        assert_eq!(MessageType::from_repr(0x11), Some(MessageType::OamDmaWrite));
        assert_eq!(MessageType::from_repr(0x12), None);
    }

    #[test]
    fn ram_write_reassembles_eleven_bit_address() {
        let msg = Message {
            kind: MessageType::RamWrite as u8,
            size: 3,
            data: [0xab, 0x34, 0xff, 0x00],
        };
        let w = RamWrite::from_message(&msg);
        assert_eq!(w.value, 0xab);
        // Only the low three bits of data[2] participate.
        assert_eq!(w.address, 0x0734);
    }
}
