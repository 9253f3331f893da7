//! Running console model folded together from parsed tap messages.

use racetap_proto::message::{Message, MessageType, RamWrite, controller_info};

use super::{ControllerState, PpuState, Ram};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NesState {
    pub powered_on: bool,
    pub m2: u64,
    pub ram: Ram,
    pub ppu: PpuState,
    pub controller: ControllerState,
}

impl NesState {
    pub fn new() -> Self {
        Self {
            powered_on: false,
            m2: 0,
            ram: Ram::new(),
            ppu: PpuState::new(),
            controller: ControllerState::new(),
        }
    }

    /// Fold one parsed message into the model.
    ///
    /// Message types the registry does not know are ignored; the framing
    /// already guaranteed they were well-formed.
    pub fn apply(&mut self, msg: &Message) {
        let Some(kind) = msg.message_type() else {
            tracing::trace!(kind = msg.kind, "unknown message type skipped");
            return;
        };

        if kind == MessageType::RstLow {
            *self = Self::new();
            return;
        }
        self.powered_on = true;

        match kind {
            MessageType::RstLow => {}
            MessageType::M2Count => {
                // The wire carries bits 8..40 of the cycle counter; the
                // low byte is never transmitted.
                self.m2 = (u64::from(msg.data[0]) << 8)
                    | (u64::from(msg.data[1]) << 16)
                    | (u64::from(msg.data[2]) << 24)
                    | (u64::from(msg.data[3]) << 32);
            }
            MessageType::ControllerInfo => {
                let d = msg.data[0];
                if d & controller_info::READ_WRITE != 0 {
                    self.controller.on_read(d & controller_info::BUTTON_PRESSED != 0);
                } else {
                    self.controller.on_strobe();
                }
            }
            MessageType::RamWrite => {
                let w = RamWrite::from_message(msg);
                self.ram.write(w.address, w.value);
            }
            MessageType::PpuCtrlWrite => self.ppu.ctrl = msg.data[0],
            MessageType::PpuMaskWrite => self.ppu.mask = msg.data[0],
            MessageType::PpuStatusRead => self.ppu.on_status_read(),
            MessageType::OamAddrWrite => self.ppu.on_oam_addr_write(msg.data[0]),
            MessageType::OamDataWrite => self.ppu.on_oam_data_write(msg.data[0]),
            MessageType::PpuScrollWrite => self.ppu.on_scroll_write(msg.data[0]),
            MessageType::PpuAddrWrite => self.ppu.on_addr_write(msg.data[0]),
            MessageType::PpuDataWrite => self.ppu.on_data_write(msg.data[0]),
            // Reads of $2004/$2007 and $4014 DMA kicks carry no state we
            // project from; the OAM content itself arrives as RAM writes
            // followed by the DMA, which the game mirrors in RAM.
            MessageType::OamDataRead | MessageType::PpuDataRead | MessageType::OamDmaWrite => {}
        }
    }
}

impl Default for NesState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(kind: MessageType, data: &[u8]) -> Message {
        let mut d = [0u8; 4];
        d[..data.len()].copy_from_slice(data);
        Message {
            kind: kind as u8,
            size: data.len() as u8,
            data: d,
        }
    }

    #[test]
    fn rst_low_resets_everything() {
        let mut nes = NesState::new();
        nes.apply(&msg(MessageType::M2Count, &[1, 2, 3, 4]));
        nes.apply(&msg(MessageType::RamWrite, &[0xff, 0x34, 0x02]));
        nes.apply(&msg(MessageType::PpuCtrlWrite, &[0x90]));
        assert!(nes.powered_on);

        nes.apply(&msg(MessageType::RstLow, &[]));
        assert_eq!(nes, NesState::new());
        assert!(!nes.powered_on);
        assert_eq!(nes.m2, 0);
    }

    #[test]
    fn m2_assembles_shifted_counter() {
        let mut nes = NesState::new();
        nes.apply(&msg(MessageType::M2Count, &[0x12, 0x34, 0x56, 0x78]));
        assert_eq!(
            nes.m2,
            (0x12u64 << 8) | (0x34u64 << 16) | (0x56u64 << 24) | (0x78u64 << 32)
        );
    }

    #[test]
    fn any_non_reset_message_marks_power() {
        let mut nes = NesState::new();
        assert!(!nes.powered_on);
        nes.apply(&msg(MessageType::PpuMaskWrite, &[0x1e]));
        assert!(nes.powered_on);
    }

    #[test]
    fn ram_write_lands_at_eleven_bit_address() {
        let mut nes = NesState::new();
        nes.apply(&msg(MessageType::RamWrite, &[0x42, 0x1a, 0x07]));
        assert_eq!(nes.ram.read(0x071a), 0x42);
    }

    #[test]
    fn controller_read_write_protocol() {
        let mut nes = NesState::new();
        // Strobe, then eight reads with A and Right held.
        nes.apply(&msg(MessageType::ControllerInfo, &[0x00]));
        for i in 0..8u8 {
            let pressed = i == 0 || i == 7;
            let d = controller_info::READ_WRITE | u8::from(pressed);
            nes.apply(&msg(MessageType::ControllerInfo, &[d]));
        }
        assert_eq!(
            nes.controller.buttons,
            crate::nes::Button::A | crate::nes::Button::RIGHT
        );
        assert_eq!(nes.controller.latch, 8);
        nes.apply(&msg(MessageType::ControllerInfo, &[0x00]));
        assert_eq!(nes.controller.latch, 0);
    }
}
