use bitflags::bitflags;

bitflags! {
    /// Standard pad bit layout as latched out of `$4016` (A first).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Button: u8 {
        const A      = 0x01;
        const B      = 0x02;
        const SELECT = 0x04;
        const START  = 0x08;
        const UP     = 0x10;
        const DOWN   = 0x20;
        const LEFT   = 0x40;
        const RIGHT  = 0x80;
    }
}

/// Controller state reconstructed from observed `$4016` traffic.
///
/// Each read of `$4016` shifts one button bit out of the console; the tap
/// reports the data line level, so `latch` counts how many of the eight
/// bits have been overwritten since the last strobe. A strobe write resets
/// `latch` to zero and marks the frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    pub buttons: Button,
    pub latch: u8,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `$4016` read observed with the data line at `pressed`.
    pub fn on_read(&mut self, pressed: bool) {
        if self.latch < 8 {
            let bit = Button::from_bits_retain(1 << self.latch);
            self.buttons.set(bit, pressed);
            self.latch += 1;
        }
    }

    /// A `$4016` strobe write; restarts the shift sequence.
    pub fn on_strobe(&mut self) {
        self.latch = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fill_bits_in_shift_order() {
        let mut c = ControllerState::new();
        // A pressed, B not, Select not, Start pressed.
        for pressed in [true, false, false, true, false, false, false, false] {
            c.on_read(pressed);
        }
        assert_eq!(c.buttons, Button::A | Button::START);
        assert_eq!(c.latch, 8);

        // Extra reads past eight bits change nothing.
        c.on_read(true);
        assert_eq!(c.buttons, Button::A | Button::START);

        c.on_strobe();
        assert_eq!(c.latch, 0);
        c.on_read(false);
        assert_eq!(c.buttons, Button::START);
    }
}
