pub mod controller;
pub mod ppu;
pub mod ram;
pub mod state;

pub use controller::{Button, ControllerState};
pub use ppu::{FramePalette, NameTable, Oam, PpuState};
pub use ram::Ram;
pub use state::NesState;
