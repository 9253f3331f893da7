pub mod addr;
pub mod area;
pub mod frame;
pub mod nametable_cache;
pub mod projector;
pub mod route;

pub use area::AreaId;
pub use frame::{FrameInfo, NtDiff, OamX, SoundQueues, TitleScreenTiles};
pub use nametable_cache::NametableCache;
pub use projector::Projector;
pub use route::{Route, Section};
