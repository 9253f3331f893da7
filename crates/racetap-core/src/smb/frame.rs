//! The per-frame semantic snapshot projected out of the console model.

use super::area::AreaId;

/// One OAM sprite extended with its resolved palette so consumers can
/// render without the console's palette RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OamX {
    pub x: i32,
    pub y: i32,
    pub tile_index: u8,
    pub attributes: u8,
    pub pattern_table_index: i32,
    pub tile_palette: [u8; 4],
}

/// A background tile (or attribute byte) that differs from the baseline
/// nametable for the current area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtDiff {
    pub nametable_page: i32,
    pub offset: i32,
    pub value: u8,
}

/// Raw tiles lifted from the fixed title-screen and status-bar cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TitleScreenTiles {
    pub score_tiles: [u8; 7],
    pub coin_tiles: [u8; 2],
    pub world_tile: u8,
    pub level_tile: u8,
    pub life_tiles: [u8; 2],
}

/// Snapshot of the six sound queues for the frame; each byte is the first
/// non-zero value written to that queue since the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoundQueues {
    pub pause: u8,
    pub area_music: u8,
    pub event_music: u8,
    pub noise: u8,
    pub square2: u8,
    pub square1: u8,
}

impl SoundQueues {
    pub fn from_array(q: [u8; 6]) -> Self {
        Self {
            pause: q[0],
            area_music: q[1],
            event_music: q[2],
            noise: q[3],
            square2: q[4],
            square1: q[5],
        }
    }

    pub fn to_array(self) -> [u8; 6] {
        [
            self.pause,
            self.area_music,
            self.event_music,
            self.noise,
            self.square2,
            self.square1,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub aid: AreaId,
    pub prev_apx: i32,
    pub apx: i32,
    pub game_engine_subroutine: u8,
    pub oper_mode: u8,
    pub interval_timer_control: u8,
    pub oam_ext: Vec<OamX>,
    pub nt_diffs: Vec<NtDiff>,
    /// Status bar: four tile rows then 32 attribute bytes, verbatim.
    pub top_rows: Vec<u8>,
    /// One-based, as displayed.
    pub world: u8,
    pub level: u8,
    pub title_screen: TitleScreenTiles,
    /// Status-bar timer value, or -1 while the digits are not numeric.
    pub time: i32,
    pub sound_queues: SoundQueues,
}
