//! Fixed Super Mario Bros. RAM addresses and status-bar tile cells.
//!
//! Addresses follow the standard disassembly naming. Tile cells are
//! (column, row) coordinates into nametable 0.

/// `$000e` — which engine subroutine ran this frame.
pub const GAME_ENGINE_SUBROUTINE: u16 = 0x000e;

/// `$00e7`/`$00e8` — pointer to the current area's layout data. The pair
/// identifies the area layout uniquely and is what [`super::AreaId`] wraps.
pub const AREA_DATA_LOW: u16 = 0x00e7;
pub const AREA_DATA_HIGH: u16 = 0x00e8;

/// `$00fa..=$00ff` — the six sound queues, written once per effect.
pub const PAUSE_SOUND_QUEUE: u16 = 0x00fa;
pub const AREA_MUSIC_QUEUE: u16 = 0x00fb;
pub const EVENT_MUSIC_QUEUE: u16 = 0x00fc;
pub const NOISE_SOUND_QUEUE: u16 = 0x00fd;
pub const SQUARE2_SOUND_QUEUE: u16 = 0x00fe;
pub const SQUARE1_SOUND_QUEUE: u16 = 0x00ff;

pub const SOUND_QUEUE_COUNT: usize = 6;

/// `$0770` — title screen / playing / victory mode.
pub const OPER_MODE: u16 = 0x0770;

/// `$075c` — current level, zero based.
pub const LEVEL_NUMBER: u16 = 0x075c;

/// `$075f` — current world, zero based.
pub const WORLD_NUMBER: u16 = 0x075f;

/// `$071a`/`$071c` — page and pixel of the screen's left edge, the pair
/// behind the horizontal progress measure.
pub const SCREENEDGE_PAGELOC: u16 = 0x071a;
pub const SCREENEDGE_X_POS: u16 = 0x071c;

/// `$077f` — frame-rule interval timer control.
pub const INTERVAL_TIMER_CONTROL: u16 = 0x077f;

/// Block-buffer cell whose value discriminates the 8-4 maze sections.
/// Reverse engineered; see `AreaId::CASTLE_AREA_6` progress correction.
pub const BLOCK_BUFFER_84_DISC: u16 = 0x05f0;

/// Status-bar rows copied verbatim into every frame (tile rows 0..4 plus
/// the first 32 attribute bytes).
pub const TOP_TILE_ROWS: usize = 4;
pub const TOP_ATTRIBUTE_BYTES: usize = 32;
pub const TOP_ROWS_LEN: usize = TOP_TILE_ROWS * 32 + TOP_ATTRIBUTE_BYTES;

/// First background row the nametable differ looks at.
pub const FIRST_DIFF_ROW: usize = 4;

pub const SCREEN_TILE_COLS: usize = 32;
pub const SCREEN_TILE_ROWS: usize = 30;
pub const ATTRIBUTE_OFFSET: usize = 0x3c0;

/// Title-screen and status-bar cells, from the competition overlay.
pub const TITLESCREEN_SCORE_X: usize = 0x02;
pub const TITLESCREEN_SCORE_Y: usize = 0x03;
pub const TITLESCREEN_COIN_X: usize = 0x0d;
pub const TITLESCREEN_COIN_Y: usize = 0x03;
pub const TITLESCREEN_WORLD_X: usize = 0x13;
pub const TITLESCREEN_WORLD_Y: usize = 0x03;
pub const TITLESCREEN_LEVEL_X: usize = 0x15;
pub const TITLESCREEN_LEVEL_Y: usize = 0x03;
pub const TITLESCREEN_LIFE_X: usize = 0x11;
pub const TITLESCREEN_LIFE_Y: usize = 0x0e;

/// In-game timer digits in the status bar.
pub const TIME_DIGITS_X: usize = 0x1a;
pub const TIME_DIGITS_Y: usize = 0x03;
pub const TIME_DIGIT_COUNT: usize = 3;
