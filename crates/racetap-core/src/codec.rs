//! Bit-exact binary encoding of [`Output`] for recordings and broadcast.
//!
//! Layout (all integers little-endian):
//! - header: magic `69 04 20`, `powered_on: u8`, `elapsed: i64`,
//!   `m2: u64`, `user_m2: u64`, `controller: u8`
//! - mid (present only when powered on): `frame_palette[32]`, `aid: u16`,
//!   `prev_apx: i32`, `apx: i32`, `game_engine_subroutine: u8`,
//!   `oper_mode: u8`, `interval_timer_control: u8`, `oam_len: u64`,
//!   `nt_len: u64`, `top_len: u64`, `world: u8`, `level: u8`,
//!   title-screen tiles (7+2+1+1+2 bytes), `time: i32`, six queue bytes
//! - trailer: `oam_len x {x: i32, y: i32, tile: u8, attr: u8,
//!   pattern_table: i32, palette: [u8;4]}`, `nt_len x {page: i32,
//!   offset: i32, value: u8}`, `top_len` raw bytes

use crate::error::CodecError;
use crate::nes::ppu::FRAME_PALETTE_SIZE;
use crate::output::Output;
use crate::smb::area::AreaId;
use crate::smb::frame::{FrameInfo, NtDiff, OamX, SoundQueues, TitleScreenTiles};

pub const MAGIC: [u8; 3] = [0x69, 0x04, 0x20];

/// Sprite slots minus the skipped sprite 0.
const MAX_OAM_ENTRIES: u64 = 63;
/// Generous cap; the broadcaster trims to 5000 before encoding.
const MAX_NT_DIFFS: u64 = 0x1_0000;
const MAX_TOP_ROWS: u64 = 0x1000;

pub fn encode(output: &Output, buffer: &mut Vec<u8>) {
    buffer.clear();
    buffer.extend_from_slice(&MAGIC);
    buffer.push(u8::from(output.powered_on));
    buffer.extend_from_slice(&output.elapsed.to_le_bytes());
    buffer.extend_from_slice(&output.m2.to_le_bytes());
    buffer.extend_from_slice(&output.user_m2.to_le_bytes());
    buffer.push(output.controller);

    if !output.powered_on {
        return;
    }
    let f = &output.frame;
    buffer.extend_from_slice(&output.frame_palette);
    buffer.extend_from_slice(&f.aid.0.to_le_bytes());
    buffer.extend_from_slice(&f.prev_apx.to_le_bytes());
    buffer.extend_from_slice(&f.apx.to_le_bytes());
    buffer.push(f.game_engine_subroutine);
    buffer.push(f.oper_mode);
    buffer.push(f.interval_timer_control);
    buffer.extend_from_slice(&(f.oam_ext.len() as u64).to_le_bytes());
    buffer.extend_from_slice(&(f.nt_diffs.len() as u64).to_le_bytes());
    buffer.extend_from_slice(&(f.top_rows.len() as u64).to_le_bytes());
    buffer.push(f.world);
    buffer.push(f.level);
    buffer.extend_from_slice(&f.title_screen.score_tiles);
    buffer.extend_from_slice(&f.title_screen.coin_tiles);
    buffer.push(f.title_screen.world_tile);
    buffer.push(f.title_screen.level_tile);
    buffer.extend_from_slice(&f.title_screen.life_tiles);
    buffer.extend_from_slice(&f.time.to_le_bytes());
    buffer.extend_from_slice(&f.sound_queues.to_array());

    for oam in &f.oam_ext {
        buffer.extend_from_slice(&oam.x.to_le_bytes());
        buffer.extend_from_slice(&oam.y.to_le_bytes());
        buffer.push(oam.tile_index);
        buffer.push(oam.attributes);
        buffer.extend_from_slice(&oam.pattern_table_index.to_le_bytes());
        buffer.extend_from_slice(&oam.tile_palette);
    }
    for diff in &f.nt_diffs {
        buffer.extend_from_slice(&diff.nametable_page.to_le_bytes());
        buffer.extend_from_slice(&diff.offset.to_le_bytes());
        buffer.push(diff.value);
    }
    buffer.extend_from_slice(&f.top_rows);
}

pub fn to_bytes(output: &Output) -> Vec<u8> {
    let mut buffer = Vec::new();
    encode(output, &mut buffer);
    buffer
}

pub fn decode(bytes: &[u8]) -> Result<Output, CodecError> {
    let mut r = Reader::new(bytes);
    if r.bytes(3)? != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let powered_on = r.u8()? != 0;
    let elapsed = r.i64()?;
    let m2 = r.u64()?;
    let user_m2 = r.u64()?;
    let controller = r.u8()?;

    let mut output = Output {
        elapsed,
        powered_on,
        m2,
        user_m2,
        controller,
        frame: FrameInfo::default(),
        frame_palette: [0; FRAME_PALETTE_SIZE],
    };
    if !powered_on {
        return Ok(output);
    }

    output
        .frame_palette
        .copy_from_slice(r.bytes(FRAME_PALETTE_SIZE)?);
    let aid = AreaId(r.u16()?);
    let prev_apx = r.i32()?;
    let apx = r.i32()?;
    let game_engine_subroutine = r.u8()?;
    let oper_mode = r.u8()?;
    let interval_timer_control = r.u8()?;
    let oam_len = r.len("oam_ext", MAX_OAM_ENTRIES)?;
    let nt_len = r.len("nt_diffs", MAX_NT_DIFFS)?;
    let top_len = r.len("top_rows", MAX_TOP_ROWS)?;
    let world = r.u8()?;
    let level = r.u8()?;

    let mut title_screen = TitleScreenTiles::default();
    title_screen.score_tiles.copy_from_slice(r.bytes(7)?);
    title_screen.coin_tiles.copy_from_slice(r.bytes(2)?);
    title_screen.world_tile = r.u8()?;
    title_screen.level_tile = r.u8()?;
    title_screen.life_tiles.copy_from_slice(r.bytes(2)?);
    let time = r.i32()?;

    let mut queues = [0u8; 6];
    queues.copy_from_slice(r.bytes(6)?);

    let mut oam_ext = Vec::with_capacity(oam_len);
    for _ in 0..oam_len {
        let x = r.i32()?;
        let y = r.i32()?;
        let tile_index = r.u8()?;
        let attributes = r.u8()?;
        let pattern_table_index = r.i32()?;
        let mut tile_palette = [0u8; 4];
        tile_palette.copy_from_slice(r.bytes(4)?);
        oam_ext.push(OamX {
            x,
            y,
            tile_index,
            attributes,
            pattern_table_index,
            tile_palette,
        });
    }
    let mut nt_diffs = Vec::with_capacity(nt_len);
    for _ in 0..nt_len {
        let nametable_page = r.i32()?;
        let offset = r.i32()?;
        let value = r.u8()?;
        nt_diffs.push(NtDiff {
            nametable_page,
            offset,
            value,
        });
    }
    let top_rows = r.bytes(top_len)?.to_vec();

    output.frame = FrameInfo {
        aid,
        prev_apx,
        apx,
        game_engine_subroutine,
        oper_mode,
        interval_timer_control,
        oam_ext,
        nt_diffs,
        top_rows,
        world,
        level,
        title_screen,
        time,
        sound_queues: SoundQueues::from_array(queues),
    };
    Ok(output)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::ShortInput)?;
        let s = self.buf.get(self.pos..end).ok_or(CodecError::ShortInput)?;
        self.pos = end;
        Ok(s)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(
            self.bytes(2)?.try_into().expect("slice length is 2"),
        ))
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(
            self.bytes(4)?.try_into().expect("slice length is 4"),
        ))
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(
            self.bytes(8)?.try_into().expect("slice length is 8"),
        ))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(
            self.bytes(8)?.try_into().expect("slice length is 8"),
        ))
    }

    fn len(&mut self, region: &'static str, max: u64) -> Result<usize, CodecError> {
        let len = self.u64()?;
        if len > max {
            return Err(CodecError::LengthOutOfBounds { region, len });
        }
        Ok(len as usize)
    }
}
