//! Projects the raw console model into per-frame game semantics.

use std::sync::Arc;

use racetap_proto::message::{Message, MessageType};

use super::addr;
use super::area::AreaId;
use super::frame::{FrameInfo, NtDiff, OamX, SoundQueues, TitleScreenTiles};
use super::nametable_cache::NametableCache;
use crate::nes::NesState;
use crate::output::Output;

impl FrameInfo {
    /// The frame that marks the start of a run: standing at the left edge
    /// of 1-1 with the timer freshly seeded.
    pub fn is_run_start(&self) -> bool {
        self.aid == AreaId::GROUND_AREA_6 && self.apx < 15 && (self.time == 399 || self.time == 400)
    }
}

/// Horizontal progress within the area.
///
/// The 8-4 correction is a reverse-engineered special case: the castle's
/// looping corridors reset the screen-edge page while the discriminator
/// block-buffer cell is populated, so progress in the back half reads low
/// by exactly four pages. It applies to this area only; no other area
/// needs (or tolerates) the adjustment.
pub fn area_pointer_x(page_loc: u8, x_pos: u8, aid: AreaId, block_buffer_disc: u8) -> i32 {
    let mut apx = 256 * i32::from(page_loc) + i32::from(x_pos);
    if apx < 512 && aid == AreaId::CASTLE_AREA_6 && block_buffer_disc != 0 {
        apx += 1024;
    }
    apx
}

/// Owns one console model plus the accumulators needed to cut it into
/// frame-aligned outputs.
pub struct Projector {
    nes: NesState,
    nametables: Arc<NametableCache>,
    sound_latch: [u8; addr::SOUND_QUEUE_COUNT],
    last_out_m2: u64,
    prev_apx: i32,
}

impl Projector {
    pub fn new(nametables: Arc<NametableCache>) -> Self {
        Self {
            nes: NesState::new(),
            nametables,
            sound_latch: [0; addr::SOUND_QUEUE_COUNT],
            last_out_m2: 0,
            prev_apx: 0,
        }
    }

    pub fn nes(&self) -> &NesState {
        &self.nes
    }

    pub fn reset(&mut self) {
        self.nes = NesState::new();
        self.sound_latch = [0; addr::SOUND_QUEUE_COUNT];
        self.last_out_m2 = 0;
        self.prev_apx = 0;
    }

    /// Fold one message in; returns an output when the message closed a
    /// frame (controller strobe) or the console dropped into reset.
    pub fn on_message(&mut self, msg: &Message, elapsed: i64) -> Option<Output> {
        let kind = msg.message_type();

        // Latch sound queue writes before they land in RAM so a queue the
        // game clears in the same batch still reports its effect. Only the
        // first non-zero write per queue survives until the next output.
        if kind == Some(MessageType::RamWrite) {
            let w = racetap_proto::message::RamWrite::from_message(msg);
            if (addr::PAUSE_SOUND_QUEUE..=addr::SQUARE1_SOUND_QUEUE).contains(&w.address) {
                let idx = (w.address - addr::PAUSE_SOUND_QUEUE) as usize;
                if self.sound_latch[idx] == 0 && w.value != 0 {
                    self.sound_latch[idx] = w.value;
                }
            }
        }

        self.nes.apply(msg);

        let boundary = match kind {
            Some(MessageType::RstLow) => {
                self.sound_latch = [0; addr::SOUND_QUEUE_COUNT];
                self.prev_apx = 0;
                self.last_out_m2 = 0;
                true
            }
            Some(MessageType::ControllerInfo) => self.nes.controller.latch == 0,
            _ => false,
        };
        if !boundary {
            return None;
        }
        if self.nes.powered_on && self.nes.m2 == self.last_out_m2 {
            return None;
        }

        let output = self.build_output(elapsed);
        self.last_out_m2 = self.nes.m2;
        self.prev_apx = output.frame.apx;
        self.sound_latch = [0; addr::SOUND_QUEUE_COUNT];
        Some(output)
    }

    fn build_output(&self, elapsed: i64) -> Output {
        let mut out = Output {
            elapsed,
            powered_on: self.nes.powered_on,
            m2: self.nes.m2,
            user_m2: 0,
            controller: self.nes.controller.buttons.bits(),
            frame: FrameInfo::default(),
            frame_palette: self.nes.ppu.frame_palette,
        };
        if self.nes.powered_on {
            out.frame = self.project_frame();
        }
        out
    }

    fn project_frame(&self) -> FrameInfo {
        let ram = &self.nes.ram;
        let aid = AreaId::from_bytes(ram.read(addr::AREA_DATA_LOW), ram.read(addr::AREA_DATA_HIGH));
        let apx = area_pointer_x(
            ram.read(addr::SCREENEDGE_PAGELOC),
            ram.read(addr::SCREENEDGE_X_POS),
            aid,
            ram.read(addr::BLOCK_BUFFER_84_DISC),
        );

        FrameInfo {
            aid,
            prev_apx: self.prev_apx,
            apx,
            game_engine_subroutine: ram.read(addr::GAME_ENGINE_SUBROUTINE),
            oper_mode: ram.read(addr::OPER_MODE),
            interval_timer_control: ram.read(addr::INTERVAL_TIMER_CONTROL),
            oam_ext: self.project_oam(),
            nt_diffs: self.project_nt_diffs(aid, apx),
            top_rows: self.project_top_rows(),
            world: ram.read(addr::WORLD_NUMBER).wrapping_add(1),
            level: ram.read(addr::LEVEL_NUMBER).wrapping_add(1),
            title_screen: self.project_title_screen(),
            time: self.project_time(),
            sound_queues: SoundQueues::from_array(self.sound_latch),
        }
    }

    fn tile(&self, x: usize, y: usize) -> u8 {
        self.nes.ppu.nametables[0][y * addr::SCREEN_TILE_COLS + x]
    }

    fn project_time(&self) -> i32 {
        let mut time = 0i32;
        for i in 0..addr::TIME_DIGIT_COUNT {
            let tile = self.tile(addr::TIME_DIGITS_X + i, addr::TIME_DIGITS_Y);
            if tile > 9 {
                return -1;
            }
            time = time * 10 + i32::from(tile);
        }
        time
    }

    fn project_title_screen(&self) -> TitleScreenTiles {
        let mut ts = TitleScreenTiles::default();
        for (i, t) in ts.score_tiles.iter_mut().enumerate() {
            *t = self.tile(addr::TITLESCREEN_SCORE_X + i, addr::TITLESCREEN_SCORE_Y);
        }
        for (i, t) in ts.coin_tiles.iter_mut().enumerate() {
            *t = self.tile(addr::TITLESCREEN_COIN_X + i, addr::TITLESCREEN_COIN_Y);
        }
        ts.world_tile = self.tile(addr::TITLESCREEN_WORLD_X, addr::TITLESCREEN_WORLD_Y);
        ts.level_tile = self.tile(addr::TITLESCREEN_LEVEL_X, addr::TITLESCREEN_LEVEL_Y);
        for (i, t) in ts.life_tiles.iter_mut().enumerate() {
            *t = self.tile(addr::TITLESCREEN_LIFE_X + i, addr::TITLESCREEN_LIFE_Y);
        }
        ts
    }

    fn project_top_rows(&self) -> Vec<u8> {
        let nt = &self.nes.ppu.nametables[0];
        let tiles = addr::TOP_TILE_ROWS * addr::SCREEN_TILE_COLS;
        let mut rows = Vec::with_capacity(addr::TOP_ROWS_LEN);
        rows.extend_from_slice(&nt[..tiles]);
        rows.extend_from_slice(
            &nt[addr::ATTRIBUTE_OFFSET..addr::ATTRIBUTE_OFFSET + addr::TOP_ATTRIBUTE_BYTES],
        );
        rows
    }

    /// Sprites 1..63 with their palettes resolved. Sprite 0 is the fixed
    /// coin-icon split trigger and never part of the scene.
    fn project_oam(&self) -> Vec<OamX> {
        let ppu = &self.nes.ppu;
        let mut out = Vec::new();
        for i in 1..64usize {
            let y = ppu.oam[i * 4];
            if y > 240 {
                continue;
            }
            let tile_index = ppu.oam[i * 4 + 1];
            let attributes = ppu.oam[i * 4 + 2];
            let x = ppu.oam[i * 4 + 3];

            let bank = usize::from(attributes & 0x03);
            let mut tile_palette = [0u8; 4];
            tile_palette[0] = ppu.frame_palette[0x10];
            for (k, c) in tile_palette.iter_mut().enumerate().skip(1) {
                *c = ppu.frame_palette[0x10 + bank * 4 + k];
            }

            out.push(OamX {
                x: i32::from(x),
                y: i32::from(y),
                tile_index,
                attributes,
                pattern_table_index: ppu.sprite_pattern_table(),
                tile_palette,
            });
        }
        out
    }

    /// Background cells in the visible window that differ from the
    /// baseline capture for this area.
    fn project_nt_diffs(&self, aid: AreaId, apx: i32) -> Vec<NtDiff> {
        let mut diffs = Vec::new();
        if apx < 0 {
            return diffs;
        }
        let first_page = ((apx - 7).max(0)) / 256;
        let last_page = (apx + 255) / 256;

        for page in first_page..=last_page {
            let Some(baseline) = self.nametables.get(aid, page) else {
                continue;
            };
            let live = &self.nes.ppu.nametables[(page % 2) as usize];
            // Attribute cells whose 4x4 block produced a tile diff. Only
            // those carry their attribute byte along; an attribute change
            // with no tile change in its block is not reported.
            let mut block_dirty = [false; 64];

            for row in addr::FIRST_DIFF_ROW..addr::SCREEN_TILE_ROWS {
                for col in 0..addr::SCREEN_TILE_COLS {
                    let x_pixel = page * 256 + (col as i32) * 8;
                    if x_pixel <= apx - 8 || x_pixel >= apx + 256 {
                        continue;
                    }
                    let offset = row * addr::SCREEN_TILE_COLS + col;
                    if live[offset] != baseline[offset] {
                        block_dirty[(row / 4) * 8 + col / 4] = true;
                        diffs.push(NtDiff {
                            nametable_page: page,
                            offset: offset as i32,
                            value: live[offset],
                        });
                    }
                }
            }

            for (cell, dirty) in block_dirty.iter().enumerate() {
                if !dirty {
                    continue;
                }
                let attr = addr::ATTRIBUTE_OFFSET + cell;
                if live[attr] != baseline[attr] {
                    diffs.push(NtDiff {
                        nametable_page: page,
                        offset: attr as i32,
                        value: live[attr],
                    });
                }
            }
        }
        diffs
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

    fn ram_write(addr: u16, value: u8) -> Message {
        msg(
            MessageType::RamWrite,
            &[value, (addr & 0xff) as u8, (addr >> 8) as u8],
        )
    }

    fn strobe() -> Message {
        msg(MessageType::ControllerInfo, &[0x00])
    }

    fn m2(count: u64) -> Message {
        msg(
            MessageType::M2Count,
            &[
                (count >> 8) as u8,
                (count >> 16) as u8,
                (count >> 24) as u8,
                (count >> 32) as u8,
            ],
        )
    }

    fn projector() -> Projector {
        Projector::new(Arc::new(NametableCache::new()))
    }

    /// Projector sitting on 1-1 at apx 0, with an all-zero baseline for
    /// page 0 so any PPU write shows up as a diff.
    fn projector_on_1_1() -> Projector {
        let mut cache = NametableCache::new();
        cache.insert(
            AreaId::GROUND_AREA_6,
            0,
            Box::new([0u8; super::super::nametable_cache::PAGE_LEN]),
        );
        let mut p = Projector::new(Arc::new(cache));
        p.on_message(&m2(0x10000), 0);
        p.on_message(&ram_write(addr::AREA_DATA_LOW, 0xe5), 0);
        p.on_message(&ram_write(addr::AREA_DATA_HIGH, 0xa2), 0);
        p
    }

    fn ppu_write(p: &mut Projector, vram: u16, value: u8) {
        p.on_message(&msg(MessageType::PpuAddrWrite, &[(vram >> 8) as u8]), 0);
        p.on_message(&msg(MessageType::PpuAddrWrite, &[(vram & 0xff) as u8]), 0);
        p.on_message(&msg(MessageType::PpuDataWrite, &[value]), 0);
    }

    #[test]
    fn strobe_closes_a_frame() {
        let mut p = projector();
        assert!(p.on_message(&m2(0x10000), 5).is_none());
        assert!(p.on_message(&ram_write(addr::SCREENEDGE_PAGELOC, 2), 5).is_none());
        assert!(p.on_message(&ram_write(addr::SCREENEDGE_X_POS, 0x21), 5).is_none());

        let out = p.on_message(&strobe(), 6).expect("boundary output");
        assert!(out.powered_on);
        assert_eq!(out.elapsed, 6);
        assert_eq!(out.frame.apx, 2 * 256 + 0x21);
        assert_eq!(out.frame.prev_apx, 0);
    }

    #[test]
    fn unchanged_m2_is_skipped() {
        let mut p = projector();
        p.on_message(&m2(0x10000), 0);
        assert!(p.on_message(&strobe(), 0).is_some());
        // Same m2: this strobe must not emit.
        assert!(p.on_message(&strobe(), 1).is_none());
        p.on_message(&m2(0x20000), 2);
        assert!(p.on_message(&strobe(), 2).is_some());
    }

    #[test]
    fn rst_low_emits_powered_off_output() {
        let mut p = projector();
        p.on_message(&m2(0x10000), 0);
        p.on_message(&strobe(), 0);

        let out = p.on_message(&msg(MessageType::RstLow, &[]), 3).expect("reset output");
        assert!(!out.powered_on);
        assert_eq!(out.m2, 0);
        assert_eq!(out.frame, FrameInfo::default());
    }

    #[test]
    fn prev_apx_tracks_last_emission() {
        let mut p = projector();
        p.on_message(&m2(0x10000), 0);
        p.on_message(&ram_write(addr::SCREENEDGE_PAGELOC, 1), 0);
        p.on_message(&ram_write(addr::SCREENEDGE_X_POS, 0), 0);
        let a = p.on_message(&strobe(), 0).unwrap();
        assert_eq!(a.frame.apx, 256);

        p.on_message(&m2(0x20000), 1);
        p.on_message(&ram_write(addr::SCREENEDGE_X_POS, 0x40), 1);
        let b = p.on_message(&strobe(), 1).unwrap();
        assert_eq!(b.frame.prev_apx, 256);
        assert_eq!(b.frame.apx, 256 + 0x40);
    }

    #[test]
    fn sound_queue_latch_keeps_first_nonzero_per_batch() {
        let mut p = projector();
        p.on_message(&m2(0x10000), 0);
        p.on_message(&ram_write(addr::SQUARE1_SOUND_QUEUE, 0x80), 0);
        // A later write in the same batch loses.
        p.on_message(&ram_write(addr::SQUARE1_SOUND_QUEUE, 0x02), 0);
        // Zero writes never latch.
        p.on_message(&ram_write(addr::NOISE_SOUND_QUEUE, 0x00), 0);

        let out = p.on_message(&strobe(), 0).unwrap();
        assert_eq!(out.frame.sound_queues.square1, 0x80);
        assert_eq!(out.frame.sound_queues.noise, 0);

        // Latch cleared after emission.
        p.on_message(&m2(0x20000), 1);
        let out = p.on_message(&strobe(), 1).unwrap();
        assert_eq!(out.frame.sound_queues.square1, 0);
    }

    #[test]
    fn castle_wrap_correction_applies_only_to_8_4() {
        assert_eq!(area_pointer_x(1, 0, AreaId::CASTLE_AREA_6, 1), 256 + 1024);
        assert_eq!(area_pointer_x(1, 0, AreaId::CASTLE_AREA_6, 0), 256);
        assert_eq!(area_pointer_x(1, 0, AreaId::GROUND_AREA_6, 1), 256);
        // Past the first two pages the correction no longer applies.
        assert_eq!(area_pointer_x(2, 0, AreaId::CASTLE_AREA_6, 1), 512);
    }

    #[test]
    fn nt_diffs_respect_window_and_baseline() {
        let mut p = projector_on_1_1();

        // Write a tile at row 5, col 3 of nametable 0 via the PPU port.
        ppu_write(&mut p, 0x2000 + (5 * 32 + 3) as u16, 0x45);

        let out = p.on_message(&strobe(), 0).unwrap();
        let diff = out
            .frame
            .nt_diffs
            .iter()
            .find(|d| d.offset == 5 * 32 + 3)
            .expect("tile diff present");
        assert_eq!(diff.nametable_page, 0);
        assert_eq!(diff.value, 0x45);

        // Status-bar rows are never diffed.
        assert!(out.frame.nt_diffs.iter().all(|d| {
            d.offset >= (addr::FIRST_DIFF_ROW * 32) as i32
        }));
        assert_eq!(out.frame.top_rows.len(), addr::TOP_ROWS_LEN);
    }

    #[test]
    fn attribute_only_change_is_not_diffed() {
        let mut p = projector_on_1_1();

        // Attribute byte for the block covering rows 4..8, cols 0..4;
        // none of that block's tiles change.
        let attr = addr::ATTRIBUTE_OFFSET + (5 / 4) * 8 + 3 / 4;
        ppu_write(&mut p, 0x2000 + attr as u16, 0x05);

        let out = p.on_message(&strobe(), 0).unwrap();
        assert!(out.frame.nt_diffs.is_empty());
    }

    #[test]
    fn attribute_diff_rides_along_with_a_tile_diff() {
        let mut p = projector_on_1_1();

        // Two tiles inside the same 4x4 block, plus that block's
        // attribute byte.
        let attr = addr::ATTRIBUTE_OFFSET + (5 / 4) * 8 + 3 / 4;
        ppu_write(&mut p, 0x2000 + (5 * 32 + 3) as u16, 0x45);
        ppu_write(&mut p, 0x2000 + (6 * 32 + 3) as u16, 0x46);
        ppu_write(&mut p, 0x2000 + attr as u16, 0x05);

        let out = p.on_message(&strobe(), 0).unwrap();
        let attr_diffs: Vec<_> = out
            .frame
            .nt_diffs
            .iter()
            .filter(|d| d.offset == attr as i32)
            .collect();
        // Exactly one attribute diff despite two dirty tiles in the block.
        assert_eq!(attr_diffs.len(), 1);
        assert_eq!(attr_diffs[0].value, 0x05);
        assert_eq!(out.frame.nt_diffs.len(), 3);
    }

    #[test]
    fn run_start_detection() {
        let mut f = FrameInfo {
            aid: AreaId::GROUND_AREA_6,
            apx: 3,
            time: 400,
            ..FrameInfo::default()
        };
        assert!(f.is_run_start());
        f.time = 399;
        assert!(f.is_run_start());
        f.time = 398;
        assert!(!f.is_run_start());
        f.time = 400;
        f.apx = 15;
        assert!(!f.is_run_start());
        f.apx = 3;
        f.aid = AreaId::CASTLE_AREA_6;
        assert!(!f.is_run_start());
    }
}
