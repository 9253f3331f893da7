//! Combined-view selection: which single player the big shared screen
//! shows, including the smart-follow autoselect.

use std::sync::Arc;

use racetap_core::Output;

use crate::minimap::PlayerMarker;
use crate::player::PlayerId;

/// Frames of sustained leadership before smart-follow switches players.
pub const SMART_SWITCH_FRAMES: i32 = 40;
/// Countdown steps per frame when the challenger is a whole section ahead.
const SECTION_CROSS_DECAY: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewType {
    #[default]
    NoPlayer,
    NoOutput,
    ConsoleOff,
    TitleScreen,
    GameOver,
    Playing,
}

/// OperMode values as the game stores them.
const OPER_MODE_TITLE: u8 = 0x00;
const OPER_MODE_GAME_OVER: u8 = 0x03;

pub fn classify(output: Option<&Arc<Output>>) -> ViewType {
    match output {
        None => ViewType::NoOutput,
        Some(out) if !out.powered_on => ViewType::ConsoleOff,
        Some(out) => match out.frame.oper_mode {
            OPER_MODE_TITLE => ViewType::TitleScreen,
            OPER_MODE_GAME_OVER => ViewType::GameOver,
            _ => ViewType::Playing,
        },
    }
}

#[derive(Debug, Default)]
pub struct CombinedView {
    pub follow_smart: bool,
    pub player: Option<PlayerId>,
    pub view_type: ViewType,
    pending: Option<PlayerId>,
    countdown: i32,
}

impl CombinedView {
    pub fn new() -> Self {
        Self {
            follow_smart: true,
            ..Self::default()
        }
    }

    /// Choose who the combined view shows, with hysteresis: the leader
    /// must hold the front for a sustained stretch before the view
    /// switches, decaying faster when they pulled a section ahead.
    pub fn step(&mut self, markers: &[PlayerMarker]) {
        if !self.follow_smart {
            return;
        }
        let leader = markers
            .iter()
            .max_by_key(|m| (m.section, m.category_x))
            .map(|m| m.player);
        let Some(leader) = leader else {
            return;
        };

        if self.player.is_none() {
            self.player = Some(leader);
            self.pending = None;
            return;
        }
        if Some(leader) == self.player {
            self.pending = None;
            return;
        }

        if self.pending != Some(leader) {
            self.pending = Some(leader);
            self.countdown = SMART_SWITCH_FRAMES;
        }

        let current_section = self
            .player
            .and_then(|id| markers.iter().find(|m| m.player == id))
            .map(|m| m.section);
        let leader_section = markers
            .iter()
            .find(|m| m.player == leader)
            .map(|m| m.section);
        let decay = match (leader_section, current_section) {
            (Some(l), Some(c)) if l > c => SECTION_CROSS_DECAY,
            _ => 1,
        };

        self.countdown -= decay;
        if self.countdown <= 0 {
            self.player = Some(leader);
            self.pending = None;
        }
    }
}
