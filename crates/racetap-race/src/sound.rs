//! Maps the game's sound queues to effect and music-track lifecycles.
//!
//! Queue bytes follow the game's sound engine: each queue is a bitfield
//! written once when an effect fires, and `0x80` in a music queue means
//! "stop the music". Area tracks loop until replaced; event tracks (death,
//! level clear, ...) play exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use racetap_core::Output;
use strum::Display;

use crate::player::PlayerId;

/// Music queue value meaning "silence".
pub const MUSIC_SILENCE: u8 = 0x80;

/// Area tracks occupy the low byte; event tracks are shifted into their
/// own domain so one table covers both queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MusicTrack {
    Water,
    Ground,
    Underground,
    Castle,
    Cloud,
    PipeIntro,
    StarPower,
    Death,
    GameOver,
    AltGameOver,
    EndOfCastle,
    EndOfLevel,
    Victory,
    TimeRunningOut,
}

impl MusicTrack {
    pub fn from_area_queue(value: u8) -> Option<MusicTrack> {
        match value {
            0x01 => Some(Self::Water),
            0x02 => Some(Self::Ground),
            0x04 => Some(Self::Underground),
            0x08 => Some(Self::Castle),
            0x10 => Some(Self::Cloud),
            0x20 => Some(Self::PipeIntro),
            0x40 => Some(Self::StarPower),
            _ => None,
        }
    }

    pub fn from_event_queue(value: u8) -> Option<MusicTrack> {
        match value {
            0x01 => Some(Self::Death),
            0x02 => Some(Self::GameOver),
            0x04 => Some(Self::AltGameOver),
            0x08 => Some(Self::EndOfCastle),
            0x10 => Some(Self::EndOfLevel),
            0x20 => Some(Self::Victory),
            0x40 => Some(Self::TimeRunningOut),
            _ => None,
        }
    }

    /// Area and star-power tracks loop; event cues play once.
    pub fn loops(self) -> bool {
        matches!(
            self,
            Self::Water
                | Self::Ground
                | Self::Underground
                | Self::Castle
                | Self::Cloud
                | Self::PipeIntro
                | Self::StarPower
        )
    }
}

/// Fire-and-forget channel effects by queue bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SoundEffect {
    // Pause queue.
    PauseToggle,
    // Square 1 queue.
    BigJump,
    Bump,
    EnemyStomp,
    EnemySmack,
    PipeDownInjury,
    Fireball,
    Flagpole,
    SmallJump,
    // Square 2 queue.
    CoinGrab,
    GrowPowerUp,
    GrowVine,
    Blast,
    TimerTick,
    PowerUpGrab,
    ExtraLife,
    BowserFall,
    // Noise queue.
    BrickShatter,
    BowserFlame,
}

fn square1_effects(value: u8, out: &mut Vec<SoundEffect>) {
    const TABLE: [(u8, SoundEffect); 8] = [
        (0x01, SoundEffect::BigJump),
        (0x02, SoundEffect::Bump),
        (0x04, SoundEffect::EnemyStomp),
        (0x08, SoundEffect::EnemySmack),
        (0x10, SoundEffect::PipeDownInjury),
        (0x20, SoundEffect::Fireball),
        (0x40, SoundEffect::Flagpole),
        (0x80, SoundEffect::SmallJump),
    ];
    for (bit, effect) in TABLE {
        if value & bit != 0 {
            out.push(effect);
        }
    }
}

fn square2_effects(value: u8, out: &mut Vec<SoundEffect>) {
    const TABLE: [(u8, SoundEffect); 8] = [
        (0x01, SoundEffect::CoinGrab),
        (0x02, SoundEffect::GrowPowerUp),
        (0x04, SoundEffect::GrowVine),
        (0x08, SoundEffect::Blast),
        (0x10, SoundEffect::TimerTick),
        (0x20, SoundEffect::PowerUpGrab),
        (0x40, SoundEffect::ExtraLife),
        (0x80, SoundEffect::BowserFall),
    ];
    for (bit, effect) in TABLE {
        if value & bit != 0 {
            out.push(effect);
        }
    }
}

fn noise_effects(value: u8, out: &mut Vec<SoundEffect>) {
    const TABLE: [(u8, SoundEffect); 2] = [
        (0x01, SoundEffect::BrickShatter),
        (0x02, SoundEffect::BowserFlame),
    ];
    for (bit, effect) in TABLE {
        if value & bit != 0 {
            out.push(effect);
        }
    }
}

/// What a player's frame asked of the audio layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoundFrame {
    pub effects: Vec<SoundEffect>,
    /// `Some(Some(track))`: start this track. `Some(None)`: silence.
    pub music: Option<Option<MusicTrack>>,
}

/// Tracks per-player music and turns queue snapshots into audio events.
///
/// Which player's music actually reaches the speakers is a policy
/// decision left to the caller; the per-player map is exposed for it.
#[derive(Debug, Default)]
pub struct SoundDispatcher {
    player_music: HashMap<PlayerId, MusicTrack>,
}

impl SoundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_music(&self, player: PlayerId) -> Option<MusicTrack> {
        self.player_music.get(&player).copied()
    }

    pub fn player_music(&self) -> &HashMap<PlayerId, MusicTrack> {
        &self.player_music
    }

    pub fn on_output(&mut self, player: PlayerId, output: &Arc<Output>) -> SoundFrame {
        let mut frame = SoundFrame::default();
        if !output.powered_on {
            self.player_music.remove(&player);
            return frame;
        }
        let q = &output.frame.sound_queues;

        if q.pause != 0 {
            frame.effects.push(SoundEffect::PauseToggle);
        }
        square1_effects(q.square1, &mut frame.effects);
        square2_effects(q.square2, &mut frame.effects);
        noise_effects(q.noise, &mut frame.effects);

        // Event music outranks area music within one frame.
        type Lookup = fn(u8) -> Option<MusicTrack>;
        let request: Option<(u8, Lookup)> = if q.event_music != 0 {
            Some((q.event_music, MusicTrack::from_event_queue))
        } else if q.area_music != 0 {
            Some((q.area_music, MusicTrack::from_area_queue))
        } else {
            None
        };
        if let Some((value, lookup)) = request {
            if value == MUSIC_SILENCE {
                self.player_music.remove(&player);
                frame.music = Some(None);
            } else if let Some(track) = lookup(value) {
                self.player_music.insert(player, track);
                frame.music = Some(Some(track));
            }
        }
        frame
    }
}
