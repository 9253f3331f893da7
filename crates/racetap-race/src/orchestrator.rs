//! Cross-player race state: ingest, standings, tower, minimap, combined
//! view, replay capture and sound routing, advanced once per display
//! frame.

use std::collections::HashMap;
use std::sync::Arc;

use racetap_core::Output;
use racetap_core::output::m2_delta_to_ms;
use racetap_core::smb::Route;
use racetap_feed::OutputSource;
use tracing::debug;

use crate::minimap::{Minimap, PlayerMarker};
use crate::player::{PlayerId, RacePlayer};
use crate::replay::ReplayCenter;
use crate::sound::{SoundDispatcher, SoundFrame};
use crate::timing::PlayerTimings;
use crate::tower::{TimingTower, TowerEntry, TowerState, round_to_grid};
use crate::view::{CombinedView, classify};

/// One row of the computed standings, in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub player: PlayerId,
    pub position: i32,
    /// -1 not running, 0 leader, otherwise gap to the row above (or the
    /// final time for finished rows).
    pub interval_ms: i64,
    pub is_final: bool,
    pub in_section: bool,
}

/// Rank key: finished runs first (fastest first), then runners by
/// progress, then seats still waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RankClass {
    Finished { final_rel_m2: u64 },
    Running { section: usize, page: i32, rel_m2: u64 },
    Waiting,
}

impl RankClass {
    fn sort_key(&self) -> (u8, u64, i64, i64, u64) {
        match *self {
            RankClass::Finished { final_rel_m2 } => (0, final_rel_m2, 0, 0, 0),
            RankClass::Running {
                section,
                page,
                rel_m2,
            } => (1, 0, -(section as i64), -i64::from(page), rel_m2),
            RankClass::Waiting => (2, 0, 0, 0, 0),
        }
    }
}

pub struct Race {
    title: String,
    route: Route,
    players: Vec<RacePlayer>,
    feeds: HashMap<PlayerId, Box<dyn OutputSource>>,
    latest: HashMap<PlayerId, Arc<Output>>,
    timings: HashMap<PlayerId, PlayerTimings>,
    pub tower: TimingTower,
    pub minimap: Minimap,
    pub view: CombinedView,
    pub replay: ReplayCenter,
    pub sound: SoundDispatcher,
    standings: Vec<Standing>,
    markers: Vec<PlayerMarker>,
    sound_frames: Vec<(PlayerId, SoundFrame)>,
    frame_number: u64,
}

impl Race {
    pub fn new(title: &str, route: Route, players: Vec<RacePlayer>) -> Self {
        let timings = players
            .iter()
            .map(|p| (p.id, PlayerTimings::new()))
            .collect();
        Self {
            title: title.to_owned(),
            route,
            players,
            feeds: HashMap::new(),
            latest: HashMap::new(),
            timings,
            tower: TimingTower::new(),
            minimap: Minimap::new(),
            view: CombinedView::new(),
            replay: ReplayCenter::default(),
            sound: SoundDispatcher::new(),
            standings: Vec::new(),
            markers: Vec::new(),
            sound_frames: Vec::new(),
            frame_number: 0,
        }
    }

    pub fn attach_feed(&mut self, player: PlayerId, feed: Box<dyn OutputSource>) {
        self.feeds.insert(player, feed);
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn players(&self) -> &[RacePlayer] {
        &self.players
    }

    pub fn timings(&self, player: PlayerId) -> Option<&PlayerTimings> {
        self.timings.get(&player)
    }

    pub fn latest_output(&self, player: PlayerId) -> Option<&Arc<Output>> {
        self.latest.get(&player)
    }

    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    pub fn markers(&self) -> &[PlayerMarker] {
        &self.markers
    }

    /// Audio events raised by the most recent step.
    pub fn sound_frames(&self) -> &[(PlayerId, SoundFrame)] {
        &self.sound_frames
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// One display frame: drain feeds, recompute standings, move the
    /// tower, minimap and combined view.
    pub fn step(&mut self) {
        self.ingest();
        self.update_markers();
        self.standings = self.compute_standings();
        self.tower.target_state = self.build_tower_target();
        self.tower.reconcile();
        self.minimap.step(&self.route, &self.markers);
        self.view.step(&self.markers);
        self.view.view_type =
            classify(self.view.player.and_then(|id| self.latest.get(&id)));
        self.frame_number += 1;
    }

    fn ingest(&mut self) {
        self.sound_frames.clear();
        for player in &self.players {
            let Some(feed) = self.feeds.get_mut(&player.id) else {
                continue;
            };
            while let Some(output) = feed.next() {
                if let Some(timings) = self.timings.get_mut(&player.id) {
                    timings.step(&self.route, &output);
                }
                let sound_frame = self.sound.on_output(player.id, &output);
                if sound_frame != SoundFrame::default() {
                    self.sound_frames.push((player.id, sound_frame));
                }
                self.replay.note_output(player.id, Arc::clone(&output));
                self.latest.insert(player.id, output);
            }
        }
    }

    fn update_markers(&mut self) {
        self.markers.clear();
        for player in &self.players {
            let Some(out) = self.latest.get(&player.id) else {
                continue;
            };
            if !out.powered_on {
                continue;
            }
            let f = &out.frame;
            match self.route.in_category(f.aid, f.apx, f.world, f.level) {
                Some(pos) => self.markers.push(PlayerMarker {
                    player: player.id,
                    section: pos.section,
                    category_x: pos.category_x,
                }),
                None => {
                    // Off route this frame (menu, pipe, death): no marker.
                    debug!(player = player.id, aid = %f.aid, "off route");
                }
            }
        }
    }

    fn rank_class(&self, player: PlayerId) -> RankClass {
        let Some(t) = self.timings.get(&player) else {
            return RankClass::Waiting;
        };
        let Some(start) = t.start_m2() else {
            return RankClass::Waiting;
        };
        if let Some(final_m2) = t.final_m2() {
            return RankClass::Finished {
                final_rel_m2: final_m2.saturating_sub(start),
            };
        }
        if !t.running() {
            return RankClass::Waiting;
        }
        let Some((section, page)) = t.section_page() else {
            return RankClass::Waiting;
        };
        let split = t.m2_at(section, page).unwrap_or(start);
        RankClass::Running {
            section,
            page,
            rel_m2: split.saturating_sub(start),
        }
    }

    /// Rank primarily by section, then page, then earlier arrival; the
    /// player id closes the order so equal keys resolve the same way
    /// every frame.
    fn compute_standings(&self) -> Vec<Standing> {
        let mut ranked: Vec<(RacePlayer, RankClass)> = self
            .players
            .iter()
            .map(|p| (p.clone(), self.rank_class(p.id)))
            .collect();
        ranked.sort_by_key(|(p, class)| (class.sort_key(), p.id));

        let mut standings = Vec::with_capacity(ranked.len());
        for (i, (player, class)) in ranked.iter().enumerate() {
            let position = i as i32 + 1;
            let interval_ms = match *class {
                RankClass::Waiting => -1,
                RankClass::Finished { final_rel_m2 } => m2_delta_to_ms(final_rel_m2),
                RankClass::Running { section, page, rel_m2 } => {
                    if i == 0 {
                        0
                    } else {
                        self.interval_behind(&ranked[i - 1], section, page, rel_m2)
                    }
                }
            };
            standings.push(Standing {
                player: player.id,
                position,
                interval_ms,
                is_final: matches!(class, RankClass::Finished { .. }),
                in_section: self.markers.iter().any(|m| m.player == player.id),
            });
        }
        standings
    }

    /// Gap to the player immediately ahead, measured where the trailing
    /// player is now: both cumulative (run-relative) m2 counts at the
    /// trailing player's `(section, page)`, subtracted and put on the
    /// display grid.
    fn interval_behind(
        &self,
        ahead: &(RacePlayer, RankClass),
        section: usize,
        page: i32,
        rel_m2: u64,
    ) -> i64 {
        let (ahead_player, ahead_class) = ahead;
        if matches!(ahead_class, RankClass::Waiting) {
            return -1;
        }
        let Some(ahead_t) = self.timings.get(&ahead_player.id) else {
            return -1;
        };
        let (Some(ahead_start), Some(ahead_at)) = (ahead_t.start_m2(), ahead_t.m2_at(section, page))
        else {
            return -1;
        };
        let ahead_rel = ahead_at.saturating_sub(ahead_start);
        let delta = rel_m2.saturating_sub(ahead_rel);
        round_to_grid(m2_delta_to_ms(delta))
    }

    fn build_tower_target(&self) -> TowerState {
        let entries = self
            .standings
            .iter()
            .map(|s| {
                let player = self
                    .players
                    .iter()
                    .find(|p| p.id == s.player)
                    .expect("standings only rank configured players");
                TowerEntry {
                    position: s.position,
                    color: player.color,
                    name: player.short_name.clone(),
                    interval_ms: s.interval_ms,
                    is_final_time: s.is_final,
                    in_section: s.in_section,
                    is_highlight: self.view.player == Some(s.player),
                    y: 0,
                }
            })
            .collect();
        let mut state = TowerState {
            title: self.title.clone(),
            subtitle: self.route.name.clone(),
            entries,
        };
        // Equal positions (mid-animation ties) keep larger gaps lower so
        // rows do not flicker past each other.
        state
            .entries
            .sort_by_key(|e| (e.position, e.interval_ms.max(0)));
        state
    }
}
