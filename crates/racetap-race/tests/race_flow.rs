//! End-to-end orchestrator behavior over scripted feeds.

use std::collections::VecDeque;
use std::sync::Arc;

use racetap_core::Output;
use racetap_core::output::m2_delta_to_ms;
use racetap_core::smb::{AreaId, FrameInfo, Route};
use racetap_feed::OutputSource;
use racetap_race::tower::round_to_grid;
use racetap_race::{Race, RacePlayer};

struct ScriptedFeed {
    queue: VecDeque<Arc<Output>>,
}

impl ScriptedFeed {
    fn new(outputs: Vec<Output>) -> Self {
        Self {
            queue: outputs.into_iter().map(Arc::new).collect(),
        }
    }
}

impl OutputSource for ScriptedFeed {
    fn latest(&mut self) -> Option<Arc<Output>> {
        self.queue.back().cloned()
    }

    fn next(&mut self) -> Option<Arc<Output>> {
        self.queue.pop_front()
    }
}

fn frame(aid: AreaId, apx: i32, world: u8, level: u8, time: i32, m2: u64) -> Output {
    Output {
        powered_on: true,
        m2,
        elapsed: (m2 / 1790) as i64,
        frame: FrameInfo {
            aid,
            apx,
            world,
            level,
            time,
            ..FrameInfo::default()
        },
        ..Output::default()
    }
}

fn run_start(m2: u64) -> Output {
    frame(AreaId::GROUND_AREA_6, 3, 1, 1, 400, m2)
}

fn players() -> Vec<RacePlayer> {
    vec![RacePlayer::new(1, "ALPHA"), RacePlayer::new(2, "BRAVO")]
}

#[test]
fn standings_rank_by_progress_and_arrival() {
    let mut race = Race::new("test race", Route::any_percent(), players());

    // Both start; ALPHA reaches 1-2 (section 1), BRAVO stays in 1-1.
    race.attach_feed(
        1,
        Box::new(ScriptedFeed::new(vec![
            run_start(1_000),
            frame(AreaId::GROUND_AREA_6, 600, 1, 1, 390, 200_000),
            frame(AreaId::UNDERGROUND_AREA_1, 40, 1, 2, 350, 700_000),
        ])),
    );
    race.attach_feed(
        2,
        Box::new(ScriptedFeed::new(vec![
            run_start(5_000),
            frame(AreaId::GROUND_AREA_6, 900, 1, 1, 380, 600_000),
        ])),
    );
    race.step();

    let standings = race.standings();
    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].player, 1);
    assert_eq!(standings[0].position, 1);
    assert_eq!(standings[0].interval_ms, 0);
    assert_eq!(standings[1].player, 2);
    assert_eq!(standings[1].position, 2);

    let tower = &race.tower.draw_state;
    assert_eq!(tower.entries[0].name, "ALPHA");
    assert_eq!(tower.entries[1].name, "BRAVO");
    assert!(tower.entries[1].interval_ms > 0);
}

#[test]
fn interval_is_the_grid_rounded_gap_at_the_trailing_position() {
    // Both players cross into section 1 page 0; BRAVO arrives a run-
    // relative 3_579_546 m2 (2.000 s) later.
    let delta: u64 = 3_579_546;
    let mut race = Race::new("gap", Route::any_percent(), players());
    race.attach_feed(
        1,
        Box::new(ScriptedFeed::new(vec![
            run_start(1_000),
            frame(AreaId::UNDERGROUND_AREA_1, 10, 1, 2, 390, 1_000 + 5_000_000),
        ])),
    );
    race.attach_feed(
        2,
        Box::new(ScriptedFeed::new(vec![
            run_start(2_000),
            frame(
                AreaId::UNDERGROUND_AREA_1,
                10,
                1,
                2,
                390,
                2_000 + 5_000_000 + delta,
            ),
        ])),
    );
    race.step();

    let standings = race.standings();
    assert_eq!(standings[0].player, 1);
    let expected = round_to_grid(m2_delta_to_ms(delta));
    assert_eq!(expected, 2000);
    assert_eq!(standings[1].interval_ms, expected);
}

#[test]
fn unstarted_players_show_minus_one() {
    let mut race = Race::new("idle", Route::any_percent(), players());
    race.attach_feed(1, Box::new(ScriptedFeed::new(vec![run_start(1_000)])));
    // BRAVO's console is on but still on the title screen.
    race.attach_feed(
        2,
        Box::new(ScriptedFeed::new(vec![frame(
            AreaId(0),
            0,
            0,
            0,
            -1,
            500,
        )])),
    );
    race.step();

    let standings = race.standings();
    assert_eq!(standings[0].player, 1);
    assert_eq!(standings[1].player, 2);
    assert_eq!(standings[1].interval_ms, -1);
    assert!(!standings[1].in_section);
}

#[test]
fn replay_and_markers_follow_ingest() {
    let mut race = Race::new("replay", Route::any_percent(), players());
    race.attach_feed(
        1,
        Box::new(ScriptedFeed::new(vec![
            run_start(1_000),
            frame(AreaId::GROUND_AREA_6, 300, 1, 1, 395, 100_000),
        ])),
    );
    race.step();

    let buffer = race.replay.buffer(1).expect("replay buffer");
    assert_eq!(buffer.len(), 2);

    let markers = race.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].player, 1);
    assert_eq!(markers[0].category_x, 300);

    // The combined view latched onto the only visible player.
    assert_eq!(race.view.player, Some(1));
}

#[test]
fn tie_on_section_and_page_breaks_by_arrival_time() {
    let mut race = Race::new("tie", Route::any_percent(), players());
    // Same (section, page); BRAVO got there first relative to their start.
    race.attach_feed(
        1,
        Box::new(ScriptedFeed::new(vec![
            run_start(1_000),
            frame(AreaId::GROUND_AREA_6, 300, 1, 1, 390, 901_000),
        ])),
    );
    race.attach_feed(
        2,
        Box::new(ScriptedFeed::new(vec![
            run_start(50_000),
            frame(AreaId::GROUND_AREA_6, 300, 1, 1, 390, 850_000),
        ])),
    );
    race.step();

    let standings = race.standings();
    assert_eq!(standings[0].player, 2);
    assert_eq!(standings[1].player, 1);
}
