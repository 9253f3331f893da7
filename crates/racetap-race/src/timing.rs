//! Per-player split ledger keyed by route section and page.

use racetap_core::Output;
use racetap_core::smb::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingState {
    #[default]
    WaitingForOneOne,
    Running,
}

/// The split ledger for one player.
///
/// `split_m2s[0]` is the run start; `split_m2s[i]` the m2 at which section
/// `i` was entered; after a finish the vector is padded to one entry per
/// section plus the final split. `split_page_m2s` mirrors it with one
/// inner vector per section, one entry per 256-pixel page. Values are
/// nondecreasing within every vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerTimings {
    pub state: TimingState,
    pub split_m2s: Vec<u64>,
    pub split_page_m2s: Vec<Vec<u64>>,
    pub finished: bool,
}

impl PlayerTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(&self) -> bool {
        self.state == TimingState::Running
    }

    pub fn start_m2(&self) -> Option<u64> {
        self.split_m2s.first().copied()
    }

    /// Last (section, page) with a recorded split.
    pub fn section_page(&self) -> Option<(usize, i32)> {
        let section = self.split_page_m2s.len().checked_sub(1)?;
        let page = self.split_page_m2s[section].len().checked_sub(1)? as i32;
        Some((section, page))
    }

    /// m2 recorded at `(section, page)`, or the nearest earlier split when
    /// the exact page was skipped by a shortcut.
    pub fn m2_at(&self, section: usize, page: i32) -> Option<u64> {
        let pages = self.split_page_m2s.get(section)?;
        if pages.is_empty() {
            return self.split_m2s.get(section).copied();
        }
        let idx = (page.max(0) as usize).min(pages.len() - 1);
        Some(pages[idx])
    }

    pub fn final_m2(&self) -> Option<u64> {
        if self.finished {
            self.split_m2s.last().copied()
        } else {
            None
        }
    }

    pub fn step(&mut self, route: &Route, output: &Output) {
        match self.state {
            TimingState::WaitingForOneOne => {
                if output.powered_on && output.frame.is_run_start() {
                    self.state = TimingState::Running;
                    self.finished = false;
                    self.split_m2s = vec![output.m2];
                    self.split_page_m2s = vec![vec![output.m2]];
                }
            }
            TimingState::Running => {
                if !output.powered_on {
                    *self = Self::new();
                    return;
                }
                let f = &output.frame;
                if f.world == 8 && f.level == 4 && f.apx > 4096 && f.oper_mode == 0x02 {
                    self.finalize(route, output.m2);
                    return;
                }
                let Some(pos) = route.in_category(f.aid, f.apx, f.world, f.level) else {
                    return;
                };
                let page = route.page_of(pos.section, f.apx);
                let current = self.section_page();
                if current == Some((pos.section, page)) {
                    return;
                }
                if let Some(from) = current
                    && route.is_split_exception(from, (pos.section, page))
                {
                    return;
                }
                self.record(pos.section, page, output.m2);
            }
        }
    }

    /// Grow the ledger so `(section, page)` has a split. Sections and
    /// pages jumped over in the same frame inherit this split's m2;
    /// moving backwards records nothing.
    fn record(&mut self, section: usize, page: i32, m2: u64) {
        while self.split_page_m2s.len() <= section {
            self.split_page_m2s.push(Vec::new());
            self.split_m2s.push(m2);
        }
        let pages = &mut self.split_page_m2s[section];
        while (pages.len() as i32) <= page {
            pages.push(m2);
        }
    }

    /// End of game: pad the ledger to the full route and close it with a
    /// final split. The ledger stays visible; the state machine returns
    /// to waiting so a console reset can start a fresh run.
    fn finalize(&mut self, route: &Route, m2: u64) {
        let pad = self.split_m2s.last().copied().unwrap_or(m2);
        while self.split_m2s.len() < route.sections.len() {
            self.split_m2s.push(pad);
            self.split_page_m2s.push(vec![pad]);
        }
        self.split_m2s.push(m2);
        self.split_page_m2s.push(vec![m2]);
        self.finished = true;
        self.state = TimingState::WaitingForOneOne;
    }
}
