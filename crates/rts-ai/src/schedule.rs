//! Per-behavior tick scheduling.
//!
//! Each behavior keeps the tick at which it next becomes eligible. Running a
//! behavior pushes that tick forward by the behavior's interval.

use serde::{Deserialize, Serialize};

use crate::config::{Difficulty, ScheduleConfig};

const BEHAVIOR_COUNT: usize = 10;

/// Scheduled controller behaviors, in the order they run within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Defense,
    Vision,
    PruneIntel,
    Scout,
    AdaptComposition,
    Build,
    Harvesters,
    Repair,
    Train,
    Army,
}

impl Behavior {
    pub const ALL: [Behavior; BEHAVIOR_COUNT] = [
        Behavior::Defense,
        Behavior::Vision,
        Behavior::PruneIntel,
        Behavior::Scout,
        Behavior::AdaptComposition,
        Behavior::Build,
        Behavior::Harvesters,
        Behavior::Repair,
        Behavior::Train,
        Behavior::Army,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Ticks between runs at the given difficulty.
    pub fn interval(self, config: &ScheduleConfig, difficulty: Difficulty) -> u64 {
        let ticks = match self {
            Behavior::Defense => config.defense,
            Behavior::Vision => config.vision,
            Behavior::PruneIntel => config.prune_intel,
            Behavior::Scout => config.scout,
            Behavior::AdaptComposition => config.adapt_composition,
            Behavior::Build => difficulty.pick(&config.build),
            Behavior::Harvesters => config.harvesters,
            Behavior::Repair => config.repair,
            Behavior::Train => difficulty.pick(&config.train),
            Behavior::Army => difficulty.pick(&config.army),
        };
        ticks.max(1)
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    next_tick: [u64; BEHAVIOR_COUNT],
    offset: u64,
}

impl Scheduler {
    /// All behaviors become eligible at `offset`.
    pub fn new(offset: u64) -> Self {
        Self {
            next_tick: [offset; BEHAVIOR_COUNT],
            offset,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_due(&self, behavior: Behavior, tick: u64) -> bool {
        tick >= self.next_tick[behavior.index()]
    }

    pub fn next_tick(&self, behavior: Behavior) -> u64 {
        self.next_tick[behavior.index()]
    }

    /// Records a run at `tick`; the behavior is next due `interval` ticks later.
    pub fn mark_ran(&mut self, behavior: Behavior, tick: u64, interval: u64) {
        self.next_tick[behavior.index()] = tick + interval.max(1);
    }

    /// Holds a behavior back until at least `tick`.
    pub fn defer_until(&mut self, behavior: Behavior, tick: u64) {
        let slot = &mut self.next_tick[behavior.index()];
        *slot = (*slot).max(tick);
    }

    /// Re-bases every behavior on `tick`, keeping the instance offset.
    pub fn restart(&mut self, tick: u64) {
        self.next_tick = [tick + self.offset; BEHAVIOR_COUNT];
    }

    /// Behaviors due at `tick`, in run order.
    pub fn due(&self, tick: u64) -> Vec<Behavior> {
        Behavior::ALL
            .into_iter()
            .filter(|b| self.is_due(*b, tick))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_delays_first_run() {
        let scheduler = Scheduler::new(5);
        assert!(!scheduler.is_due(Behavior::Build, 4));
        assert!(scheduler.is_due(Behavior::Build, 5));
        assert_eq!(scheduler.due(5).len(), Behavior::ALL.len());
    }

    #[test]
    fn test_mark_ran_and_defer() {
        let mut scheduler = Scheduler::new(0);
        scheduler.mark_ran(Behavior::Army, 10, 60);
        assert!(!scheduler.is_due(Behavior::Army, 69));
        assert!(scheduler.is_due(Behavior::Army, 70));

        scheduler.defer_until(Behavior::Army, 100);
        assert_eq!(scheduler.next_tick(Behavior::Army), 100);
        scheduler.defer_until(Behavior::Army, 50);
        assert_eq!(scheduler.next_tick(Behavior::Army), 100);

        scheduler.restart(200);
        assert_eq!(scheduler.next_tick(Behavior::Vision), 200);
    }

    #[test]
    fn test_intervals_scale_with_difficulty() {
        let config = ScheduleConfig::default();
        let easy = Behavior::Build.interval(&config, Difficulty::Easy);
        let hard = Behavior::Build.interval(&config, Difficulty::Hard);
        assert!(hard < easy);
        assert_eq!(Behavior::Vision.interval(&config, Difficulty::Easy), config.vision);
    }
}
