//! `TempoMap`: a bidirectional tick↔seconds mapping, grounded directly on the tempo
//! table arithmetic of the original sequencer (`getSecFromClock` / `getClockFromSec`).

use crate::model::tick::{Tick, DEFAULT_TEMPO_US, TICKS_PER_QUARTER_NOTE};

/// One tempo change: the tick it takes effect at, its tempo in microseconds per
/// quarter note, and a cached wall-clock time in seconds, recomputed whenever the
/// map is mutated.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TempoEntry {
    tick: Tick,
    microseconds_per_quarter: i64,
    time: f64,
}

/// Sorted list of tempo changes. Empty behaves as a single implicit entry
/// `{tick: 0, tempo: 500_000}`.
#[derive(Clone, Debug, Default)]
pub struct TempoMap {
    entries: Vec<TempoEntry>,
}

impl TempoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or overwrites the tempo taking effect at `tick`, then recomputes the
    /// cached time of every entry. Dedup on equal tick keeps the *last* insertion.
    pub fn add(&mut self, tick: Tick, microseconds_per_quarter: i64) {
        match self.entries.binary_search_by_key(&tick, |e| e.tick) {
            Ok(idx) => self.entries[idx].microseconds_per_quarter = microseconds_per_quarter,
            Err(idx) => self.entries.insert(
                idx,
                TempoEntry {
                    tick,
                    microseconds_per_quarter,
                    time: 0.0,
                },
            ),
        }
        self.update_cache();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn update_cache(&mut self) {
        for i in 0..self.entries.len() {
            if i == 0 {
                self.entries[0].time = DEFAULT_TEMPO_US as f64 * self.entries[0].tick as f64
                    / (TICKS_PER_QUARTER_NOTE as f64 * 1e6);
            } else {
                let prev = self.entries[i - 1];
                let dtick = (self.entries[i].tick - prev.tick) as f64;
                self.entries[i].time = prev.time
                    + prev.microseconds_per_quarter as f64 * dtick
                        / (TICKS_PER_QUARTER_NOTE as f64 * 1e6);
            }
        }
    }

    /// The tempo entry with the greatest `tick <= target`, or `None` before the first
    /// entry (and always `None` for an empty map).
    fn entry_at_or_before(&self, target: Tick) -> Option<&TempoEntry> {
        let idx = self.entries.partition_point(|e| e.tick <= target);
        if idx == 0 {
            None
        } else {
            Some(&self.entries[idx - 1])
        }
    }

    /// The tempo entry with the greatest `time < target`, or `None` if none precedes.
    fn entry_before_time(&self, target: f64) -> Option<&TempoEntry> {
        let idx = self.entries.partition_point(|e| e.time < target);
        if idx == 0 {
            None
        } else {
            Some(&self.entries[idx - 1])
        }
    }

    /// Maps a tick position to wall-clock seconds.
    pub fn seconds_from_tick(&self, tick: Tick) -> f64 {
        match self.entry_at_or_before(tick) {
            Some(entry) => {
                let dtick = (tick - entry.tick) as f64;
                entry.time
                    + dtick * entry.microseconds_per_quarter as f64
                        / (1e6 * TICKS_PER_QUARTER_NOTE as f64)
            }
            None => {
                let sec_per_tick = DEFAULT_TEMPO_US as f64 / (1e6 * TICKS_PER_QUARTER_NOTE as f64);
                tick as f64 * sec_per_tick
            }
        }
    }

    /// Iterates tempo changes in ascending tick order, as written to the SMF master
    /// track's 0xFF 0x51 meta events. An empty map yields the single implicit entry.
    pub fn iter(&self) -> impl Iterator<Item = (Tick, i64)> + '_ {
        let mut owned: Vec<(Tick, i64)> = self
            .entries
            .iter()
            .map(|e| (e.tick, e.microseconds_per_quarter))
            .collect();
        if owned.is_empty() {
            owned.push((0, DEFAULT_TEMPO_US));
        }
        owned.into_iter()
    }

    /// Maps wall-clock seconds to a (fractional) tick position.
    pub fn tick_from_seconds(&self, seconds: f64) -> f64 {
        match self.entry_before_time(seconds) {
            Some(entry) => {
                let dtime = seconds - entry.time;
                entry.tick as f64
                    + dtime * TICKS_PER_QUARTER_NOTE as f64 * 1e6
                        / entry.microseconds_per_quarter as f64
            }
            None => {
                let tick_per_sec = 1e6 * TICKS_PER_QUARTER_NOTE as f64 / DEFAULT_TEMPO_US as f64;
                seconds * tick_per_sec
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tempo_before_first_entry() {
        let map = TempoMap::new();
        assert_eq!(0.0, map.seconds_from_tick(0));
        assert!((map.seconds_from_tick(480) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn tempo_change_extends_linearly() {
        let mut map = TempoMap::new();
        map.add(0, 500_000);
        map.add(1920, 250_000);
        assert!((map.seconds_from_tick(1920) - 2.0).abs() < 1e-9);
        assert!((map.seconds_from_tick(3840) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_within_tolerance() {
        let mut map = TempoMap::new();
        map.add(0, 500_000);
        map.add(1920, 250_000);
        map.add(5000, 600_000);
        for &t in &[0i64, 100, 1920, 2500, 3840, 9999] {
            let sec = map.seconds_from_tick(t);
            let back = map.seconds_from_tick(map.tick_from_seconds(sec).floor() as Tick);
            assert!((back - sec).abs() < 1e-6, "tick {} sec {} back {}", t, sec, back);
        }
    }

    #[test]
    fn add_on_existing_tick_overwrites() {
        let mut map = TempoMap::new();
        map.add(0, 500_000);
        map.add(0, 400_000);
        assert_eq!(1, map.len());
        assert!((map.seconds_from_tick(480) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn iter_yields_the_implicit_entry_when_empty() {
        let map = TempoMap::new();
        assert_eq!(vec![(0, 500_000)], map.iter().collect::<Vec<_>>());
    }

    #[test]
    fn iter_yields_every_tempo_change_in_tick_order() {
        let mut map = TempoMap::new();
        map.add(1920, 250_000);
        map.add(0, 500_000);
        assert_eq!(
            vec![(0, 500_000), (1920, 250_000)],
            map.iter().collect::<Vec<_>>()
        );
    }
}
