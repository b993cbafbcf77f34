//! `TimesigMap`: a bar→tick→(numerator,denominator) mapping, grounded on
//! `original_source/Timesig.cpp`'s `{clock, numerator, denominator, barCount}` record.

use crate::model::tick::{Tick, TICKS_PER_QUARTER_NOTE};

/// One time signature change, keyed by bar index.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TimesigEntry {
    bar_index: i32,
    numerator: i32,
    denominator: i32,
    tick: Tick,
}

/// Sorted list of time signature changes. Empty behaves as an implicit 4/4 at bar 0.
#[derive(Clone, Debug, Default)]
pub struct TimesigMap {
    entries: Vec<TimesigEntry>,
}

/// Ticks spanned by one bar of `numerator/denominator` time, at 480 ticks per quarter
/// note: `numerator * (480 * 4 / denominator)`.
fn ticks_per_bar(numerator: i32, denominator: i32) -> Tick {
    numerator as Tick * (TICKS_PER_QUARTER_NOTE * 4 / denominator as Tick)
}

impl TimesigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a time signature change at `bar_index`, then recomputes every entry's
    /// derived tick from the numerator/denominator of the entries preceding it.
    pub fn add(&mut self, bar_index: i32, numerator: i32, denominator: i32) {
        match self
            .entries
            .binary_search_by_key(&bar_index, |e| e.bar_index)
        {
            Ok(idx) => {
                self.entries[idx].numerator = numerator;
                self.entries[idx].denominator = denominator;
            }
            Err(idx) => self.entries.insert(
                idx,
                TimesigEntry {
                    bar_index,
                    numerator,
                    denominator,
                    tick: 0,
                },
            ),
        }
        self.update_ticks();
    }

    fn update_ticks(&mut self) {
        for i in 0..self.entries.len() {
            if i == 0 {
                self.entries[0].tick = 0;
            } else {
                let prev = self.entries[i - 1];
                let bars = (self.entries[i].bar_index - prev.bar_index) as Tick;
                self.entries[i].tick =
                    prev.tick + bars * ticks_per_bar(prev.numerator, prev.denominator);
            }
        }
    }

    /// The `(numerator, denominator)` in effect at `bar_index`.
    pub fn at_bar(&self, bar_index: i32) -> (i32, i32) {
        let idx = self.entries.partition_point(|e| e.bar_index <= bar_index);
        if idx == 0 {
            (4, 4)
        } else {
            let e = self.entries[idx - 1];
            (e.numerator, e.denominator)
        }
    }

    /// Iterates time signature changes in ascending tick order, as written to the SMF
    /// master track's 0xFF 0x58 meta events. An empty map yields the implicit 4/4 at
    /// tick 0.
    pub fn iter(&self) -> impl Iterator<Item = (Tick, i32, i32)> + '_ {
        let mut owned: Vec<(Tick, i32, i32)> = self
            .entries
            .iter()
            .map(|e| (e.tick, e.numerator, e.denominator))
            .collect();
        if owned.is_empty() {
            owned.push((0, 4, 4));
        }
        owned.into_iter()
    }

    /// The tick at which `bar_index` begins.
    pub fn tick_at_bar(&self, bar_index: i32) -> Tick {
        let idx = self.entries.partition_point(|e| e.bar_index <= bar_index);
        if idx == 0 {
            if self.entries.is_empty() {
                return bar_index as Tick * ticks_per_bar(4, 4);
            }
            0
        } else {
            let e = self.entries[idx - 1];
            let bars = (bar_index - e.bar_index) as Tick;
            e.tick + bars * ticks_per_bar(e.numerator, e.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_is_four_four() {
        let map = TimesigMap::new();
        assert_eq!((4, 4), map.at_bar(0));
        assert_eq!(TICKS_PER_QUARTER_NOTE * 4, map.tick_at_bar(1));
    }

    #[test]
    fn change_mid_sequence_shifts_tick() {
        let mut map = TimesigMap::new();
        map.add(0, 4, 4);
        map.add(4, 3, 4);
        assert_eq!(0, map.tick_at_bar(0));
        assert_eq!(4 * TICKS_PER_QUARTER_NOTE * 4 / 4, map.tick_at_bar(4));
        assert_eq!((3, 4), map.at_bar(4));
        assert_eq!((3, 4), map.at_bar(10));
    }

    #[test]
    fn iter_yields_the_implicit_entry_when_empty() {
        let map = TimesigMap::new();
        assert_eq!(vec![(0, 4, 4)], map.iter().collect::<Vec<_>>());
    }

    #[test]
    fn iter_yields_every_change_in_tick_order() {
        let mut map = TimesigMap::new();
        map.add(0, 4, 4);
        map.add(4, 3, 4);
        let expected_tick = 4 * TICKS_PER_QUARTER_NOTE * 4 / 4;
        assert_eq!(
            vec![(0, 4, 4), (expected_tick, 3, 4)],
            map.iter().collect::<Vec<_>>()
        );
    }
}
