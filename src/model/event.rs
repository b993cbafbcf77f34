//! `Event` / `EventList`: timestamped Note, Singer, or Icon events, indexed by a unique
//! per-track id and kept sorted by `(tick, kind)`.

use crate::model::handle::Handle;
use crate::model::tick::Tick;
use std::collections::HashMap;

/// The EOS (end-of-sequence) sentinel id, used by the meta-text writer's `TOTAL=EOS`
/// line; never assigned to a real event.
pub const EOS_ID: i32 = -1;

pub const MAX_NOTE_NUMBER: i32 = 127;
pub const MIN_NOTE_NUMBER: i32 = 0;

/// Note-specific fields, present only on `EventKind::Note`.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteData {
    pub note: i32,
    pub dynamics: i32,
    pub pm_bend_depth: i32,
    pub pm_bend_length: i32,
    pub pmb_portamento_use: i32,
    pub dem_dec_gain_rate: i32,
    pub dem_accent: i32,
    pub vibrato_delay: i32,
    pub d4mean: i32,
    pub p_mean_onset_first_note: i32,
    pub v_mean_note_transition: i32,
    pub p_mean_ending_note: i32,
    /// Every note carries exactly one lyric handle.
    pub lyric_handle: Handle,
    pub vibrato_handle: Option<Handle>,
    pub note_head_handle: Option<Handle>,
}

/// Icon-specific fields, present only on `EventKind::Icon`.
#[derive(Clone, Debug, PartialEq)]
pub struct IconData {
    pub icon_handle: Handle,
    pub note: i32,
}

/// The discriminated payload of an `Event`. `kind_ord` fixes a total, documented order
/// used to break (tick, kind) ties (§4.3, §9): `Singer < Note < Icon`.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    Singer(Handle),
    Note(NoteData),
    Icon(IconData),
}

impl EventKind {
    pub fn kind_ord(&self) -> u8 {
        match self {
            EventKind::Singer(_) => 0,
            EventKind::Note(_) => 1,
            EventKind::Icon(_) => 2,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::Singer(_) => "Singer",
            EventKind::Note(_) => "Anote",
            EventKind::Icon(_) => "Aicon",
        }
    }
}

/// A single timestamped event within a track's `EventList`.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub tick: Tick,
    /// Unique id within the owning EventList; assigned on insertion.
    pub id: i32,
    pub length: Tick,
    pub kind: EventKind,
}

impl Event {
    pub fn new(tick: Tick, kind: EventKind) -> Self {
        Self {
            tick,
            id: 0,
            length: 0,
            kind,
        }
    }

    pub fn is_eos(&self) -> bool {
        self.id == EOS_ID
    }

    /// `(tick, kind_ord)` lexicographic comparison key.
    fn order_key(&self) -> (Tick, u8) {
        (self.tick, self.kind.kind_ord())
    }
}

/// Ordered sequence of Events, sorted by `(tick, kind)`, plus a side-table mapping
/// internal id → storage index, rebuilt whenever the list is mutated.
#[derive(Clone, Debug, Default)]
pub struct EventList {
    events: Vec<Event>,
    by_id: HashMap<i32, usize>,
    next_id: i32,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Appends `event`, assigning the next monotonically increasing id, then
    /// re-sorts and rebuilds the id index. Returns the assigned id.
    pub fn add(&mut self, mut event: Event) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        event.id = id;
        self.events.push(event);
        self.sort();
        id
    }

    /// Appends `event` with an explicit internal id, bumping the id counter past it
    /// if necessary. Used when re-materialising events parsed from meta-text, where
    /// ids are already assigned by the document.
    pub fn add_with_id(&mut self, mut event: Event, id: i32) {
        event.id = id;
        self.next_id = self.next_id.max(id + 1);
        self.events.push(event);
        self.sort();
    }

    fn sort(&mut self) {
        self.events.sort_by_key(|e| e.order_key());
        self.by_id.clear();
        for (idx, e) in self.events.iter().enumerate() {
            self.by_id.insert(e.id, idx);
        }
    }

    pub fn get(&self, id: i32) -> Option<&Event> {
        self.by_id.get(&id).map(|&idx| &self.events[idx])
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut Event> {
        if let Some(&idx) = self.by_id.get(&id) {
            Some(&mut self.events[idx])
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: i32) -> Option<Event> {
        if let Some(idx) = self.by_id.get(&id).copied() {
            let removed = self.events.remove(idx);
            self.sort();
            Some(removed)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Events with `tick == tick`, in insertion-stable order (i.e. the order
    /// `sort_by_key`'s stability preserves among equal keys).
    pub fn at_tick(&self, tick: Tick) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.tick == tick)
    }

    pub fn last_tick(&self) -> Tick {
        self.events.iter().map(|e| e.tick).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::handle::Handle;

    fn note_event(tick: Tick) -> Event {
        Event::new(
            tick,
            EventKind::Note(NoteData {
                note: 60,
                dynamics: 64,
                pm_bend_depth: 0,
                pm_bend_length: 0,
                pmb_portamento_use: 0,
                dem_dec_gain_rate: 0,
                dem_accent: 0,
                vibrato_delay: 0,
                d4mean: 0,
                p_mean_onset_first_note: 0,
                v_mean_note_transition: 0,
                p_mean_ending_note: 0,
                lyric_handle: Handle::lyric(vec![], false),
                vibrato_handle: None,
                note_head_handle: None,
            }),
        )
    }

    #[test]
    fn add_assigns_monotonic_ids() {
        let mut list = EventList::new();
        let a = list.add(note_event(0));
        let b = list.add(note_event(10));
        assert_eq!(0, a);
        assert_eq!(1, b);
    }

    #[test]
    fn events_sharing_a_tick_preserve_insertion_order() {
        let mut list = EventList::new();
        let a = list.add(note_event(100));
        let b = list.add(note_event(100));
        let ticked: Vec<i32> = list.at_tick(100).map(|e| e.id).collect();
        assert_eq!(vec![a, b], ticked);
    }

    #[test]
    fn sorted_by_tick_then_kind_ord() {
        let mut list = EventList::new();
        list.add(note_event(10));
        let singer_id = list.add(Event::new(
            10,
            EventKind::Singer(Handle::singer("$0701", 0, 0)),
        ));
        let collected: Vec<_> = list.iter().map(|e| e.id).collect();
        assert_eq!(singer_id, collected[0]);
    }

    #[test]
    fn get_and_remove_roundtrip() {
        let mut list = EventList::new();
        let id = list.add(note_event(5));
        assert!(list.get(id).is_some());
        list.remove(id);
        assert!(list.get(id).is_none());
    }
}
