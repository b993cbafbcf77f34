//! `Sequence`: the set of tracks, master/mixer, tempo and time-signature maps, and
//! total length that make up one VOCALOID song.

use crate::model::mixer::{Master, Mixer};
use crate::model::tempo_map::TempoMap;
use crate::model::tick::Tick;
use crate::model::timesig_map::TimesigMap;
use crate::model::track::Track;

/// A complete song: tempo and time-signature maps apply to every track; track index 0
/// is the Master track in SMF output but is not stored here — `tracks[0]` corresponds
/// to SMF track 1.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    pub tempo_map: TempoMap,
    pub timesig_map: TimesigMap,
    pub master: Master,
    pub mixer: Mixer,
    pub tracks: Vec<Track>,
    pub total_ticks: Tick,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// The last tick referenced by any track's events, used to derive the
    /// `TOTAL=EOS` meta-text line (§4.3: last tick plus a pad of 120).
    pub fn last_event_tick(&self) -> Tick {
        self.tracks
            .iter()
            .map(|t| t.events.last_tick())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sequence_has_no_tracks() {
        let seq = Sequence::new();
        assert!(seq.tracks.is_empty());
        assert_eq!(0, seq.last_event_tick());
    }

    #[test]
    fn push_track_returns_index() {
        let mut seq = Sequence::new();
        let idx = seq.push_track(Track::new());
        assert_eq!(0, idx);
        assert_eq!(1, seq.tracks.len());
    }
}
