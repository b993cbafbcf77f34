mod utils;

use utils::enable_logging;
use vsq_sequence::model::event::{EventKind, NoteData};
use vsq_sequence::model::handle::Handle;
use vsq_sequence::model::lyric::Lyric;
use vsq_sequence::model::track::{CurveKind, Track};
use vsq_sequence::model::{Event, Sequence};
use vsq_sequence::{read_smf, write_smf, Identity};

fn write_and_read(sequence: &Sequence) -> Sequence {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.mid");

    let mut file = std::fs::File::create(&path).unwrap();
    write_smf(&mut file, sequence, &Identity, 500.0).unwrap();
    drop(file);

    let file = std::fs::File::open(&path).unwrap();
    read_smf(file, &Identity).unwrap()
}

fn note_event(tick: i64, note: i32, phrase: &str) -> Event {
    let lyric = Lyric::new(phrase, vec![phrase.to_string()]).unwrap();
    let data = NoteData {
        note,
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
        lyric_handle: Handle::lyric(vec![lyric], true),
        vibrato_handle: None,
        note_head_handle: None,
    };
    let mut event = Event::new(tick, EventKind::Note(data));
    event.length = 240;
    event
}

#[test]
fn empty_sequence_round_trips_through_a_real_file() {
    enable_logging();
    let sequence = Sequence::new();
    let parsed = write_and_read(&sequence);
    assert!(parsed.tracks.is_empty());
    assert_eq!(500_000, parsed.tempo_map.iter().next().unwrap().1);
}

#[test]
fn a_track_with_notes_and_lyrics_round_trips() {
    enable_logging();
    let mut sequence = Sequence::new();
    let mut track = Track::new();
    track.common.name = "Vocal".to_string();
    track.events.add(note_event(0, 60, "a"));
    track.events.add(note_event(480, 62, "ka"));
    sequence.push_track(track);
    sequence.total_ticks = sequence.last_event_tick();

    let parsed = write_and_read(&sequence);
    assert_eq!(1, parsed.tracks.len());
    let track = &parsed.tracks[0];
    assert_eq!("Vocal", track.common.name);
    assert_eq!(2, track.events.len());

    let first = track.events.at_tick(0).next().unwrap();
    match &first.kind {
        EventKind::Note(n) => {
            assert_eq!(60, n.note);
            match &n.lyric_handle.body {
                vsq_sequence::model::HandleBody::Lyric { lyrics, .. } => {
                    assert_eq!("a", lyrics[0].phrase);
                }
                other => panic!("expected lyric handle, got {:?}", other),
            }
        }
        other => panic!("expected note event, got {:?}", other),
    }
}

#[test]
fn curve_data_round_trips() {
    enable_logging();
    let mut sequence = Sequence::new();
    let mut track = Track::new();
    track.curve_mut(CurveKind::Dyn).add(0, 100);
    track.curve_mut(CurveKind::Dyn).add(480, 40);
    sequence.push_track(track);

    let parsed = write_and_read(&sequence);
    let curve = parsed.tracks[0].curve(CurveKind::Dyn);
    assert_eq!(100, curve.value_at(0));
    assert_eq!(40, curve.value_at(480));
}

#[test]
fn tempo_and_timesig_changes_round_trip_in_tick_order() {
    enable_logging();
    let mut sequence = Sequence::new();
    sequence.tempo_map.add(0, 500_000);
    sequence.tempo_map.add(1920, 428_571);
    sequence.timesig_map.add(0, 4, 4);
    sequence.timesig_map.add(4, 3, 4);
    sequence.push_track(Track::new());

    let parsed = write_and_read(&sequence);
    let tempos: Vec<_> = parsed.tempo_map.iter().collect();
    assert_eq!(2, tempos.len());
    assert_eq!(0, tempos[0].0);
    assert_eq!(500_000, tempos[0].1);
    assert_eq!(1920, tempos[1].0);
    assert_eq!(428_571, tempos[1].1);

    let timesigs: Vec<_> = parsed.timesig_map.iter().collect();
    assert_eq!(2, timesigs.len());
    assert_eq!((4, 4), (timesigs[0].1, timesigs[0].2));
    assert_eq!((3, 4), (timesigs[1].1, timesigs[1].2));
}

#[test]
fn multiple_tracks_keep_their_own_names_and_channels() {
    enable_logging();
    let mut sequence = Sequence::new();
    for name in ["Lead", "Harmony"] {
        let mut track = Track::new();
        track.common.name = name.to_string();
        track.events.add(note_event(0, 60, "a"));
        sequence.push_track(track);
    }

    let parsed = write_and_read(&sequence);
    assert_eq!(2, parsed.tracks.len());
    assert_eq!("Lead", parsed.tracks[0].common.name);
    assert_eq!("Harmony", parsed.tracks[1].common.name);
}
