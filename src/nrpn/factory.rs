//! Generates the NRPN controller-change stream VOCALOID synthesisers read note and
//! curve data from. Grounded on
//! `original_source/VocaloidMidiEventListFactory.hpp`'s `generateMidiEventList` and its
//! `generate*` helpers.

use crate::model::common::EngineVersion;
use crate::model::event::{EventKind, NoteData};
use crate::model::handle::HandleBody;
use crate::model::tempo_map::TempoMap;
use crate::model::tick::Tick;
use crate::model::bplist::BPList;
use crate::model::track::{CurveKind, Track};
use crate::nrpn::event::{sort_key, ControllerEvent, NrpnEvent};
use crate::nrpn::param::*;
use log::trace;

/// Pre-send latency compensation, in milliseconds, applied ahead of every NRPN write
/// so the synthesiser has time to react before the musical tick it describes (§4.5).
pub const DEFAULT_PRE_SEND_MS: f64 = 500.0;

/// Produces the full NRPN controller stream for one track, already sorted into final
/// playback order (ascending tick, then the MSB-omission-aware `sort_key`, then
/// flattened to atomic CC events).
pub fn generate_track_nrpn(track: &Track, tempo_map: &TempoMap, pre_send_ms: f64) -> Vec<ControllerEvent> {
    let version = track.common.engine_version();
    let mut composites: Vec<NrpnEvent> = Vec::new();

    composites.push(generate_header_nrpn(track));

    let mut vcp_last_delay = 0i32;
    generate_voice_change_parameter_nrpn(track, version, tempo_map, pre_send_ms, &mut vcp_last_delay, &mut composites);

    if matches!(version, EngineVersion::Dsb2) {
        generate_fx2_depth_nrpn(track, tempo_map, pre_send_ms, &mut composites);
    }

    generate_curve_nrpn(
        track.curve(CurveKind::Dyn),
        DYN_DELAY,
        DYN_VALUE,
        0,
        tempo_map,
        pre_send_ms,
        &mut composites,
    );
    generate_curve_nrpn(
        track.curve(CurveKind::Pbs),
        PBS_DELAY,
        PBS_VALUE,
        0,
        tempo_map,
        pre_send_ms,
        &mut composites,
    );
    generate_curve_nrpn(
        track.curve(CurveKind::Pit),
        PIT_DELAY,
        PIT_VALUE,
        0x2000,
        tempo_map,
        pre_send_ms,
        &mut composites,
    );

    generate_note_nrpn(track, version, tempo_map, pre_send_ms, &mut composites);
    generate_singer_change_nrpn(track, tempo_map, pre_send_ms, &mut composites);

    composites.sort_by_key(sort_key);
    let flattened: Vec<ControllerEvent> = composites.iter().flat_map(|c| c.expand()).collect();
    trace!(
        "generated {} NRPN atomic events for track {:?}",
        flattened.len(),
        track.common.name
    );
    flattened
}

/// The pre-send-adjusted tick a value destined for `tick` should actually be written
/// at, and the delay (in milliseconds) the synthesiser should hold it for to land on
/// time. Grounded on `_getActualClockAndDelay`.
fn actual_tick_and_delay(tempo_map: &TempoMap, tick: Tick, pre_send_ms: f64) -> (Tick, i32) {
    let clock_msec = tempo_map.seconds_from_tick(tick) * 1000.0;
    let actual_tick = if clock_msec - pre_send_ms <= 0.0 {
        0
    } else {
        tempo_map
            .tick_from_seconds((clock_msec - pre_send_ms) / 1000.0)
            .floor() as Tick
    };
    let delay = (clock_msec - tempo_map.seconds_from_tick(actual_tick) * 1000.0).floor() as i32;
    (actual_tick, delay)
}

/// Finds the singer in effect at tick 0 (the latest Singer event at or before tick 0),
/// and builds the header NRPN announcing it — the version/device, language, and voice
/// selection emitted once at the start of every track.
fn generate_header_nrpn(track: &Track) -> NrpnEvent {
    let leading = track
        .events
        .iter()
        .filter(|e| e.tick <= 0)
        .filter_map(|e| match &e.kind {
            EventKind::Singer(handle) => Some((e.tick, handle)),
            _ => None,
        })
        .last();

    let (language, program) = match leading.map(|(_, h)| &h.body) {
        Some(HandleBody::Singer { language, program }) => (*language, *program),
        _ => (0, 0),
    };
    build_singer_composite(
        0,
        language,
        program,
        CC_BS_VERSION_AND_DEVICE,
        CC_BS_LANGUAGE_TYPE,
        CC_BS_DELAY,
        PC_VOICE_TYPE,
    )
}

/// Mid-track singer changes: every Singer event other than the one the header NRPN
/// already accounted for.
fn generate_singer_change_nrpn(
    track: &Track,
    tempo_map: &TempoMap,
    pre_send_ms: f64,
    out: &mut Vec<NrpnEvent>,
) {
    let mut seen_header = false;
    for event in track.events.iter() {
        if let EventKind::Singer(handle) = &event.kind {
            if !seen_header && event.tick <= 0 {
                seen_header = true;
                continue;
            }
            let (language, program) = match &handle.body {
                HandleBody::Singer { language, program } => (*language, *program),
                _ => (0, 0),
            };
            let (actual_tick, _delay) = actual_tick_and_delay(tempo_map, event.tick, pre_send_ms);
            out.push(build_singer_composite(
                actual_tick,
                language,
                program,
                CC_SC_VERSION_AND_DEVICE,
                CC_SC_LANGUAGE_TYPE,
                CC_SC_DELAY,
                CC_SC_VOICE_TYPE,
            ));
        }
    }
}

fn build_singer_composite(
    tick: Tick,
    language: i32,
    program: i32,
    version_and_device_addr: u16,
    language_addr: u16,
    delay_addr: u16,
    voice_addr: u16,
) -> NrpnEvent {
    let (vd_m, vd_l) = addr_parts(version_and_device_addr);
    let mut root = NrpnEvent::new(tick, vd_m, vd_l, 0);

    let (d_m, d_l) = addr_parts(delay_addr);
    root.append(NrpnEvent::with_lsb(tick, d_m, d_l, 0, 0), true);

    let (lt_m, lt_l) = addr_parts(language_addr);
    root.append(
        NrpnEvent::new(tick, lt_m, lt_l, language.clamp(0, 127) as u8),
        true,
    );

    let (pc_m, pc_l) = addr_parts(voice_addr);
    root.append(
        NrpnEvent::new(tick, pc_m, pc_l, program.clamp(0, 127) as u8),
        true,
    );

    root
}

/// The version-dependent curve list `addVoiceChangeParameters` walks, sharing a single
/// `last_delay` accumulator across every curve in the pass.
fn generate_voice_change_parameter_nrpn(
    track: &Track,
    version: EngineVersion,
    tempo_map: &TempoMap,
    pre_send_ms: f64,
    last_delay: &mut i32,
    out: &mut Vec<NrpnEvent>,
) {
    for kind in voice_change_parameter_curve_list(version) {
        let (delay_addr, value_addr) = voice_change_parameter_addrs(kind);
        generate_curve_nrpn_shared(
            track.curve(kind),
            delay_addr,
            value_addr,
            0,
            tempo_map,
            pre_send_ms,
            last_delay,
            out,
        );
    }
}

fn voice_change_parameter_curve_list(version: EngineVersion) -> Vec<CurveKind> {
    match version {
        EngineVersion::Dsb3 => vec![
            CurveKind::Bre,
            CurveKind::Bri,
            CurveKind::Cle,
            CurveKind::Por,
            CurveKind::Ope,
            CurveKind::Gen,
        ],
        EngineVersion::Dsb2 => vec![
            CurveKind::Bre,
            CurveKind::Bri,
            CurveKind::Cle,
            CurveKind::Por,
            CurveKind::Gen,
            CurveKind::Harmonics,
            CurveKind::Reso1Freq,
            CurveKind::Reso2Freq,
            CurveKind::Reso3Freq,
            CurveKind::Reso4Freq,
            CurveKind::Reso1Bw,
            CurveKind::Reso2Bw,
            CurveKind::Reso3Bw,
            CurveKind::Reso4Bw,
            CurveKind::Reso1Amp,
            CurveKind::Reso2Amp,
            CurveKind::Reso3Amp,
            CurveKind::Reso4Amp,
        ],
        EngineVersion::Baseline => vec![
            CurveKind::Bre,
            CurveKind::Bri,
            CurveKind::Cle,
            CurveKind::Por,
            CurveKind::Gen,
        ],
    }
}

fn generate_fx2_depth_nrpn(
    track: &Track,
    tempo_map: &TempoMap,
    pre_send_ms: f64,
    out: &mut Vec<NrpnEvent>,
) {
    generate_curve_nrpn(
        track.curve(CurveKind::Fx2Depth),
        FX2_DEPTH_DELAY,
        FX2_DEPTH_VALUE,
        0,
        tempo_map,
        pre_send_ms,
        out,
    );
}

/// One ordinary curve's NRPN stream, with `last_delay` reset independently for this
/// call (§4.5 rule 4).
fn generate_curve_nrpn(
    curve: &BPList,
    delay_addr: u16,
    value_addr: u16,
    bias: i32,
    tempo_map: &TempoMap,
    pre_send_ms: f64,
    out: &mut Vec<NrpnEvent>,
) {
    let mut last_delay = 0i32;
    generate_curve_nrpn_shared(
        curve,
        delay_addr,
        value_addr,
        bias,
        tempo_map,
        pre_send_ms,
        &mut last_delay,
        out,
    );
}

/// Per-breakpoint NRPN emission shared by the ordinary-curve and voice-change-parameter
/// passes. Grounded on `generateNRPNByBPList`.
fn generate_curve_nrpn_shared(
    curve: &BPList,
    delay_addr: u16,
    value_addr: u16,
    bias: i32,
    tempo_map: &TempoMap,
    pre_send_ms: f64,
    last_delay: &mut i32,
    out: &mut Vec<NrpnEvent>,
) {
    let (d_m, d_l) = addr_parts(delay_addr);
    let (v_m, v_l) = addr_parts(value_addr);
    for (tick, value) in curve.iter() {
        let (actual_tick, delay) = actual_tick_and_delay(tempo_map, tick, pre_send_ms);
        let (v_msb, v_lsb) = msb_lsb(value + bias);
        let value_event = NrpnEvent::with_lsb(actual_tick, v_m, v_l, v_msb, v_lsb);
        if delay != *last_delay {
            let (d_msb, d_lsb) = msb_lsb(delay);
            let mut delay_event = NrpnEvent::with_lsb(actual_tick, d_m, d_l, d_msb, d_lsb);
            delay_event.append(value_event, d_m == v_m);
            out.push(delay_event);
            *last_delay = delay;
        } else {
            out.push(value_event);
        }
    }
}

/// One composite per Note event: delay, note number, velocity, duration, location,
/// optional vibrato block, phonetic symbols, and per-note expression knobs. Grounded on
/// `generateNoteNRPN`.
fn generate_note_nrpn(
    track: &Track,
    version: EngineVersion,
    tempo_map: &TempoMap,
    pre_send_ms: f64,
    out: &mut Vec<NrpnEvent>,
) {
    let notes: Vec<(Tick, Tick, &NoteData)> = track
        .events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::Note(note) => Some((e.tick, e.length, note)),
            _ => None,
        })
        .collect();

    let mut last_delay = 0i32;
    for (i, (tick, length, note)) in notes.iter().enumerate() {
        let (actual_tick, delay) = actual_tick_and_delay(tempo_map, *tick, pre_send_ms);
        let loc = note_location(&notes, i);
        let mut fields: Vec<NrpnEvent> = Vec::new();

        if i == 0 {
            let (m, l) = addr_parts(PN_VERSION_AND_DEVICE);
            fields.push(NrpnEvent::new(actual_tick, m, l, 0));
        }
        if delay != last_delay {
            let (m, l) = addr_parts(PN_DELAY);
            let (dmsb, dlsb) = msb_lsb(delay);
            fields.push(NrpnEvent::with_lsb(actual_tick, m, l, dmsb, dlsb));
            last_delay = delay;
        }

        let (m, l) = addr_parts(PN_NOTE_NUMBER);
        fields.push(NrpnEvent::new(actual_tick, m, l, note.note.clamp(0, 127) as u8));

        let (m, l) = addr_parts(PN_VELOCITY);
        fields.push(NrpnEvent::new(actual_tick, m, l, note.dynamics.clamp(0, 127) as u8));

        let (m, l) = addr_parts(PN_NOTE_DURATION);
        let (dur_msb, dur_lsb) = msb_lsb(*length as i32);
        fields.push(NrpnEvent::with_lsb(actual_tick, m, l, dur_msb, dur_lsb));

        let (m, l) = addr_parts(PN_NOTE_LOCATION);
        fields.push(NrpnEvent::new(actual_tick, m, l, loc));

        if let Some(vibrato) = &note.vibrato_handle {
            let vibrato_type = vibrato
                .icon_id
                .chars()
                .rev()
                .take(3)
                .collect::<String>()
                .chars()
                .rev()
                .collect::<String>();
            let vibrato_type = u8::from_str_radix(&vibrato_type, 16).unwrap_or(0);
            let note_length = *length as f64;
            let duration = if note_length > 0.0 {
                ((note_length - note.vibrato_delay as f64) / note_length * 127.0).floor() as i32
            } else {
                0
            };
            let duration_byte = duration.clamp(0, 127) as u8;
            let delay_byte = 0x7f - duration_byte;
            let (m, l) = addr_parts(PN_VIBRATO_CONFIG);
            fields.push(NrpnEvent::with_lsb(actual_tick, m, l, vibrato_type, duration_byte));
            let (m, l) = addr_parts(PN_VIBRATO_DELAY);
            fields.push(NrpnEvent::new(actual_tick, m, l, delay_byte));
        }

        append_phonetic_symbols(actual_tick, note, &mut fields);

        let (m, l) = addr_parts(PN_ADD_PORTAMENTO);
        fields.push(NrpnEvent::new(actual_tick, m, l, note.pmb_portamento_use.clamp(0, 127) as u8));
        let (m, l) = addr_parts(PN_PM_BEND_LENGTH);
        let (pbl_msb, pbl_lsb) = msb_lsb(note.pm_bend_length);
        fields.push(NrpnEvent::with_lsb(actual_tick, m, l, pbl_msb, pbl_lsb));
        let (m, l) = addr_parts(PN_PORTAMENTO_USE);
        let (pbd_msb, pbd_lsb) = msb_lsb(note.pm_bend_depth);
        fields.push(NrpnEvent::with_lsb(actual_tick, m, l, pbd_msb, pbd_lsb));
        let (m, l) = addr_parts(PN_DEC_GAIN_RATE);
        fields.push(NrpnEvent::new(actual_tick, m, l, note.dem_dec_gain_rate.clamp(0, 127) as u8));
        let (m, l) = addr_parts(PN_ACCENT);
        fields.push(NrpnEvent::new(actual_tick, m, l, note.dem_accent.clamp(0, 127) as u8));

        if matches!(version, EngineVersion::Dsb3) {
            let (m, l) = addr_parts(PN_D4_MEAN);
            fields.push(NrpnEvent::new(actual_tick, m, l, note.d4mean.clamp(0, 127) as u8));
            let (m, l) = addr_parts(PN_P_MEAN_ONSET_FIRST_NOTE);
            fields.push(NrpnEvent::new(
                actual_tick,
                m,
                l,
                note.p_mean_onset_first_note.clamp(0, 127) as u8,
            ));
            let (m, l) = addr_parts(PN_V_MEAN_NOTE_TRANSITION);
            fields.push(NrpnEvent::new(
                actual_tick,
                m,
                l,
                note.v_mean_note_transition.clamp(0, 127) as u8,
            ));
            let (m, l) = addr_parts(PN_P_MEAN_ENDING_NOTE);
            fields.push(NrpnEvent::new(
                actual_tick,
                m,
                l,
                note.p_mean_ending_note.clamp(0, 127) as u8,
            ));
        }

        let (m, l) = addr_parts(PN_NOTE_TERMINATOR);
        fields.push(NrpnEvent::new(actual_tick, m, l, 0));

        let mut fields = fields.into_iter();
        let mut root = fields.next().expect("note composite always has a note number field");
        for field in fields {
            root.append(field, true);
        }
        out.push(root);

        generate_vibrato_curve_nrpn(tempo_map, *tick, *length, note, pre_send_ms, out);
    }
}

/// The Vibrato handle's `DepthBP`/`RateBP` breakpoint curves, walked and emitted as
/// their own `CC_VD_*`/`CC_VR_*` controller stream alongside (not inside) the note's
/// composite. Grounded on `generateVibratoNRPN`.
fn generate_vibrato_curve_nrpn(
    tempo_map: &TempoMap,
    note_tick: Tick,
    note_length: Tick,
    note: &NoteData,
    pre_send_ms: f64,
    out: &mut Vec<NrpnEvent>,
) {
    let vibrato = match &note.vibrato_handle {
        Some(v) => v,
        None => return,
    };
    let (start_depth, depth_bp, start_rate, rate_bp) = match &vibrato.body {
        HandleBody::Vibrato {
            start_depth,
            depth_bp,
            start_rate,
            rate_bp,
        } => (*start_depth, depth_bp, *start_rate, rate_bp),
        _ => return,
    };

    let vclock = note_tick + note.vibrato_delay as Tick;
    let (header_tick, header_delay) = actual_tick_and_delay(tempo_map, vclock, pre_send_ms);
    let (header_dmsb, header_dlsb) = msb_lsb(header_delay);

    let (m, l) = addr_parts(CC_VD_VERSION_AND_DEVICE);
    let mut header = NrpnEvent::with_lsb(header_tick, m, l, 0, 0);
    let (m, l) = addr_parts(CC_VR_VERSION_AND_DEVICE);
    header.append(NrpnEvent::with_lsb(header_tick, m, l, 0, 0), false);
    let (m, l) = addr_parts(CC_VD_DELAY);
    header.append(NrpnEvent::with_lsb(header_tick, m, l, header_dmsb, header_dlsb), false);
    let (m, l) = addr_parts(CC_VR_DELAY);
    header.append(NrpnEvent::with_lsb(header_tick, m, l, header_dmsb, header_dlsb), false);
    let (m, l) = addr_parts(CC_VD_VIBRATO_DEPTH);
    header.append(
        NrpnEvent::new(header_tick, m, l, start_depth.clamp(0, 127) as u8),
        false,
    );
    let (m, l) = addr_parts(CC_VR_VIBRATO_RATE);
    header.append(
        NrpnEvent::new(header_tick, m, l, start_rate.clamp(0, 127) as u8),
        false,
    );
    out.push(header);

    let vlength = (note_length - note.vibrato_delay as Tick).max(0);
    generate_vibrato_breakpoint_nrpn(tempo_map, vclock, vlength, depth_bp, CC_VD_DELAY, CC_VD_VIBRATO_DEPTH, pre_send_ms, out);
    generate_vibrato_breakpoint_nrpn(tempo_map, vclock, vlength, rate_bp, CC_VR_DELAY, CC_VR_VIBRATO_RATE, pre_send_ms, out);
}

/// One `DepthBP`/`RateBP` curve's breakpoints, converted to `(delay, value)` composites
/// with an independent `last_delay` accumulator, mirroring `generateVibratoNRPN`'s
/// per-curve loop.
fn generate_vibrato_breakpoint_nrpn(
    tempo_map: &TempoMap,
    vclock: Tick,
    vlength: Tick,
    curve: &crate::model::vibrato::VibratoCurve,
    delay_addr: u16,
    value_addr: u16,
    pre_send_ms: f64,
    out: &mut Vec<NrpnEvent>,
) {
    let (d_m, d_l) = addr_parts(delay_addr);
    let (v_m, v_l) = addr_parts(value_addr);
    let mut last_delay = 0i32;
    for (x, y) in curve.iter() {
        let cl = vclock + (x * vlength as f64).floor() as Tick;
        let (actual_tick, delay) = actual_tick_and_delay(tempo_map, cl, pre_send_ms);
        let value_event = NrpnEvent::new(actual_tick, v_m, v_l, y.clamp(0, 127) as u8);
        if delay != last_delay {
            let (d_msb, d_lsb) = msb_lsb(delay);
            let mut delay_event = NrpnEvent::with_lsb(actual_tick, d_m, d_l, d_msb, d_lsb);
            delay_event.append(value_event, d_m == v_m);
            out.push(delay_event);
        } else {
            out.push(value_event);
        }
        last_delay = delay;
    }
}

fn append_phonetic_symbols(tick: Tick, note: &NoteData, fields: &mut Vec<NrpnEvent>) {
    let (lyrics, adjustments) = match &note.lyric_handle.body {
        HandleBody::Lyric { lyrics, .. } => match lyrics.first() {
            Some(lyric) => (&lyric.phonetic_symbols, &lyric.consonant_adjustment),
            None => return,
        },
        _ => return,
    };

    let (m, l) = addr_parts(PN_PHONETIC_SYMBOL_COUNT);
    fields.push(NrpnEvent::new(tick, m, l, lyrics.len().min(127) as u8));

    for (i, symbol) in lyrics.iter().enumerate() {
        let addr = match phonetic_symbol_addr(i) {
            Some(addr) => addr,
            None => break,
        };
        let adjustment = adjustments.get(i).copied().unwrap_or(0);
        let code = symbol.chars().next().map(|c| c as i32).unwrap_or(0);
        let byte = (code + adjustment).clamp(0, 127) as u8;
        let (m, l) = addr_parts(addr);
        fields.push(NrpnEvent::new(tick, m, l, byte));
    }
}

/// `note_location` bits: `0x02` set when no preceding note abuts this one, `0x01` set
/// when no succeeding note abuts it.
fn note_location(notes: &[(Tick, Tick, &NoteData)], i: usize) -> u8 {
    let mut loc = 0u8;
    let has_prev = i > 0 && notes[i - 1].0 + notes[i - 1].1 == notes[i].0;
    let has_next = i + 1 < notes.len() && notes[i].0 + notes[i].1 == notes[i + 1].0;
    if !has_prev {
        loc |= 0x02;
    }
    if !has_next {
        loc |= 0x01;
    }
    loc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{Event, EventKind, NoteData};
    use crate::model::handle::Handle;
    use crate::model::lyric::Lyric;
    use crate::model::tempo_map::TempoMap;
    use crate::model::track::Track;

    fn plain_note(note_num: i32) -> NoteData {
        NoteData {
            note: note_num,
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
            lyric_handle: Handle::lyric(vec![Lyric::new("a", vec!["a".to_string()]).unwrap()], false),
            vibrato_handle: None,
            note_head_handle: None,
        }
    }

    #[test]
    fn header_nrpn_defaults_to_zero_without_a_leading_singer() {
        let track = Track::new();
        let header = generate_header_nrpn(&track);
        assert_eq!(0, header.tick());
    }

    #[test]
    fn header_nrpn_picks_up_the_singer_at_or_before_tick_zero() {
        let mut track = Track::new();
        let mut event = Event::new(0, EventKind::Singer(Handle::singer("$0701", 3, 5)));
        event.length = 0;
        track.events.add(event);
        let header = generate_header_nrpn(&track);
        let atoms = header.expand();
        // version/device (0x63,0x62,0x06), delay (0x62,0x06,0x26), language (0x62,0x06), voice (0x62,0x06)
        assert!(atoms.iter().any(|a| a.controller == 0x06 && a.value == 3));
        assert!(atoms.iter().any(|a| a.controller == 0x06 && a.value == 5));
    }

    #[test]
    fn generate_track_nrpn_sorts_output_by_ascending_tick() {
        let mut track = Track::new();
        let mut e1 = Event::new(480, EventKind::Note(plain_note(60)));
        e1.length = 480;
        track.events.add(e1);
        let mut e2 = Event::new(0, EventKind::Note(plain_note(62)));
        e2.length = 480;
        track.events.add(e2);

        let tempo_map = TempoMap::new();
        let events = generate_track_nrpn(&track, &tempo_map, 0.0);
        let ticks: Vec<Tick> = events.iter().map(|e| e.tick).collect();
        let mut sorted = ticks.clone();
        sorted.sort();
        assert_eq!(sorted, ticks);
    }

    #[test]
    fn note_location_flags_isolated_notes() {
        let note = plain_note(60);
        let notes = vec![(0, 480, &note), (960, 480, &note)];
        assert_eq!(0x03, note_location(&notes, 0));
        assert_eq!(0x03, note_location(&notes, 1));
    }

    #[test]
    fn note_location_clears_bits_for_abutting_notes() {
        let note = plain_note(60);
        let notes = vec![(0, 480, &note), (480, 480, &note)];
        assert_eq!(0x02, note_location(&notes, 0));
        assert_eq!(0x01, note_location(&notes, 1));
    }

    fn note_with_vibrato(icon_id: &str, vibrato_delay: i32) -> NoteData {
        let mut note = plain_note(60);
        note.vibrato_delay = vibrato_delay;
        note.vibrato_handle = Some(Handle::vibrato(icon_id, 0));
        note
    }

    /// Locates the vibrato-type data byte (unambiguous: 0x11 from icon id "...011")
    /// and returns `(duration_byte, delay_byte)` read off the atoms that follow it:
    /// `[.., 0x06(type), 0x26(duration), 0x62, 0x06(delay)]`.
    fn vibrato_config_bytes(atoms: &[crate::nrpn::event::ControllerEvent]) -> (u8, u8) {
        let type_idx = atoms
            .iter()
            .position(|a| a.controller == 0x06 && a.value == 0x11)
            .unwrap();
        (atoms[type_idx + 1].value, atoms[type_idx + 3].value)
    }

    // Spec §8 scenario (d): tick=480, length=480, icon_id ends "011", vibratoDelay=0
    // gives duration=floor((480-0)/480*127)=127 and delay byte 0.
    #[test]
    fn vibrato_config_duration_and_delay_match_scenario_d() {
        let mut track = Track::new();
        let mut event = Event::new(480, EventKind::Note(note_with_vibrato("$04040011", 0)));
        event.length = 480;
        track.events.add(event);

        let tempo_map = TempoMap::new();
        let mut composites = Vec::new();
        generate_note_nrpn(&track, EngineVersion::Baseline, &tempo_map, 0.0, &mut composites);

        let note_composite = &composites[0];
        let (duration, delay) = vibrato_config_bytes(&note_composite.expand());
        assert_eq!(127, duration);
        assert_eq!(0, delay);
    }

    #[test]
    fn vibrato_duration_byte_matches_review_example() {
        // length=480, vibrato_delay=240 => duration=floor(240/480*127)=63, delay byte=64.
        let mut track = Track::new();
        let mut event = Event::new(0, EventKind::Note(note_with_vibrato("$04040011", 240)));
        event.length = 480;
        track.events.add(event);

        let tempo_map = TempoMap::new();
        let mut composites = Vec::new();
        generate_note_nrpn(&track, EngineVersion::Baseline, &tempo_map, 0.0, &mut composites);

        let note_composite = &composites[0];
        let (duration, delay) = vibrato_config_bytes(&note_composite.expand());
        assert_eq!(63, duration);
        assert_eq!(64, delay);
    }

    #[test]
    fn vibrato_depth_and_rate_curves_emit_their_own_controller_streams() {
        let mut track = Track::new();
        let mut note = note_with_vibrato("$04040011", 0);
        if let Some(handle) = &mut note.vibrato_handle {
            if let HandleBody::Vibrato { depth_bp, rate_bp, .. } = &mut handle.body {
                depth_bp.add(0.0, 10);
                depth_bp.add(0.5, 20);
                rate_bp.add(0.0, 30);
            }
        }
        let mut event = Event::new(0, EventKind::Note(note));
        event.length = 480;
        track.events.add(event);

        let tempo_map = TempoMap::new();
        let events = generate_track_nrpn(&track, &tempo_map, 0.0);

        let (depth_m, _) = addr_parts(CC_VD_VIBRATO_DEPTH);
        let (rate_m, _) = addr_parts(CC_VR_VIBRATO_RATE);
        assert!(events
            .iter()
            .any(|e| e.controller == 0x06 && e.value == 10));
        assert!(events
            .iter()
            .any(|e| e.controller == 0x06 && e.value == 20));
        assert!(events
            .iter()
            .any(|e| e.controller == 0x06 && e.value == 30));
        assert!(events.iter().any(|e| e.controller == 0x63 && e.value == depth_m));
        assert!(events.iter().any(|e| e.controller == 0x63 && e.value == rate_m));
    }
}
