//! Rendering a `Track` (and, for the carrier track, the sequence-wide `Master`/`Mixer`)
//! into meta-text lines (§4.1–§4.4, §4.7).

use crate::metatext::text_stream::TextStream;
use crate::model::bplist::BPList;
use crate::model::common::{Common, DynamicsMode, PlayMode};
use crate::model::event::{Event, EventKind};
use crate::model::handle::{Handle, HandleBody};
use crate::model::mixer::{Master, Mixer};
use crate::model::tick::Tick;
use crate::model::track::{CurveKind, Track};

/// The tick padding added to the sequence's last event tick to derive the
/// `TOTAL=EOS` line (§4.3).
const EOS_PAD_TICKS: Tick = 120;

/// Renders one track's full meta-text. `master_mixer` is `Some` only for the track
/// that carries the sequence-wide `[Master]`/`[Mixer]` sections (by convention, the
/// first track).
pub fn write_track_meta_text(
    track: &Track,
    master_mixer: Option<(&Master, &Mixer)>,
    total_ticks: Tick,
) -> String {
    let mut out = TextStream::new();
    write_common(&mut out, &track.common);
    if let Some((master, mixer)) = master_mixer {
        write_master(&mut out, master);
        write_mixer(&mut out, mixer);
    }
    let handles = write_event_list(&mut out, track, total_ticks);
    for (idx, handle) in handles.iter().enumerate() {
        write_handle(&mut out, idx, handle);
    }
    for kind in track.curve_set() {
        write_curve(&mut out, kind, track.curve(kind));
    }
    out.render()
}

fn write_common(out: &mut TextStream, common: &Common) {
    out.write_line("[Common]");
    out.write_line(&format!("Version={}", common.version));
    out.write_line(&format!("Name={}", common.name));
    out.write_line(&format!("Color={}", common.color));
    out.write_line(&format!(
        "DynamicsMode={}",
        match common.dynamics_mode {
            DynamicsMode::Standard => "Standard",
            DynamicsMode::Expert => "Expert",
        }
    ));
    out.write_line(&format!("PlayMode={}", play_mode_str(common.play_mode)));
}

fn play_mode_str(mode: PlayMode) -> &'static str {
    match mode {
        PlayMode::PlayAfterSynth => "PlayAfterSynth",
        PlayMode::PlayWithSynth => "PlayWithSynth",
        PlayMode::Off => "Off",
    }
}

fn write_master(out: &mut TextStream, master: &Master) {
    out.write_line("[Master]");
    out.write_line(&format!("PreMeasure={}", master.pre_measure));
    for (k, v) in &master.extra {
        out.write_line(&format!("{}={}", k, v));
    }
}

fn write_mixer(out: &mut TextStream, mixer: &Mixer) {
    out.write_line("[Mixer]");
    out.write_line(&format!("MasterFeder={}", mixer.master_feder));
    out.write_line(&format!("MasterPanpot={}", mixer.master_panpot));
    out.write_line(&format!("MasterMute={}", mixer.master_mute));
    out.write_line(&format!("OutputMode={}", mixer.output_mode));
    for (i, slave) in mixer.slaves.iter().enumerate() {
        out.write_line(&format!("Vd{}Feder={}", i, slave.feder));
        out.write_line(&format!("Vd{}Panpot={}", i, slave.panpot));
        out.write_line(&format!("Vd{}Mute={}", i, slave.mute));
        out.write_line(&format!("Vd{}Solo={}", i, slave.solo));
    }
    for (k, v) in &mixer.extra {
        out.write_line(&format!("{}={}", k, v));
    }
}

/// Writes `[EventList]` plus the `TOTAL=EOS` line, returning the handles referenced
/// by any event, in first-reference order (to be written afterwards as `[h#NNNN]`
/// sections by the caller).
fn write_event_list<'a>(out: &mut TextStream, track: &'a Track, total_ticks: Tick) -> Vec<&'a Handle> {
    out.write_line("[EventList]");
    let mut handles: Vec<&Handle> = Vec::new();

    let mut tick_groups: Vec<(Tick, Vec<&Event>)> = Vec::new();
    for event in track.events.iter() {
        match tick_groups.last_mut() {
            Some((t, group)) if *t == event.tick => group.push(event),
            _ => tick_groups.push((event.tick, vec![event])),
        }
    }

    let mut write_id = 0i32;
    for (tick, group) in &tick_groups {
        let ids: Vec<String> = group
            .iter()
            .map(|_| {
                let id = write_id;
                write_id += 1;
                format!("ID#{:04}", id)
            })
            .collect();
        out.write_line(&format!("{}={}", tick, ids.join(",")));
    }
    out.write_line(&format!("{}=EOS", total_ticks + EOS_PAD_TICKS));

    let mut next_write_id = 0i32;
    for (_, group) in &tick_groups {
        for event in group {
            let id = next_write_id;
            next_write_id += 1;
            write_event_section(out, id, event, &mut handles);
        }
    }
    handles
}

fn write_event_section<'a>(
    out: &mut TextStream,
    id: i32,
    event: &'a Event,
    handles: &mut Vec<&'a Handle>,
) {
    out.write_line(&format!("[ID#{:04}]", id));
    out.write_line(&format!("Type={}", event.kind.type_name()));
    match &event.kind {
        EventKind::Note(note) => {
            out.write_line(&format!("Length={}", event.length));
            out.write_line(&format!("Note#={}", note.note));
            out.write_line(&format!("Dynamics={}", note.dynamics));
            out.write_line(&format!("PMBendDepth={}", note.pm_bend_depth));
            out.write_line(&format!("PMBendLength={}", note.pm_bend_length));
            out.write_line(&format!("PMbPortamentoUse={}", note.pmb_portamento_use));
            out.write_line(&format!("DEMdecGainRate={}", note.dem_dec_gain_rate));
            out.write_line(&format!("DEMaccent={}", note.dem_accent));
            let lyric_idx = claim_handle(handles, &note.lyric_handle);
            out.write_line(&format!("LyricHandle=h#{:04}", lyric_idx));
            if let Some(vibrato) = &note.vibrato_handle {
                let idx = claim_handle(handles, vibrato);
                out.write_line(&format!("VibratoHandle=h#{:04}", idx));
                out.write_line(&format!("VibratoDelay={}", note.vibrato_delay));
            }
            if let Some(note_head) = &note.note_head_handle {
                let idx = claim_handle(handles, note_head);
                out.write_line(&format!("NoteHeadHandle=h#{:04}", idx));
            }
        }
        EventKind::Singer(handle) => {
            let idx = claim_handle(handles, handle);
            out.write_line(&format!("IconHandle=h#{:04}", idx));
        }
        EventKind::Icon(icon) => {
            let idx = claim_handle(handles, &icon.icon_handle);
            out.write_line(&format!("IconHandle=h#{:04}", idx));
            out.write_line(&format!("Note#={}", icon.note));
        }
    }
}

/// Returns the write-time index of `handle`, assigning the next sequential index
/// the first time a given handle reference is encountered. Handle identity here is
/// positional (by reference), matching the single-pass exporter described in §4.3.
fn claim_handle<'a>(handles: &mut Vec<&'a Handle>, handle: &'a Handle) -> usize {
    handles.push(handle);
    handles.len() - 1
}

fn write_handle(out: &mut TextStream, idx: usize, handle: &Handle) {
    out.write_line(&format!("[h#{:04}]", idx));
    match &handle.body {
        HandleBody::Singer { language, program } => {
            write_handle_prefix(out, handle, true);
            out.write_line(&format!("Language={}", language));
            out.write_line(&format!("Program={}", program));
        }
        HandleBody::Lyric {
            lyrics,
            quote_on_write,
        } => {
            for (i, lyric) in lyrics.iter().enumerate() {
                let symbols = lyric.phonetic_symbols.join(" ");
                let adjustments: Vec<String> = lyric
                    .consonant_adjustment
                    .iter()
                    .map(|a| a.to_string())
                    .collect();
                let prot = if lyric.is_protected { "1" } else { "0" };
                let line = if *quote_on_write {
                    format!(
                        "\"{}\",\"{}\",{},{}",
                        lyric.phrase,
                        symbols,
                        adjustments.join(","),
                        prot
                    )
                } else {
                    format!(
                        "{},{},{},{}",
                        lyric.phrase,
                        symbols,
                        adjustments.join(","),
                        prot
                    )
                };
                out.write_line(&format!("L{}={}", i, line));
            }
        }
        HandleBody::Vibrato {
            start_depth,
            depth_bp,
            start_rate,
            rate_bp,
        } => {
            write_handle_prefix(out, handle, true);
            out.write_line(&format!("StartDepth={}", start_depth));
            write_curve_bp(out, "Depth", depth_bp);
            out.write_line(&format!("StartRate={}", start_rate));
            write_curve_bp(out, "Rate", rate_bp);
        }
        HandleBody::NoteHead { duration, depth } => {
            write_handle_prefix(out, handle, true);
            out.write_line(&format!("Duration={}", duration));
            out.write_line(&format!("Depth={}", depth));
        }
        HandleBody::Dynamics {
            start_dyn,
            end_dyn,
            dyn_bp,
        } => {
            write_handle_prefix(out, handle, false);
            out.write_line(&format!("StartDyn={}", start_dyn));
            out.write_line(&format!("EndDyn={}", end_dyn));
            out.write_line(&format!("Length={}", handle.length));
            write_curve_bp(out, "Dyn", dyn_bp);
        }
    }
}

/// `IconID`/`IDS`/`Original`/`Caption`, and optionally `Length`, shared by every
/// variant except Lyric (which has no header prefix of its own).
fn write_handle_prefix(out: &mut TextStream, handle: &Handle, with_length: bool) {
    out.write_line(&format!("IconID={}", handle.icon_id));
    out.write_line(&format!("IDS={}", handle.ids));
    out.write_line(&format!("Original={}", handle.original));
    out.write_line(&format!("Caption={}", handle.caption));
    if with_length {
        out.write_line(&format!("Length={}", handle.length));
    }
}

fn write_curve_bp(out: &mut TextStream, prefix: &str, curve: &crate::model::vibrato::VibratoCurve) {
    out.write_line(&format!("{}BPNum={}", prefix, curve.len()));
    if !curve.is_empty() {
        let xs: Vec<String> = curve.iter().map(|(x, _)| format!("{:.6}", x)).collect();
        let ys: Vec<String> = curve.iter().map(|(_, y)| y.to_string()).collect();
        out.write_line(&format!("{}BPX={}", prefix, xs.join(",")));
        out.write_line(&format!("{}BPY={}", prefix, ys.join(",")));
    }
}

fn write_curve(out: &mut TextStream, kind: CurveKind, curve: &BPList) {
    out.write_line(&format!("[{}]", kind.section_header()));
    for (tick, value) in curve.iter() {
        out.write_line(&format!("{}={}", tick, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::track::Track;

    #[test]
    fn empty_track_writes_common_and_event_list_sentinel() {
        let track = Track::new();
        let text = write_track_meta_text(&track, None, 0);
        assert!(text.contains("[Common]"));
        assert!(text.contains("Name=Miku"));
        assert!(text.contains("[EventList]"));
        assert!(text.contains("120=EOS"));
    }
}
