//! Parsing a track's meta-text back into a `Track` (§4.1–§4.4, §4.7): a two-pass pull
//! parser. Pass one materialises every `[ID#NNNN]`/`[h#NNNN]` block as a raw key/value
//! map; pass two resolves handle kind by which keys a block carries, then builds typed
//! events, following handle references forward.

use crate::error::LibResult;
use crate::model::common::{Common, DynamicsMode, PlayMode};
use crate::model::event::{Event, EventKind, EventList, IconData, NoteData};
use crate::model::handle::{Handle, HandleBody};
use crate::model::lyric::Lyric;
use crate::model::mixer::{Master, Mixer, MixerSlave};
use crate::model::tick::Tick;
use crate::model::track::{CurveKind, Track, ALL_CURVES};
use crate::metatext::text_stream::TextStream;
use log::warn;
use std::collections::HashMap;

pub use crate::error::Error as MetaTextError;

struct Section {
    header: String,
    lines: Vec<(String, String)>,
}

/// Groups a track's meta-text into `[Header]`-delimited sections, splitting each line
/// on its first `=`. Lines before the first header are ignored (§4.7: a document is
/// always section-framed).
fn split_sections(text: &str) -> Vec<Section> {
    let mut stream = TextStream::from_text(text);
    let mut sections = Vec::new();
    while let Some(line) = stream.read_line() {
        if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            sections.push(Section {
                header: header.to_string(),
                lines: Vec::new(),
            });
        } else if let Some(section) = sections.last_mut() {
            if let Some(eq) = line.find('=') {
                section
                    .lines
                    .push((line[..eq].to_string(), line[eq + 1..].to_string()));
            }
        }
    }
    sections
}

fn get<'a>(lines: &'a [(String, String)], key: &str) -> Option<&'a str> {
    lines.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn parse_i32(v: &str) -> LibResult<i32> {
    v.trim()
        .parse::<i32>()
        .map_err(|_| parse_e!("expected integer, got '{}'", v))
}

fn parse_tick(v: &str) -> LibResult<Tick> {
    v.trim()
        .parse::<Tick>()
        .map_err(|_| parse_e!("expected tick, got '{}'", v))
}

/// Parses one track's meta-text (the rejoined text of its `0xFF01` meta-events) into a
/// `Track`. `master_mixer` receives the sequence-wide `[Master]`/`[Mixer]` blocks when
/// present in this document (by convention, only the carrier track has them).
pub fn read_track_meta_text(
    text: &str,
) -> crate::error::Result<(Track, Option<(Master, Mixer)>)> {
    Ok(read_track_meta_text_inner(text)?)
}

fn read_track_meta_text_inner(text: &str) -> LibResult<(Track, Option<(Master, Mixer)>)> {
    let sections = split_sections(text);
    let mut track = Track::new();
    let mut master_mixer = None;

    let mut event_blocks: HashMap<i32, &[(String, String)]> = HashMap::new();
    let mut handle_blocks: HashMap<i32, &[(String, String)]> = HashMap::new();
    let mut tick_of: HashMap<i32, Tick> = HashMap::new();
    let mut event_order: Vec<i32> = Vec::new();

    for section in &sections {
        if section.header == "Common" {
            track.common = parse_common(&section.lines)?;
        } else if section.header == "Master" {
            let master = parse_master(&section.lines)?;
            master_mixer.get_or_insert((Master::default(), Mixer::default())).0 = master;
        } else if section.header == "Mixer" {
            let mixer = parse_mixer(&section.lines)?;
            master_mixer.get_or_insert((Master::default(), Mixer::default())).1 = mixer;
        } else if section.header == "EventList" {
            for (key, value) in &section.lines {
                if key.eq_ignore_ascii_case("total") {
                    continue;
                }
                let tick = parse_tick(key)?;
                if value == "EOS" {
                    continue;
                }
                for id_str in value.split(',') {
                    let id = parse_ref_id(id_str, "ID#")?;
                    tick_of.insert(id, tick);
                    event_order.push(id);
                }
            }
        } else if let Some(rest) = section.header.strip_prefix("ID#") {
            let id: i32 = rest
                .parse()
                .map_err(|_| parse_e!("bad event id '{}'", section.header))?;
            event_blocks.insert(id, &section.lines);
        } else if let Some(rest) = section.header.strip_prefix("h#") {
            let id: i32 = rest
                .parse()
                .map_err(|_| parse_e!("bad handle id '{}'", section.header))?;
            handle_blocks.insert(id, &section.lines);
        } else if let Some(kind) = curve_kind_for_header(&section.header) {
            let curve = track.curve_mut(kind);
            for (key, value) in &section.lines {
                let tick = parse_tick(key)?;
                let v = parse_i32(value)?;
                curve.add(tick, v);
            }
        } else {
            warn!("skipping unrecognised meta-text section '[{}]'", section.header);
        }
    }

    let mut built_handles: HashMap<i32, Handle> = HashMap::new();
    for (&id, lines) in &handle_blocks {
        built_handles.insert(id, build_handle(id, lines)?);
    }

    let mut events = EventList::new();
    for id in event_order {
        let lines = event_blocks
            .get(&id)
            .ok_or_else(|| resolve_e!("no [ID#{:04}] block referenced by EventList", id))?;
        let tick = *tick_of.get(&id).unwrap_or(&0);
        let event = build_event(tick, lines, &built_handles)?;
        events.add_with_id(event, id);
    }
    track.events = events;

    Ok((track, master_mixer))
}

fn parse_ref_id(s: &str, prefix: &str) -> LibResult<i32> {
    s.trim()
        .strip_prefix(prefix)
        .ok_or_else(|| parse_e!("expected '{}NNNN', got '{}'", prefix, s))?
        .parse::<i32>()
        .map_err(|_| parse_e!("bad reference id '{}'", s))
}

fn curve_kind_for_header(header: &str) -> Option<CurveKind> {
    ALL_CURVES.iter().copied().find(|k| k.section_header() == header)
}

fn parse_common(lines: &[(String, String)]) -> LibResult<Common> {
    let mut common = Common::default();
    if let Some(v) = get(lines, "Version") {
        common.version = v.to_string();
    }
    if let Some(v) = get(lines, "Name") {
        common.name = v.to_string();
    }
    if let Some(v) = get(lines, "Color") {
        common.color = v.to_string();
    }
    if let Some(v) = get(lines, "DynamicsMode") {
        common.dynamics_mode = if v == "Expert" {
            DynamicsMode::Expert
        } else {
            DynamicsMode::Standard
        };
    }
    if let Some(v) = get(lines, "PlayMode") {
        common.play_mode = parse_play_mode(v);
        common.last_play_mode = common.play_mode;
    }
    Ok(common)
}

fn parse_play_mode(v: &str) -> PlayMode {
    match v {
        "PlayAfterSynth" => PlayMode::PlayAfterSynth,
        "Off" => PlayMode::Off,
        _ => PlayMode::PlayWithSynth,
    }
}

fn parse_master(lines: &[(String, String)]) -> LibResult<Master> {
    let mut master = Master::default();
    for (k, v) in lines {
        if k == "PreMeasure" {
            master.pre_measure = parse_i32(v)?;
        } else {
            master.extra.push((k.clone(), v.clone()));
        }
    }
    Ok(master)
}

fn parse_mixer(lines: &[(String, String)]) -> LibResult<Mixer> {
    let mut mixer = Mixer::default();
    let mut slaves: HashMap<usize, MixerSlave> = HashMap::new();
    for (k, v) in lines {
        if k == "MasterFeder" {
            mixer.master_feder = parse_i32(v)?;
        } else if k == "MasterPanpot" {
            mixer.master_panpot = parse_i32(v)?;
        } else if k == "MasterMute" {
            mixer.master_mute = parse_i32(v)?;
        } else if k == "OutputMode" {
            mixer.output_mode = parse_i32(v)?;
        } else if let Some((idx, field)) = parse_slave_key(k) {
            let slave = slaves.entry(idx).or_default();
            match field {
                "Feder" => slave.feder = parse_i32(v)?,
                "Panpot" => slave.panpot = parse_i32(v)?,
                "Mute" => slave.mute = parse_i32(v)?,
                "Solo" => slave.solo = parse_i32(v)?,
                _ => {}
            }
        } else {
            mixer.extra.push((k.clone(), v.clone()));
        }
    }
    let max_idx = slaves.keys().copied().max();
    if let Some(max_idx) = max_idx {
        mixer.slaves = (0..=max_idx)
            .map(|i| slaves.remove(&i).unwrap_or_default())
            .collect();
    }
    Ok(mixer)
}

/// Parses `Vd{n}{Field}` mixer keys, e.g. `Vd0Feder`.
fn parse_slave_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("Vd")?;
    let split = rest.find(|c: char| !c.is_ascii_digit())?;
    let idx: usize = rest[..split].parse().ok()?;
    Some((idx, &rest[split..]))
}

fn build_handle(id: i32, lines: &[(String, String)]) -> LibResult<Handle> {
    let icon_id = get(lines, "IconID").unwrap_or("").to_string();
    let ids = get(lines, "IDS").unwrap_or("").to_string();
    let original = get(lines, "Original").map(parse_i32).transpose()?.unwrap_or(0);
    let caption = get(lines, "Caption").unwrap_or("").to_string();
    let length = get(lines, "Length").map(parse_tick).transpose()?.unwrap_or(0);

    let body = if get(lines, "Language").is_some() || get(lines, "Program").is_some() {
        HandleBody::Singer {
            language: get(lines, "Language").map(parse_i32).transpose()?.unwrap_or(0),
            program: get(lines, "Program").map(parse_i32).transpose()?.unwrap_or(0),
        }
    } else if lines.iter().any(|(k, _)| k.starts_with('L') && k[1..].chars().all(|c| c.is_ascii_digit()) && !k[1..].is_empty()) {
        HandleBody::Lyric {
            lyrics: parse_lyric_lines(lines)?,
            quote_on_write: lines
                .iter()
                .find(|(k, _)| k.starts_with('L'))
                .map(|(_, v)| v.starts_with('"'))
                .unwrap_or(true),
        }
    } else if get(lines, "StartDepth").is_some() || get(lines, "DepthBPNum").is_some() {
        HandleBody::Vibrato {
            start_depth: get(lines, "StartDepth").map(parse_i32).transpose()?.unwrap_or(64),
            depth_bp: parse_vibrato_curve(lines, "Depth")?,
            start_rate: get(lines, "StartRate").map(parse_i32).transpose()?.unwrap_or(64),
            rate_bp: parse_vibrato_curve(lines, "Rate")?,
        }
    } else if get(lines, "StartDyn").is_some() || get(lines, "EndDyn").is_some() {
        HandleBody::Dynamics {
            start_dyn: get(lines, "StartDyn").map(parse_i32).transpose()?.unwrap_or(0),
            end_dyn: get(lines, "EndDyn").map(parse_i32).transpose()?.unwrap_or(0),
            dyn_bp: parse_vibrato_curve(lines, "Dyn")?,
        }
    } else if get(lines, "Duration").is_some() || get(lines, "Depth").is_some() {
        HandleBody::NoteHead {
            duration: get(lines, "Duration").map(parse_i32).transpose()?.unwrap_or(0),
            depth: get(lines, "Depth").map(parse_i32).transpose()?.unwrap_or(0),
        }
    } else {
        // Ambiguous or empty block: the last-checked kind in this chain wins (§9).
        HandleBody::NoteHead { duration: 0, depth: 0 }
    };

    Ok(Handle {
        index: id,
        icon_id,
        ids,
        original,
        caption,
        length,
        body,
    })
}

fn parse_vibrato_curve(
    lines: &[(String, String)],
    prefix: &str,
) -> LibResult<crate::model::vibrato::VibratoCurve> {
    let mut curve = crate::model::vibrato::VibratoCurve::new();
    let xs = get(lines, &format!("{}BPX", prefix));
    let ys = get(lines, &format!("{}BPY", prefix));
    if let (Some(xs), Some(ys)) = (xs, ys) {
        let xs: Vec<f64> = xs
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().map_err(|_| parse_e!("bad vibrato x '{}'", s)))
            .collect::<LibResult<_>>()?;
        let ys: Vec<i32> = ys
            .split(',')
            .filter(|s| !s.is_empty())
            .map(parse_i32)
            .collect::<LibResult<_>>()?;
        for (x, y) in xs.into_iter().zip(ys.into_iter()) {
            curve.add(x, y);
        }
    }
    Ok(curve)
}

fn parse_lyric_lines(lines: &[(String, String)]) -> LibResult<Vec<Lyric>> {
    let mut entries: Vec<(usize, &str)> = lines
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix('L')
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| (n, v.as_str()))
        })
        .collect();
    entries.sort_by_key(|(n, _)| *n);
    entries.iter().map(|(_, v)| parse_lyric_line(v)).collect()
}

fn parse_lyric_line(value: &str) -> LibResult<Lyric> {
    let (phrase, symbols, rest) = if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped
            .find('"')
            .ok_or_else(|| parse_e!("unterminated lyric phrase in '{}'", value))?;
        let phrase = &stripped[..end];
        let after = stripped[end + 1..]
            .strip_prefix(',')
            .ok_or_else(|| parse_e!("expected ',' after lyric phrase in '{}'", value))?;
        let after = after
            .strip_prefix('"')
            .ok_or_else(|| parse_e!("expected quoted symbols in '{}'", value))?;
        let end2 = after
            .find('"')
            .ok_or_else(|| parse_e!("unterminated lyric symbols in '{}'", value))?;
        let symbols = &after[..end2];
        let rest = after[end2 + 1..].strip_prefix(',').unwrap_or("");
        (phrase.to_string(), symbols.to_string(), rest.to_string())
    } else {
        let mut fields = value.splitn(3, ',');
        let phrase = fields.next().unwrap_or("").to_string();
        let symbols = fields.next().unwrap_or("").to_string();
        let rest = fields.next().unwrap_or("").to_string();
        (phrase, symbols, rest)
    };

    let symbols: Vec<String> = symbols
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    let rest_fields: Vec<&str> = rest.split(',').filter(|s| !s.is_empty()).collect();
    let is_protected = rest_fields.last().map(|s| *s == "1").unwrap_or(false);
    let consonant_adjustment = if rest_fields.is_empty() {
        vec![0; symbols.len()]
    } else {
        rest_fields[..rest_fields.len() - 1]
            .iter()
            .map(|s| parse_i32(s))
            .collect::<LibResult<Vec<_>>>()?
    };

    let mut lyric = Lyric::new(phrase, symbols).map_err(|_| parse_e!("invalid lyric entry"))?;
    lyric.consonant_adjustment = if consonant_adjustment.is_empty() {
        vec![0; lyric.phonetic_symbols.len()]
    } else {
        consonant_adjustment
    };
    lyric.is_protected = is_protected;
    Ok(lyric)
}

fn build_event(
    tick: Tick,
    lines: &[(String, String)],
    handles: &HashMap<i32, Handle>,
) -> LibResult<Event> {
    let type_name = get(lines, "Type").unwrap_or("Anote");
    let length = get(lines, "Length").map(parse_tick).transpose()?.unwrap_or(0);

    let kind = match type_name {
        "Singer" => {
            let handle = resolve_handle(lines, "IconHandle", handles)?;
            EventKind::Singer(handle)
        }
        "Aicon" => EventKind::Icon(IconData {
            icon_handle: resolve_handle(lines, "IconHandle", handles)?,
            note: get(lines, "Note#").map(parse_i32).transpose()?.unwrap_or(0),
        }),
        _ => {
            let vibrato_handle = if get(lines, "VibratoHandle").is_some() {
                Some(resolve_handle(lines, "VibratoHandle", handles)?)
            } else {
                None
            };
            let note_head_handle = if get(lines, "NoteHeadHandle").is_some() {
                Some(resolve_handle(lines, "NoteHeadHandle", handles)?)
            } else {
                None
            };
            EventKind::Note(NoteData {
                note: get(lines, "Note#").map(parse_i32).transpose()?.unwrap_or(0),
                dynamics: get(lines, "Dynamics").map(parse_i32).transpose()?.unwrap_or(64),
                pm_bend_depth: get(lines, "PMBendDepth").map(parse_i32).transpose()?.unwrap_or(0),
                pm_bend_length: get(lines, "PMBendLength").map(parse_i32).transpose()?.unwrap_or(0),
                pmb_portamento_use: get(lines, "PMbPortamentoUse").map(parse_i32).transpose()?.unwrap_or(0),
                dem_dec_gain_rate: get(lines, "DEMdecGainRate").map(parse_i32).transpose()?.unwrap_or(0),
                dem_accent: get(lines, "DEMaccent").map(parse_i32).transpose()?.unwrap_or(0),
                vibrato_delay: get(lines, "VibratoDelay").map(parse_i32).transpose()?.unwrap_or(0),
                d4mean: 0,
                p_mean_onset_first_note: 0,
                v_mean_note_transition: 0,
                p_mean_ending_note: 0,
                lyric_handle: resolve_handle(lines, "LyricHandle", handles)?,
                vibrato_handle,
                note_head_handle,
            })
        }
    };

    let mut event = Event::new(tick, kind);
    event.length = length;
    Ok(event)
}

fn resolve_handle(
    lines: &[(String, String)],
    key: &str,
    handles: &HashMap<i32, Handle>,
) -> LibResult<Handle> {
    let raw = get(lines, key).ok_or_else(|| resolve_e!("missing '{}' reference", key))?;
    let id = parse_ref_id(raw, "h#")?;
    handles
        .get(&id)
        .cloned()
        .ok_or_else(|| resolve_e!("no [h#{:04}] block for '{}'", id, key))
}
