//! SMF read path (§4.6): the inverse of `writer` — parse `MThd`/`MTrk` chunks, fold the
//! Master track's tempo/time-signature meta events into a `TempoMap`/`TimesigMap`,
//! and rejoin each remaining track's `DM:NNNN:`-prefixed text slices before handing the
//! result to `metatext::read_track_meta_text`. Channel messages (the NRPN stream) carry
//! no information the meta-text doesn't already have, so they are skipped rather than
//! decoded back into NRPN composites.

use crate::byte_iter::ByteIter;
use crate::encoding::TextCodec;
use crate::error::LibResult;
use crate::model::sequence::Sequence;
use crate::model::tick::Tick;
use snafu::ResultExt;
use std::io::Read;

/// Parses a complete SMF produced by [`super::write_smf`] (or any conformant writer)
/// back into a `Sequence`, using `codec` to decode each meta-text slice's bytes.
pub fn read_smf<R: Read>(r: R, codec: &dyn TextCodec) -> crate::error::Result<Sequence> {
    read_smf_inner(r, codec).map_err(Into::into)
}

fn read_smf_inner<R: Read>(r: R, codec: &dyn TextCodec) -> LibResult<Sequence> {
    let mut iter = ByteIter::new(r.bytes()).context(bytes!())?;

    iter.expect_tag("MThd").context(bytes!())?;
    let header_len = iter.read_u32().context(bytes!())?;
    if header_len != 6 {
        return format_r!("MThd length must be 6, found {}", header_len);
    }
    let _format = iter.read_u16().context(bytes!())?;
    let num_tracks = iter.read_u16().context(bytes!())?;
    let _division = iter.read_u16().context(bytes!())?;
    if num_tracks == 0 {
        return format_r!("SMF declares zero tracks, expected at least a Master track");
    }

    let mut sequence = Sequence::new();
    let master_chunk = read_chunk(&mut iter)?;
    apply_master_chunk(&mut sequence, &master_chunk);

    for _ in 1..num_tracks {
        let chunk = read_chunk(&mut iter)?;
        let meta_text = join_text_slices(&chunk.text_slices, codec);
        let (mut track, master_mixer) = crate::metatext::read_track_meta_text(&meta_text)
            .map_err(|e| format_e!("malformed track meta-text: {}", e))?;
        if let Some(name) = &chunk.name {
            if track.common.name.is_empty() {
                track.common.name = name.clone();
            }
        }
        if let Some((master, mixer)) = master_mixer {
            sequence.master = master;
            sequence.mixer = mixer;
        }
        sequence.push_track(track);
    }

    sequence.total_ticks = sequence.last_event_tick();
    Ok(sequence)
}

/// One parsed `MTrk`'s relevant content: tempo/time-signature rows (meaningful only for
/// the Master track), accumulated text slices, and the 0xFF 0x03 track name if present.
#[derive(Default)]
struct TrackChunk {
    tempo: Vec<(Tick, i64)>,
    timesig: Vec<(Tick, i32, i32)>,
    text_slices: Vec<(usize, String)>,
    name: Option<String>,
}

fn message_data_len(status: u8) -> usize {
    match status & 0xf0 {
        0xc0 | 0xd0 => 1,
        _ => 2,
    }
}

fn read_chunk<R: Read>(iter: &mut ByteIter<R>) -> LibResult<TrackChunk> {
    iter.expect_tag("MTrk").context(bytes!())?;
    let chunk_len = iter.read_u32().context(bytes!())?;
    iter.set_size_limit(chunk_len as u64);

    let mut chunk = TrackChunk::default();
    let mut tick: Tick = 0;
    let mut running_status: Option<u8> = None;
    let mut slice_index = 0usize;

    while !iter.is_end() {
        let delta = iter.read_vlq_u32().context(bytes!())?;
        tick += delta as Tick;
        let first = iter.peek_or_die().context(bytes!())?;

        if first == 0xff {
            iter.read_or_die().context(bytes!())?;
            let kind = iter.read_or_die().context(bytes!())?;
            let len = iter.read_vlq_u32().context(bytes!())? as usize;
            let data = iter.read_n(len).context(bytes!())?;
            running_status = None;
            match kind {
                0x51 if data.len() == 3 => {
                    let us = ((data[0] as i64) << 16) | ((data[1] as i64) << 8) | data[2] as i64;
                    chunk.tempo.push((tick, us));
                }
                0x58 if data.len() == 4 => {
                    let numerator = data[0] as i32;
                    let denominator = 1i32 << data[1];
                    chunk.timesig.push((tick, numerator, denominator));
                }
                0x01 => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    chunk.text_slices.push((slice_index, text));
                    slice_index += 1;
                }
                0x03 => {
                    chunk.name = Some(String::from_utf8_lossy(&data).into_owned());
                }
                0x2f => break,
                _ => {}
            }
            continue;
        }

        if first == 0xf0 || first == 0xf7 {
            iter.read_or_die().context(bytes!())?;
            running_status = None;
            let len = iter.read_vlq_u32().context(bytes!())? as usize;
            iter.read_n(len).context(bytes!())?;
            continue;
        }

        let status = if first & 0x80 != 0 {
            iter.read_or_die().context(bytes!())?;
            running_status = Some(first);
            first
        } else {
            running_status
                .ok_or_else(|| format_e!("channel message byte {:#x} with no running status", first))?
        };
        iter.read_n(message_data_len(status)).context(bytes!())?;
    }

    iter.clear_size_limit();
    Ok(chunk)
}

fn apply_master_chunk(sequence: &mut Sequence, chunk: &TrackChunk) {
    for &(tick, us) in &chunk.tempo {
        sequence.tempo_map.add(tick, us);
    }
    for &(tick, num, den) in &chunk.timesig {
        let bar_index = bar_index_for_tick(&sequence.timesig_map, tick);
        sequence.timesig_map.add(bar_index, num, den);
    }
}

/// `TimesigMap::add` takes a bar index, not a tick, but SMF only carries ticks. Walks
/// bar boundaries forward from the map's current entries (smaller ticks, since the
/// Master track's time-signature events are read in ascending tick order) until one
/// lands on `tick`. Cheap in practice: real sequences carry at most a handful of
/// time-signature changes.
fn bar_index_for_tick(map: &crate::model::timesig_map::TimesigMap, tick: Tick) -> i32 {
    if tick <= 0 {
        return 0;
    }
    let mut bar = 0i32;
    while map.tick_at_bar(bar) < tick {
        bar += 1;
    }
    bar
}

/// Strips each slice's leading `DM:NNNN:` prefix (falling back to treating the whole
/// slice as payload if the prefix is malformed), decodes with `codec`, and joins in
/// slice-index order.
fn join_text_slices(slices: &[(usize, String)], codec: &dyn TextCodec) -> String {
    let mut ordered = slices.to_vec();
    ordered.sort_by_key(|(index, _)| *index);
    let mut out = String::new();
    for (_, raw) in ordered {
        let payload = strip_dm_prefix(&raw).unwrap_or(raw.as_str());
        out.push_str(&codec.to_utf8(payload.as_bytes()));
    }
    out
}

fn strip_dm_prefix(s: &str) -> Option<&str> {
    let rest = s.strip_prefix("DM:")?;
    let colon = rest.find(':')?;
    let (digits, after) = rest.split_at(colon);
    if digits.chars().all(|c| c.is_ascii_digit()) {
        Some(&after[1..])
    } else {
        None
    }
}
