//! SMF write path (§4.6): `MThd` followed by a Master track (merged, sorted tempo and
//! time-signature meta events) and one `MTrk` per `Track` (name meta, meta-text packed
//! into `DM:NNNN:`-prefixed 0xFF 0x01 slices, then the NRPN controller stream).
//! Chunk lengths are placeholder-written then patched via `Seek`, grounded on
//! `other_examples/1c756230_hikari-no-yume-SoundPalette__src-midi.rs.rs`'s
//! `write_midi` (`stream_position` / `SeekFrom::Start` back-patch, `write_u16`/`write_u32`).

use crate::encoding::TextCodec;
use crate::error::LibResult;
use crate::model::sequence::Sequence;
use crate::model::tick::{Tick, TICKS_PER_QUARTER_NOTE};
use crate::model::track::Track;
use crate::nrpn::ControllerEvent;
use crate::scribe::{Scribe, ScribeSettings};
use snafu::ResultExt;
use std::io::{Seek, SeekFrom, Write};

/// Writes a complete SMF for `sequence`: an `MThd` (format 1, 480 ticks per quarter
/// note) followed by a Master track and one track per `sequence.tracks` entry.
pub fn write_smf<W: Write + Seek>(
    w: &mut W,
    sequence: &Sequence,
    codec: &dyn TextCodec,
    pre_send_ms: f64,
) -> crate::error::Result<()> {
    write_smf_inner(w, sequence, codec, pre_send_ms).map_err(Into::into)
}

fn write_smf_inner<W: Write + Seek>(
    w: &mut W,
    sequence: &Sequence,
    codec: &dyn TextCodec,
    pre_send_ms: f64,
) -> LibResult<()> {
    write_bytes(w, b"MThd")?;
    write_u32_be(w, 6)?;
    write_u16_be(w, 1)?;
    write_u16_be(w, (sequence.tracks.len() + 1) as u16)?;
    write_u16_be(w, TICKS_PER_QUARTER_NOTE as u16)?;

    write_master_track(w, sequence)?;
    for (index, track) in sequence.tracks.iter().enumerate() {
        write_track(w, index, track, sequence, codec, pre_send_ms)?;
    }
    Ok(())
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> LibResult<()> {
    w.write_all(bytes).context(io!())
}

fn write_u16_be<W: Write>(w: &mut W, value: u16) -> LibResult<()> {
    write_bytes(w, &value.to_be_bytes())
}

fn write_u32_be<W: Write>(w: &mut W, value: u32) -> LibResult<()> {
    write_bytes(w, &value.to_be_bytes())
}

fn write_byte_within<W: Write>(w: &mut W, length: &mut u32, byte: u8) -> LibResult<()> {
    write_u8!(w, byte)?;
    *length += 1;
    Ok(())
}

fn write_bytes_within<W: Write>(w: &mut W, length: &mut u32, bytes: &[u8]) -> LibResult<()> {
    w.write_all(bytes).context(io!())?;
    *length += bytes.len() as u32;
    Ok(())
}

fn write_vlq_within<W: Write>(w: &mut W, length: &mut u32, value: u32) -> LibResult<()> {
    let bytes = crate::vlq::to_bytes(&[value]);
    write_bytes_within(w, length, &bytes)
}

fn write_meta_event_within<W: Write>(
    w: &mut W,
    length: &mut u32,
    kind: u8,
    data: &[u8],
) -> LibResult<()> {
    write_byte_within(w, length, 0xff)?;
    write_byte_within(w, length, kind)?;
    write_vlq_within(w, length, data.len() as u32)?;
    write_bytes_within(w, length, data)
}

/// Seeks back to `length_pos` to patch in the finished chunk's byte length, then
/// returns the cursor to wherever the caller left off.
fn patch_chunk_length<W: Write + Seek>(
    w: &mut W,
    length_pos: u64,
    length: u32,
) -> LibResult<()> {
    let end_pos = w.stream_position().context(io!())?;
    w.seek(SeekFrom::Start(length_pos)).context(io!())?;
    write_u32_be(w, length)?;
    w.seek(SeekFrom::Start(end_pos)).context(io!())?;
    Ok(())
}

enum MasterEvent {
    Tempo(i64),
    Timesig(i32, i32),
}

fn write_master_track<W: Write + Seek>(w: &mut W, sequence: &Sequence) -> LibResult<()> {
    write_bytes(w, b"MTrk")?;
    let length_pos = w.stream_position().context(io!())?;
    write_u32_be(w, 0)?;
    let mut length = 0u32;

    write_vlq_within(w, &mut length, 0)?;
    write_meta_event_within(w, &mut length, 0x03, b"Master Track")?;

    let mut events: Vec<(Tick, u8, MasterEvent)> = Vec::new();
    for (tick, us) in sequence.tempo_map.iter() {
        events.push((tick, 0, MasterEvent::Tempo(us)));
    }
    for (tick, num, den) in sequence.timesig_map.iter() {
        events.push((tick, 1, MasterEvent::Timesig(num, den)));
    }
    events.sort_by_key(|(tick, priority, _)| (*tick, *priority));

    let mut last_tick: Tick = 0;
    for (tick, _, event) in events {
        let delta = (tick - last_tick).max(0) as u32;
        last_tick = tick;
        write_vlq_within(w, &mut length, delta)?;
        match event {
            MasterEvent::Tempo(us) => {
                let bytes = [(us >> 16) as u8, (us >> 8) as u8, us as u8];
                write_meta_event_within(w, &mut length, 0x51, &bytes)?;
            }
            MasterEvent::Timesig(num, den) => {
                let den_log2 = (den as f64).log2().round() as u8;
                write_meta_event_within(w, &mut length, 0x58, &[num as u8, den_log2, 24, 8])?;
            }
        }
    }

    write_vlq_within(w, &mut length, 0)?;
    write_meta_event_within(w, &mut length, 0x2f, &[])?;

    patch_chunk_length(w, length_pos, length)
}

fn write_track<W: Write + Seek>(
    w: &mut W,
    index: usize,
    track: &Track,
    sequence: &Sequence,
    codec: &dyn TextCodec,
    pre_send_ms: f64,
) -> LibResult<()> {
    write_bytes(w, b"MTrk")?;
    let length_pos = w.stream_position().context(io!())?;
    write_u32_be(w, 0)?;
    let mut length = 0u32;

    write_vlq_within(w, &mut length, 0)?;
    write_meta_event_within(w, &mut length, 0x03, &codec.to_shift_jis(&track.common.name))?;

    let master_mixer = if index == 0 {
        Some((&sequence.master, &sequence.mixer))
    } else {
        None
    };
    let meta_text =
        crate::metatext::write_track_meta_text(track, master_mixer, sequence.total_ticks);
    let packed = codec.to_shift_jis(&meta_text);
    write_meta_text_slices(w, &mut length, &packed)?;

    let nrpn_events = crate::nrpn::generate_track_nrpn(track, &sequence.tempo_map, pre_send_ms);
    let channel = (index as u8) & 0x0f;
    write_nrpn_stream(w, &mut length, &nrpn_events, channel)?;

    write_vlq_within(w, &mut length, 0)?;
    write_meta_event_within(w, &mut length, 0x2f, &[])?;

    patch_chunk_length(w, length_pos, length)
}

/// Packs `packed` (already Shift_JIS-encoded meta-text) into `DM:NNNN:`-prefixed
/// 0xFF 0x01 text events, each at most 127 bytes including its prefix (§4.6). Always
/// emits at least one slice, even for empty text.
fn write_meta_text_slices<W: Write>(w: &mut W, length: &mut u32, packed: &[u8]) -> LibResult<()> {
    const SLICE_LIMIT: usize = 127;
    let mut index = 0usize;
    let mut pos = 0usize;
    loop {
        let prefix = if index > 9999 {
            format!("DM:{:08}:", index)
        } else {
            format!("DM:{:04}:", index)
        };
        let capacity = SLICE_LIMIT.saturating_sub(prefix.len());
        let end = (pos + capacity).min(packed.len());
        let slice = &packed[pos..end];

        write_vlq_within(w, length, 0)?;
        write_byte_within(w, length, 0xff)?;
        write_byte_within(w, length, 0x01)?;
        write_vlq_within(w, length, (prefix.len() + slice.len()) as u32)?;
        write_bytes_within(w, length, prefix.as_bytes())?;
        write_bytes_within(w, length, slice)?;

        index += 1;
        pos = end;
        if pos >= packed.len() {
            break;
        }
    }
    Ok(())
}

/// A `Write` wrapper that tallies every byte passed through it into a shared chunk
/// length counter, so `Scribe`'s running-status logic can sit between the NRPN
/// controller loop and the chunk's placeholder-length bookkeeping.
struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    length: &'a mut u32,
}

impl<'a, W: Write> Write for CountingWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        *self.length += n as u32;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Serialises NRPN controller events as delta-VLQ-framed Control Change messages on
/// `channel`, all sharing one running status byte since every event is a CC.
fn write_nrpn_stream<W: Write>(
    w: &mut W,
    length: &mut u32,
    events: &[ControllerEvent],
    channel: u8,
) -> LibResult<()> {
    let counting = CountingWriter { inner: w, length };
    let mut scribe = Scribe::new(
        counting,
        ScribeSettings {
            running_status: true,
        },
    );
    let status = 0xb0 | (channel & 0x0f);
    let mut last_tick: Tick = 0;
    for event in events {
        let delta = (event.tick - last_tick).max(0) as u32;
        last_tick = event.tick;
        let delta_bytes = crate::vlq::to_bytes(&[delta]);
        scribe.write_all(&delta_bytes).context(io!())?;
        scribe.write_status_byte(status)?;
        write_u8!(scribe, event.controller)?;
        write_u8!(scribe, event.value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Identity;
    use std::io::Cursor;

    fn read_be_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn mthd_header_describes_format_1_and_480_tpqn() {
        let sequence = Sequence::new();
        let mut buf = Cursor::new(Vec::new());
        write_smf(&mut buf, &sequence, &Identity, 0.0).unwrap();
        let bytes = buf.into_inner();
        assert_eq!(b"MThd", &bytes[0..4]);
        assert_eq!(6, read_be_u32(&bytes, 4));
        assert_eq!(1, u16::from_be_bytes([bytes[8], bytes[9]]));
        assert_eq!(1, u16::from_be_bytes([bytes[10], bytes[11]])); // master track only
        assert_eq!(480, u16::from_be_bytes([bytes[12], bytes[13]]));
    }

    #[test]
    fn empty_sequence_master_track_matches_default_tempo_and_timesig() {
        let sequence = Sequence::new();
        let mut buf = Cursor::new(Vec::new());
        write_smf(&mut buf, &sequence, &Identity, 0.0).unwrap();
        let bytes = buf.into_inner();
        assert!(contains_subsequence(&bytes, &[0xff, 0x51, 0x03, 0x07, 0xa1, 0x20]));
        assert!(contains_subsequence(
            &bytes,
            &[0xff, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08]
        ));
        assert!(contains_subsequence(&bytes, &[0xff, 0x2f, 0x00]));
    }

    #[test]
    fn meta_text_slicing_matches_the_127_byte_boundary() {
        let packed = vec![b'X'; 200];
        let mut length = 0u32;
        let mut buf = Cursor::new(Vec::new());
        write_meta_text_slices(&mut buf, &mut length, &packed).unwrap();
        let bytes = buf.into_inner();

        // event 0: delta(0x00) ff 01 <vlq len=127> "DM:0000:" + 119 'X'
        assert_eq!(&[0x00, 0xff, 0x01, 127], &bytes[0..4]);
        assert_eq!(b"DM:0000:", &bytes[4..12]);
        assert!(bytes[12..12 + 119].iter().all(|&b| b == b'X'));

        let second = 12 + 119;
        assert_eq!(&[0x00, 0xff, 0x01, 89], &bytes[second..second + 4]);
        assert_eq!(b"DM:0001:", &bytes[second + 4..second + 12]);
        assert!(bytes[second + 12..].iter().all(|&b| b == b'X'));
        assert_eq!(81, bytes.len() - (second + 12));
    }

    #[test]
    fn track_chunk_length_matches_its_payload_size() {
        let mut sequence = Sequence::new();
        sequence.push_track(Track::new());
        let mut buf = Cursor::new(Vec::new());
        write_smf(&mut buf, &sequence, &Identity, 0.0).unwrap();
        let bytes = buf.into_inner();

        // Locate the second "MTrk" tag (the master track is the first).
        let first = find_subsequence(&bytes, b"MTrk").unwrap();
        let second = find_subsequence(&bytes[first + 4..], b"MTrk").unwrap() + first + 4;
        let declared_length = read_be_u32(&bytes, second + 4) as usize;
        let payload_start = second + 8;
        assert!(payload_start + declared_length <= bytes.len());
    }

    fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
        find_subsequence(haystack, needle).is_some()
    }
}
