//! The in-memory sequence model: ticks, breakpoint curves, handles, events, tempo and
//! time-signature maps, tracks, and the top-level `Sequence`.

pub mod bplist;
pub mod common;
pub mod event;
pub mod handle;
pub mod lyric;
pub mod mixer;
pub mod sequence;
pub mod tempo_map;
pub mod tick;
pub mod timesig_map;
pub mod track;
pub mod vibrato;

pub use bplist::BPList;
pub use common::Common;
pub use event::{Event, EventKind, EventList};
pub use handle::{Handle, HandleBody};
pub use lyric::Lyric;
pub use mixer::{Master, Mixer};
pub use sequence::Sequence;
pub use tempo_map::TempoMap;
pub use tick::Tick;
pub use timesig_map::TimesigMap;
pub use track::{CurveKind, Track};
pub use vibrato::VibratoCurve;
