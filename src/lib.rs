//! Reads and writes VOCALOID song sequences embedded in Standard MIDI Files: an
//! in-memory [`model::Sequence`], a line-oriented meta-text codec
//! ([`metatext::write_track_meta_text`] / [`metatext::read_track_meta_text`]), NRPN
//! controller-stream generation ([`nrpn::generate_track_nrpn`]), and the outer SMF
//! container ([`smf::write_smf`] / [`smf::read_smf`]).

#![allow(dead_code)]

#[macro_use]
mod error;
#[macro_use]
mod clamp;
#[macro_use]
mod macros;

mod byte_iter;
mod scribe;

pub mod encoding;
pub mod metatext;
pub mod model;
pub mod nrpn;
pub mod smf;
pub mod vlq;

pub use encoding::{Identity, TextCodec};
pub use error::{Error, Result};
pub use model::Sequence;
pub use smf::{read_smf, write_smf};
