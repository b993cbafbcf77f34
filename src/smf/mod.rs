//! Standard MIDI File (SMF) codec: a Master track (tempo/time-signature meta events)
//! followed by one MTrk per `Track`, each carrying its meta-text packed into 0xFF 0x01
//! text events plus its NRPN controller-change stream (§4.6).

mod reader;
mod writer;

pub use reader::read_smf;
pub use writer::write_smf;
