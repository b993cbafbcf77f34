//! The meta-text codec: rendering a `Track` to VSQ meta-text lines and parsing it back
//! (§4.1–§4.4, §4.7).

pub mod reader;
pub mod text_stream;
pub mod writer;

pub use reader::{read_track_meta_text, MetaTextError};
pub use text_stream::TextStream;
pub use writer::write_track_meta_text;
