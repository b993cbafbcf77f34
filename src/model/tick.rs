//! The `Tick` type: a 480-per-quarter-note discrete time unit shared by every component
//! of a sequence.

/// Ticks per quarter note used throughout this crate (and by the VOCALOID engine).
pub const TICKS_PER_QUARTER_NOTE: i64 = 480;

/// A signed tick position. Negative ticks are not meaningful but are not prevented by
/// the type itself; callers that parse untrusted input should reject negative ticks
/// with a `RangeError` at the boundary (see `error::LibError::Range`).
pub type Tick = i64;

/// The default tempo, in microseconds per quarter note, used before the first tempo
/// map entry and for a freshly constructed sequence.
pub const DEFAULT_TEMPO_US: i64 = 500_000;
