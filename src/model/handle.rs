//! `Handle`: a tagged-variant reusable sub-record referenced by integer index from
//! events and other handles. Polymorphism is represented as a single struct carrying a
//! shared prefix plus a per-kind payload enum, rather than inheritance.

use crate::model::lyric::Lyric;
use crate::model::tick::Tick;
use crate::model::vibrato::VibratoCurve;

/// A reusable handle: singer icon, lyric, vibrato curve, note-attack, or dynamics.
#[derive(Clone, Debug, PartialEq)]
pub struct Handle {
    /// Position of this handle within its owning track's handle table; -1 is unused
    /// (never assigned by this crate, reserved for parity with the EventList EOS
    /// sentinel convention).
    pub index: i32,
    pub icon_id: String,
    pub ids: String,
    pub original: i32,
    pub caption: String,
    pub length: Tick,
    pub body: HandleBody,
}

/// Per-kind payload. The codec dispatches on this tag; only the active variant's keys
/// are emitted by the meta-text writer (§4.2).
#[derive(Clone, Debug, PartialEq)]
pub enum HandleBody {
    Singer { language: i32, program: i32 },
    Lyric { lyrics: Vec<Lyric>, quote_on_write: bool },
    Vibrato {
        start_depth: i32,
        depth_bp: VibratoCurve,
        start_rate: i32,
        rate_bp: VibratoCurve,
    },
    NoteHead { duration: i32, depth: i32 },
    Dynamics {
        start_dyn: i32,
        end_dyn: i32,
        dyn_bp: VibratoCurve,
    },
}

impl Handle {
    fn new(icon_id: impl Into<String>, length: Tick, body: HandleBody) -> Self {
        Self {
            index: 0,
            icon_id: icon_id.into(),
            ids: String::new(),
            original: 0,
            caption: String::new(),
            length,
            body,
        }
    }

    pub fn singer(icon_id: impl Into<String>, language: i32, program: i32) -> Self {
        Self::new(icon_id, 0, HandleBody::Singer { language, program })
    }

    pub fn lyric(lyrics: Vec<Lyric>, quote_on_write: bool) -> Self {
        Self::new(
            String::new(),
            0,
            HandleBody::Lyric {
                lyrics,
                quote_on_write,
            },
        )
    }

    pub fn vibrato(icon_id: impl Into<String>, length: Tick) -> Self {
        Self::new(
            icon_id,
            length,
            HandleBody::Vibrato {
                start_depth: 64,
                depth_bp: VibratoCurve::new(),
                start_rate: 64,
                rate_bp: VibratoCurve::new(),
            },
        )
    }

    pub fn note_head(duration: i32, depth: i32) -> Self {
        Self::new(String::new(), 0, HandleBody::NoteHead { duration, depth })
    }

    pub fn dynamics(icon_id: impl Into<String>, start_dyn: i32, end_dyn: i32) -> Self {
        Self::new(
            icon_id,
            0,
            HandleBody::Dynamics {
                start_dyn,
                end_dyn,
                dyn_bp: VibratoCurve::new(),
            },
        )
    }

    pub fn as_dynamics_kind(&self) -> Option<DynamicsKind> {
        match &self.body {
            HandleBody::Dynamics { .. } => DynamicsKind::from_icon_id(&self.icon_id),
            _ => None,
        }
    }
}

/// Dynamics handles are sub-discriminated by the prefix of their `icon_id` (§9).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DynamicsKind {
    Dynaff,
    Crescendo,
    Decrescendo,
}

impl DynamicsKind {
    pub fn from_icon_id(icon_id: &str) -> Option<Self> {
        if icon_id.starts_with("$0501") {
            Some(DynamicsKind::Dynaff)
        } else if icon_id.starts_with("$0502") {
            Some(DynamicsKind::Crescendo)
        } else if icon_id.starts_with("$0503") {
            Some(DynamicsKind::Decrescendo)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamics_kind_from_icon_id_prefix() {
        assert_eq!(
            Some(DynamicsKind::Dynaff),
            DynamicsKind::from_icon_id("$05010001")
        );
        assert_eq!(
            Some(DynamicsKind::Crescendo),
            DynamicsKind::from_icon_id("$05020001")
        );
        assert_eq!(
            Some(DynamicsKind::Decrescendo),
            DynamicsKind::from_icon_id("$05030001")
        );
        assert_eq!(None, DynamicsKind::from_icon_id("$07010011"));
    }

    #[test]
    fn vibrato_handle_carries_icon_and_length() {
        let h = Handle::vibrato("$07010011", 480);
        assert_eq!(480, h.length);
        assert!(matches!(h.body, HandleBody::Vibrato { .. }));
    }
}
