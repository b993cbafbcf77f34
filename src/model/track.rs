//! `Track`: a name, `Common` metadata, an `EventList`, and the 23 named `BPList`
//! curves a VOCALOID track carries. Grounded on the curve construction in
//! `original_source/src/Track.cpp`.

use crate::model::bplist::BPList;
use crate::model::common::{Common, EngineVersion};
use crate::model::event::EventList;

/// Identifies one of the 23 named control curves a track may hold.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(usize)]
pub enum CurveKind {
    Pit = 0,
    Pbs,
    Dyn,
    Bre,
    Bri,
    Cle,
    Reso1Freq,
    Reso2Freq,
    Reso3Freq,
    Reso4Freq,
    Reso1Bw,
    Reso2Bw,
    Reso3Bw,
    Reso4Bw,
    Reso1Amp,
    Reso2Amp,
    Reso3Amp,
    Reso4Amp,
    Harmonics,
    Fx2Depth,
    Gen,
    Por,
    Ope,
}

pub const CURVE_COUNT: usize = 23;

pub const ALL_CURVES: [CurveKind; CURVE_COUNT] = [
    CurveKind::Pit,
    CurveKind::Pbs,
    CurveKind::Dyn,
    CurveKind::Bre,
    CurveKind::Bri,
    CurveKind::Cle,
    CurveKind::Reso1Freq,
    CurveKind::Reso2Freq,
    CurveKind::Reso3Freq,
    CurveKind::Reso4Freq,
    CurveKind::Reso1Bw,
    CurveKind::Reso2Bw,
    CurveKind::Reso3Bw,
    CurveKind::Reso4Bw,
    CurveKind::Reso1Amp,
    CurveKind::Reso2Amp,
    CurveKind::Reso3Amp,
    CurveKind::Reso4Amp,
    CurveKind::Harmonics,
    CurveKind::Fx2Depth,
    CurveKind::Gen,
    CurveKind::Por,
    CurveKind::Ope,
];

/// The curves present in the baseline (non-DSB2/DSB3) engine.
const BASELINE_CURVES: [CurveKind; 8] = [
    CurveKind::Pit,
    CurveKind::Pbs,
    CurveKind::Dyn,
    CurveKind::Bre,
    CurveKind::Bri,
    CurveKind::Cle,
    CurveKind::Gen,
    CurveKind::Por,
];

/// Curves DSB2 adds on top of the baseline set: the four resonance bands (freq, bw,
/// amp), harmonics, and fx2depth.
const DSB2_EXTRA_CURVES: [CurveKind; 14] = [
    CurveKind::Reso1Freq,
    CurveKind::Reso2Freq,
    CurveKind::Reso3Freq,
    CurveKind::Reso4Freq,
    CurveKind::Reso1Bw,
    CurveKind::Reso2Bw,
    CurveKind::Reso3Bw,
    CurveKind::Reso4Bw,
    CurveKind::Reso1Amp,
    CurveKind::Reso2Amp,
    CurveKind::Reso3Amp,
    CurveKind::Reso4Amp,
    CurveKind::Harmonics,
    CurveKind::Fx2Depth,
];

impl CurveKind {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn descriptor(self) -> &'static CurveDescriptor {
        &CURVE_DESCRIPTORS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn section_header(self) -> &'static str {
        self.descriptor().section_header
    }
}

/// Static identity of one named curve: its lowercase field name, text-section header,
/// default value, and inclusive clamp range.
pub struct CurveDescriptor {
    pub kind: CurveKind,
    pub name: &'static str,
    pub section_header: &'static str,
    pub default: i32,
    pub min: i32,
    pub max: i32,
}

macro_rules! curve {
    ($kind:expr, $name:expr, $section:expr, $default:expr, $min:expr, $max:expr) => {
        CurveDescriptor {
            kind: $kind,
            name: $name,
            section_header: $section,
            default: $default,
            min: $min,
            max: $max,
        }
    };
}

/// Static registry (§9) mapping each `CurveKind` to its descriptor, indexed by
/// `CurveKind::index()`.
pub static CURVE_DESCRIPTORS: [CurveDescriptor; CURVE_COUNT] = [
    curve!(CurveKind::Pit, "pit", "PitchBendBPList", 0, -8192, 8191),
    curve!(CurveKind::Pbs, "pbs", "PitchBendSensBPList", 2, 0, 24),
    curve!(CurveKind::Dyn, "dyn", "DynamicsBPList", 64, 0, 127),
    curve!(CurveKind::Bre, "bre", "EpRResidualBPList", 0, 0, 127),
    curve!(CurveKind::Bri, "bri", "EpRESlopeBPList", 64, 0, 127),
    curve!(CurveKind::Cle, "cle", "EpRESlopeDepthBPList", 0, 0, 127),
    curve!(CurveKind::Reso1Freq, "reso1freq", "Reso1FreqBPList", 64, 0, 127),
    curve!(CurveKind::Reso2Freq, "reso2freq", "Reso2FreqBPList", 64, 0, 127),
    curve!(CurveKind::Reso3Freq, "reso3freq", "Reso3FreqBPList", 64, 0, 127),
    curve!(CurveKind::Reso4Freq, "reso4freq", "Reso4FreqBPList", 64, 0, 127),
    curve!(CurveKind::Reso1Bw, "reso1bw", "Reso1BWBPList", 64, 0, 127),
    curve!(CurveKind::Reso2Bw, "reso2bw", "Reso2BWBPList", 64, 0, 127),
    curve!(CurveKind::Reso3Bw, "reso3bw", "Reso3BWBPList", 64, 0, 127),
    curve!(CurveKind::Reso4Bw, "reso4bw", "Reso4BWBPList", 64, 0, 127),
    curve!(CurveKind::Reso1Amp, "reso1amp", "Reso1AmpBPList", 64, 0, 127),
    curve!(CurveKind::Reso2Amp, "reso2amp", "Reso2AmpBPList", 64, 0, 127),
    curve!(CurveKind::Reso3Amp, "reso3amp", "Reso3AmpBPList", 64, 0, 127),
    curve!(CurveKind::Reso4Amp, "reso4amp", "Reso4AmpBPList", 64, 0, 127),
    curve!(CurveKind::Harmonics, "harmonics", "EpRSineBPList", 64, 0, 127),
    curve!(CurveKind::Fx2Depth, "fx2depth", "VibTremDepthBPList", 64, 0, 127),
    curve!(CurveKind::Gen, "gen", "GenderFactorBPList", 64, 0, 127),
    curve!(CurveKind::Por, "por", "PortamentoTimingBPList", 64, 0, 127),
    curve!(CurveKind::Ope, "ope", "OpeningBPList", 127, 0, 127),
];

/// A track: its common metadata, event list, and 23 named breakpoint curves.
#[derive(Clone, Debug)]
pub struct Track {
    pub common: Common,
    pub events: EventList,
    curves: Vec<BPList>,
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl Track {
    pub fn new() -> Self {
        let curves = CURVE_DESCRIPTORS
            .iter()
            .map(|d| BPList::new(d.name, d.default, d.min, d.max))
            .collect();
        Self {
            common: Common::default(),
            events: EventList::new(),
            curves,
        }
    }

    pub fn curve(&self, kind: CurveKind) -> &BPList {
        &self.curves[kind.index()]
    }

    pub fn curve_mut(&mut self, kind: CurveKind) -> &mut BPList {
        &mut self.curves[kind.index()]
    }

    /// The curves enabled for this track's `Common::engine_version`, in a fixed order
    /// (baseline set, then any DSB2 additions, then `ope` under DSB3). This is the
    /// crate's canonical iteration order for both meta-text and NRPN emission.
    pub fn curve_set(&self) -> Vec<CurveKind> {
        let version = self.common.engine_version();
        let mut set: Vec<CurveKind> = BASELINE_CURVES.to_vec();
        if matches!(version, EngineVersion::Dsb2 | EngineVersion::Dsb3) {
            set.extend_from_slice(&DSB2_EXTRA_CURVES);
        }
        if matches!(version, EngineVersion::Dsb3) {
            set.push(CurveKind::Ope);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::common::EngineVersion;

    #[test]
    fn baseline_track_has_eight_curves() {
        let mut track = Track::new();
        track.common.version = "DSB100".to_string();
        assert_eq!(EngineVersion::Baseline, track.common.engine_version());
        assert_eq!(8, track.curve_set().len());
    }

    #[test]
    fn dsb3_track_has_all_23_curves() {
        let track = Track::new();
        assert_eq!("DSB301", track.common.version);
        assert_eq!(23, track.curve_set().len());
    }

    #[test]
    fn dsb2_track_excludes_opening() {
        let mut track = Track::new();
        track.common.version = "DSB200".to_string();
        assert_eq!(22, track.curve_set().len());
        assert!(!track.curve_set().contains(&CurveKind::Ope));
    }

    #[test]
    fn curve_lookup_uses_its_own_descriptor_defaults() {
        let track = Track::new();
        assert_eq!(64, track.curve(CurveKind::Dyn).default_value());
        assert_eq!(0, track.curve(CurveKind::Pit).default_value());
    }
}
