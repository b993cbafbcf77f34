//! `Master` / `Mixer`: the sequence-wide `[Master]` and `[Mixer]` sections. Unknown
//! keys are preserved verbatim across a read-modify-write round trip (§3, §9) since the
//! precise key set varies across VOCALOID versions.

/// The `[Master]` section: currently just `PreMeasure`, plus any keys this crate does
/// not recognise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Master {
    pub pre_measure: i32,
    pub extra: Vec<(String, String)>,
}

/// One mixer channel strip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MixerSlave {
    pub feder: i32,
    pub panpot: i32,
    pub mute: i32,
    pub solo: i32,
}

/// The `[Mixer]` section: a master strip plus one slave strip per track, and any
/// unrecognised keys preserved verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mixer {
    pub master_feder: i32,
    pub master_panpot: i32,
    pub master_mute: i32,
    pub output_mode: i32,
    pub slaves: Vec<MixerSlave>,
    pub extra: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mixer_has_no_slaves() {
        let mixer = Mixer::default();
        assert!(mixer.slaves.is_empty());
        assert!(mixer.extra.is_empty());
    }
}
