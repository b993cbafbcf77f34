//! `Common`: a track's `[Common]` section, grounded on
//! `original_source/src/Common.cpp`'s field defaults.

/// How a track's dynamics curve is interpreted by the synthesiser.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DynamicsMode {
    Standard,
    Expert,
}

/// How a track is routed during playback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayMode {
    PlayAfterSynth,
    PlayWithSynth,
    Off,
}

/// The `[Common]` section of a track: name, engine version, colour, and playback mode.
#[derive(Clone, Debug, PartialEq)]
pub struct Common {
    pub name: String,
    pub version: String,
    pub color: String,
    pub dynamics_mode: DynamicsMode,
    pub play_mode: PlayMode,
    pub last_play_mode: PlayMode,
}

impl Default for Common {
    fn default() -> Self {
        Self {
            name: "Miku".to_string(),
            version: "DSB301".to_string(),
            color: "179,181,123".to_string(),
            dynamics_mode: DynamicsMode::Expert,
            play_mode: PlayMode::PlayWithSynth,
            last_play_mode: PlayMode::PlayWithSynth,
        }
    }
}

/// The synthesiser engine version family a track's curve set depends on (§3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineVersion {
    Baseline,
    Dsb2,
    Dsb3,
}

impl Common {
    /// Classifies `self.version` into the curve-set family it implies.
    pub fn engine_version(&self) -> EngineVersion {
        if self.version.starts_with("DSB3") {
            EngineVersion::Dsb3
        } else if self.version.starts_with("DSB2") {
            EngineVersion::Dsb2
        } else {
            EngineVersion::Baseline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_common_defaults() {
        let common = Common::default();
        assert_eq!("Miku", common.name);
        assert_eq!("DSB301", common.version);
        assert_eq!("179,181,123", common.color);
        assert_eq!(DynamicsMode::Expert, common.dynamics_mode);
        assert_eq!(PlayMode::PlayWithSynth, common.play_mode);
    }

    #[test]
    fn engine_version_is_classified_from_version_string() {
        let mut common = Common::default();
        assert_eq!(EngineVersion::Dsb3, common.engine_version());
        common.version = "DSB200".to_string();
        assert_eq!(EngineVersion::Dsb2, common.engine_version());
        common.version = "DSB100".to_string();
        assert_eq!(EngineVersion::Baseline, common.engine_version());
    }
}
