//! The narrow external-collaborator interface for Shift_JIS ↔ UTF-8 translation
//! (§6). String-encoding tables are explicitly out of scope for this crate; callers
//! that need real Shift_JIS round-tripping supply their own `TextCodec` impl.

/// Converts between the crate's internal UTF-8 strings and the bytes a VOCALOID
/// meta-text stream actually carries.
pub trait TextCodec {
    fn to_shift_jis(&self, utf8: &str) -> Vec<u8>;
    fn to_utf8(&self, bytes: &[u8]) -> String;
}

/// An ASCII/UTF-8 passthrough codec. Round-trips any text that happens to be valid
/// UTF-8 (in particular all-ASCII text); does not perform real Shift_JIS translation.
/// Used by default, and by every round-trip test in this crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl TextCodec for Identity {
    fn to_shift_jis(&self, utf8: &str) -> Vec<u8> {
        utf8.as_bytes().to_vec()
    }

    fn to_utf8(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_codec_round_trips_ascii() {
        let codec = Identity;
        let bytes = codec.to_shift_jis("Master Track");
        assert_eq!("Master Track", codec.to_utf8(&bytes));
    }
}
