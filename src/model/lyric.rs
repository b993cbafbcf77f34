//! `Lyric`: a grapheme paired with a phoneme list and per-phoneme consonant adjustment.

use crate::error::LibResult;

/// One lyric entry: `phrase` is the on-screen text (e.g. kana or a romanised syllable),
/// `phonetic_symbols` is the ordered phoneme breakdown, and `consonant_adjustment`
/// carries one adjustment value per phoneme.
#[derive(Clone, Debug, PartialEq)]
pub struct Lyric {
    pub phrase: String,
    pub phonetic_symbols: Vec<String>,
    pub consonant_adjustment: Vec<i32>,
    pub is_protected: bool,
}

impl Lyric {
    pub fn new(
        phrase: impl Into<String>,
        phonetic_symbols: Vec<String>,
    ) -> LibResult<Self> {
        let consonant_adjustment = vec![0; phonetic_symbols.len()];
        Ok(Self {
            phrase: phrase.into(),
            phonetic_symbols,
            consonant_adjustment,
            is_protected: false,
        })
    }

    /// True when `phonetic_symbols.len() == consonant_adjustment.len()`, the
    /// invariant required before serialising an `L#=` line.
    pub fn is_consistent(&self) -> bool {
        self.phonetic_symbols.len() == self.consonant_adjustment.len()
    }
}
