//! # speech-prep
//!
//! Data preparation for speech synthesis and recognition models.
//!
//! ## Features
//!
//! - **Phoneme durations**: turn Montreal Forced Aligner TextGrids into
//!   per-utterance phoneme sequences, durations and subset vocabularies
//! - **Tokenizers**: map between transcripts and token index tensors using
//!   those vocabularies
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! speech-prep = { version = "2026.2" }
//! ```
//!
//! ```ignore
//! use std::path::Path;
//! use speech_prep::{tokenizers::PhonemeTokenizer, EncodeOptions, Tokenizer};
//!
//! let tokenizer = PhonemeTokenizer::from_file(
//!     Path::new("data/mfa/english_mfa/train/stress/vocab"),
//!     None,
//! )?;
//! let ids = tokenizer.text_to_tensor("HH AH0 L OW1", EncodeOptions::default())?;
//! println!("{}", tokenizer.tensor_to_text(&ids)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod duration;
mod error;
pub mod tokenizers;

pub use error::PrepError;

use ndarray::Array1;

use tokenizers::TokenVocab;

/// Options for [`Tokenizer::text_to_tensor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Do not prepend `<sos/eos>`.
    pub no_sos: bool,
    /// Do not append `<sos/eos>`.
    pub no_eos: bool,
}

/// Common interface for converting text to token index tensors and back.
pub trait Tokenizer {
    /// The vocabulary with the reserved `<sos/eos>`, `<blank>` and `<unk>` indices.
    fn vocab(&self) -> &TokenVocab;

    /// Encode a text string. `<sos/eos>` is attached at both ends unless
    /// disabled by `options`.
    fn text_to_tensor(&self, text: &str, options: EncodeOptions) -> Result<Array1<i64>, PrepError>;

    /// Decode a tensor of token indices into a string.
    ///
    /// Default implementation concatenates the tokens, skips `<sos/eos>` and
    /// writes `*` for `<unk>`. Override it when tokens need separators or a
    /// third-party decoder.
    fn tensor_to_text(&self, tensor: &Array1<i64>) -> Result<String, PrepError> {
        let vocab = self.vocab();
        let mut text = String::new();
        for &idx in tensor.iter() {
            if idx == vocab.sos_eos_idx {
                continue;
            }
            if idx == vocab.unk_idx {
                text.push('*');
                continue;
            }
            let token = vocab.token(idx).ok_or(PrepError::UnknownTokenIndex(idx))?;
            text.push_str(token);
        }
        Ok(text)
    }

    /// Number of distinct tokens.
    fn vocab_size(&self) -> usize {
        self.vocab().vocab_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct CharTokenizer {
        vocab: TokenVocab,
    }

    impl Tokenizer for CharTokenizer {
        fn vocab(&self) -> &TokenVocab {
            &self.vocab
        }

        fn text_to_tensor(
            &self,
            text: &str,
            options: EncodeOptions,
        ) -> Result<Array1<i64>, PrepError> {
            let mut ids: Vec<i64> = text
                .chars()
                .map(|c| self.vocab.index_or_unk(&c.to_string()))
                .collect();
            if !options.no_sos {
                ids.insert(0, self.vocab.sos_eos_idx);
            }
            if !options.no_eos {
                ids.push(self.vocab.sos_eos_idx);
            }
            Ok(Array1::from(ids))
        }
    }

    fn char_tokenizer() -> CharTokenizer {
        let tokens = ["<blank>", "a", "b", "<unk>", "<sos/eos>"];
        let vocab = TokenVocab::from_tokens("vocab", tokens.iter().map(|t| t.to_string())).unwrap();
        CharTokenizer { vocab }
    }

    #[test]
    fn default_decode_concatenates_and_masks_unknown() {
        let tok = char_tokenizer();
        let ids = tok.text_to_tensor("abz", EncodeOptions::default()).unwrap();
        assert_eq!(ids, array![4i64, 1, 2, 3, 4]);
        assert_eq!(tok.tensor_to_text(&ids).unwrap(), "ab*");
        assert_eq!(tok.vocab_size(), 5);
    }

    #[test]
    fn default_decode_rejects_out_of_range_indices() {
        let tok = char_tokenizer();
        assert!(matches!(
            tok.tensor_to_text(&array![1i64, 9]),
            Err(PrepError::UnknownTokenIndex(9))
        ));
    }
}
