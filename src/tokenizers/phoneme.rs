use std::path::Path;

use ndarray::Array1;

use super::vocab::TokenVocab;
use crate::{EncodeOptions, PrepError, Tokenizer};

/// Tokenizer over phoneme vocabularies written by the duration calculator.
///
/// Input text is a whitespace-separated phoneme string such as
/// `"HH AH0 L OW1 <space> W ER1 L D"`.
#[derive(Debug, Clone)]
pub struct PhonemeTokenizer {
    vocab: TokenVocab,
}

impl PhonemeTokenizer {
    pub fn new(vocab: TokenVocab) -> Self {
        Self { vocab }
    }

    pub fn from_file(token_vocab: &Path, copy_path: Option<&Path>) -> Result<Self, PrepError> {
        Ok(Self::new(TokenVocab::load(token_vocab, copy_path)?))
    }
}

impl Tokenizer for PhonemeTokenizer {
    fn vocab(&self) -> &TokenVocab {
        &self.vocab
    }

    fn text_to_tensor(&self, text: &str, options: EncodeOptions) -> Result<Array1<i64>, PrepError> {
        let mut ids = Vec::new();
        if !options.no_sos {
            ids.push(self.vocab.sos_eos_idx);
        }
        ids.extend(
            text.split_whitespace()
                .map(|phone| self.vocab.index_or_unk(phone)),
        );
        if !options.no_eos {
            ids.push(self.vocab.sos_eos_idx);
        }
        Ok(Array1::from(ids))
    }

    /// Space-separated phonemes; `<space>` is kept so word gaps stay
    /// visible and `<unk>` is rendered as `*`.
    fn tensor_to_text(&self, tensor: &Array1<i64>) -> Result<String, PrepError> {
        let mut phones = Vec::with_capacity(tensor.len());
        for &idx in tensor.iter() {
            if idx == self.vocab.sos_eos_idx {
                continue;
            }
            if idx == self.vocab.unk_idx {
                phones.push("*");
                continue;
            }
            let token = self
                .vocab
                .token(idx)
                .ok_or(PrepError::UnknownTokenIndex(idx))?;
            phones.push(token);
        }
        Ok(phones.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::SPACE_TOKEN;
    use ndarray::array;

    fn tokenizer() -> PhonemeTokenizer {
        let tokens = ["<blank>", SPACE_TOKEN, "HH", "AY1", "<unk>", "<sos/eos>"];
        let vocab =
            TokenVocab::from_tokens("vocab", tokens.iter().map(|t| t.to_string())).unwrap();
        PhonemeTokenizer::new(vocab)
    }

    #[test]
    fn encodes_with_sos_eos_by_default() {
        let tok = tokenizer();
        let ids = tok
            .text_to_tensor("HH AY1 <space> ZH", EncodeOptions::default())
            .unwrap();
        assert_eq!(ids, array![5i64, 2, 3, 1, 4, 5]);
    }

    #[test]
    fn encode_options_drop_sos_and_eos() {
        let tok = tokenizer();
        let no_sos = EncodeOptions {
            no_sos: true,
            no_eos: false,
        };
        assert_eq!(tok.text_to_tensor("HH", no_sos).unwrap(), array![2i64, 5]);

        let bare = EncodeOptions {
            no_sos: true,
            no_eos: true,
        };
        assert_eq!(tok.text_to_tensor("  HH  ", bare).unwrap(), array![2i64]);
    }

    #[test]
    fn decodes_to_space_separated_phones() {
        let tok = tokenizer();
        let text = tok.tensor_to_text(&array![5i64, 2, 3, 1, 4, 5]).unwrap();
        assert_eq!(text, "HH AY1 <space> *");
    }

    #[test]
    fn rejects_indices_outside_the_vocab() {
        let tok = tokenizer();
        assert!(matches!(
            tok.tensor_to_text(&array![2i64, 42]),
            Err(PrepError::UnknownTokenIndex(42))
        ));
    }
}
