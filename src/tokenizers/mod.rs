//! Tokenizers built on vocabulary files.
//!
//! A vocabulary file lists one token per line; the line number is the token
//! index. Every vocabulary must contain `<blank>`, `<unk>` and `<sos/eos>`,
//! which is what the duration calculator writes:
//!
//! ```text
//! <blank>
//! <space>
//! AH0
//! ...
//! <unk>
//! <sos/eos>
//! ```

pub mod phoneme;
pub mod vocab;

pub use phoneme::PhonemeTokenizer;
pub use vocab::{TokenVocab, TOKEN_VOCAB_FILE};
