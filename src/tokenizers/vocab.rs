use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::duration::{BLANK_TOKEN, SOS_EOS_TOKEN, UNK_TOKEN};
use crate::PrepError;

/// File name of the vocabulary backup written next to an experiment.
pub const TOKEN_VOCAB_FILE: &str = "token_vocab";

/// A token vocabulary with the reserved indices every tokenizer needs.
#[derive(Debug, Clone)]
pub struct TokenVocab {
    path: PathBuf,
    idx2token: Vec<String>,
    token2idx: HashMap<String, i64>,
    /// Tokens in first-appearance order, without duplicates.
    ordered: Vec<String>,
    pub sos_eos_idx: i64,
    /// Index of `<blank>`: CTC blank, or the ignored label of
    /// encoder-decoder models.
    pub ignore_idx: i64,
    pub unk_idx: i64,
}

impl TokenVocab {
    /// Load a vocabulary file with one token per line (index = line number).
    ///
    /// When `copy_path` holds a `token_vocab` backup it is used instead of
    /// `token_vocab`. When `copy_path` is given, a backup is written there
    /// after loading.
    pub fn load(token_vocab: &Path, copy_path: Option<&Path>) -> Result<Self, PrepError> {
        let path = match copy_path {
            Some(dir) if dir.join(TOKEN_VOCAB_FILE).exists() => dir.join(TOKEN_VOCAB_FILE),
            _ => token_vocab.to_path_buf(),
        };

        let content = fs::read_to_string(&path)?;
        let tokens = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string);
        let vocab = Self::from_tokens(path, tokens)?;
        log::info!(
            "Loaded {} tokens from {}",
            vocab.vocab_size(),
            vocab.path.display()
        );

        if let Some(dir) = copy_path {
            vocab.save(&dir.join(TOKEN_VOCAB_FILE))?;
        }
        Ok(vocab)
    }

    /// Build a vocabulary from tokens in index order.
    ///
    /// A repeated token keeps its first position in the backup order but maps
    /// to its last index.
    pub fn from_tokens<I>(path: impl Into<PathBuf>, tokens: I) -> Result<Self, PrepError>
    where
        I: IntoIterator<Item = String>,
    {
        let path = path.into();
        let idx2token: Vec<String> = tokens.into_iter().collect();

        let mut token2idx = HashMap::with_capacity(idx2token.len());
        let mut ordered = Vec::with_capacity(idx2token.len());
        for (idx, token) in idx2token.iter().enumerate() {
            if token2idx.insert(token.clone(), idx as i64).is_none() {
                ordered.push(token.clone());
            }
        }

        let lookup = |token: &str| {
            token2idx
                .get(token)
                .copied()
                .ok_or_else(|| PrepError::MissingReservedToken {
                    token: token.to_string(),
                    path: path.clone(),
                })
        };
        let sos_eos_idx = lookup(SOS_EOS_TOKEN)?;
        let ignore_idx = lookup(BLANK_TOKEN)?;
        let unk_idx = lookup(UNK_TOKEN)?;

        Ok(Self {
            path,
            idx2token,
            token2idx,
            ordered,
            sos_eos_idx,
            ignore_idx,
            unk_idx,
        })
    }

    /// Write the vocabulary, one token per line.
    pub fn save(&self, path: &Path) -> Result<(), PrepError> {
        let mut content = self.ordered.join("\n");
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Path the vocabulary was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct tokens.
    pub fn vocab_size(&self) -> usize {
        self.token2idx.len()
    }

    pub fn index_of(&self, token: &str) -> Option<i64> {
        self.token2idx.get(token).copied()
    }

    /// Index of `token`, or the `<unk>` index for unknown tokens.
    pub fn index_or_unk(&self, token: &str) -> i64 {
        self.index_of(token).unwrap_or(self.unk_idx)
    }

    pub fn token(&self, idx: i64) -> Option<&str> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.idx2token.get(i))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_reserved_indices() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let path = dir.join("vocab");
        fs::write(&path, "<blank>\n<space>\nAH0\n\nN\n<unk>\n<sos/eos>\n").unwrap();

        let vocab = TokenVocab::load(&path, None).unwrap();
        assert_eq!(vocab.ignore_idx, 0);
        assert_eq!(vocab.unk_idx, 4);
        assert_eq!(vocab.sos_eos_idx, 5);
        assert_eq!(vocab.vocab_size(), 6);
        assert_eq!(vocab.token(2), Some("AH0"));
        assert_eq!(vocab.token(6), None);
        assert_eq!(vocab.token(-1), None);
        assert_eq!(vocab.index_or_unk("ZH"), 4);
    }

    #[test]
    fn missing_reserved_token_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let path = dir.join("vocab");
        fs::write(&path, "<blank>\nAH0\n<unk>\n").unwrap();

        match TokenVocab::load(&path, None) {
            Err(PrepError::MissingReservedToken { token, .. }) => assert_eq!(token, "<sos/eos>"),
            other => panic!("expected MissingReservedToken, got {other:?}"),
        }
    }

    #[test]
    fn prefers_backup_and_writes_it() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let original = dir.join("vocab");
        fs::write(&original, "<blank>\nA\nA\n<unk>\n<sos/eos>\n").unwrap();
        let exp = dir.join("exp");
        fs::create_dir_all(&exp).unwrap();

        let first = TokenVocab::load(&original, Some(&exp)).unwrap();
        assert_eq!(first.path(), original.as_path());
        assert_eq!(first.index_of("A"), Some(2));
        assert_eq!(first.vocab_size(), 4);

        let backup = exp.join(TOKEN_VOCAB_FILE);
        assert_eq!(
            fs::read_to_string(&backup).unwrap(),
            "<blank>\nA\n<unk>\n<sos/eos>\n"
        );

        let second = TokenVocab::load(&original, Some(&exp)).unwrap();
        assert_eq!(second.path(), backup.as_path());
        assert_eq!(second.unk_idx, 2);
    }
}
