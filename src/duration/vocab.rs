use std::collections::HashMap;

use super::aggregate::UNK_TOKEN;

/// Index 0 of every vocabulary; CTC blank and ignore index.
pub const BLANK_TOKEN: &str = "<blank>";
/// Last vocabulary entry, shared start/end token of autoregressive models.
pub const SOS_EOS_TOKEN: &str = "<sos/eos>";

/// Count tokens, keeping the order in which each token first appeared.
pub fn count_tokens<'a, I>(sequences: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for sequence in sequences {
        for token in sequence {
            match positions.get(token) {
                Some(&pos) => counts[pos].1 += 1,
                None => {
                    positions.insert(token.clone(), counts.len());
                    counts.push((token.clone(), 1));
                }
            }
        }
    }

    counts
}

/// Build a phoneme vocabulary from the token sequences of one subset.
///
/// Layout: `<blank>`, tokens by descending frequency (ties in order of first
/// appearance), `<unk>`, `<sos/eos>`.
pub fn build_vocab<'a, I>(sequences: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut ranked = count_tokens(sequences);
    // stable, so equal counts keep first-appearance order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut vocab = Vec::with_capacity(ranked.len() + 3);
    vocab.push(BLANK_TOKEN.to_string());
    vocab.extend(
        ranked
            .into_iter()
            .map(|(token, _)| token)
            .filter(|token| !matches!(token.as_str(), BLANK_TOKEN | UNK_TOKEN | SOS_EOS_TOKEN)),
    );
    vocab.push(UNK_TOKEN.to_string());
    vocab.push(SOS_EOS_TOKEN.to_string());
    vocab
}
