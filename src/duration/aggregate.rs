use std::collections::HashMap;
use std::path::Path;

use super::textgrid::{Interval, TextGrid};
use crate::PrepError;

/// Token inserted for pauses and word gaps.
pub const SPACE_TOKEN: &str = "<space>";
/// Token that spoken-noise phones (`spn`) are mapped to.
pub const UNK_TOKEN: &str = "<unk>";

const SPOKEN_NOISE_MARK: &str = "spn";

/// Phoneme and word marks that denote non-speech.
pub fn is_silence_mark(mark: &str) -> bool {
    matches!(mark, "sp" | "" | "sil")
}

/// Round to 2 decimal places.
///
/// Rounds the exact binary value, so `0.175` (stored just below it) gives
/// `0.17`. Scaling by 100 first would land on a tie and round up.
pub fn round2(seconds: f64) -> f64 {
    format!("{seconds:.2}").parse().unwrap_or(seconds)
}

/// Value in integer centiseconds, after [`round2`].
pub fn centiseconds(seconds: f64) -> i64 {
    (round2(seconds) * 100.0).round() as i64
}

/// Token and duration sequences of one utterance.
///
/// Both sequences only grow through the methods below, so they always have
/// the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtteranceDurations {
    tokens: Vec<String>,
    durations: Vec<f64>,
}

impl UtteranceDurations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Durations in seconds, index-aligned with [`tokens`](Self::tokens).
    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn push(&mut self, token: impl Into<String>, duration: f64) {
        self.tokens.push(token.into());
        self.durations.push(duration);
    }

    /// Record a silence interval, folding it into a trailing `<space>`.
    fn push_silence(&mut self, duration: f64) {
        match (self.tokens.last(), self.durations.last_mut()) {
            (Some(last), Some(total)) if last == SPACE_TOKEN => {
                *total = round2(*total + duration);
            }
            _ => self.push(SPACE_TOKEN, duration),
        }
    }

    /// True when the utterance holds nothing but a single pause.
    pub fn is_silence_only(&self) -> bool {
        self.tokens.len() == 1 && self.tokens[0] == SPACE_TOKEN
    }
}

/// Map of rounded word end times to whether the word carries speech.
#[derive(Debug, Clone, Default)]
pub struct WordBoundaries {
    ends: HashMap<i64, bool>,
}

impl WordBoundaries {
    pub fn from_words(words: &[Interval]) -> Self {
        let mut ends = HashMap::with_capacity(words.len());
        for word in words {
            ends.insert(centiseconds(word.max_time), !is_silence_mark(&word.mark));
        }
        Self { ends }
    }

    /// True if `time` (rounded to 2 decimals) ends a real word.
    pub fn is_word_end(&self, time: f64) -> bool {
        self.ends
            .get(&centiseconds(time))
            .copied()
            .unwrap_or(false)
    }
}

/// Phone token for a non-silence mark.
fn phone_token(mark: &str, retain_stress: bool) -> String {
    let stripped = match mark.chars().last() {
        Some(last) if !retain_stress && last.is_ascii_digit() => &mark[..mark.len() - 1],
        _ => mark,
    };
    if stripped == SPOKEN_NOISE_MARK {
        UNK_TOKEN.to_string()
    } else {
        stripped.to_string()
    }
}

/// Turn a word tier and a phone tier into token and duration sequences.
///
/// Returns `None` when the utterance contains no speech, i.e. the result is a
/// single `<space>`.
pub fn aggregate_durations(
    words: &[Interval],
    phones: &[Interval],
    retain_stress: bool,
) -> Option<UtteranceDurations> {
    let boundaries = WordBoundaries::from_words(words);
    let mut utterance = UtteranceDurations::new();

    for phone in phones {
        let duration = round2(phone.max_time - phone.min_time);

        if is_silence_mark(&phone.mark) {
            utterance.push_silence(duration);
        } else {
            // repeated phones stay separate tokens
            utterance.push(phone_token(&phone.mark, retain_stress), duration);
        }

        if boundaries.is_word_end(phone.max_time) {
            utterance.push(SPACE_TOKEN, 0.0);
        }
    }

    if utterance.is_silence_only() {
        None
    } else {
        Some(utterance)
    }
}

/// Utterance id of an alignment file: its file name up to the first `.`.
pub fn utterance_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.split('.').next().map(str::to_string)
}

/// Load one TextGrid and aggregate it.
///
/// Returns the utterance id together with the durations, or `None` for the
/// durations when the utterance is silence-only.
pub fn durations_from_file(
    path: &Path,
    retain_stress: bool,
) -> Result<(String, Option<UtteranceDurations>), PrepError> {
    let id = utterance_id(path).ok_or_else(|| PrepError::TextGrid {
        path: path.to_path_buf(),
        message: "file name is not valid UTF-8".to_string(),
    })?;

    let grid = TextGrid::from_file(path)?;
    let (words, phones) = match (grid.word_tier(), grid.phone_tier()) {
        (Some(words), Some(phones)) => (words, phones),
        _ => {
            return Err(PrepError::MissingTier {
                path: path.to_path_buf(),
                found: grid.tiers.len(),
            })
        }
    };

    let durations = aggregate_durations(&words.intervals, &phones.intervals, retain_stress);
    if durations.is_none() {
        log::warn!("Dropping silence-only utterance {id} ({})", path.display());
    }
    Ok((id, durations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(min: f64, max: f64, mark: &str) -> Interval {
        Interval::new(min, max, mark)
    }

    fn tokens(utt: &UtteranceDurations) -> Vec<&str> {
        utt.tokens().iter().map(String::as_str).collect()
    }

    #[test]
    fn merges_consecutive_silences() {
        let words = vec![iv(0.0, 0.35, ""), iv(0.35, 0.6, "a")];
        let phones = vec![
            iv(0.0, 0.10, "sil"),
            iv(0.10, 0.30, "sp"),
            iv(0.30, 0.35, ""),
            iv(0.35, 0.6, "AH0"),
        ];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["<space>", "AH0", "<space>"]);
        assert_eq!(utt.durations(), &[0.35, 0.25, 0.0]);
    }

    #[test]
    fn does_not_merge_silence_across_phones() {
        let words = vec![iv(0.0, 1.0, "")];
        let phones = vec![
            iv(0.0, 0.2, "sil"),
            iv(0.2, 0.5, "N"),
            iv(0.5, 1.0, "sp"),
        ];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["<space>", "N", "<space>"]);
        assert_eq!(utt.durations(), &[0.2, 0.3, 0.5]);
    }

    #[test]
    fn keeps_repeated_phones() {
        let words = vec![iv(0.0, 0.3, "")];
        let phones = vec![iv(0.0, 0.1, "n"), iv(0.1, 0.2, "n")];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["n", "n"]);
        assert_eq!(utt.durations(), &[0.1, 0.1]);
    }

    #[test]
    fn strips_stress_only_when_asked() {
        let words = vec![iv(0.0, 1.0, "")];
        let phones = vec![iv(0.0, 0.1, "AE1"), iv(0.1, 0.2, "T")];

        let stripped = aggregate_durations(&words, &phones, false).unwrap();
        assert_eq!(tokens(&stripped), vec!["AE", "T"]);

        let kept = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&kept), vec!["AE1", "T"]);
    }

    #[test]
    fn maps_spoken_noise_to_unk() {
        let words = vec![iv(0.0, 1.0, "")];
        let phones = vec![iv(0.0, 0.4, "spn")];
        for retain_stress in [true, false] {
            let utt = aggregate_durations(&words, &phones, retain_stress).unwrap();
            assert_eq!(tokens(&utt), vec!["<unk>"]);
        }
    }

    #[test]
    fn word_end_space_absorbs_following_pause() {
        let words = vec![iv(0.0, 0.3, "hi"), iv(0.3, 0.5, "")];
        let phones = vec![
            iv(0.0, 0.1, "HH"),
            iv(0.1, 0.3, "AY1"),
            iv(0.3, 0.5, "sil"),
        ];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        // the pause after the word folds into the word-end space
        assert_eq!(tokens(&utt), vec!["HH", "AY1", "<space>"]);
        assert_eq!(utt.durations(), &[0.1, 0.2, 0.2]);
    }

    #[test]
    fn word_end_space_is_fresh_after_a_pause() {
        // a silent phone inside a word that ends the word
        let words = vec![iv(0.0, 0.5, "uh")];
        let phones = vec![iv(0.0, 0.3, "AH0"), iv(0.3, 0.5, "sp")];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["AH0", "<space>", "<space>"]);
        assert_eq!(utt.durations(), &[0.3, 0.2, 0.0]);
    }

    #[test]
    fn silent_word_end_adds_nothing() {
        let words = vec![iv(0.0, 0.4, "sil")];
        let phones = vec![iv(0.0, 0.2, "sil"), iv(0.2, 0.4, "sil")];
        // only a single pause remains, so the utterance is dropped
        assert!(aggregate_durations(&words, &phones, true).is_none());
    }

    #[test]
    fn boundary_matching_uses_rounded_times() {
        let words = vec![iv(0.0, 0.304, "a")];
        let phones = vec![iv(0.0, 0.3, "AH0")];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["AH0", "<space>"]);
    }

    #[test]
    fn later_words_override_shared_end_times() {
        let words = vec![iv(0.0, 0.2, "a"), iv(0.2, 0.2, "")];
        let phones = vec![iv(0.0, 0.2, "AH0")];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["AH0"]);
    }

    #[test]
    fn sequences_stay_aligned() {
        let words = vec![iv(0.0, 0.2, ""), iv(0.2, 0.6, "cat"), iv(0.6, 0.9, "")];
        let phones = vec![
            iv(0.0, 0.2, "sil"),
            iv(0.2, 0.3, "K"),
            iv(0.3, 0.5, "AE1"),
            iv(0.5, 0.6, "T"),
            iv(0.6, 0.7, "sp"),
            iv(0.7, 0.9, "sil"),
        ];
        let utt = aggregate_durations(&words, &phones, false).unwrap();
        assert_eq!(utt.tokens().len(), utt.durations().len());
        assert_eq!(tokens(&utt), vec!["<space>", "K", "AE", "T", "<space>"]);
        assert_eq!(utt.durations(), &[0.2, 0.1, 0.2, 0.1, 0.3]);
    }

    #[test]
    fn rounds_the_stored_value() {
        assert_eq!(centiseconds(0.125), 12);
        assert_eq!(centiseconds(0.135), 14);
        assert_eq!(round2(0.175), 0.17);
        assert_eq!(centiseconds(0.175), 17);
        assert_eq!(round2(0.3 - 0.1), 0.2);
    }

    #[test]
    fn durations_round_below_a_scaled_tie() {
        let words = vec![iv(0.0, 1.0, "")];
        let phones = vec![iv(0.0, 0.175, "AH0"), iv(0.175, 0.18, "T")];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(utt.durations(), &[0.17, 0.01]);
    }

    #[test]
    fn word_end_matches_phone_end_after_rounding() {
        let words = vec![iv(0.0, 0.175, "a")];
        let phones = vec![iv(0.0, 0.17, "AH0")];
        let utt = aggregate_durations(&words, &phones, true).unwrap();
        assert_eq!(tokens(&utt), vec!["AH0", "<space>"]);
        assert_eq!(utt.durations(), &[0.17, 0.0]);
    }

    #[test]
    fn utterance_id_stops_at_first_dot() {
        let id = utterance_id(Path::new("/data/TextGrid/train/103_1241_000000.normalized.TextGrid"));
        assert_eq!(id.as_deref(), Some("103_1241_000000"));
    }
}
