use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::aggregate::UtteranceDurations;
use super::vocab::build_vocab;
use crate::PrepError;

/// Read an `idx2data` file (`<id> <value>` per line), keeping file order.
///
/// Blank lines are skipped. A line without a value maps to an empty string.
pub fn load_idx2data_file(path: &Path) -> Result<Vec<(String, String)>, PrepError> {
    let content = fs::read_to_string(path)?;
    let rows = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(char::is_whitespace) {
            Some((id, value)) => (id.to_string(), value.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect();
    Ok(rows)
}

/// Format tokens as a Python list literal, e.g. `['HH', 'AH0', '<space>']`.
pub fn format_token_list(tokens: &[String]) -> String {
    let mut out = String::from("[");
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_python_str(&mut out, token);
    }
    out.push(']');
    out
}

/// Format durations as a Python float list literal, e.g. `[0.05, 0.1, 0.0]`.
///
/// Zero-length word-end `<space>` entries come out as `0.0` like any other
/// duration. Older metadata files carry a bare integer `0` there; readers
/// parse both the same way.
pub fn format_duration_list(durations: &[f64]) -> String {
    let mut out = String::from("[");
    for (i, duration) in durations.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&duration.to_string());
        if duration.is_finite() && duration.fract() == 0.0 {
            out.push_str(".0");
        }
    }
    out.push(']');
    out
}

fn push_python_str(out: &mut String, text: &str) {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

/// The durations of one subset, in subset-membership order.
#[derive(Debug)]
pub struct SubsetMetadata<'a> {
    pub name: String,
    pub utterances: Vec<(&'a str, &'a UtteranceDurations)>,
}

impl<'a> SubsetMetadata<'a> {
    /// Select the utterances listed in `subset_ids` from `index`.
    ///
    /// Ids missing from `index` (e.g. silence-only utterances) are skipped;
    /// repeated ids keep their first position.
    pub fn collect<I, S>(
        name: impl Into<String>,
        subset_ids: I,
        index: &'a HashMap<String, UtteranceDurations>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        let mut seen = HashSet::new();
        let mut utterances = Vec::new();
        let mut missing = 0usize;

        for id in subset_ids {
            let Some((key, durations)) = index.get_key_value(id.as_ref()) else {
                missing += 1;
                continue;
            };
            if seen.insert(key.as_str()) {
                utterances.push((key.as_str(), durations));
            }
        }

        if missing > 0 {
            log::warn!("{missing} utterance(s) of subset {name} have no durations, skipped");
        }

        Self { name, utterances }
    }

    pub fn vocab(&self) -> Vec<String> {
        build_vocab(self.utterances.iter().map(|(_, utt)| utt.tokens()))
    }

    /// Write `idx2text`, `idx2text_len`, `vocab` and `idx2duration` into
    /// `<save_path>/<subset>/{stress|no-stress}/`.
    ///
    /// Returns the directory the files were written to.
    pub fn write(&self, save_path: &Path, retain_stress: bool) -> Result<PathBuf, PrepError> {
        let subset_dir = subset_output_dir(save_path, &self.name, retain_stress);
        fs::create_dir_all(&subset_dir)?;

        let text_path = subset_dir.join("idx2text");
        write_rows(
            &text_path,
            self.utterances
                .iter()
                .map(|(id, utt)| format!("{id} {}", format_token_list(utt.tokens()))),
        )?;
        log::info!("Tokenized text has been successfully saved to {}.", text_path.display());

        let text_len_path = subset_dir.join("idx2text_len");
        write_rows(
            &text_len_path,
            self.utterances
                .iter()
                .map(|(id, utt)| format!("{id} {}", utt.len())),
        )?;
        log::info!(
            "The length of tokenized text has been successfully saved to {}.",
            text_len_path.display()
        );

        let vocab_path = subset_dir.join("vocab");
        write_rows(&vocab_path, self.vocab().into_iter())?;
        log::info!("Phoneme vocabulary has been successfully saved to {}.", vocab_path.display());

        let duration_path = subset_dir.join("idx2duration");
        write_rows(
            &duration_path,
            self.utterances
                .iter()
                .map(|(id, utt)| format!("{id} {}", format_duration_list(utt.durations()))),
        )?;
        log::info!(
            "The duration of tokenized text has been successfully saved to {}.",
            duration_path.display()
        );

        Ok(subset_dir)
    }
}

pub fn subset_output_dir(save_path: &Path, subset_name: &str, retain_stress: bool) -> PathBuf {
    save_path
        .join(subset_name)
        .join(if retain_stress { "stress" } else { "no-stress" })
}

fn write_rows<I>(path: &Path, rows: I) -> Result<(), PrepError>
where
    I: Iterator<Item = String>,
{
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(())
}
