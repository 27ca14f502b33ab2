use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::PrepError;

/// A timed span of one tier with its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min_time: f64,
    pub max_time: f64,
    pub mark: String,
}

impl Interval {
    pub fn new(min_time: f64, max_time: f64, mark: impl Into<String>) -> Self {
        Self {
            min_time,
            max_time,
            mark: mark.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierKind {
    IntervalTier,
    /// Point tier; each point is stored as a zero-length interval.
    TextTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub kind: TierKind,
    pub intervals: Vec<Interval>,
}

/// A parsed Praat TextGrid.
///
/// Montreal Forced Aligner writes the word tier first and the phoneme tier
/// second; [`TextGrid::word_tier`] and [`TextGrid::phone_tier`] rely on that
/// order rather than on tier names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGrid {
    pub min_time: f64,
    pub max_time: f64,
    pub tiers: Vec<Tier>,
}

impl TextGrid {
    /// Read a TextGrid file with the `textgrid` crate.
    ///
    /// Files the crate rejects are retried with [`TextGrid::parse`]; the
    /// error reports both failures when that fails too.
    pub fn from_file(path: &Path) -> Result<Self, PrepError> {
        let crate_err = match textgrid::TextGrid::from_file(path) {
            Ok(grid) => return Ok(Self::from(grid)),
            Err(err) => err.to_string(),
        };
        log::debug!(
            "textgrid crate could not read {} ({crate_err}), using fallback parser",
            path.display()
        );

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|fallback_err| PrepError::TextGrid {
            path: path.to_path_buf(),
            message: format!("textgrid crate ({crate_err}) and fallback parser ({fallback_err})"),
        })
    }

    /// Parse TextGrid text.
    ///
    /// Both Praat text layouts reduce to the same stream of values once keys
    /// (`xmin =`, `intervals [3]:` ...) are dropped, so parsing works on that
    /// stream.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let values = tokenize(contents.trim_start_matches('\u{feff}'))?;
        let mut stream = ValueStream { values, pos: 0 };

        let file_type = stream.string("file type")?;
        if !file_type.starts_with("ooTextFile") {
            return Err(format!("unsupported file type {file_type:?}"));
        }
        let object_class = stream.string("object class")?;
        if object_class != "TextGrid" {
            return Err(format!("unsupported object class {object_class:?}"));
        }

        let min_time = stream.number("xmin")?;
        let max_time = stream.number("xmax")?;
        if !stream.flag("tiers?")? {
            return Ok(Self {
                min_time,
                max_time,
                tiers: Vec::new(),
            });
        }

        let tier_count = stream.count("size")?;
        let mut tiers = Vec::new();
        for _ in 0..tier_count {
            tiers.push(parse_tier(&mut stream)?);
        }

        Ok(Self {
            min_time,
            max_time,
            tiers,
        })
    }

    pub fn word_tier(&self) -> Option<&Tier> {
        self.tiers.first()
    }

    pub fn phone_tier(&self) -> Option<&Tier> {
        self.tiers.get(1)
    }
}

impl From<textgrid::TextGrid> for TextGrid {
    fn from(grid: textgrid::TextGrid) -> Self {
        let tiers = grid.tiers.into_iter().map(Tier::from).collect();
        Self {
            min_time: grid.xmin,
            max_time: grid.xmax,
            tiers,
        }
    }
}

impl From<textgrid::Tier> for Tier {
    /// Point tiers keep their kind but carry no intervals.
    fn from(tier: textgrid::Tier) -> Self {
        let kind = if tier.tier_type == textgrid::TierType::IntervalTier {
            TierKind::IntervalTier
        } else {
            TierKind::TextTier
        };
        let intervals = tier
            .intervals
            .into_iter()
            .map(|interval| Interval::new(interval.xmin, interval.xmax, interval.text.trim()))
            .collect();
        Self {
            name: tier.name,
            kind,
            intervals,
        }
    }
}

fn parse_tier(stream: &mut ValueStream) -> Result<Tier, String> {
    let class = stream.string("class")?;
    let kind = match class.as_str() {
        "IntervalTier" => TierKind::IntervalTier,
        "TextTier" => TierKind::TextTier,
        other => return Err(format!("unknown tier class {other:?}")),
    };
    let name = stream.string("name")?;
    let _ = stream.number("tier xmin")?;
    let _ = stream.number("tier xmax")?;
    let count = stream.count("intervals: size")?;

    let mut intervals = Vec::new();
    for _ in 0..count {
        let interval = match kind {
            TierKind::IntervalTier => {
                let min_time = stream.number("xmin")?;
                let max_time = stream.number("xmax")?;
                let mark = stream.string("text")?;
                Interval::new(min_time, max_time, mark.trim())
            }
            TierKind::TextTier => {
                let time = stream.number("number")?;
                let mark = stream.string("mark")?;
                Interval::new(time, time, mark.trim())
            }
        };
        intervals.push(interval);
    }

    Ok(Tier {
        name,
        kind,
        intervals,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Number(f64),
    Flag(bool),
}

struct ValueStream {
    values: Vec<Value>,
    pos: usize,
}

impl ValueStream {
    fn next(&mut self, what: &str) -> Result<Value, String> {
        let value = self
            .values
            .get(self.pos)
            .cloned()
            .ok_or_else(|| format!("unexpected end of file while reading {what}"))?;
        self.pos += 1;
        Ok(value)
    }

    fn string(&mut self, what: &str) -> Result<String, String> {
        match self.next(what)? {
            Value::Text(text) => Ok(text),
            other => Err(format!("expected a string for {what}, found {other:?}")),
        }
    }

    fn number(&mut self, what: &str) -> Result<f64, String> {
        match self.next(what)? {
            Value::Number(value) => Ok(value),
            other => Err(format!("expected a number for {what}, found {other:?}")),
        }
    }

    /// An item count. Every item takes at least one value, so a count larger
    /// than what is left of the file is rejected.
    fn count(&mut self, what: &str) -> Result<usize, String> {
        let value = self.number(what)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(format!("invalid {what} {value}"));
        }
        let remaining = self.values.len() - self.pos;
        if value > remaining as f64 {
            return Err(format!(
                "{what} {value} exceeds the {remaining} values left in the file"
            ));
        }
        Ok(value as usize)
    }

    fn flag(&mut self, what: &str) -> Result<bool, String> {
        match self.next(what)? {
            Value::Flag(flag) => Ok(flag),
            other => Err(format!("expected <exists> or <absent> for {what}, found {other:?}")),
        }
    }
}

/// Split TextGrid text into quoted strings, numbers and `<exists>` flags.
///
/// Bare words that are not numbers (keys, `=`, `[1]:` labels) are dropped.
fn tokenize(contents: &str) -> Result<Vec<Value>, String> {
    let mut values = Vec::new();
    let mut chars = contents.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => {
                        // "" is an escaped quote inside a string
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            text.push('"');
                        } else {
                            break;
                        }
                    }
                    Some(c) => text.push(c),
                    None => return Err("unterminated string".to_string()),
                }
            }
            values.push(Value::Text(text));
            continue;
        }

        if ch == '!' {
            for c in chars.by_ref() {
                if c == '\n' {
                    break;
                }
            }
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '"' {
                break;
            }
            word.push(c);
            chars.next();
        }

        match word.as_str() {
            "<exists>" => values.push(Value::Flag(true)),
            "<absent>" => values.push(Value::Flag(false)),
            _ => {
                if let Ok(number) = word.parse::<f64>() {
                    values.push(Value::Number(number));
                }
            }
        }
    }

    Ok(values)
}
