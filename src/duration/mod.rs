//! Phoneme durations from Montreal Forced Aligner TextGrids.
//!
//! Each TextGrid holds a word tier followed by a phone tier. Every phone
//! becomes one token with its duration in seconds; pauses (`sil`, `sp` or an
//! empty mark) collapse into a single `<space>` token and the end of every
//! spoken word adds a zero-length `<space>`.
//!
//! # Directory Layout
//!
//! ```text
//! <data_path>/
//! ├── wav/<subset>/idx2wav                     # subset membership
//! └── mfa/<model>/
//!     ├── TextGrid/<subset>/**/<id>.TextGrid   # input
//!     └── <subset>/{stress,no-stress}/         # output (default save path)
//!         ├── idx2text
//!         ├── idx2text_len
//!         ├── idx2duration
//!         └── vocab
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use speech_prep::duration::{Dataset, DurationJob, DurationJobConfigBuilder};
//!
//! let config = DurationJobConfigBuilder::default()
//!     .data_path("datasets/libritts/data")
//!     .pretrained_model_name("librispeech_train-clean-100")
//!     .dataset(Dataset::LibriTts)
//!     .build()?;
//!
//! let report = DurationJob::new(config).run()?;
//! println!("{} utterances written", report.utterances);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregate;
pub mod job;
pub mod metadata;
pub mod textgrid;
pub mod vocab;

pub use aggregate::{aggregate_durations, UtteranceDurations, SPACE_TOKEN, UNK_TOKEN};
pub use job::{
    calculate_durations, Dataset, DirectorySubsets, DurationIndex, DurationJob, DurationJobConfig,
    DurationJobConfigBuilder, JobReport, SubsetSource,
};
pub use metadata::SubsetMetadata;
pub use self::textgrid::{Interval, TextGrid, Tier};
pub use vocab::{build_vocab, BLANK_TOKEN, SOS_EOS_TOKEN};
