use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::aggregate::{durations_from_file, UtteranceDurations};
use super::metadata::{load_idx2data_file, SubsetMetadata};
use crate::PrepError;

/// Extension of the alignment files written by Montreal Forced Aligner.
pub const TEXTGRID_EXTENSION: &str = ".TextGrid";

/// Utterance id → token and duration sequences.
pub type DurationIndex = HashMap<String, UtteranceDurations>;

/// Datasets whose MFA output layout this job understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    LjSpeech,
    LibriTts,
    LibriSpeech,
}

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::LjSpeech => "ljspeech",
            Dataset::LibriTts => "libritts",
            Dataset::LibriSpeech => "librispeech",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ljspeech" => Ok(Dataset::LjSpeech),
            "libritts" => Ok(Dataset::LibriTts),
            "librispeech" => Ok(Dataset::LibriSpeech),
            other => Err(PrepError::UnknownDataset(other.to_string())),
        }
    }
}

/// Settings of one duration-calculation run.
///
/// ```rust,no_run
/// use speech_prep::duration::{Dataset, DurationJobConfigBuilder};
///
/// let config = DurationJobConfigBuilder::default()
///     .data_path("datasets/libritts/data")
///     .pretrained_model_name("librispeech_train-clean-100")
///     .dataset(Dataset::LibriTts)
///     .retain_stress(false)
///     .build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DurationJobConfig {
    /// Root of the dumped dataset (contains `wav/` and `mfa/`).
    pub data_path: PathBuf,
    /// Name of the MFA model used to produce the TextGrids.
    pub pretrained_model_name: String,
    #[serde(rename = "dataset_name")]
    pub dataset: Dataset,
    /// Output root. Defaults to `<data_path>/mfa/<pretrained_model_name>`.
    #[builder(default)]
    #[serde(default)]
    pub save_path: Option<PathBuf>,
    /// Only process this subset. All subsets are processed when absent.
    #[builder(default)]
    #[serde(default)]
    pub subset_name: Option<String>,
    /// Keep the stress digit at the end of vowel phones.
    #[builder(default = "true")]
    #[serde(default = "default_retain_stress")]
    pub retain_stress: bool,
    /// Number of workers.
    #[builder(default = "8")]
    #[serde(default = "default_ncpu")]
    pub ncpu: usize,
}

fn default_retain_stress() -> bool {
    true
}

fn default_ncpu() -> usize {
    8
}

impl DurationJobConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.ncpu {
            return Err("ncpu must be at least 1".to_string());
        }
        if let Some(name) = &self.pretrained_model_name {
            if name.trim().is_empty() {
                return Err("pretrained_model_name must not be empty".to_string());
            }
        }
        Ok(())
    }
}

impl DurationJobConfig {
    /// Load a config from a JSON file using the CLI argument names as keys.
    pub fn from_json_file(path: &Path) -> Result<Self, PrepError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), PrepError> {
        if self.ncpu == 0 {
            return Err(PrepError::Config("ncpu must be at least 1".to_string()));
        }
        if self.pretrained_model_name.trim().is_empty() {
            return Err(PrepError::Config(
                "pretrained_model_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn mfa_dir(&self) -> PathBuf {
        self.data_path.join("mfa").join(&self.pretrained_model_name)
    }

    /// Directory searched for TextGrid files.
    pub fn textgrid_dir(&self) -> PathBuf {
        let root = self.mfa_dir().join("TextGrid");
        match &self.subset_name {
            Some(subset) => root.join(subset),
            None => root,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.save_path.clone().unwrap_or_else(|| self.mfa_dir())
    }

    /// Directory holding the per-subset `idx2wav` lists.
    pub fn dataset_dir(&self) -> PathBuf {
        self.data_path.join("wav")
    }
}

impl From<DurationJobConfigBuilderError> for PrepError {
    fn from(err: DurationJobConfigBuilderError) -> Self {
        PrepError::Config(err.to_string())
    }
}

/// Source of the subset names to dump when no subset is configured.
pub trait SubsetSource {
    fn subset_names(&self) -> Result<Vec<String>, PrepError>;
}

/// Subsets are the sub-directories of the TextGrid directory, sorted by name.
#[derive(Debug, Clone)]
pub struct DirectorySubsets {
    root: PathBuf,
}

impl DirectorySubsets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SubsetSource for DirectorySubsets {
    fn subset_names(&self) -> Result<Vec<String>, PrepError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// A fixed list of subset names.
impl SubsetSource for Vec<String> {
    fn subset_names(&self) -> Result<Vec<String>, PrepError> {
        Ok(self.clone())
    }
}

/// Recursively collect files under `root` whose names end with `suffix`,
/// sorted by path.
pub fn find_files(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, PrepError> {
    let mut found = Vec::new();
    if root.is_dir() {
        collect_files(root, suffix, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect_files(dir: &Path, suffix: &str, found: &mut Vec<PathBuf>) -> Result<(), PrepError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, suffix, found)?;
        } else if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Split `items` round-robin into `n` chunks: chunk `i` holds items
/// `i, i + n, i + 2n, ...`.
pub fn partition_round_robin<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    (0..n)
        .map(|offset| items.iter().skip(offset).step_by(n).cloned().collect())
        .collect()
}

/// Aggregate every file of one chunk.
pub fn process_chunk(files: &[PathBuf], retain_stress: bool) -> Result<DurationIndex, PrepError> {
    let mut index = DurationIndex::with_capacity(files.len());
    for file in files {
        let (id, durations) = durations_from_file(file, retain_stress)?;
        match durations {
            Some(durations) => {
                index.insert(id, durations);
            }
            None => {
                index.remove(&id);
            }
        }
    }
    log::debug!("Processed chunk of {} TextGrid file(s)", files.len());
    Ok(index)
}

#[cfg(feature = "parallel")]
fn run_chunks(
    chunks: Vec<Vec<PathBuf>>,
    retain_stress: bool,
) -> Result<Vec<DurationIndex>, PrepError> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(chunks.len())
        .build()
        .map_err(|e| PrepError::ThreadPool(e.to_string()))?;

    pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| process_chunk(chunk, retain_stress))
            .collect()
    })
}

#[cfg(not(feature = "parallel"))]
fn run_chunks(
    chunks: Vec<Vec<PathBuf>>,
    retain_stress: bool,
) -> Result<Vec<DurationIndex>, PrepError> {
    chunks
        .iter()
        .map(|chunk| process_chunk(chunk, retain_stress))
        .collect()
}

/// Aggregate all `files` using `ncpu` round-robin chunks and merge the
/// results in chunk order.
pub fn calculate_durations(
    files: &[PathBuf],
    retain_stress: bool,
    ncpu: usize,
) -> Result<DurationIndex, PrepError> {
    let chunks = partition_round_robin(files, ncpu);
    let results = run_chunks(chunks, retain_stress)?;

    let mut index = DurationIndex::with_capacity(files.len());
    for partial in results {
        index.extend(partial);
    }
    Ok(index)
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub textgrid_files: usize,
    pub utterances: usize,
    /// Directories the metadata files were written to, one per subset.
    pub subset_dirs: Vec<PathBuf>,
}

/// The duration calculator: TextGrids in, per-subset metadata out.
pub struct DurationJob<S = DirectorySubsets> {
    config: DurationJobConfig,
    subsets: S,
}

impl DurationJob<DirectorySubsets> {
    /// Job that discovers subsets from the TextGrid directory.
    pub fn new(config: DurationJobConfig) -> Self {
        let subsets = DirectorySubsets::new(config.textgrid_dir());
        Self { config, subsets }
    }
}

impl<S: SubsetSource> DurationJob<S> {
    pub fn with_subset_source(config: DurationJobConfig, subsets: S) -> Self {
        Self { config, subsets }
    }

    pub fn config(&self) -> &DurationJobConfig {
        &self.config
    }

    pub fn run(&self) -> Result<JobReport, PrepError> {
        let config = &self.config;
        let textgrid_dir = config.textgrid_dir();
        log::info!(
            "Start to summarize all the .TextGrid files in {} ({} dataset)",
            textgrid_dir.display(),
            config.dataset
        );

        let files = find_files(&textgrid_dir, TEXTGRID_EXTENSION)?;
        if files.is_empty() {
            return Err(PrepError::NoAlignmentFiles(textgrid_dir));
        }
        log::info!(
            "Found {} TextGrid file(s), using {} worker(s)",
            files.len(),
            config.ncpu
        );

        let index = calculate_durations(&files, config.retain_stress, config.ncpu)?;
        log::info!("Calculated durations of {} utterance(s)", index.len());

        let subset_names = match &config.subset_name {
            Some(name) => vec![name.clone()],
            None => self.subsets.subset_names()?,
        };

        let save_path = config.output_dir();
        let dataset_dir = config.dataset_dir();
        let mut subset_dirs = Vec::with_capacity(subset_names.len());
        for name in subset_names {
            let members = load_idx2data_file(&dataset_dir.join(&name).join("idx2wav"))?;
            let subset =
                SubsetMetadata::collect(name, members.iter().map(|(id, _)| id.as_str()), &index);
            subset_dirs.push(subset.write(&save_path, config.retain_stress)?);
        }

        Ok(JobReport {
            textgrid_files: files.len(),
            utterances: index.len(),
            subset_dirs,
        })
    }
}
