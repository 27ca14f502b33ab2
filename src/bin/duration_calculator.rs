use std::path::PathBuf;
use std::time::Instant;

use clap::builder::BoolishValueParser;
use clap::Parser;

use speech_prep::duration::{DurationJob, DurationJobConfig, DurationJobConfigBuilder};

/// Summarize MFA TextGrid files into phoneme duration and vocabulary metadata.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with the job settings. Command-line values take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// The path where you place the dumped data.
    #[arg(long, alias = "data_path", required_unless_present = "config")]
    data_path: Option<PathBuf>,

    /// The path to save the duration metadata files. [default: <data_path>/mfa/<pretrained_model_name>]
    #[arg(long, alias = "save_path")]
    save_path: Option<PathBuf>,

    /// The name of the pretrained model used to get the .TextGrid files.
    #[arg(long, alias = "pretrained_model_name", required_unless_present = "config")]
    pretrained_model_name: Option<String>,

    /// Whether to retain the stress indicators at the end of vowel phonemes.
    #[arg(long, alias = "retain_stress", value_parser = BoolishValueParser::new())]
    retain_stress: Option<bool>,

    /// The dataset to process: ljspeech, libritts or librispeech.
    #[arg(long, alias = "dataset_name", required_unless_present = "config")]
    dataset_name: Option<String>,

    /// The subset to process. All subsets are processed when omitted or "none".
    #[arg(long, alias = "subset_name")]
    subset_name: Option<String>,

    /// The number of workers used to calculate the phoneme durations. [default: 8]
    #[arg(long)]
    ncpu: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<DurationJobConfig, speech_prep::PrepError> {
        let mut builder = DurationJobConfigBuilder::default();
        if let Some(path) = &self.config {
            let base = DurationJobConfig::from_json_file(path)?;
            builder
                .data_path(base.data_path)
                .pretrained_model_name(base.pretrained_model_name)
                .dataset(base.dataset)
                .save_path(base.save_path)
                .subset_name(base.subset_name)
                .retain_stress(base.retain_stress)
                .ncpu(base.ncpu);
        }

        // unknown datasets fail before anything else happens
        if let Some(name) = &self.dataset_name {
            builder.dataset(name.parse::<speech_prep::duration::Dataset>()?);
        }
        if let Some(data_path) = self.data_path {
            builder.data_path(data_path);
        }
        if let Some(name) = self.pretrained_model_name {
            builder.pretrained_model_name(name);
        }
        if let Some(save_path) = self.save_path {
            builder.save_path(Some(save_path));
        }
        if let Some(subset) = self.subset_name {
            let subset = (!subset.eq_ignore_ascii_case("none")).then_some(subset);
            builder.subset_name(subset);
        }
        if let Some(retain_stress) = self.retain_stress {
            builder.retain_stress(retain_stress);
        }
        if let Some(ncpu) = self.ncpu {
            builder.ncpu(ncpu);
        }

        Ok(builder.build()?)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config()?;
    log::debug!("Job configuration: {}", serde_json::to_string(&config)?);

    let start = Instant::now();
    let report = DurationJob::new(config).run()?;
    log::info!(
        "Processed {} TextGrid files ({} utterances, {} subsets) in {:.2?}",
        report.textgrid_files,
        report.utterances,
        report.subset_dirs.len(),
        start.elapsed()
    );
    Ok(())
}
