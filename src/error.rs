use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum PrepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown dataset: {0}! It must be one of ['ljspeech', 'libritts', 'librispeech'].")]
    UnknownDataset(String),
    #[error(".TextGrid files have not been successfully saved to {}!", .0.display())]
    NoAlignmentFiles(PathBuf),
    #[error("Failed to parse TextGrid {}: {message}", path.display())]
    TextGrid { path: PathBuf, message: String },
    #[error("TextGrid {} has {found} tier(s), expected a word tier and a phoneme tier", path.display())]
    MissingTier { path: PathBuf, found: usize },
    #[error("Token vocabulary {} has no '{token}' entry", path.display())]
    MissingReservedToken { token: String, path: PathBuf },
    #[error("Token index {0} is not in the vocabulary")]
    UnknownTokenIndex(i64),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}
