use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read reps file {path}: {source}")]
    RepsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse reps file: {0}")]
    RepsFileParse(#[from] serde_yaml::Error),

    #[error("reps validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid range \"{0}\": expected a count followed by h or d (e.g. 24h, 7d)")]
    InvalidRange(String),
}
