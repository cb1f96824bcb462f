use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("model not trained; call train() with trip data first")]
    Untrained,

    #[error("cannot parse arrival time {0:?}; expected HH:MM or HHMM")]
    TimeParse(String),

    #[error("group size must be at least 1, got {0}")]
    InvalidGroupSize(u32),

    #[error("departure for arrival {0} falls before the earliest representable date")]
    DepartureOutOfRange(chrono::NaiveDateTime),

    #[error("training corpus is empty")]
    EmptyCorpus,

    #[error("forest: {0}")]
    Forest(String),

    #[error("dataset row {row}: {message}")]
    Dataset { row: usize, message: String },
}

pub type Result<T> = std::result::Result<T, PredictorError>;
