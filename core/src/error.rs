use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown area '{area}'")]
    UnknownArea { area: String },

    #[error("Area '{area}': duplicate spot id '{spot_id}'")]
    DuplicateSpotId { area: String, spot_id: String },

    #[error("Area '{area}': spot '{spot_id}' is missing coordinates")]
    MissingCoordinates { area: String, spot_id: String },

    #[error("Area '{area}': spot '{spot_id}' has invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates {
        area: String,
        spot_id: String,
        lat: f64,
        lng: f64,
    },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Virtual time out of range: {reason}")]
    TimeOutOfRange { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
