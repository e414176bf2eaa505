use thiserror::Error;

/// Error depicting errors that occur while loading the configuration
///
#[derive(Error, Debug)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);
impl From<&str> for ConfigError {
    fn from(e: &str) -> Self { ConfigError(e.to_string()) }
}
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self { ConfigError(e.to_string()) }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self { ConfigError(e.to_string()) }
}

/// Error depicting malformed pollutant or weather values
///
#[derive(Error, Debug, PartialEq)]
pub enum AqiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors from communicating with the upstream weather and air quality API
///
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidInput(String),
    #[error("upstream rejected request with status {0}")]
    Client(u16),
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("transient upstream failure: {0}")]
    Transient(String),
    #[error("malformed upstream document: {0}")]
    Document(String),
    #[error("upstream unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl FetchError {
    /// Returns true if the failure may succeed on a later attempt, i.e. timeouts,
    /// connection problems, 5xx and rate limiting (429)
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transient(_) => true,
            FetchError::Client(status) => *status == 429,
            _ => false,
        }
    }
}
impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self { FetchError::Document(e.to_string()) }
}
impl From<AqiError> for FetchError {
    fn from(e: AqiError) -> Self { FetchError::InvalidInput(e.to_string()) }
}
impl From<ureq::Error> for FetchError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(status) if status >= 500 => {
                FetchError::Transient(format!("http status {}", status))
            },
            ureq::Error::StatusCode(status) => FetchError::Client(status),
            ureq::Error::Timeout(_)
            | ureq::Error::Io(_)
            | ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound => FetchError::Transient(e.to_string()),
            _ => FetchError::Request(e.to_string()),
        }
    }
}

/// Errors from loading the model artifact and running inference
///
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("feature mismatch: {0}")]
    FeatureMismatch(String),
    #[error(transparent)]
    InvalidInput(#[from] AqiError),
}

/// Error depicting errors that occur while setting up the service
///
#[derive(Error, Debug)]
pub enum InitError {
    #[error("InitError: {0}")]
    Predict(#[from] PredictError),
    #[error("InitError: {0}")]
    Features(#[from] AqiError),
    #[error("InitError: {0}")]
    Location(#[from] FetchError),
}

/// Errors surfaced by the http handlers
///
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("worker failed: {0}")]
    Worker(String),
}
