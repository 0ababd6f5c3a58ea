/// Errors produced by the prompt chain, the remote clients and the dataset tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request text was empty after trimming.
    #[error("user input is empty")]
    EmptyInput,

    /// A setting needed for the requested operation is not configured.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response.
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status.
    #[error("{method} {url} failed: {status} {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
