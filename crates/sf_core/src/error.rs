use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Date parse error: {0}")]
    DateParse(String),

    /// The JSON blob embedded in an inline script no longer matches the
    /// expected markers or layout.
    #[error("Embedded data format changed: {0}")]
    EmbeddedFormat(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Whether a fetch that failed with this error is worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(Error::Timeout("slow".into()).is_transient());
        assert!(Error::HttpStatus { status: 503, url: "https://a".into() }.is_transient());
        assert!(Error::HttpStatus { status: 429, url: "https://a".into() }.is_transient());
        assert!(!Error::HttpStatus { status: 404, url: "https://a".into() }.is_transient());
        assert!(!Error::MissingField("title").is_transient());
    }
}
