use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Content extraction error: {0}")]
    ContentExtraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() {
            Error::Parse(err.to_string())
        } else {
            Error::Http(err.to_string())
        }
    }
}

impl Error {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_) | Error::Io(_))
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Config(_) | Error::Invalid(_) | Error::NotFound(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Http(_) => "HTTP_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Parse(_) => "PARSE",
            Error::ContentExtraction(_) => "CONTENT_EXTRACTION",
            Error::Config(_) => "CONFIG",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Invalid(_) => "INVALID",
            Error::Storage(_) => "STORAGE",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Timeout("slow".to_string()).is_temporary());
        assert!(Error::Http("502".to_string()).is_temporary());
        assert!(!Error::Parse("bad json".to_string()).is_temporary());

        assert!(Error::Invalid("page 0".to_string()).is_user_error());
        assert!(!Error::Storage("disk".to_string()).is_user_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotFound("x".to_string()).error_code(), "NOT_FOUND");
        assert_eq!(Error::Config("x".to_string()).error_code(), "CONFIG");
    }

    #[test]
    fn test_toml_error_conversion() {
        let err: Error = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }
}
