use crate::safety::sanitize_reqwest_error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpToolsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("outbound request blocked: {0}")]
    Blocked(String),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}
