#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("Invalid server response")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    InvalidFile(String),
    #[error("session store error: {0}")]
    Store(String),
    #[error("not logged in")]
    NotLoggedIn,
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Store(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Store(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
