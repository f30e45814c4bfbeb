/// Errors surfaced by the URLive API client.
///
/// Page controllers show the `Display` text of these errors to the user
/// verbatim, so every variant renders as a readable sentence.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required local identifier (usually the user id) is absent. Raised
    /// before any request is sent.
    #[error("{0}")]
    MissingSession(&'static str),

    /// The server answered with a non-success status, or with a body whose
    /// embedded code is not the expected one.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered successfully but the body could not be used.
    #[error("{0}")]
    Malformed(String),

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
        }
    }
}
