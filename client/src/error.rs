use thiserror::Error;

/// Errors raised while building a client. Runtime transport failures are
/// logged by the driver instead.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("User id must not be empty")]
    MissingUserId,

    #[error("No websocket endpoints configured")]
    NoEndpoints,

    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidConfig { key: String, value: String },
}
