use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Image message {0} has no image URL")]
    MissingImageUrl(String),

    #[error("Text message {0} carries an image URL")]
    UnexpectedImageUrl(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageKind(String),
}
