use thiserror::Error;
use uuid::Uuid;

/// Rejected before any optimistic mutation; the store is untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task text must not be empty")]
    EmptyTaskText,

    #[error("no group selected")]
    MissingGroup,

    #[error("unknown group: {0}")]
    UnknownGroup(Uuid),

    #[error("group name must not be empty")]
    EmptyGroupName,

    #[error("owner already has a default group")]
    DuplicateDefaultGroup,

    #[error("no signed-in user")]
    NotSignedIn,
}

/// Failures reported by the remote store collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote store rejected the request: {0}")]
    Rejected(String),

    #[error("push channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote call failed during the commit step; the optimistic local
    /// change has already been rolled back when this surfaces.
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("malformed change event: {0}")]
    MalformedEvent(String),

    #[error("unknown record: {0}")]
    UnknownRecord(Uuid),
}
