pub mod errors;
pub mod events;
pub mod models;

pub use errors::{RemoteError, SyncError, ValidationError};
pub use events::{ChangeEvent, ChangeKind, MutationState, RawChange, Table};
pub use models::{Group, GroupDraft, Task, TaskDraft, TaskPatch};

pub type SyncResult<T> = Result<T, SyncError>;
