pub mod remote;
pub mod session;
pub mod store;
pub mod sync_engine;
pub mod views;

pub use remote::{AuthProvider, RemoteStore, Subscription};
pub use session::Session;
pub use store::{EntityStore, Keyed};
pub use sync_engine::{MutationKind, PendingMutation, SyncEngine};
pub use views::{classify_deadline, project, TaskFilter, TaskViews, Urgency};
