pub mod push;
pub mod sync;

pub use push::{ClickOutcome, NotificationContent};
pub use sync::{PendingStudyQueue, RetryMeta, StudyRecord, WorkerMessage};
