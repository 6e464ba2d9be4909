pub mod cache_service;
pub mod fetch_service;
pub mod notification_service;
pub mod sync_service;

pub use cache_service::*;
pub use fetch_service::*;
pub use notification_service::*;
pub use sync_service::*;
