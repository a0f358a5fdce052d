pub mod event_edit;
pub mod event_metadata;
pub mod event_request;
pub mod going;
pub mod notification;

pub use event_edit::EventEditRepository;
pub use event_metadata::EventMetadataRepository;
pub use event_request::EventRequestRepository;
pub use going::GoingRepository;
pub use notification::{AdminNotificationRepository, UserNotificationRepository};
