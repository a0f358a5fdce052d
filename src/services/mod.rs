pub mod attendance;
pub mod cache;
pub mod email;
pub mod events;
pub mod export;
pub mod feed;
pub mod init;
pub mod notifications;
pub mod reconciler;
pub mod workflow;
