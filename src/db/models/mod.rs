#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` work across the crate.

pub mod event_edit;
pub mod event_metadata;
pub mod event_request;
pub mod going;
pub mod notification;

pub use self::event_edit::*;
pub use self::event_metadata::*;
pub use self::event_request::*;
pub use self::going::*;
pub use self::notification::*;
