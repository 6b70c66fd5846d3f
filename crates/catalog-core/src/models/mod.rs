//! Data models for the catalogue
//!
//! Entries own images and entry-level files; tags and tag types form the
//! classification scheme; users are the staff accounts allowed to call the API.

mod entry;
mod media;
mod tag;
mod user;

pub use entry::*;
pub use media::*;
pub use tag::*;
pub use user::*;
