//! Local-first writings store: ordered collections persisted as one blob per
//! named slot, write-through to the remote backend for published articles.

pub mod persist;
pub mod state;
pub mod writings;
