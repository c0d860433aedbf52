//! # GDLO Common Library
//!
//! Shared code for the level observer and the query server:
//! - Data model (levels, creators, songs, official song catalog)
//! - SQLite storage collaborator and level filters
//! - Bootstrap configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{Creator, CustomSong, LevelSnapshot, OfficialSong, SongReference};
