//! gdlo-ob library
//!
//! Level observer: decodes game server listings, detects changes between
//! successive snapshots, keeps creator point totals and walks the known
//! levels in fixed-size windows.

pub mod builder;
pub mod client;
pub mod cursor;
pub mod diff;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod protocol;
pub mod report;
pub mod scheduler;

pub use client::{HttpLevelSource, LevelSource};
pub use cursor::CursorScheduler;
pub use pipeline::{Observer, ObserverSettings};
pub use report::{Category, Report};
pub use scheduler::{ObserverService, ServiceHandle};
