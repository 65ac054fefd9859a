//! Trellis Watcher — filesystem events driving incremental workspace updates

pub mod watcher;

pub use watcher::{FileWatcher, WatchEvent, WatcherService};
