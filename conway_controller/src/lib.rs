// lib.rs - Local side of a distributed run
//
// `Controller` loads the initial world through an `ImageIo`, submits
// the run to the broker and turns ticker samples, key commands and the
// final result into a stream of `Event`s.

mod config;
mod controller;
mod error;
mod events;
mod keys;

pub mod io;

pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::ControllerError;
pub use events::{Event, State};
pub use io::{ImageError, ImageIo, MemoryIo, PgmIo, SeededIo};
pub use keys::Command;
