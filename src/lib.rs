//! Serve a rotating slideshow of a local photo directory over HTTP.

pub mod config;
pub mod error;
pub mod scan;
pub mod state;
pub mod web;
pub mod tasks {
    pub mod advance;
    pub mod files;
}

pub use config::Configuration;
pub use error::Error;
pub use state::{Slideshow, Snapshot};
