//! Stick Frames capture-and-retrieval pipeline.
//!
//! A video comes either from a file ([`upload::UploadSection`]) or from the
//! webcam ([`recording::CameraSection`]), is uploaded to the processing
//! backend, and the three landmark streams it returns are fetched together
//! and handed to a [`sink::LandmarkSink`].
//!
//! Everything runs on one thread: shared state is `Rc`/`RefCell`, device and
//! backend seams are `?Send` async traits, and background work is spawned
//! with `tokio::task::spawn_local` inside a `LocalSet`.

pub mod backend;
pub mod camera;
pub mod controller;
pub mod error;
pub mod media;
pub mod object_url;
pub mod orchestrator;
pub mod recording;
pub mod session;
pub mod sink;
pub mod status;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PipelineError, RetrievalError, UploadError};
