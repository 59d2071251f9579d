//! Classifier gateway for Wavegrid screens.
//!
//! This crate provides an Axum server that sits between the screens and
//! the classifier service:
//!
//! - **Duplex channel** (`/api/v1/ws/{session_id}`): screens push
//!   base64 JPEG frames and get one classification reply per frame.
//! - **REST endpoints** for gateway health, classifier health and
//!   one-shot head-pose classification.
//!
//! # Architecture
//!
//! Each channel is served by its own task and handles its frames in
//! arrival order. A classifier failure is answered in-band with an
//! error reply; the channel only ends when the screen disconnects.

pub mod classifier;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use classifier::{Classifier, ClassifierError, HttpClassifier, ScriptedClassifier};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use state::AppState;
