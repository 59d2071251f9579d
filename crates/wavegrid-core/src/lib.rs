//! The Wavegrid gesture-to-control pipeline.
//!
//! Frames flow out, classifications flow back, and a single-owner loop
//! turns them into simulation state:
//!
//! ```text
//! capture -> throttle -> transport(out) -> gateway -> classifier
//!                                                         |
//! sink <- loop <- mapper <- decoder <- transport(in) <----+
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `wavegrid-config.yaml`.
//! - [`capture`] -- Capture sources and JPEG/base64 frame encoding.
//! - [`throttle`] -- Fixed-rate, drop-not-buffer frame sampling.
//! - [`transport`] -- The duplex channel ([`TransportSession`]).
//! - [`decoder`] -- Inbound message decoding.
//! - [`mapper`] -- Classification-to-command mapping with the reversal guard.
//! - [`food`] -- Uniform food placement over free cells.
//! - [`game`] -- The grid game state machine.
//! - [`drawing`] -- The drawing surface.
//! - [`control`] -- Shared stop signal.
//! - [`runner`] -- Simulation loops and the [`RenderSink`] seam.
//!
//! [`TransportSession`]: transport::TransportSession
//! [`RenderSink`]: runner::RenderSink

pub mod capture;
pub mod config;
pub mod control;
pub mod decoder;
pub mod drawing;
pub mod food;
pub mod game;
pub mod mapper;
pub mod runner;
pub mod throttle;
pub mod transport;
