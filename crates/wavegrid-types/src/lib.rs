//! Shared type definitions for the Wavegrid gesture pipeline.
//!
//! This crate is the single source of truth for every type that crosses a
//! crate or process boundary: the JSON messages exchanged over the duplex
//! channel, the decoded classification events, the control commands, and
//! the snapshots handed to render sinks. Snapshot and wire types flow to
//! `TypeScript` via `ts-rs` for the browser renderer.
//!
//! # Modules
//!
//! - [`ids`] -- Session identifiers and the [`Session`] record
//! - [`labels`] -- Gesture and head-pose classification labels
//! - [`geometry`] -- Grid cells, headings, and canvas points
//! - [`commands`] -- Classification events and control commands
//! - [`snapshot`] -- Render snapshots and connection state
//! - [`wire`] -- JSON messages on the duplex channel and classifier API

pub mod commands;
pub mod geometry;
pub mod ids;
pub mod labels;
pub mod snapshot;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use commands::{ClassificationEvent, ControlCommand};
pub use geometry::{Cell, Direction, Point};
pub use ids::{Session, SessionId, SessionKind};
pub use labels::{GestureLabel, Label, PoseDirection};
pub use snapshot::{
    ConnectionState, DrawingSnapshot, EndReason, GamePhase, GameSnapshot, Stroke, StrokeKind,
};
pub use wire::{
    ClassificationReply, ErrorReply, FacePrediction, FrameMessage, GesturePrediction,
    PoseReply,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the browser renderer.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::SessionId::export_all();
        let _ = crate::ids::SessionKind::export_all();
        let _ = crate::labels::GestureLabel::export_all();
        let _ = crate::labels::PoseDirection::export_all();
        let _ = crate::labels::Label::export_all();
        let _ = crate::geometry::Cell::export_all();
        let _ = crate::geometry::Direction::export_all();
        let _ = crate::geometry::Point::export_all();
        let _ = crate::snapshot::GamePhase::export_all();
        let _ = crate::snapshot::EndReason::export_all();
        let _ = crate::snapshot::GameSnapshot::export_all();
        let _ = crate::snapshot::StrokeKind::export_all();
        let _ = crate::snapshot::Stroke::export_all();
        let _ = crate::snapshot::DrawingSnapshot::export_all();
        let _ = crate::snapshot::ConnectionState::export_all();
        let _ = crate::wire::FrameMessage::export_all();
        let _ = crate::wire::ClassificationReply::export_all();
        let _ = crate::wire::PoseReply::export_all();
        let _ = crate::wire::ErrorReply::export_all();
    }
}
