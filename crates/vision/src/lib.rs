//! Camera capture and multimodal model access for zone inspections.
//!
//! Two seams, both trait objects so the engine can be tested without
//! a network: [`camera::CameraSource`] fetches a snapshot for a zone,
//! and [`client::VisionClient`] sends that snapshot plus a prompt to a
//! provider and returns the raw reply text. Reply interpretation lives
//! in `zonewatch_core::parser`, not here.

pub mod anthropic;
pub mod camera;
pub mod client;
pub mod error;
pub mod gemini;
pub mod openai;

pub use camera::{CameraSource, CapturedImage, HttpCameraSource};
pub use client::{build_client, ClientBuildError, VisionClient};
pub use error::{CameraError, VisionError};
