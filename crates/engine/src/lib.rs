//! Inspection engine: runs checks end to end and schedules them.
//!
//! [`controller::InspectionController`] owns one inspection from camera
//! snapshot to recorded verdict; [`runner::InspectionRunner`] is the
//! periodic tick loop that feeds due zones into the controller.

pub mod controller;
pub mod runner;

pub use controller::InspectionController;
pub use runner::InspectionRunner;
