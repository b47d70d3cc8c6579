//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod state_writer;
pub mod timer_driver;

// Re-export main functions
pub use state_writer::state_writer_task;
pub use timer_driver::timer_driver_task;
