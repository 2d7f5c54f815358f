//! # noswim-server
//!
//! Monitoring daemon library for noswim.
//!
//! Provides the headless presenter, the status/log API handlers, and the
//! logging setup used by the `noswim-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod presenter;
pub mod state;
