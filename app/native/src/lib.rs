//! surface-portal - keeps long-lived native rendering surfaces positioned over
//! the ephemeral placeholders of a declarative UI.
//!
//! A declarative layer rebuilds its view tree freely, but the surfaces it
//! shows (terminals, browsers) must survive those rebuilds. Each window gets a
//! [`portal::Portal`] that owns a host container above the base content and
//! keeps every hosted view's frame, visibility and stacking in sync with the
//! placeholder ("anchor") it is bound to.
//!
//! - [`geometry`] - pure reconciliation of an anchor into a placement
//! - [`platform`] - the seams the portal talks through, plus a headless backend
//! - [`portal`] - per-window portals and the registry that maps windows to them
//! - [`config`] - JSONC configuration
//! - [`cli`] - the `surface-portal` inspection binary

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod platform;
pub mod portal;
pub mod schema;

pub use config::PortalConfig;
pub use error::{PortalError, PortalResult};
pub use portal::{Portal, PortalRegistry};
