//! Player-to-controller assignment before gameplay starts
//!
//! # Architecture
//!
//! ```text
//! gilrs/stdin ──► InputEvent ──► Session ──► MainMenu / AssignmentCoordinator
//!                                   │                 │
//!                                   │           Observation
//!                                   ▼                 ▼
//!                              ListenerHub       PlayerRoster ──► players ready
//! ```
//!
//! - [`input`] - input subsystem seam, gilrs collector and listener routing
//! - [`device`] - assignable devices and their snapshot
//! - [`assignment`] - the per-player negotiation
//! - [`players`], [`screens`], [`session`] - the surrounding pre-game flow
//! - [`config`] - TOML configuration

pub mod assignment;
pub mod config;
pub mod device;
pub mod input;
pub mod players;
pub mod screens;
pub mod session;
