//! Errors returned by negotiation commands

use thiserror::Error;

/// Reasons a negotiation could not be started
///
/// Event handlers never fail; duplicate claims and dead devices are not errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// Player count was zero or negative
    #[error("Invalid player count: {0}")]
    InvalidSlotCount(i64),

    /// More players than assignable devices, with strict device checks enabled
    #[error("{requested} players requested but only {available} devices available")]
    InsufficientDevices { requested: usize, available: usize },

    /// `start` while another negotiation is still waiting for players
    #[error("A negotiation is already waiting for player {0}")]
    AlreadyNegotiating(usize),
}
