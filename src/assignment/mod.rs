//! Player-to-controller assignment
//!
//! Binds every player slot to exactly one input device before gameplay starts. The
//! [`coordinator`] reacts to release events, [`state`] holds the slots and the set of
//! claimed devices and [`error`] lists the ways a negotiation can fail to start.

pub mod coordinator;
pub mod error;
pub mod state;

pub use coordinator::{AssignmentCoordinator, AssignmentSettings, Observation};
pub use error::AssignmentError;
pub use state::{NegotiationPhase, NegotiationState, PlayerSlot, SlotAssignment};
