//! Conversation runtime
//!
//! [`TurnExecutor`] runs one user turn against the model and the tool
//! registry; [`run_session`] drives turns from a line-oriented input until
//! the user leaves.

#[cfg(test)]
mod proptests;
mod session_loop;
#[cfg(test)]
pub mod testing;
mod turn;

pub use session_loop::run_session;
pub use turn::{TurnExecutor, TurnSettings};
