//! Status synchronization for the door station web panel.
//!
//! This library keeps a local mirror of the station's relay states in
//! sync over two redundant transports: a periodic HTTP status poll and
//! a server-sent event stream. A session merges both into one relay
//! view and one connected/disconnected indicator.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reconciler;
pub mod session;
pub mod state;

#[cfg(test)]
mod testutil;
