//! Client-side state: the relay store renderers read and the connection
//! monitor that decides liveness. Both are plain state machines mutated
//! only from the session's event loop.

pub mod monitor;
pub mod store;

pub use monitor::{ChannelHealth, ConnectionMonitor, ConnectionState};
pub use store::{RelayEntry, RelayId, RelayState, RelayStateStore, StatusSnapshot};
