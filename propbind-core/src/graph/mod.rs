//! Binding Tree
//!
//! This module implements the tree of binding nodes that mirrors the paths
//! subscribers are interested in.
//!
//! # Overview
//!
//! Binding `Class.Teacher.Name` and `Class.Name` on the same host produces:
//!
//! ```text
//! root        observes the data context       direct: {}
//! └─ Class    observes root.Class             direct: { Name }
//!    └─ Teacher   observes root.Class.Teacher direct: { Name }
//! ```
//!
//! Each node subscribes to the change notifications of the object it
//! observes. When that object reports a change, only the registrations on
//! that property and the child observing it are touched. When a node's
//! observed object is replaced, the change cascades down its subtree.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a flat arena indexed by [`NodeId`]. Listeners and
//!    handles refer to nodes by id, so a notification for a node that has
//!    since been removed just finds nothing.
//!
//! 2. Shared prefixes share nodes. Nodes are created lazily on first bind
//!    and live until the host is cleared.
//!
//! 3. Every cascade works on a snapshot, so callbacks are free to bind,
//!    cancel, write, or replace data contexts while it runs.

mod arena;
mod handle;
mod host;
mod node;
mod path;
mod suppress;

pub use handle::RegistrationHandle;
pub use host::{BindingHost, HostBuilder, WeakBindingHost};
pub use node::{NodeId, RegistrationId};
pub use path::PropertyPath;
