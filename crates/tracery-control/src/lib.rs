//! Tracery Control Plane
//!
//! The long-lived background coordinator. It owns the global block state and
//! the per-tab observation store, answers the popup's messages, and keeps
//! the declarative rule table in step with the blocklist and whitelist.
//!
//! Browser APIs are reached only through the traits in [`ports`], so the
//! same coordinator runs inside the extension and under test.

pub mod message;
pub mod plane;
pub mod ports;
pub mod state;

pub use message::{MessageError, Request, KINDS};
pub use plane::{ControlPlane, Ports};
pub use ports::{BadgeSink, KnowledgeSource, NoBadge, PortError, ScriptInjector, StaticKnowledge, TabMessenger};
pub use state::BlockState;
