//! Tracery Shield
//!
//! Anti-fingerprinting countermeasures for the page context.
//!
//! # Architecture
//!
//! Injection happens in two stages. The [`relay`] runs in the extension's
//! isolated world: it reads settings, skips whitelisted hosts, seeds a
//! configuration snapshot into the page and loads the payload script. The
//! [`payload`] runs with page privileges and installs [`protections`] into a
//! [`PageHost`]. The two sides only talk through [`message`].
//!
//! Protections never patch globals themselves. Each one wraps the capability
//! handle the host currently exposes and hands back a decorator; the host
//! bindings decide how browser calls reach it.
//!
//! # Modules
//!
//! - `capability`: Capability traits and the `PageHost` slot table
//! - `protections`: One decorator per fingerprinting surface
//! - `noise`: Randomness for canvas, screen and timing
//! - `config`: Live countermeasure configuration
//! - `message`: Relay to payload message contract
//! - `payload`: Page-context installer
//! - `relay`: Isolated-world injector and update forwarder

pub mod capability;
pub mod config;
pub mod message;
pub mod noise;
pub mod payload;
pub mod protections;
pub mod relay;

#[cfg(test)]
mod testing;

pub use capability::{CapResult, CapabilityError, ImageData, PageHost, PropertyBag, PropertyDescriptor, PropertyValue};
pub use config::CountermeasureConfig;
pub use message::{PageMessage, PROTOCOL_VERSION};
pub use noise::Noise;
pub use payload::Payload;
pub use protections::Protection;
pub use relay::{DocumentInjector, InjectionError, PagePort, Relay, RelayOutcome};
