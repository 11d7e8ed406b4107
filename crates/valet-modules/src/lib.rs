//! Built-in capability modules for the valet engine.
//!
//! Each module implements [`valet_core::CapabilityModule`]: a set of named
//! tool functions gated by a permission bit. Register the ones a deployment
//! wants with [`valet_core::Bot::register_module`].

mod ambient;
mod profile;
mod vault;

pub use ambient::AmbientModule;
pub use profile::ProfileModule;
pub use vault::VaultModule;
