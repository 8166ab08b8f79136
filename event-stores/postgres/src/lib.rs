//! A PostgreSQL-backed [`venty::EventStore`].
//!
//! Check out [`EventStoreBuilder`] for how to build one; the
//! underlying schema is embedded in the crate and applied through
//! [`refinery`] migrations on [`EventStoreBuilder::migrate_database`].

#![deny(unsafe_code)]

mod config;
pub mod store;

pub use config::Config;
pub use store::{Error, EventStore, EventStoreBuilder};
