//! Domain models for AppLink.
//!
//! Value objects validate on construction; the `Account` and
//! `Installation` entities guard their state machines behind mutator
//! methods and buffer domain events on every completed transition.

pub mod account;
pub mod auth_token;
pub mod domain_url;
pub mod installation;
