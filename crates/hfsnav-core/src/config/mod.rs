//! Configuration management for hfsnav.
//!
//! User preferences ([`settings::Config`]) are stored as a TOML file and
//! loaded at startup. Every field has a default, so the file is optional.

pub mod settings;
