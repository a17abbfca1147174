//! External service integrations.

pub mod airtable_client {
    pub use crate::airtable_client::*;
}
