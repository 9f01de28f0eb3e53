//! Command implementations for the Folio CLI

pub mod check;
pub mod serve;
