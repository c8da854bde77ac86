//! Weir DNS Infrastructure Layer
pub mod dns;
