//! HTTP handlers

pub mod health;
pub mod events;
pub mod stats;
pub mod stream;
pub mod extract;

#[cfg(test)]
mod tests;
