pub mod access;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod lookups;
pub mod resources;
pub mod rest;
pub mod service;

#[cfg(test)]
mod test_support;
