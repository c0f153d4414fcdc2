// src/blockchain/mod.rs

pub mod client;
pub mod key_signer;
pub mod keys;
pub mod mirror_node;
pub mod models;
pub mod params;
pub mod services;
pub mod transaction;

// Re-export commonly used types
pub use client::{Client, LedgerClient};
pub use key_signer::KeySigner;
pub use mirror_node::{MirrorNode, MirrorNodeClient};
