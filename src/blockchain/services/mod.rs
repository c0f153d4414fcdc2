// src/blockchain/services/mod.rs

pub mod account;
pub mod amount;
pub mod evm;
pub mod execution;
pub mod key_type;
pub mod normaliser;
