//! Shared types for the sc-sandbox workspace.
//!
//! This crate provides the value types that both the VM core and the command
//! pipeline speak:
//!
//! - [`address`] - 20-byte script hashes and their base58check address form
//! - [`fixed8`] - GAS amounts with eight decimal places
//! - [`parameter`] - contract call arguments and the token parser shared by
//!   positional and interactive parameter resolution

pub mod address;
pub mod fixed8;
pub mod parameter;

pub use address::{hash256, is_valid_address, AddressError, ScriptHash, ADDRESS_VERSION};
pub use fixed8::{Fixed8, Fixed8Error};
pub use parameter::ContractParameter;
