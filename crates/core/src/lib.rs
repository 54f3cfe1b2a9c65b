//! Shopfront Core - Shared types library.
//!
//! This crate provides the domain types used across all Shopfront components:
//! - `storefront` - Server-rendered storefront and admin screens
//! - `cli` - Command-line tools for catalog and cart maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage. Cart arithmetic and catalog filtering live here so
//! they can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Products, prices, cart items and type-safe IDs
//! - [`cart`] - Cart mutation arithmetic
//! - [`catalog`] - Filtering over an already-fetched product list

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;

pub use cart::Cart;
pub use types::*;
