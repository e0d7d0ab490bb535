//! TapeLab Core — replay a price series through a trading strategy.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, signals, positions, the portfolio ledger, trades)
//! - The bar-by-bar simulation loop with its run-state machine
//! - The execution simulator (slippage, commission, minimum trade size)
//! - The strategy trait and three reference strategies
//! - Rolling indicator helpers
//!
//! The ledger's conservation identity is the backbone invariant: cash plus
//! signed position market values always equals initial capital plus realized
//! and unrealized PnL minus commission. `Portfolio::verify_conservation`
//! asserts it after every mark in debug builds.

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod strategy;
