//! # rs485-busmaster
//!
//! A portable, no_std Rust bus-master driver for a half-duplex RS-485
//! discover/poll field bus, built on `embedded-hal` and `embedded-hal-nb`.
//!
//! The master continuously round-robins a discover probe across up to 128
//! device ids while polling every device whose cadence has come due, tracks
//! each device's liveness from consecutive exchange failures, and reports
//! `ACTIVE`/`INACTIVE`/`POLL` lines to a console link.
//!
//! ## Crate features
//! | Feature       | Description |
//! |---------------|-------------|
//! | `std`         | Enables `std`-only pieces of `thiserror`/`log`; the crate is `no_std` otherwise |
//! | `defmt-0-3`   | Uses `defmt` logging/formatting for `embedded-hal`, `heapless`, and `nb` types |
//! | `log`         | Uses the `log` facade for diagnostics |
//!
//! ## Software Features
//!
//! - Fixed, 128-slot device table; no heap, no dynamic allocation, no
//!   polymorphism on the hot path
//! - CRC-16 ("Modbus"/IBM reflected variant) frame validation
//! - Dual-timeout (per-character and overall) response reception
//! - A pluggable [`clock::Clock`] facade so the crate never depends on a
//!   specific MCU's timer peripheral
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rs485_busmaster::scheduler::BusMaster;
//! use rs485_busmaster::report::ConsoleReporter;
//!
//! // `bus_uart`/`console_uart` implement `embedded_hal_nb::serial::{Read, Write}`,
//! // `bus_de`/`bus_re` implement `embedded_hal::digital::OutputPin`, and `clock`
//! // implements `rs485_busmaster::clock::Clock` -- all board-specific types
//! // supplied by the binary crate that owns the MCU peripherals.
//! let mut master = BusMaster::new(bus_uart, bus_de, bus_re, console_uart, clock);
//! let mut reporter = ConsoleReporter::new(report_uart);
//! master.announce(&mut reporter);
//! loop {
//!     master.step(&mut reporter).unwrap();
//! }
//! ```
//!
//! ## Status
//!
//! This crate targets a single fixed wire protocol (see module docs) and is
//! not intended as a general-purpose Modbus/fieldbus stack.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod clock;
pub mod config;
pub(crate) mod consts;
pub(crate) mod crc;
pub mod device;
pub mod error;
pub mod frame;
pub(crate) mod hex;
pub mod line;
pub(crate) mod liveness;
pub mod report;
pub mod scheduler;

/// The bus master entry point; see [`scheduler::BusMaster`].
pub use scheduler::BusMaster;
