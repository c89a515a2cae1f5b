//! # Context-Adaptive Arithmetic Coding (CAAC)
//!
//! *Entropy coding that learns its model while it codes.*
//!
//! ## Intuition First
//!
//! Imagine narrowing in on a number between 0 and 1 by repeatedly zooming
//! into sub-intervals. Arithmetic coding assigns each symbol a slice of the
//! current interval proportional to its probability; encoding a message
//! means zooming into slice after slice, and the final position — written
//! as a binary fraction — *is* the compressed data.
//!
//! The adaptive twist: neither side knows the probabilities up front. Both
//! start from the same trivial statistics and update them identically after
//! every symbol, so no model ever travels with the data. A PPM-style
//! escape mechanism lets the coder say "I haven't seen this symbol in this
//! context" and fall back to progressively simpler models, down to a
//! uniform table over the raw alphabet that can always code anything once.
//!
//! ## The Problem
//!
//! Fixed-width integer arithmetic can only hold the top few bits of that
//! ever-narrowing interval. The coder therefore renormalizes: once the
//! lower and upper bounds agree on their top bit (E1/E2) the bit is
//! settled and shifted out; when the interval straddles the midpoint too
//! tightly to settle a bit (E3), the registers are expanded around the
//! middle and a complement bit is owed for later. Encoder and decoder must
//! perform these steps bit-for-bit identically — one rounding or masking
//! discrepancy and the stream desynchronizes with no way to resync.
//!
//! ## Historical Context
//!
//! ```text
//! 1948  Shannon            Entropy as the fundamental limit
//! 1976  Pasco, Rissanen    Arithmetic coding becomes practical
//! 1984  Cleary & Witten    PPM: contexts + escape probabilities
//! 1987  Witten/Neal/Cleary CACM implementation with E1/E2/E3 rescaling
//! 1995  Moffat et al.      Improved bounds on fixed-precision coding
//! 2000  Sayood             Textbook treatment of the tag formulation
//! ```
//!
//! ## Mathematical Formulation
//!
//! With word-size-bit registers, a symbol occupying the cumulative count
//! range $[c_{lo}, c_{hi})$ out of $T$ narrows the tag interval to
//!
//! ```text
//! upper' = lower + floor((upper - lower + 1) * c_hi / T) - 1
//! lower' = lower + floor((upper - lower + 1) * c_lo / T)
//! ```
//!
//! and the decoder inverts it by scaling its current tag back into count
//! space. Keeping every table total at or below $2^{w-2}$ guarantees the
//! narrowed interval never collapses and rescaling terminates.
//!
//! ## Complexity Analysis
//!
//! - **Time**: O(k) per symbol, where k is the (small) size of the tables
//!   consulted — cumulative counts are prefix scans by design.
//! - **Space**: O(distinct symbols + contexts) table entries.
//!
//! ## Failure Modes
//!
//! 1. **Desynchronization**: any difference in update order between the
//!    two sides corrupts everything after it; there is no recovery.
//! 2. **Capacity**: output is written into caller-provided buffers and a
//!    mid-stream overflow is fatal, not resumable.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - [`ContextEncoder`]: order-1 adaptive encoder over integer symbols.
//! - [`ContextDecoder`]: its exact mirror, stopping at a configured
//!   termination symbol.
//!
//! Streams may be split into chunks: statistics and range registers thread
//! through successive calls, and the caller appends the termination symbol
//! to each chunk (framing is entirely the caller's concern).
//!
//! ## Example
//!
//! ```rust
//! use caac::{ContextDecoder, ContextEncoder};
//!
//! // 257 symbols: raw bytes plus a terminator id
//! let mut encoder = ContextEncoder::new(16, 257).unwrap();
//! let mut decoder = ContextDecoder::new(16, 257, 256).unwrap();
//!
//! let data = [72, 101, 108, 108, 111, 256];
//! let mut encoded = [0u8; 64];
//! let written = encoder.encode(&data, data.len(), &mut encoded, 64, true).unwrap();
//!
//! let mut decoded = [0i32; 8];
//! let produced = decoder.decode(&encoded, written, &mut decoded, 8).unwrap();
//! assert_eq!(&decoded[..produced], &data[..5]);
//! ```
//!
//! ## References
//!
//! - Witten, I. H., Neal, R. M., Cleary, J. G. (1987). "Arithmetic coding
//!   for data compression." Communications of the ACM 30(6).
//! - Cleary, J. G., Witten, I. H. (1984). "Data compression using adaptive
//!   coding and partial string matching." IEEE Trans. Communications.
//! - Sayood, K. (2000). "Introduction to Data Compression", ch. 4.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bitio;
mod context;
mod error;
mod freq;
mod model;
mod tag;

pub use context::{ContextDecoder, ContextEncoder};
pub use error::{Error, Result};

/// Smallest supported tag register width, in bits.
pub const MIN_WORD_SIZE: u32 = 3;

/// Largest supported tag register width, in bits.
pub const MAX_WORD_SIZE: u32 = 16;
