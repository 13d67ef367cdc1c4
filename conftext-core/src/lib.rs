//! Generic primitives for block-structured configuration text.
//!
//! FortiOS exports (and several related appliance formats) are built from two
//! constructs: `config <section> … end` blocks, which nest arbitrarily, and
//! `edit <id> … next` entries inside table blocks. This crate tokenizes that
//! shape without knowing anything about what the sections mean:
//!
//! - [`scanner`] — locate blocks and split them into entries, tolerating
//!   nested sub-blocks and malformed input
//! - [`fields`] — read `set <key> <value>` statements out of a block or
//!   entry body
//!
//! Higher-level crates decide which sections to ask for and what the fields
//! mean.

pub mod fields;
pub mod scanner;

pub use scanner::{blocks, entries, Block, Entry};
