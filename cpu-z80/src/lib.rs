//! Instruction-stepped Z80 CPU emulator.
//!
//! Each call to [`Z80::step`] advances the CPU by exactly one instruction
//! (or one interrupt acknowledge sequence) and returns the T-states
//! consumed. Flag behaviour, including the undocumented X/Y bits and the
//! block-instruction quirks, matches the ZEXDOC/ZEXALL exercisers.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.
#![allow(clippy::cast_sign_loss)] // Displacements are sign-extended then wrapped.

pub mod alu;
mod cpu;
pub mod flags;
mod registers;

pub use cpu::{M1Hook, Z80};
pub use registers::Registers;
