//! An assembler and emulator library for a reduced RV32I instruction
//! architecture: 32 general-purpose registers, the base integer arithmetic,
//! branch and memory operations, and nothing else. No floating point, no
//! multiply or divide, no compressed encodings.
//!
//! This crate provides the functionality to:
//! - Split and lex line-oriented assembly source.
//! - Assemble it in two passes into a [Program](instruction::Program), with
//!   forward label references resolved by a deferred fix-up sweep.
//! - Execute the program against a segmented data/stack memory image on a
//!   step-bounded [VirtualMachine](emulator::VirtualMachine).
//!
//! Everything is bounded up front by the constants in [limits], and a run
//! never blocks, never performs IO and always terminates, so the whole cycle
//! can be invoked repeatedly expecting bit-identical results.
//!
//! # Example
//! ```
//! use rv32::{
//!     emulator::Context,
//!     outcome::{run, Stage},
//! };
//!
//! fn main() {
//!     // Add 40 and 2 and store the sum at the start of the data segment.
//!     let source = r#"
//!         addi t0, x0, 40
//!         addi t1, x0, 2
//!         add  a1, t0, t1
//!         sw   a1, 0(a0)
//!     "#;
//!
//!     let outcome = run(source, &[0; 4], &Context::default());
//!
//!     assert!(outcome.ok);
//!     assert_eq!(outcome.stage, Stage::Ok);
//!     assert_eq!(outcome.execution.registers[11], 42);
//!     assert_eq!(&outcome.execution.data[..], &[42, 0, 0, 0]);
//! }
//! ```
//!
//! # Executables
//!
//! ## `rv32asm`
//!
//! Assembles a source file and prints the resolved instruction listing and
//! the label table.
//!
//! ## `rv32run`
//!
//! Assembles and executes a source file, optionally seeding the data segment
//! from a file, and prints the outcome together with the final register and
//! data state.

pub mod assembler;
pub mod emulator;
pub mod error;
pub mod instruction;
pub mod lexer;
pub mod limits;
pub mod outcome;
pub mod symbol_table;
