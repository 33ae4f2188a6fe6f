//! A crate for compiling and interpreting `NV_fragment_program` assembly, the per-pixel shading
//! language of early programmable graphics hardware.
//!
//! Currently this crate provides the functionality to:
//! - Compile `!!FP1.0` program text into an immutable [Program].
//! - Disassemble a compiled program back into program text.
//! - Execute a program on the fragments of a rasterized [Span], including texture lookups,
//!   condition codes, fragment kills and screen space derivatives.
//! - Keep a bound program in a [Context] that survives failed recompilations.
//!
//! # Example
//! ```
//! use fpcore::{
//!     compile,
//!     instruction::{INPUT_COL0, OUTPUT_COLR},
//!     interpreter::{Interpreter, SolidColor},
//!     span::{Fragment, Span},
//! };
//!
//! // Modulates the primary color with a texture.
//! let source = r#"!!FP1.0
//!     TEX R0, f[TEX0], TEX0, 2D;
//!     MUL o[COLR], R0, f[COL0];
//!     END
//! "#;
//!
//! let program = compile(source).unwrap();
//!
//! let mut fragment = Fragment::default();
//! fragment.inputs[INPUT_COL0] = [1.0, 0.5, 0.25, 1.0];
//!
//! let span = Span::single(fragment);
//!
//! let mut interpreter = Interpreter::new(&program, SolidColor([0.5; 4]));
//! interpreter.execute(&span, 0);
//!
//! assert_eq!(interpreter.machine.outputs[OUTPUT_COLR], [0.5, 0.25, 0.125, 0.5]);
//! ```
//!
//! # Executables
//!
//! ## `fprun`
//!
//! Compiles a program file, prints its disassembly and runs it on a single fragment whose
//! inputs and local parameters are given on the command line. Requires the `fprun` feature.
//!
//! ```text
//! $ fprun modulate.fp --input COL0=1,0.5,0.25,1 --param 0=2,2,2,1
//! ```
pub mod compiler;
pub mod context;
pub mod error;
pub mod event;
pub mod instruction;
pub mod interpreter;
pub mod parameters;
pub mod parser;
pub mod program;
pub mod span;

pub use compiler::{compile, compile_with_logger};
pub use context::Context;
pub use program::Program;
pub use span::{Fragment, Span};
