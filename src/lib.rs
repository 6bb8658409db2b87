//! This library contains the control-flow restructuring stage of a JVM
//! bytecode decompiler. The surrounding decompiler hands us a method AST in
//! which loops, conditions, switches and try/catch nesting have already been
//! rebuilt, but where the residual jumps of the original bytecode are still
//! present as raw `goto` expressions.
//!
//! The entry point is [`remove_gotos`](transform::remove_gotos::remove_gotos):
//! it classifies every goto by simulating where control actually flows under
//! structured semantics and rewrites it into the strongest structured
//! equivalent (`nop`, `break`, `continue`, an inlined `return`/`throw`, or a
//! `leave` out of a protected region), then cleans up the dead labels and
//! redundant statements the rewrites leave behind. Gotos with no structured
//! equivalent are kept as-is.
//!
//! The AST itself lives in [`ast`]; it is arena-backed, with node identity
//! given by typed indices from [`ids`].

#[macro_use]
extern crate log;

#[macro_use]
pub mod ids;
pub mod ast;
pub mod errors;
pub mod export;
pub mod logger;
pub mod pretty;
pub mod transform;

pub use transform::remove_gotos::remove_gotos;
