//! The restructuring micro-passes.
//!
//! The surrounding decompiler owns AST construction, expression inlining and
//! emission; this stage owns the control-flow rewrites that turn residual
//! gotos into structured jumps and clean up after them.

pub mod remove_gotos;
pub mod remove_redundant_code;

pub use remove_gotos::remove_gotos;
pub use remove_redundant_code::remove_redundant_code;
