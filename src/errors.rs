//! Structural errors raised by the restructuring pass.
//!
//! Failures to *simplify* a goto are not errors: the flow simulator signals
//! them in-band by returning no target, and the classifier moves on to the
//! next rewrite rule. The variants below are precondition/invariant
//! violations and abort the pass.

use crate::ast::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AstError {
    /// The same subtree appears as a child in two places. The input AST is
    /// malformed: every node except the method root must have exactly one
    /// parent.
    #[error("expression {0} is linked from multiple locations")]
    ExpressionLinkedFromMultipleLocations(NodeId::Id),

    /// Control-flow completion was simulated for a node whose parent kind has
    /// no structured-completion rule (an expression argument or a label).
    #[error("unsupported node {0} in control-flow simulation")]
    UnsupportedNode(NodeId::Id),
}
