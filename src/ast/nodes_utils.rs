//! Implementations for [crate::ast::nodes]: structural traversal, accessors
//! and the builder API used by the AST construction stage and the tests.

use smallvec::SmallVec;

use crate::ast::nodes::*;

impl Node {
    pub fn is_label(&self) -> bool {
        matches!(self, Node::Label(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Node::Expression(_))
    }

    pub fn is_try_catch(&self) -> bool {
        matches!(self, Node::TryCatch(_))
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Node::Loop(_))
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Node::Switch(_))
    }

    /// The block-like view of this node, if it has one. [`CaseBlock`] and
    /// [`CatchBlock`] are blocks with extra attributes.
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(b) => Some(b),
            Node::Case(c) => Some(&c.block),
            Node::Catch(c) => Some(&c.block),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Node::Block(b) => Some(b),
            Node::Case(c) => Some(&mut c.block),
            Node::Catch(c) => Some(&mut c.block),
            _ => None,
        }
    }

    pub fn is_block_like(&self) -> bool {
        self.as_block().is_some()
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Node::Expression(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_expression_mut(&mut self) -> Option<&mut Expression> {
        match self {
            Node::Expression(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this node unconditionally leaves its containing block. Only
    /// expressions can; all other kinds complete normally.
    pub fn is_unconditional_control_flow(&self) -> bool {
        match self {
            Node::Expression(e) => e.code.is_unconditional_control_flow(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Block(_) => "block",
            Node::Expression(_) => "expression",
            Node::Label(_) => "label",
            Node::Condition(_) => "condition",
            Node::Loop(_) => "loop",
            Node::Switch(_) => "switch",
            Node::Case(_) => "case",
            Node::TryCatch(_) => "try",
            Node::Catch(_) => "catch",
        }
    }

    /// The structural children, in execution-relevant order. For block-likes
    /// the entry goto precedes the body; for try/catch the try block comes
    /// first, then the handlers, then the finally block.
    pub fn children(&self) -> SmallVec<[NodeId::Id; 8]> {
        let mut children = SmallVec::new();
        match self {
            Node::Block(b) | Node::Case(CaseBlock { block: b, .. })
            | Node::Catch(CatchBlock { block: b, .. }) => {
                children.extend(b.entry_goto);
                children.extend_from_slice(&b.body);
            }
            Node::Expression(e) => children.extend_from_slice(&e.arguments),
            Node::Label(_) => {}
            Node::Condition(c) => {
                children.push(c.condition);
                children.push(c.true_block);
                children.push(c.false_block);
            }
            Node::Loop(l) => {
                children.extend(l.condition);
                children.push(l.body);
            }
            Node::Switch(s) => {
                children.push(s.condition);
                children.extend_from_slice(&s.case_blocks);
            }
            Node::TryCatch(t) => {
                children.push(t.try_block);
                children.extend_from_slice(&t.catch_blocks);
                children.extend(t.finally_block);
            }
        }
        children
    }
}

impl Expression {
    /// An expression is a branch iff its operand carries label targets.
    pub fn is_branch(&self) -> bool {
        matches!(
            self.operand,
            Some(Operand::Label(_)) | Some(Operand::Labels(_))
        )
    }

    pub fn branch_targets(&self) -> SmallVec<[NodeId::Id; 2]> {
        match &self.operand {
            Some(Operand::Label(l)) => SmallVec::from_slice(&[*l]),
            Some(Operand::Labels(ls)) => SmallVec::from_slice(ls),
            _ => SmallVec::new(),
        }
    }
}

/// Pre-order traversal over a subtree, left to right.
pub struct Preorder<'a> {
    method: &'a MethodAst,
    stack: Vec<NodeId::Id>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId::Id;

    fn next(&mut self) -> Option<NodeId::Id> {
        let id = self.stack.pop()?;
        let children = self.method.node(id).children();
        self.stack.extend(children.iter().rev());
        Some(id)
    }
}

impl MethodAst {
    /// The node itself followed by all nodes reachable through structural
    /// children, pre-order.
    pub fn self_and_children(&self, id: NodeId::Id) -> Preorder<'_> {
        Preorder {
            method: self,
            stack: vec![id],
        }
    }

    /// All expressions in the method, pre-order.
    pub fn expressions(&self) -> impl Iterator<Item = NodeId::Id> + '_ {
        self.self_and_children(self.root())
            .filter(|&id| self.node(id).is_expression())
    }

    /// All block-like nodes in the method (blocks, case blocks, catch
    /// blocks), pre-order, root included.
    pub fn blocks(&self) -> impl Iterator<Item = NodeId::Id> + '_ {
        self.self_and_children(self.root())
            .filter(|&id| self.node(id).is_block_like())
    }

    pub fn loops(&self) -> impl Iterator<Item = NodeId::Id> + '_ {
        self.self_and_children(self.root())
            .filter(|&id| self.node(id).is_loop())
    }

    pub fn switches(&self) -> impl Iterator<Item = NodeId::Id> + '_ {
        self.self_and_children(self.root())
            .filter(|&id| self.node(id).is_switch())
    }

    pub fn try_catch_blocks(&self) -> impl Iterator<Item = NodeId::Id> + '_ {
        self.self_and_children(self.root())
            .filter(|&id| self.node(id).is_try_catch())
    }

    /// The block-like view of a node. Panics if the node is not block-like;
    /// restructuring only calls this where the tree shape guarantees it.
    pub fn block(&self, id: NodeId::Id) -> &Block {
        self.node(id).as_block().unwrap()
    }

    pub fn block_mut(&mut self, id: NodeId::Id) -> &mut Block {
        self.node_mut(id).as_block_mut().unwrap()
    }

    pub fn expr(&self, id: NodeId::Id) -> &Expression {
        self.node(id).as_expression().unwrap()
    }

    pub fn expr_mut(&mut self, id: NodeId::Id) -> &mut Expression {
        self.node_mut(id).as_expression_mut().unwrap()
    }

    /// Deep-clone an expression subtree. The clone gets fresh ids throughout.
    pub fn clone_expr(&mut self, id: NodeId::Id) -> NodeId::Id {
        let e = self.expr(id);
        let code = e.code;
        let operand = e.operand.clone();
        let ranges = e.ranges.clone();
        let arguments: Vec<NodeId::Id> = e.arguments.clone();
        let arguments = arguments
            .into_iter()
            .map(|a| self.clone_expr(a))
            .collect();
        self.add_node(Node::Expression(Expression {
            code,
            operand,
            arguments,
            ranges,
        }))
    }

    // Builders. The construction stage assembles methods bottom-up with
    // these; the tests use them as their fixture DSL.

    pub fn new_label(&mut self, name: impl Into<String>) -> NodeId::Id {
        self.add_node(Node::Label(Label { name: name.into() }))
    }

    pub fn new_expr(
        &mut self,
        code: AstCode,
        operand: Option<Operand>,
        arguments: Vec<NodeId::Id>,
    ) -> NodeId::Id {
        self.add_node(Node::Expression(Expression {
            code,
            operand,
            arguments,
            ranges: Vec::new(),
        }))
    }

    pub fn new_goto(&mut self, label: NodeId::Id) -> NodeId::Id {
        debug_assert!(self.node(label).is_label());
        self.new_expr(AstCode::Goto, Some(Operand::Label(label)), Vec::new())
    }

    pub fn new_load(&mut self, var: VariableId::Id) -> NodeId::Id {
        self.new_expr(AstCode::Load, Some(Operand::Variable(var)), Vec::new())
    }

    pub fn new_store(&mut self, var: VariableId::Id, value: NodeId::Id) -> NodeId::Id {
        self.new_expr(AstCode::Store, Some(Operand::Variable(var)), vec![value])
    }

    pub fn new_block(&mut self, body: Vec<NodeId::Id>) -> NodeId::Id {
        self.add_node(Node::Block(Block {
            entry_goto: None,
            body,
        }))
    }

    pub fn new_block_with_entry(
        &mut self,
        entry_goto: NodeId::Id,
        body: Vec<NodeId::Id>,
    ) -> NodeId::Id {
        self.add_node(Node::Block(Block {
            entry_goto: Some(entry_goto),
            body,
        }))
    }

    pub fn new_condition(
        &mut self,
        condition: NodeId::Id,
        true_block: NodeId::Id,
        false_block: NodeId::Id,
    ) -> NodeId::Id {
        self.add_node(Node::Condition(Condition {
            condition,
            true_block,
            false_block,
        }))
    }

    pub fn new_loop(&mut self, condition: Option<NodeId::Id>, body: NodeId::Id) -> NodeId::Id {
        self.add_node(Node::Loop(Loop { condition, body }))
    }

    pub fn new_switch(&mut self, condition: NodeId::Id, case_blocks: Vec<NodeId::Id>) -> NodeId::Id {
        self.add_node(Node::Switch(Switch {
            condition,
            case_blocks,
        }))
    }

    pub fn new_case(&mut self, values: Vec<i32>, body: Vec<NodeId::Id>) -> NodeId::Id {
        self.add_node(Node::Case(CaseBlock {
            values,
            block: Block {
                entry_goto: None,
                body,
            },
        }))
    }

    pub fn new_try_catch(
        &mut self,
        try_block: NodeId::Id,
        catch_blocks: Vec<NodeId::Id>,
        finally_block: Option<NodeId::Id>,
    ) -> NodeId::Id {
        self.add_node(Node::TryCatch(TryCatchBlock {
            try_block,
            catch_blocks,
            finally_block,
        }))
    }

    pub fn new_catch(
        &mut self,
        exception_types: Vec<String>,
        exception_variable: Option<VariableId::Id>,
        body: Vec<NodeId::Id>,
    ) -> NodeId::Id {
        self.add_node(Node::Catch(CatchBlock {
            exception_types,
            exception_variable,
            block: Block {
                entry_goto: None,
                body,
            },
        }))
    }

    /// Append a statement to a block-like body.
    pub fn push(&mut self, block: NodeId::Id, statement: NodeId::Id) {
        self.block_mut(block).body.push(statement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstCode;

    #[test]
    fn preorder_visits_entry_goto_before_body() {
        let mut m = MethodAst::new();
        let l = m.new_label("L_0");
        let g = m.new_goto(l);
        let r = m.new_expr(AstCode::Return, None, vec![]);
        let inner = m.new_block_with_entry(g, vec![l, r]);
        let root = m.root();
        m.push(root, inner);

        let order: Vec<_> = m.self_and_children(root).collect();
        assert_eq!(order, vec![root, inner, g, l, r]);
    }

    #[test]
    fn clone_expr_is_deep() {
        let mut m = MethodAst::new();
        let v = m.new_variable("x");
        let load = m.new_load(v);
        let ret = m.new_expr(AstCode::Return, None, vec![load]);

        let cloned = m.clone_expr(ret);
        assert_ne!(cloned, ret);
        let cloned_arg = m.expr(cloned).arguments[0];
        assert_ne!(cloned_arg, load);
        assert_eq!(m.expr(cloned_arg).code, AstCode::Load);
    }

    #[test]
    fn branch_targets_cover_single_and_multi_way_operands() {
        let mut m = MethodAst::new();
        let l0 = m.new_label("L_0");
        let l1 = m.new_label("L_1");
        let g = m.new_goto(l0);
        let cond = m.new_expr(AstCode::LdC, Some(Operand::Constant(1)), vec![]);
        let sw = m.new_expr(
            AstCode::Switch,
            Some(Operand::Labels(vec![l0, l1])),
            vec![cond],
        );

        assert!(m.expr(g).is_branch());
        assert_eq!(m.expr(g).branch_targets().as_slice(), &[l0]);
        assert!(m.expr(sw).is_branch());
        assert_eq!(m.expr(sw).branch_targets().as_slice(), &[l0, l1]);
        assert!(!m.expr(cond).is_branch());
    }
}
