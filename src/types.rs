use crate::error::{M3gpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div, // Protected
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    pub fn parse(symbol: &str) -> Result<Self> {
        match symbol.trim() {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Sub),
            "*" => Ok(Self::Mul),
            "/" => Ok(Self::Div),
            other => Err(M3gpError::Configuration(format!(
                "operators: unknown operator '{}'",
                other
            ))),
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Add, Self::Sub, Self::Mul, Self::Div]
    }
}

/// Leaf of an expression tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Terminal {
    Variable(usize), // x_i
    Constant(f64),   // fixed when the tree is grown
}

/// Entry of a terminal set, before constants are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalKind {
    Variable(usize),
    RandomConstant,
}

impl TerminalKind {
    /// Parses `x<i>` or `r`
    pub fn parse(symbol: &str) -> Result<Self> {
        let symbol = symbol.trim();
        if symbol == "r" {
            return Ok(Self::RandomConstant);
        }
        symbol
            .strip_prefix('x')
            .and_then(|index| index.parse::<usize>().ok())
            .map(Self::Variable)
            .ok_or_else(|| {
                M3gpError::Configuration(format!("terminals: unknown terminal '{}'", symbol))
            })
    }
}

/// Expression tree node. Children are owned, so `clone` is a deep copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Operator {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Terminal(Terminal),
}

/// Address of a node: child indices from the root (0 = left, 1 = right)
pub type NodePath = Vec<usize>;

impl Node {
    pub fn operator(op: Operator, left: Node, right: Node) -> Self {
        Self::Operator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn variable(index: usize) -> Self {
        Self::Terminal(Terminal::Variable(index))
    }

    pub fn constant(value: f64) -> Self {
        Self::Terminal(Terminal::Constant(value))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Terminal(_) => 1,
            Self::Operator { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Terminal(_) => 1,
            Self::Operator { left, right, .. } => 1 + left.size() + right.size(),
        }
    }

    /// All node addresses in preorder; the root is the empty path
    pub fn paths(&self) -> Vec<NodePath> {
        let mut paths = Vec::with_capacity(self.size());
        self.collect_paths(&mut Vec::new(), &mut paths);
        paths
    }

    fn collect_paths(&self, current: &mut NodePath, paths: &mut Vec<NodePath>) {
        paths.push(current.clone());
        if let Self::Operator { left, right, .. } = self {
            current.push(0);
            left.collect_paths(current, paths);
            current.pop();
            current.push(1);
            right.collect_paths(current, paths);
            current.pop();
        }
    }

    pub fn subtree(&self, path: &[usize]) -> Option<&Node> {
        match (path.split_first(), self) {
            (None, _) => Some(self),
            (Some((&0, rest)), Self::Operator { left, .. }) => left.subtree(rest),
            (Some((&1, rest)), Self::Operator { right, .. }) => right.subtree(rest),
            _ => None,
        }
    }

    /// Swaps in `replacement` at `path`, returning the node that was there
    pub fn replace_subtree(&mut self, path: &[usize], replacement: Node) -> Option<Node> {
        match path.split_first() {
            None => Some(std::mem::replace(self, replacement)),
            Some((&index, rest)) => match self {
                Self::Operator { left, .. } if index == 0 => left.replace_subtree(rest, replacement),
                Self::Operator { right, .. } if index == 1 => {
                    right.replace_subtree(rest, replacement)
                }
                _ => None,
            },
        }
    }

    /// Largest variable index referenced, if any
    pub fn max_variable(&self) -> Option<usize> {
        match self {
            Self::Terminal(Terminal::Variable(i)) => Some(*i),
            Self::Terminal(Terminal::Constant(_)) => None,
            Self::Operator { left, right, .. } => left.max_variable().max(right.max_variable()),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(Terminal::Variable(i)) => write!(f, "x{}", i),
            Self::Terminal(Terminal::Constant(c)) => write!(f, "{:.3}", c),
            Self::Operator { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        // (x0 + (x1 * 0.5))
        Node::operator(
            Operator::Add,
            Node::variable(0),
            Node::operator(Operator::Mul, Node::variable(1), Node::constant(0.5)),
        )
    }

    #[test]
    fn test_depth_and_size() {
        let node = sample();
        assert_eq!(node.depth(), 3);
        assert_eq!(node.size(), 5);
        assert_eq!(Node::variable(3).depth(), 1);
    }

    #[test]
    fn test_paths_address_every_node() {
        let node = sample();
        let paths = node.paths();
        assert_eq!(paths.len(), node.size());
        assert!(paths[0].is_empty());
        for path in &paths {
            assert!(node.subtree(path).is_some());
        }
        assert_eq!(node.subtree(&[1, 0]), Some(&Node::variable(1)));
        assert_eq!(node.subtree(&[0, 0]), None);
    }

    #[test]
    fn test_replace_root_and_inner() {
        let mut node = sample();
        let old = node.replace_subtree(&[1], Node::variable(7));
        assert_eq!(old.map(|n| n.size()), Some(3));
        assert_eq!(node.to_string(), "(x0 + x7)");

        let old_root = node.replace_subtree(&[], Node::constant(2.0));
        assert!(old_root.is_some());
        assert_eq!(node, Node::constant(2.0));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = sample();
        let mut copy = original.clone();
        copy.replace_subtree(&[0], Node::variable(9));
        assert_eq!(original.to_string(), "(x0 + (x1 * 0.500))");
        assert_ne!(original, copy);
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(Operator::parse("/").unwrap(), Operator::Div);
        assert!(Operator::parse("%").is_err());
        assert_eq!(TerminalKind::parse("x12").unwrap(), TerminalKind::Variable(12));
        assert_eq!(TerminalKind::parse("r").unwrap(), TerminalKind::RandomConstant);
        assert!(TerminalKind::parse("y1").is_err());
        assert_eq!(sample().max_variable(), Some(1));
    }
}
