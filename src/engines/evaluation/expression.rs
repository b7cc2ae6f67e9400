use crate::types::{Node, Operator, Terminal};

/// Divisors closer to zero than this trigger protected division
pub const DIVISION_EPSILON: f64 = 1e-6;

/// Result of a protected division by ~0
pub const PROTECTED_DIVISION_VALUE: f64 = 1.0;

pub fn protected_div(numerator: f64, divisor: f64) -> f64 {
    if divisor.abs() < DIVISION_EPSILON {
        PROTECTED_DIVISION_VALUE
    } else {
        numerator / divisor
    }
}

impl Operator {
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Sub => left - right,
            Self::Mul => left * right,
            Self::Div => protected_div(left, right),
        }
    }
}

impl Node {
    /// Evaluate the tree on one feature row.
    ///
    /// Variables index into `row`; callers guarantee the row is at least as
    /// wide as the largest referenced variable.
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        match self {
            Self::Terminal(Terminal::Variable(i)) => row[*i],
            Self::Terminal(Terminal::Constant(c)) => *c,
            Self::Operator { op, left, right } => op.apply(left.evaluate(row), right.evaluate(row)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        // ((x0 - x1) * 2) + 1
        let node = Node::operator(
            Operator::Add,
            Node::operator(
                Operator::Mul,
                Node::operator(Operator::Sub, Node::variable(0), Node::variable(1)),
                Node::constant(2.0),
            ),
            Node::constant(1.0),
        );
        assert_eq!(node.evaluate(&[5.0, 3.0]), 5.0);
    }

    #[test]
    fn test_protected_division() {
        let node = Node::operator(Operator::Div, Node::variable(0), Node::variable(1));
        assert_eq!(node.evaluate(&[4.0, 2.0]), 2.0);
        assert_eq!(node.evaluate(&[4.0, 0.0]), PROTECTED_DIVISION_VALUE);
        assert_eq!(node.evaluate(&[4.0, 1e-9]), PROTECTED_DIVISION_VALUE);
        assert_eq!(node.evaluate(&[0.0, 0.0]), PROTECTED_DIVISION_VALUE);
        assert!(!node.evaluate(&[0.0, -0.0]).is_nan());
    }

    #[test]
    fn test_clone_evaluates_identically() {
        let node = Node::operator(
            Operator::Div,
            Node::operator(Operator::Mul, Node::variable(0), Node::constant(-0.3)),
            Node::variable(1),
        );
        let copy = node.clone();
        for row in [[1.0, 2.0], [0.0, 0.0], [-3.5, 7.25]] {
            assert_eq!(node.evaluate(&row), copy.evaluate(&row));
        }
        assert_eq!(node.size(), copy.size());
        assert_eq!(node.depth(), copy.depth());
    }
}
