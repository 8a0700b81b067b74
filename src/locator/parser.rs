//! Recursive-descent parser for XPath 1.0 expressions.
//!
//! Precedence, loosest first: `or`, `and`, equality, relational, additive,
//! multiplicative, unary minus, union, then paths and filter expressions.

use super::ast::{
    collapse_descendant_steps, ArithOp, Axis, CmpOp, Expr, FilterExpr, Function, Kind,
    LocationPath, NodeTest, Step,
};
use super::lexer::{tokenize, Spanned, Token};
use super::LocatorError;

/// Parses a full locator, which must evaluate to a node-set.
pub(crate) fn parse(source: &str) -> Result<Expr, LocatorError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(LocatorError::new(0, "empty expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
    };

    let expr = parser.expr()?;
    if let Some(extra) = parser.peek_spanned() {
        return Err(LocatorError::new(extra.offset, "unexpected trailing input"));
    }
    if expr.kind() != Kind::NodeSet {
        return Err(LocatorError::new(0, "expression does not select nodes"));
    }
    Ok(expr)
}

fn is_node_type(name: &str) -> bool {
    matches!(
        name,
        "node" | "text" | "comment" | "processing-instruction"
    )
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Offset reported for errors at end of input.
    end: usize,
}

impl Parser {
    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.peek_spanned().map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), LocatorError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> LocatorError {
        LocatorError::new(self.offset(), message)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn starts_filter(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen | Token::Variable(_)) => {
                true
            }
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !is_node_type(name)
            }
            _ => false,
        }
    }

    /// Requires `expr` to be a node-set, reporting `what` at `offset` otherwise.
    fn node_set(expr: Expr, offset: usize, what: &str) -> Result<Expr, LocatorError> {
        if expr.kind() == Kind::NodeSet {
            Ok(expr)
        } else {
            Err(LocatorError::new(offset, format!("{what} must be a node-set")))
        }
    }

    // === Operators ===

    fn expr(&mut self) -> Result<Expr, LocatorError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, LocatorError> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::And) {
            let rhs = self.equality()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, LocatorError> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::Ne) => CmpOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.relational()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn relational(&mut self) -> Result<Expr, LocatorError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, LocatorError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, LocatorError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithOp::Mul,
                Some(Token::Div) => ArithOp::Div,
                Some(Token::Mod) => ArithOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, LocatorError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        self.union()
    }

    fn union(&mut self) -> Result<Expr, LocatorError> {
        let offset = self.offset();
        let mut lhs = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            lhs = Self::node_set(lhs, offset, "union operand")?;
            let rhs_offset = self.offset();
            let rhs = Self::node_set(self.path_expr()?, rhs_offset, "union operand")?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // === Paths ===

    fn path_expr(&mut self) -> Result<Expr, LocatorError> {
        if !self.starts_filter() {
            return Ok(Expr::Path(self.location_path()?));
        }

        let offset = self.offset();
        let primary = self.primary()?;
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RBracket, "']'")?;
        }

        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                self.relative_steps(&mut steps)?;
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                steps.push(Step::descendant_or_self());
                self.relative_steps(&mut steps)?;
            }
            _ => {}
        }

        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        let primary = Self::node_set(primary, offset, "a filtered expression")?;
        collapse_descendant_steps(&mut steps);
        Ok(Expr::Filter(Box::new(FilterExpr {
            primary,
            predicates,
            steps,
        })))
    }

    fn location_path(&mut self) -> Result<LocationPath, LocatorError> {
        let mut path = LocationPath {
            absolute: false,
            steps: Vec::new(),
        };

        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                path.absolute = true;
                if self.starts_step() {
                    self.relative_steps(&mut path.steps)?;
                }
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                path.absolute = true;
                path.steps.push(Step::descendant_or_self());
                self.relative_steps(&mut path.steps)?;
            }
            _ => self.relative_steps(&mut path.steps)?,
        }

        collapse_descendant_steps(&mut path.steps);
        Ok(path)
    }

    fn relative_steps(&mut self, steps: &mut Vec<Step>) -> Result<(), LocatorError> {
        steps.push(self.step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                    steps.push(self.step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(Step::descendant_or_self());
                    steps.push(self.step()?);
                }
                _ => return Ok(()),
            }
        }
    }

    fn step(&mut self) -> Result<Step, LocatorError> {
        match self.peek() {
            Some(Token::Dot) => {
                self.advance();
                return Ok(Step::new(Axis::SelfNode, NodeTest::AnyNode));
            }
            Some(Token::DotDot) => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::AnyNode));
            }
            None => return Err(self.error("expected a location step")),
            _ => {}
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::ColonColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = Axis::from_name(name)
                .ok_or_else(|| self.error(format!("unknown axis '{name}'")))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let mut step = Step::new(axis, self.node_test()?);
        while self.eat(&Token::LBracket) {
            step.predicates.push(self.expr()?);
            self.expect(&Token::RBracket, "']'")?;
        }
        Ok(step)
    }

    fn node_test(&mut self) -> Result<NodeTest, LocatorError> {
        match self.peek().cloned() {
            Some(Token::Star) => {
                self.advance();
                Ok(NodeTest::Wildcard)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) => {
                if !is_node_type(&name) {
                    return Err(self.error(format!("'{name}()' is not a node test")));
                }
                self.pos += 2;
                let test = match name.as_str() {
                    "processing-instruction" => match self.peek().cloned() {
                        Some(Token::Literal(target)) => {
                            self.advance();
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::AnyNode,
                };
                self.expect(&Token::RParen, "')'")?;
                Ok(test)
            }
            Some(Token::Name(name)) => {
                self.advance();
                Ok(match name.strip_suffix(":*") {
                    Some(prefix) => NodeTest::PrefixWildcard(prefix.to_ascii_lowercase()),
                    None => NodeTest::Name(name.to_ascii_lowercase()),
                })
            }
            _ => Err(self.error("expected a node test")),
        }
    }

    // === Primaries ===

    fn primary(&mut self) -> Result<Expr, LocatorError> {
        match self.peek().cloned() {
            Some(Token::Literal(text)) => {
                self.advance();
                Ok(Expr::Literal(text))
            }
            Some(Token::Number(value)) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Variable(name)) => {
                Err(self.error(format!("variable '${name}' has no binding")))
            }
            Some(Token::Name(name)) => self.call(&name),
            Some(_) => Err(self.error("unexpected token in expression")),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, LocatorError> {
        let offset = self.offset();
        let function = Function::from_name(name)
            .ok_or_else(|| LocatorError::new(offset, format!("unknown function '{name}()'")))?;
        self.pos += 2;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen, "')' or ','")?;
                break;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(LocatorError::new(
                offset,
                format!("wrong number of arguments to '{name}()'"),
            ));
        }
        if function.takes_node_set() && args.iter().any(|arg| arg.kind() != Kind::NodeSet) {
            return Err(LocatorError::new(
                offset,
                format!("'{name}()' expects a node-set argument"),
            ));
        }

        Ok(Expr::Call(function, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(source: &str) -> LocationPath {
        match parse(source) {
            Ok(Expr::Path(path)) => path,
            other => panic!("{source}: expected a location path, got {other:?}"),
        }
    }

    fn predicate(source: &str) -> Expr {
        path(source).steps.remove(0).predicates.remove(0)
    }

    #[test]
    fn double_slash_name_becomes_descendant_step() {
        let path = path("//li");
        assert!(path.absolute);
        assert_eq!(
            path.steps,
            vec![Step::new(Axis::Descendant, NodeTest::Name("li".into()))]
        );
    }

    #[test]
    fn positional_predicate_keeps_child_semantics() {
        let path = path("//li[1]");
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[1].axis, Axis::Child);
        assert_eq!(path.steps[1].predicates, vec![Expr::Number(1.0)]);
    }

    #[test]
    fn names_are_lowercased() {
        let path = path("DIV/Span");
        assert_eq!(path.steps[0].test, NodeTest::Name("div".into()));
        assert_eq!(path.steps[1].test, NodeTest::Name("span".into()));
    }

    #[test]
    fn explicit_axes_and_abbreviations() {
        let path = path("../preceding-sibling::td/text()");
        assert_eq!(path.steps[0].axis, Axis::Parent);
        assert_eq!(path.steps[1].axis, Axis::PrecedingSibling);
        assert_eq!(path.steps[2].test, NodeTest::Text);
    }

    #[test]
    fn node_type_tests() {
        assert_eq!(path("comment()").steps[0].test, NodeTest::Comment);
        assert_eq!(
            path("processing-instruction('xml')").steps[0].test,
            NodeTest::ProcessingInstruction(Some("xml".into()))
        );
        assert_eq!(
            path("following::svg:*").steps[0].test,
            NodeTest::PrefixWildcard("svg".into())
        );
    }

    #[test]
    fn attribute_steps_may_be_continued() {
        assert!(path("a/@href").selects_attributes());
        assert!(!path("@href/..").selects_attributes());
        assert!(path("@*[starts-with(name(), 'data-')]").selects_attributes());
    }

    #[test]
    fn unions_nest_left_to_right() {
        let expr = parse("h1 | h2|h3").unwrap_or_else(|e| panic!("{e}"));
        match expr {
            Expr::Union(lhs, _) => assert!(matches!(*lhs, Expr::Union(_, _))),
            other => panic!("expected a union, got {other:?}"),
        }
    }

    #[test]
    fn boolean_operators_bind_and_tighter_than_or() {
        assert!(matches!(predicate("p[@a or @b and @c]"), Expr::Or(_, _)));
    }

    #[test]
    fn arithmetic_precedence() {
        match predicate("p[1 + 2 * 3 = 7]") {
            Expr::Compare(CmpOp::Eq, lhs, _) => match *lhs {
                Expr::Arith(ArithOp::Add, _, rhs) => {
                    assert!(matches!(*rhs, Expr::Arith(ArithOp::Mul, _, _)));
                }
                other => panic!("expected addition, got {other:?}"),
            },
            other => panic!("expected comparison, got {other:?}"),
        }
        assert!(matches!(
            predicate("td[last() - 1]"),
            Expr::Arith(ArithOp::Sub, _, _)
        ));
        assert!(matches!(
            predicate("tr[position() mod 2 = 0]"),
            Expr::Compare(CmpOp::Eq, _, _)
        ));
    }

    #[test]
    fn filter_expressions() {
        match parse("(.//span)[1]/b") {
            Ok(Expr::Filter(filter)) => {
                assert_eq!(filter.predicates, vec![Expr::Number(1.0)]);
                assert_eq!(filter.steps.len(), 1);
            }
            other => panic!("expected a filter expression, got {other:?}"),
        }
        assert!(matches!(parse("(//a)"), Ok(Expr::Path(_))));
        assert!(matches!(parse("id('main')//p"), Ok(Expr::Filter(_))));
    }

    #[test]
    fn function_errors_are_reported() {
        assert!(parse("p[frobnicate(.)]").is_err());
        assert!(parse("p[contains(.)]").is_err());
        assert!(parse("p[count('x')]").is_err());
        assert!(parse("p[substring('abc', 1, 2, 3)]").is_err());
        assert!(parse("p[position() = last()]").is_ok());
    }

    #[test]
    fn non_node_set_locators_are_rejected() {
        assert!(parse("1 + 1").is_err());
        assert!(parse("count(//a)").is_err());
        assert!(parse("('a')[1]").is_err());
        assert!(parse("//a | 'b'").is_err());
        assert!(parse("//p[$limit]").is_err());
    }

    #[test]
    fn structural_errors_are_reported() {
        assert!(parse("").is_err());
        assert!(parse("div[").is_err());
        assert!(parse("div]").is_err());
        assert!(parse("//").is_err());
        assert!(parse("sideways::div").is_err());
        assert!(parse("div/").is_err());
        assert!(parse(".[1]").is_err());
    }

    #[test]
    fn lone_slash_selects_document_root() {
        let path = path("/");
        assert!(path.absolute);
        assert!(path.steps.is_empty());
    }
}
