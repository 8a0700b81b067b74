//! Syntax tree for compiled locators.

/// Direction of travel for a location step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfNode,
    Parent,
    Ancestor,
    AncestorOrSelf,
    Following,
    FollowingSibling,
    Preceding,
    PrecedingSibling,
    Attribute,
    Namespace,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "self" => Self::SelfNode,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following" => Self::Following,
            "following-sibling" => Self::FollowingSibling,
            "preceding" => Self::Preceding,
            "preceding-sibling" => Self::PrecedingSibling,
            "attribute" => Self::Attribute,
            "namespace" => Self::Namespace,
            _ => return None,
        })
    }

    /// Reverse axes number their proximity positions from the context node outwards.
    pub(crate) fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Parent
                | Self::Ancestor
                | Self::AncestorOrSelf
                | Self::Preceding
                | Self::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
    /// Element (or attribute) name, stored lowercase.
    Name(String),
    /// `*`
    Wildcard,
    /// `prefix:*`
    PrefixWildcard(String),
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()`, optionally restricted to one target.
    ProcessingInstruction(Option<String>),
    /// `node()`
    AnyNode,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub(crate) fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    /// The expansion of `//`.
    pub(crate) fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::AnyNode)
    }

    fn is_bare_descendant_or_self(&self) -> bool {
        self.axis == Axis::DescendantOrSelf
            && self.test == NodeTest::AnyNode
            && self.predicates.is_empty()
    }
}

/// Folds `descendant-or-self::node()/child::x[p]` into `descendant::x[p]`.
///
/// Only valid when no predicate of the child step depends on position,
/// since the two forms number their candidates differently.
pub(crate) fn collapse_descendant_steps(steps: &mut Vec<Step>) {
    let mut folded = Vec::with_capacity(steps.len());
    let mut iter = std::mem::take(steps).into_iter().peekable();
    while let Some(step) = iter.next() {
        let foldable = step.is_bare_descendant_or_self()
            && iter.peek().is_some_and(|next| {
                next.axis == Axis::Child && !next.predicates.iter().any(Expr::is_positional)
            });
        if foldable {
            if let Some(mut next) = iter.next() {
                next.axis = Axis::Descendant;
                folded.push(next);
            }
        } else {
            folded.push(step);
        }
    }
    *steps = folded;
}

/// True when `steps`, applied to items that may include attributes when
/// `from_attributes` holds, can yield attribute items.
fn steps_yield_attributes(steps: &[Step], from_attributes: bool) -> bool {
    steps.iter().fold(from_attributes, |may, step| match step.axis {
        Axis::Attribute => true,
        Axis::SelfNode | Axis::AncestorOrSelf | Axis::DescendantOrSelf => {
            may && step.test == NodeTest::AnyNode
        }
        _ => false,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

impl LocationPath {
    pub(crate) fn selects_attributes(&self) -> bool {
        steps_yield_attributes(&self.steps, false)
    }
}

/// A primary expression narrowed by predicates and continued by a relative path:
/// `(//li)[2]/a`, `id('main')//p`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterExpr {
    pub primary: Expr,
    pub predicates: Vec<Expr>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// The operator that gives the same result with its operands swapped.
    pub(crate) fn flipped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Static result type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    NodeSet,
    Number,
    String,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    // Node-set functions
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    // String functions
    String,
    Concat,
    StartsWith,
    EndsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    // Boolean functions
    Boolean,
    Not,
    True,
    False,
    Lang,
    // Number functions
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "last" => Self::Last,
            "position" => Self::Position,
            "count" => Self::Count,
            "id" => Self::Id,
            "local-name" => Self::LocalName,
            "namespace-uri" => Self::NamespaceUri,
            "name" => Self::Name,
            "string" => Self::String,
            "concat" => Self::Concat,
            "starts-with" => Self::StartsWith,
            "ends-with" => Self::EndsWith,
            "contains" => Self::Contains,
            "substring-before" => Self::SubstringBefore,
            "substring-after" => Self::SubstringAfter,
            "substring" => Self::Substring,
            "string-length" => Self::StringLength,
            "normalize-space" => Self::NormalizeSpace,
            "translate" => Self::Translate,
            "boolean" => Self::Boolean,
            "not" => Self::Not,
            "true" => Self::True,
            "false" => Self::False,
            "lang" => Self::Lang,
            "number" => Self::Number,
            "sum" => Self::Sum,
            "floor" => Self::Floor,
            "ceiling" => Self::Ceiling,
            "round" => Self::Round,
            _ => return None,
        })
    }

    /// Minimum and maximum argument count (`None` = unbounded).
    pub(crate) fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => (0, Some(0)),
            Self::Count
            | Self::Id
            | Self::Boolean
            | Self::Not
            | Self::Lang
            | Self::Sum
            | Self::Floor
            | Self::Ceiling
            | Self::Round => (1, Some(1)),
            Self::LocalName
            | Self::NamespaceUri
            | Self::Name
            | Self::String
            | Self::StringLength
            | Self::NormalizeSpace
            | Self::Number => (0, Some(1)),
            Self::StartsWith
            | Self::EndsWith
            | Self::Contains
            | Self::SubstringBefore
            | Self::SubstringAfter => (2, Some(2)),
            Self::Substring => (2, Some(3)),
            Self::Translate => (3, Some(3)),
            Self::Concat => (2, None),
        }
    }

    /// Functions whose argument must be a node-set.
    pub(crate) fn takes_node_set(self) -> bool {
        matches!(
            self,
            Self::Count | Self::Sum | Self::LocalName | Self::NamespaceUri | Self::Name
        )
    }

    pub(crate) fn kind(self) -> Kind {
        match self {
            Self::Id => Kind::NodeSet,
            Self::Last
            | Self::Position
            | Self::Count
            | Self::StringLength
            | Self::Number
            | Self::Sum
            | Self::Floor
            | Self::Ceiling
            | Self::Round => Kind::Number,
            Self::StartsWith
            | Self::EndsWith
            | Self::Contains
            | Self::Boolean
            | Self::Not
            | Self::True
            | Self::False
            | Self::Lang => Kind::Boolean,
            Self::LocalName
            | Self::NamespaceUri
            | Self::Name
            | Self::String
            | Self::Concat
            | Self::SubstringBefore
            | Self::SubstringAfter
            | Self::Substring
            | Self::NormalizeSpace
            | Self::Translate => Kind::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Path(LocationPath),
    Filter(Box<FilterExpr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    pub(crate) fn kind(&self) -> Kind {
        match self {
            Self::Or(..) | Self::And(..) | Self::Compare(..) => Kind::Boolean,
            Self::Arith(..) | Self::Negate(_) | Self::Number(_) => Kind::Number,
            Self::Literal(_) => Kind::String,
            Self::Union(..) | Self::Path(_) => Kind::NodeSet,
            Self::Filter(filter) => {
                if filter.predicates.is_empty() && filter.steps.is_empty() {
                    filter.primary.kind()
                } else {
                    Kind::NodeSet
                }
            }
            Self::Call(function, _) => function.kind(),
        }
    }

    /// True when the expression's node-set can contain attributes.
    pub(crate) fn selects_attributes(&self) -> bool {
        match self {
            Self::Path(path) => path.selects_attributes(),
            Self::Union(lhs, rhs) => lhs.selects_attributes() || rhs.selects_attributes(),
            Self::Filter(filter) => {
                steps_yield_attributes(&filter.steps, filter.primary.selects_attributes())
            }
            _ => false,
        }
    }

    /// Conservative: true whenever the predicate might depend on the
    /// candidate's position within its step.
    pub(crate) fn is_positional(&self) -> bool {
        self.kind() == Kind::Number || self.reads_context_position()
    }

    /// Calls `position()` or `last()` for the current context. Paths and
    /// filter predicates open contexts of their own and do not count.
    fn reads_context_position(&self) -> bool {
        match self {
            Self::Literal(_) | Self::Number(_) | Self::Path(_) => false,
            Self::Or(lhs, rhs)
            | Self::And(lhs, rhs)
            | Self::Compare(_, lhs, rhs)
            | Self::Arith(_, lhs, rhs)
            | Self::Union(lhs, rhs) => {
                lhs.reads_context_position() || rhs.reads_context_position()
            }
            Self::Negate(inner) => inner.reads_context_position(),
            Self::Filter(filter) => filter.primary.reads_context_position(),
            Self::Call(Function::Position | Function::Last, _) => true,
            Self::Call(_, args) => args.iter().any(Self::reads_context_position),
        }
    }
}
