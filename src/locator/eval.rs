//! Evaluation of compiled locators over a `dom_query` tree.
//!
//! Evaluation is total: every well-formed locator yields a (possibly empty)
//! result for every context node. Node-sets are kept de-duplicated and in
//! document order after each step.

use std::collections::{HashMap, HashSet};

use dom_query::{NodeData, NodeId, NodeRef};

use super::ast::{ArithOp, Axis, CmpOp, Expr, FilterExpr, Function, LocationPath, NodeTest, Step};
use super::Hit;

/// Evaluates a node-set expression from `context`.
pub(crate) fn select<'a>(expr: &Expr, context: NodeRef<'a>) -> Vec<Hit<'a>> {
    let ctx = Context {
        item: Hit::Node(context),
        position: 1,
        size: 1,
    };
    match evaluate(expr, &ctx) {
        Value::Nodes(hits) => hits,
        _ => Vec::new(),
    }
}

fn document_root(node: NodeRef<'_>) -> NodeRef<'_> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

// === Paths ===

fn select_path<'a>(path: &LocationPath, item: &Hit<'a>) -> Vec<Hit<'a>> {
    let start = if path.absolute {
        Hit::Node(document_root(item.node()))
    } else {
        item.clone()
    };
    apply_steps(&path.steps, vec![start])
}

fn select_filtered<'a>(filter: &FilterExpr, ctx: &Context<'a>) -> Vec<Hit<'a>> {
    let mut hits = match evaluate(&filter.primary, ctx) {
        Value::Nodes(hits) => hits,
        _ => return Vec::new(),
    };
    for predicate in &filter.predicates {
        hits = filter_by_predicate(predicate, hits);
    }
    apply_steps(&filter.steps, hits)
}

fn apply_steps<'a>(steps: &[Step], mut current: Vec<Hit<'a>>) -> Vec<Hit<'a>> {
    for step in steps {
        if current.is_empty() {
            break;
        }
        current = apply_step(step, &current);
    }
    current
}

fn apply_step<'a>(step: &Step, contexts: &[Hit<'a>]) -> Vec<Hit<'a>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for context in contexts {
        // Candidates arrive in axis order, so predicates see proximity positions.
        let mut candidates: Vec<Hit<'a>> = axis_items(step.axis, context)
            .into_iter()
            .filter(|hit| matches_test(step.axis, &step.test, hit))
            .collect();

        for predicate in &step.predicates {
            candidates = filter_by_predicate(predicate, candidates);
        }

        if step.axis.is_reverse() {
            candidates.reverse();
        }

        for hit in candidates {
            if seen.insert(identity(&hit)) {
                out.push(hit);
            }
        }
    }

    if contexts.len() > 1 && out.len() > 1 {
        DocumentOrder::default().sort(&mut out);
    }
    out
}

fn filter_by_predicate<'a>(predicate: &Expr, candidates: Vec<Hit<'a>>) -> Vec<Hit<'a>> {
    let size = candidates.len();
    candidates
        .into_iter()
        .enumerate()
        .filter(|(index, hit)| {
            let context = Context {
                item: hit.clone(),
                position: index + 1,
                size,
            };
            match evaluate(predicate, &context) {
                Value::Num(n) => n == (index + 1) as f64,
                other => other.to_bool(),
            }
        })
        .map(|(_, hit)| hit)
        .collect()
}

/// Merges two node-sets into one de-duplicated node-set in document order.
fn union<'a>(lhs: Vec<Hit<'a>>, rhs: Vec<Hit<'a>>) -> Vec<Hit<'a>> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Hit<'a>> = lhs
        .into_iter()
        .chain(rhs)
        .filter(|hit| seen.insert(identity(hit)))
        .collect();
    DocumentOrder::default().sort(&mut merged);
    merged
}

fn identity(hit: &Hit<'_>) -> (NodeId, Option<String>) {
    match hit {
        Hit::Node(node) => (node.id, None),
        Hit::Attribute { owner, name, .. } => (owner.id, Some(name.clone())),
    }
}

// === Axes and node tests ===

fn axis_items<'a>(axis: Axis, item: &Hit<'a>) -> Vec<Hit<'a>> {
    let node = match item {
        Hit::Node(node) => *node,
        Hit::Attribute { owner, .. } => return attribute_axis_items(axis, item, *owner),
    };

    let nodes = match axis {
        Axis::Attribute => return attributes(node),
        Axis::Namespace => return Vec::new(),
        Axis::Child => node.children(),
        Axis::Descendant => descendants(node),
        Axis::DescendantOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(descendants(node));
            nodes
        }
        Axis::SelfNode => vec![node],
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => ancestors(node),
        Axis::AncestorOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(ancestors(node));
            nodes
        }
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
        Axis::FollowingSibling => siblings(node, NodeRef::next_sibling),
        Axis::PrecedingSibling => siblings(node, NodeRef::prev_sibling),
    };
    nodes.into_iter().map(Hit::Node).collect()
}

/// Axes from an attribute: it has no children or siblings, its parent is the
/// owning element, and the owner's content follows it.
fn attribute_axis_items<'a>(axis: Axis, item: &Hit<'a>, owner: NodeRef<'a>) -> Vec<Hit<'a>> {
    let nodes = match axis {
        Axis::SelfNode | Axis::DescendantOrSelf => return vec![item.clone()],
        Axis::AncestorOrSelf => {
            let mut hits = vec![item.clone()];
            hits.extend(axis_items(Axis::AncestorOrSelf, &Hit::Node(owner)));
            return hits;
        }
        Axis::Parent => vec![owner],
        Axis::Ancestor => {
            let mut nodes = vec![owner];
            nodes.extend(ancestors(owner));
            nodes
        }
        Axis::Following => {
            let mut nodes = descendants(owner);
            nodes.extend(following(owner));
            nodes
        }
        Axis::Preceding => preceding(owner),
        Axis::Child
        | Axis::Descendant
        | Axis::FollowingSibling
        | Axis::PrecedingSibling
        | Axis::Attribute
        | Axis::Namespace => Vec::new(),
    };
    nodes.into_iter().map(Hit::Node).collect()
}

/// Attributes of an element, in source order.
fn attributes(owner: NodeRef<'_>) -> Vec<Hit<'_>> {
    owner
        .attrs()
        .into_iter()
        .map(|attr| Hit::Attribute {
            owner,
            name: match &attr.name.prefix {
                Some(prefix) => format!("{prefix}:{}", attr.name.local),
                None => attr.name.local.to_string(),
            },
            value: attr.value.to_string(),
        })
        .collect()
}

/// Pre-order descendants, excluding `node` itself.
fn descendants(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeRef<'_>> = node.children().into_iter().rev().collect();
    while let Some(next) = stack.pop() {
        out.push(next);
        stack.extend(next.children().into_iter().rev());
    }
    out
}

/// Ancestors, nearest first.
fn ancestors(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        current = parent.parent();
        out.push(parent);
    }
    out
}

fn siblings<'a>(
    node: NodeRef<'a>,
    next: impl Fn(&NodeRef<'a>) -> Option<NodeRef<'a>>,
) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut sibling = next(&node);
    while let Some(s) = sibling {
        sibling = next(&s);
        out.push(s);
    }
    out
}

/// Everything after `node` in document order, minus its descendants.
fn following(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut out = Vec::new();
    let mut current = Some(node);
    while let Some(c) = current {
        for sibling in siblings(c, NodeRef::next_sibling) {
            out.push(sibling);
            out.extend(descendants(sibling));
        }
        current = c.parent();
    }
    out
}

/// Everything before `node` in document order, minus its ancestors; nearest first.
fn preceding(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut out = Vec::new();
    let mut current = Some(node);
    while let Some(c) = current {
        for sibling in siblings(c, NodeRef::prev_sibling) {
            out.extend(descendants(sibling).into_iter().rev());
            out.push(sibling);
        }
        current = c.parent();
    }
    out
}

fn matches_test(axis: Axis, test: &NodeTest, hit: &Hit<'_>) -> bool {
    match (hit, test) {
        (_, NodeTest::AnyNode) => true,
        // The attribute axis selects attributes; every other axis selects elements by name.
        (Hit::Attribute { name, .. }, NodeTest::Name(wanted)) => {
            axis == Axis::Attribute && name.eq_ignore_ascii_case(wanted)
        }
        (Hit::Attribute { .. }, NodeTest::Wildcard) => axis == Axis::Attribute,
        (Hit::Attribute { name, .. }, NodeTest::PrefixWildcard(prefix)) => {
            axis == Axis::Attribute && has_prefix(name, prefix)
        }
        (Hit::Attribute { .. }, _) => false,
        (Hit::Node(node), NodeTest::Name(wanted)) => element_name(node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case(wanted)),
        (Hit::Node(node), NodeTest::Wildcard) => node.is_element(),
        (Hit::Node(node), NodeTest::PrefixWildcard(prefix)) => {
            element_name(node).is_some_and(|tag| has_prefix(&tag, prefix))
        }
        (Hit::Node(node), NodeTest::Text) => node.is_text(),
        (Hit::Node(node), NodeTest::Comment) => node.is_comment(),
        (Hit::Node(node), NodeTest::ProcessingInstruction(wanted)) => node
            .query(|n| match &n.data {
                NodeData::ProcessingInstruction { target, .. } => {
                    wanted.as_deref().is_none_or(|w| w == &**target)
                }
                _ => false,
            })
            .unwrap_or(false),
    }
}

fn element_name(node: &NodeRef<'_>) -> Option<String> {
    if node.is_element() {
        node.node_name().map(|tag| tag.to_string())
    } else {
        None
    }
}

fn has_prefix(name: &str, prefix: &str) -> bool {
    name.split_once(':')
        .is_some_and(|(p, _)| p.eq_ignore_ascii_case(prefix))
}

// === Document order ===

/// Computes document-order sort keys, caching sibling indexes.
///
/// A key is the chain of child indexes from the root, paired with 0 for a
/// node or 1 + the attribute's index for an attribute, so attributes sort
/// after their owner and before its children.
#[derive(Default)]
struct DocumentOrder {
    sibling_index: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    fn key(&mut self, hit: &Hit<'_>) -> (Vec<usize>, usize) {
        let node = hit.node();
        let mut chain = Vec::new();
        let mut current = node;
        while let Some(parent) = current.parent() {
            chain.push(self.index_of(current, parent));
            current = parent;
        }
        chain.reverse();

        let slot = match hit {
            Hit::Node(_) => 0,
            Hit::Attribute { name, .. } => attributes(node)
                .iter()
                .position(|attr| matches!(attr, Hit::Attribute { name: n, .. } if n == name))
                .map_or(1, |index| index + 1),
        };
        (chain, slot)
    }

    fn index_of(&mut self, node: NodeRef<'_>, parent: NodeRef<'_>) -> usize {
        if let Some(&index) = self.sibling_index.get(&node.id) {
            return index;
        }
        for (index, child) in parent.children().iter().enumerate() {
            self.sibling_index.insert(child.id, index);
        }
        self.sibling_index.get(&node.id).copied().unwrap_or(0)
    }

    fn sort(&mut self, hits: &mut Vec<Hit<'_>>) {
        let mut keyed: Vec<_> = hits.drain(..).map(|hit| (self.key(&hit), hit)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        hits.extend(keyed.into_iter().map(|(_, hit)| hit));
    }
}

// === Expressions ===

struct Context<'a> {
    item: Hit<'a>,
    position: usize,
    size: usize,
}

enum Value<'a> {
    Nodes(Vec<Hit<'a>>),
    Str(String),
    Num(f64),
    Bool(bool),
}

impl<'a> Value<'a> {
    fn to_bool(&self) -> bool {
        match self {
            Self::Nodes(hits) => !hits.is_empty(),
            Self::Str(s) => !s.is_empty(),
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::Bool(b) => *b,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Self::Num(n) => *n,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Str(_) | Self::Nodes(_) => string_to_number(&self.to_text()),
        }
    }

    /// XPath `string()` conversion: a node-set yields its first item's string value.
    fn to_text(&self) -> String {
        match self {
            Self::Nodes(hits) => hits.first().map(Hit::string_value).unwrap_or_default(),
            Self::Str(s) => s.clone(),
            Self::Num(n) => number_to_string(*n),
            Self::Bool(b) => b.to_string(),
        }
    }

    fn into_nodes(self) -> Vec<Hit<'a>> {
        match self {
            Self::Nodes(hits) => hits,
            _ => Vec::new(),
        }
    }
}

fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let well_formed = !trimmed.is_empty()
        && trimmed
            .strip_prefix('-')
            .unwrap_or(trimmed)
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.');
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// XPath `round()`: halves go towards positive infinity.
fn round_half_up(n: f64) -> f64 {
    if n.is_finite() {
        (n + 0.5).floor()
    } else {
        n
    }
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(length)`.
fn substring(text: &str, start: f64, length: Option<f64>) -> String {
    let first = round_half_up(start);
    let end = length.map_or(f64::INFINITY, |length| first + round_half_up(length));
    text.chars()
        .enumerate()
        .filter(|&(index, _)| {
            let position = (index + 1) as f64;
            position >= first && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn evaluate<'a>(expr: &Expr, ctx: &Context<'a>) -> Value<'a> {
    match expr {
        Expr::Or(lhs, rhs) => {
            Value::Bool(evaluate(lhs, ctx).to_bool() || evaluate(rhs, ctx).to_bool())
        }
        Expr::And(lhs, rhs) => {
            Value::Bool(evaluate(lhs, ctx).to_bool() && evaluate(rhs, ctx).to_bool())
        }
        Expr::Compare(op, lhs, rhs) => {
            Value::Bool(compare(*op, &evaluate(lhs, ctx), &evaluate(rhs, ctx)))
        }
        Expr::Arith(op, lhs, rhs) => {
            let a = evaluate(lhs, ctx).to_number();
            let b = evaluate(rhs, ctx).to_number();
            Value::Num(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Mod => a % b,
            })
        }
        Expr::Negate(inner) => Value::Num(-evaluate(inner, ctx).to_number()),
        Expr::Union(lhs, rhs) => Value::Nodes(union(
            evaluate(lhs, ctx).into_nodes(),
            evaluate(rhs, ctx).into_nodes(),
        )),
        Expr::Literal(text) => Value::Str(text.clone()),
        Expr::Number(n) => Value::Num(*n),
        Expr::Path(path) => Value::Nodes(select_path(path, &ctx.item)),
        Expr::Filter(filter) => {
            if filter.predicates.is_empty() && filter.steps.is_empty() {
                evaluate(&filter.primary, ctx)
            } else {
                Value::Nodes(select_filtered(filter, ctx))
            }
        }
        Expr::Call(function, args) => call(*function, args, ctx),
    }
}

fn call<'a>(function: Function, args: &[Expr], ctx: &Context<'a>) -> Value<'a> {
    let arg = |i: usize| {
        args.get(i)
            .map_or(Value::Nodes(Vec::new()), |expr| evaluate(expr, ctx))
    };
    // Zero-argument forms operate on the context item.
    let text_or_context = || {
        if args.is_empty() {
            ctx.item.string_value()
        } else {
            arg(0).to_text()
        }
    };
    let first_or_context = || {
        if args.is_empty() {
            Some(ctx.item.clone())
        } else {
            arg(0).into_nodes().into_iter().next()
        }
    };

    match function {
        Function::Position => Value::Num(ctx.position as f64),
        Function::Last => Value::Num(ctx.size as f64),
        Function::Count => Value::Num(arg(0).into_nodes().len() as f64),
        Function::Id => Value::Nodes(elements_by_id(&arg(0), ctx.item.node())),
        Function::Name => {
            Value::Str(first_or_context().map(|hit| hit.name()).unwrap_or_default())
        }
        Function::LocalName => Value::Str(
            first_or_context()
                .map(|hit| {
                    let name = hit.name();
                    match name.split_once(':') {
                        Some((_, local)) => local.to_string(),
                        None => name,
                    }
                })
                .unwrap_or_default(),
        ),
        // Documents are parsed as HTML, which carries no namespace URIs.
        Function::NamespaceUri => Value::Str(String::new()),

        Function::String => Value::Str(text_or_context()),
        Function::Concat => {
            Value::Str(args.iter().map(|a| evaluate(a, ctx).to_text()).collect())
        }
        Function::Contains => Value::Bool(arg(0).to_text().contains(&arg(1).to_text())),
        Function::StartsWith => Value::Bool(arg(0).to_text().starts_with(&arg(1).to_text())),
        Function::EndsWith => Value::Bool(arg(0).to_text().ends_with(&arg(1).to_text())),
        Function::SubstringBefore => {
            let text = arg(0).to_text();
            let needle = arg(1).to_text();
            Value::Str(
                text.find(&needle)
                    .map(|at| text[..at].to_string())
                    .unwrap_or_default(),
            )
        }
        Function::SubstringAfter => {
            let text = arg(0).to_text();
            let needle = arg(1).to_text();
            Value::Str(
                text.find(&needle)
                    .map(|at| text[at + needle.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        Function::Substring => {
            let length = (args.len() > 2).then(|| arg(2).to_number());
            Value::Str(substring(&arg(0).to_text(), arg(1).to_number(), length))
        }
        Function::StringLength => Value::Num(text_or_context().chars().count() as f64),
        Function::NormalizeSpace => Value::Str(
            text_or_context()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        ),
        Function::Translate => {
            let from: Vec<char> = arg(1).to_text().chars().collect();
            let to: Vec<char> = arg(2).to_text().chars().collect();
            Value::Str(
                arg(0)
                    .to_text()
                    .chars()
                    .filter_map(|c| match from.iter().position(|&f| f == c) {
                        Some(i) => to.get(i).copied(),
                        None => Some(c),
                    })
                    .collect(),
            )
        }

        Function::Boolean => Value::Bool(arg(0).to_bool()),
        Function::Not => Value::Bool(!arg(0).to_bool()),
        Function::True => Value::Bool(true),
        Function::False => Value::Bool(false),
        Function::Lang => Value::Bool(in_language(&ctx.item, &arg(0).to_text())),

        Function::Number => Value::Num(if args.is_empty() {
            string_to_number(&ctx.item.string_value())
        } else {
            arg(0).to_number()
        }),
        Function::Sum => Value::Num(
            arg(0)
                .into_nodes()
                .iter()
                .map(|hit| string_to_number(&hit.string_value()))
                .sum(),
        ),
        Function::Floor => Value::Num(arg(0).to_number().floor()),
        Function::Ceiling => Value::Num(arg(0).to_number().ceil()),
        Function::Round => Value::Num(round_half_up(arg(0).to_number())),
    }
}

/// Elements whose `id` is one of the whitespace-separated tokens in `ids`.
fn elements_by_id<'a>(ids: &Value<'a>, context: NodeRef<'a>) -> Vec<Hit<'a>> {
    let wanted: HashSet<String> = match ids {
        Value::Nodes(hits) => hits
            .iter()
            .flat_map(|hit| {
                hit.string_value()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect(),
        other => other
            .to_text()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    };
    if wanted.is_empty() {
        return Vec::new();
    }

    descendants(document_root(context))
        .into_iter()
        .filter(|node| {
            node.is_element()
                && node
                    .attr("id")
                    .is_some_and(|id| wanted.contains(&*id))
        })
        .map(Hit::Node)
        .collect()
}

/// `lang()`: the nearest `lang` or `xml:lang` on the context or its ancestors
/// equals `wanted` or starts with `wanted` followed by `-`, ignoring case.
fn in_language(item: &Hit<'_>, wanted: &str) -> bool {
    let wanted = wanted.to_ascii_lowercase();
    let declared = std::iter::once(item.node())
        .chain(ancestors(item.node()))
        .find_map(|node| {
            attributes(node).into_iter().find_map(|attr| match attr {
                Hit::Attribute { name, value, .. } if name == "lang" || name == "xml:lang" => {
                    Some(value.to_ascii_lowercase())
                }
                _ => None,
            })
        });
    declared.is_some_and(|lang| {
        lang == wanted
            || lang
                .strip_prefix(wanted.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
    })
}

/// XPath 1.0 comparison, including the existential rules for node-sets.
fn compare(op: CmpOp, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match (lhs, rhs) {
        (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|x| {
            let x = Value::Str(x.string_value());
            b.iter()
                .any(|y| compare_atoms(op, &x, &Value::Str(y.string_value())))
        }),
        (Value::Nodes(a), Value::Bool(_)) => {
            compare_atoms(op, &Value::Bool(!a.is_empty()), rhs)
        }
        (Value::Bool(_), Value::Nodes(b)) => {
            compare_atoms(op, lhs, &Value::Bool(!b.is_empty()))
        }
        (Value::Nodes(a), atom) => a
            .iter()
            .any(|x| compare_atoms(op, &Value::Str(x.string_value()), atom)),
        (atom, Value::Nodes(b)) => b
            .iter()
            .any(|y| compare_atoms(op.flipped(), &Value::Str(y.string_value()), atom)),
        (a, b) => compare_atoms(op, a, b),
    }
}

fn compare_atoms(op: CmpOp, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match op {
        CmpOp::Eq | CmpOp::Ne => {
            let equal = match (lhs, rhs) {
                (Value::Bool(_), _) | (_, Value::Bool(_)) => lhs.to_bool() == rhs.to_bool(),
                (Value::Num(_), _) | (_, Value::Num(_)) => lhs.to_number() == rhs.to_number(),
                _ => lhs.to_text() == rhs.to_text(),
            };
            equal == (op == CmpOp::Eq)
        }
        CmpOp::Lt => lhs.to_number() < rhs.to_number(),
        CmpOp::Le => lhs.to_number() <= rhs.to_number(),
        CmpOp::Gt => lhs.to_number() > rhs.to_number(),
        CmpOp::Ge => lhs.to_number() >= rhs.to_number(),
    }
}
