//! Tree-expression queries
//!
//! A query string that is neither a plain filter nor a `/body/flags` regex
//! is evaluated as a path expression over the database node tree (database
//! root, zones, scopes, leaf events). The supported subset:
//!
//! - steps separated by `/`, with `//` selecting descendants
//! - name tests: a node name, `*` (any), `.` (self), `..` (parent)
//! - predicates: `[@attr]` (attribute exists), `[@attr='value']` or
//!   `[@attr=42]` (attribute equals), `[n]` (1-based position in the step
//!   result)
//!
//! Expressions evaluate against the database root whether or not they start
//! with `/`; the result is the node set after the last step, in first-visit
//! order with duplicates removed.

use crate::QueryError;
use tracedb_engine::NodeRef;
use tracedb_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    SelfNode,
    Parent,
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// `[n]` — 1-based position in the step result
    Index(usize),
    /// `[@name]` — attribute exists
    Has(String),
    /// `[@name=literal]` — attribute equals
    Equals(String, String),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

/// A parsed tree expression.
#[derive(Debug)]
pub struct TreeExpression {
    source: String,
    steps: Vec<Step>,
}

impl std::fmt::Display for TreeExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl TreeExpression {
    /// Parse an expression string
    pub fn parse(source: &str) -> Result<TreeExpression, QueryError> {
        let segments = split_segments(source)?;
        let mut steps = Vec::new();
        let mut pending_descendant = false;
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                if i == 0 {
                    // Leading '/': absolute path, evaluation starts at the
                    // root either way.
                    continue;
                }
                if pending_descendant {
                    return Err(QueryError::InvalidExpression(format!(
                        "empty step in `{source}`"
                    )));
                }
                pending_descendant = true;
                continue;
            }
            let axis = if pending_descendant {
                Axis::Descendant
            } else {
                Axis::Child
            };
            pending_descendant = false;
            steps.push(parse_step(segment, axis, source)?);
        }
        if pending_descendant || steps.is_empty() {
            return Err(QueryError::InvalidExpression(format!(
                "expression `{source}` has no steps"
            )));
        }
        Ok(TreeExpression {
            source: source.to_string(),
            steps,
        })
    }

    /// The original expression string
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the tree rooted at `root`; returns the matched node
    /// set in first-visit order.
    pub fn evaluate<'a>(&self, root: NodeRef<'a>) -> Vec<NodeRef<'a>> {
        let mut current = vec![root];
        for step in &self.steps {
            let mut next: Vec<NodeRef<'a>> = Vec::new();
            for node in &current {
                for candidate in step_candidates(*node, step) {
                    if !next.contains(&candidate) {
                        next.push(candidate);
                    }
                }
            }
            for predicate in &step.predicates {
                next = apply_predicate(next, predicate);
            }
            current = next;
        }
        current
    }
}

fn step_candidates<'a>(node: NodeRef<'a>, step: &Step) -> Vec<NodeRef<'a>> {
    match (&step.axis, &step.test) {
        (_, NameTest::SelfNode) => vec![node],
        (_, NameTest::Parent) => node.parent().into_iter().collect(),
        (Axis::Child, NameTest::Any) => node.children(),
        (Axis::Child, NameTest::Name(name)) => node.children_matching(Some(name)),
        (Axis::Descendant, NameTest::Any) => node.descendants(),
        (Axis::Descendant, NameTest::Name(name)) => node.descendants_matching(Some(name)),
    }
}

fn apply_predicate<'a>(nodes: Vec<NodeRef<'a>>, predicate: &Predicate) -> Vec<NodeRef<'a>> {
    match predicate {
        Predicate::Index(n) => nodes.get(n - 1).copied().into_iter().collect(),
        Predicate::Has(name) => nodes
            .into_iter()
            .filter(|node| node.attribute(name).is_some())
            .collect(),
        Predicate::Equals(name, literal) => nodes
            .into_iter()
            .filter(|node| match node.attribute(name) {
                Some(value) => attribute_equals(&value, literal),
                None => false,
            })
            .collect(),
    }
}

/// Numeric attributes compare numerically when the literal parses as a
/// number; everything else compares by display string.
fn attribute_equals(value: &Value, literal: &str) -> bool {
    match value {
        Value::Int(i) => literal
            .parse::<i64>()
            .map(|l| l == *i)
            .unwrap_or_else(|_| value.to_display_string() == literal),
        Value::Float(f) => literal
            .parse::<f64>()
            .map(|l| l == *f)
            .unwrap_or_else(|_| value.to_display_string() == literal),
        other => other.to_display_string() == literal,
    }
}

/// Split on `/` at bracket depth zero, respecting quoted literals.
fn split_segments(source: &str) -> Result<Vec<String>, QueryError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in source.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '[' => {
                    depth += 1;
                    current.push(c);
                }
                ']' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        QueryError::InvalidExpression(format!("unbalanced `]` in `{source}`"))
                    })?;
                    current.push(c);
                }
                '/' if depth == 0 => {
                    segments.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }
    if quote.is_some() {
        return Err(QueryError::InvalidExpression(format!(
            "unterminated quote in `{source}`"
        )));
    }
    if depth != 0 {
        return Err(QueryError::InvalidExpression(format!(
            "unbalanced `[` in `{source}`"
        )));
    }
    segments.push(current);
    Ok(segments)
}

fn parse_step(segment: &str, axis: Axis, source: &str) -> Result<Step, QueryError> {
    let segment = segment.trim();
    let name_end = segment.find('[').unwrap_or(segment.len());
    let (name, mut rest) = segment.split_at(name_end);
    let test = match name.trim() {
        "" => {
            return Err(QueryError::InvalidExpression(format!(
                "step without a name test in `{source}`"
            )))
        }
        "*" => NameTest::Any,
        "." => NameTest::SelfNode,
        ".." => NameTest::Parent,
        other => NameTest::Name(other.to_string()),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = rest.find(']').ok_or_else(|| {
            QueryError::InvalidExpression(format!("unterminated predicate in `{source}`"))
        })?;
        let inner = rest[1..close].trim();
        predicates.push(parse_predicate(inner, source)?);
        rest = &rest[close + 1..];
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_predicate(inner: &str, source: &str) -> Result<Predicate, QueryError> {
    if let Some(attr) = inner.strip_prefix('@') {
        return match attr.split_once('=') {
            None => Ok(Predicate::Has(attr.trim().to_string())),
            Some((name, literal)) => {
                let name = name.trim();
                let literal = literal.trim();
                let literal = literal
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| {
                        literal
                            .strip_prefix('"')
                            .and_then(|s| s.strip_suffix('"'))
                    })
                    .unwrap_or(literal);
                Ok(Predicate::Equals(name.to_string(), literal.to_string()))
            }
        };
    }
    match inner.parse::<usize>() {
        Ok(0) => Err(QueryError::InvalidExpression(format!(
            "positions are 1-based in `{source}`"
        ))),
        Ok(n) => Ok(Predicate::Index(n)),
        Err(_) => Err(QueryError::InvalidExpression(format!(
            "unsupported predicate `[{inner}]` in `{source}`"
        ))),
    }
}
