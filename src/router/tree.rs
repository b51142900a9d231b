//! Segment trie used to match request paths.
//!
//! Patterns and paths are split on `/` and empty segments are dropped, so
//! `/subject/42`, `subject/42/` and `//subject//42` all walk the same nodes.
//! A node has any number of literal children and at most one parameter child.
//! Lookup prefers the literal child and falls back to the parameter child when
//! the literal branch has no route for the rest of the path.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::context::HandlerFn;
use crate::router::error::RouteError;

/// Prefix marking a parameter segment in a route pattern.
pub const PARAM_MARKER: char = ':';

/// Split a pattern or a request path into its non-empty segments.
fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Split a request path and percent-decode each segment.
///
/// Decoding happens after the split, so an encoded `%2F` stays inside its
/// segment. A segment that does not decode to UTF-8 is kept as sent.
fn decode_segments(path: &str) -> Vec<Cow<'_, str>> {
    split_segments(path)
        .into_iter()
        .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
        .collect()
}

/// What a node that terminates a registered route carries.
struct Endpoint {
    pattern: String,
    handlers: Arc<[HandlerFn]>,
    /// Segment index and name of every parameter along the route.
    params: Vec<(usize, String)>,
}

/// One segment of the trie.
pub struct RouteNode {
    segment: String,
    param_name: Option<String>,
    children: Vec<RouteNode>,
    param_child: Option<Box<RouteNode>>,
    endpoint: Option<Endpoint>,
}

impl RouteNode {
    fn root() -> Self {
        Self::literal("")
    }

    fn literal(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            param_name: None,
            children: Vec::new(),
            param_child: None,
            endpoint: None,
        }
    }

    fn param(name: &str) -> Self {
        Self {
            param_name: Some(name.to_string()),
            ..Self::literal(&format!("{PARAM_MARKER}{name}"))
        }
    }

    /// The segment label: the literal text, or `:name` for a parameter.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn param_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    /// The pattern this node was registered under, if it ends a route.
    pub fn pattern(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|endpoint| endpoint.pattern.as_str())
    }

    /// The handler chain of the route ending here; empty for inner nodes.
    pub fn handlers(&self) -> Arc<[HandlerFn]> {
        match &self.endpoint {
            Some(endpoint) => Arc::clone(&endpoint.handlers),
            None => Arc::new([]),
        }
    }

    fn is_endpoint(&self) -> bool {
        self.endpoint
            .as_ref()
            .is_some_and(|endpoint| !endpoint.handlers.is_empty())
    }

    /// Collect the parameters of `path`, which must be a path this node matched.
    ///
    /// Uses the same segment split and decoding as matching, so positions
    /// line up and values are percent-decoded.
    pub fn parse_params(&self, path: &str) -> HashMap<String, String> {
        let Some(endpoint) = &self.endpoint else {
            return HashMap::new();
        };
        let segments = decode_segments(path);
        endpoint
            .params
            .iter()
            .filter_map(|(position, name)| {
                segments
                    .get(*position)
                    .map(|value| (name.clone(), value.to_string()))
            })
            .collect()
    }

    fn find(&self, segments: &[&str]) -> Option<&RouteNode> {
        let Some((first, rest)) = segments.split_first() else {
            return self.is_endpoint().then_some(self);
        };

        let literal = self
            .children
            .iter()
            .find(|child| child.segment == *first)
            .and_then(|child| child.find(rest));

        literal.or_else(|| self.param_child.as_deref().and_then(|child| child.find(rest)))
    }

    fn collect_patterns<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(pattern) = self.pattern() {
            out.push(pattern);
        }
        for child in &self.children {
            child.collect_patterns(out);
        }
        if let Some(child) = &self.param_child {
            child.collect_patterns(out);
        }
    }
}

/// The routes registered for one HTTP method.
pub struct Tree {
    root: RouteNode,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self { root: RouteNode::root() }
    }

    /// Register `handlers` under `pattern`.
    ///
    /// A segment starting with `:` is a parameter. Every route passing through
    /// the same position must use the same parameter name there, and one
    /// pattern may not use a name twice.
    ///
    /// Registering a pattern that already has handlers replaces them, and only
    /// a warning is logged. Patterns that differ only in parameter placement
    /// versus a literal (`/users/:id` and `/users/admin`) coexist; the literal
    /// wins at lookup.
    pub fn add_route(&mut self, pattern: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        let mut node = &mut self.root;
        let mut params: Vec<(usize, String)> = Vec::new();

        for (position, segment) in split_segments(pattern).into_iter().enumerate() {
            if let Some(name) = segment.strip_prefix(PARAM_MARKER) {
                if name.is_empty() {
                    return Err(RouteError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: "parameter segment without a name",
                    });
                }
                if params.iter().any(|(_, seen)| seen == name) {
                    return Err(RouteError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: "parameter name used twice",
                    });
                }
                if let Some(existing) = node.param_child.as_ref().and_then(|child| child.param_name.as_deref()) {
                    if existing != name {
                        return Err(RouteError::ParamConflict {
                            pattern: pattern.to_string(),
                            position,
                            existing: existing.to_string(),
                            conflicting: name.to_string(),
                        });
                    }
                }
                params.push((position, name.to_string()));
                node = &mut **node
                    .param_child
                    .get_or_insert_with(|| Box::new(RouteNode::param(name)));
            } else {
                let index = match node.children.iter().position(|child| child.segment == segment) {
                    Some(index) => index,
                    None => {
                        node.children.push(RouteNode::literal(segment));
                        node.children.len() - 1
                    }
                };
                node = &mut node.children[index];
            }
        }

        if let Some(previous) = &node.endpoint {
            warn!(
                "Route {pattern} replaces handlers previously registered as {previous}",
                previous = previous.pattern
            );
        }
        node.endpoint = Some(Endpoint {
            pattern: pattern.to_string(),
            handlers: handlers.into(),
            params,
        });
        Ok(())
    }

    /// Find the node whose route matches `path`.
    ///
    /// Returns `None` when no registered route matches, including when the
    /// path only reaches an inner node.
    pub fn match_node(&self, path: &str) -> Option<&RouteNode> {
        let decoded = decode_segments(path);
        let segments: Vec<&str> = decoded.iter().map(AsRef::as_ref).collect();
        self.root.find(&segments)
    }

    /// All registered patterns, literal branches before parameter branches.
    pub fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_patterns(&mut out);
        out
    }
}
