//! Call-site extraction
//!
//! Walks a syntax dump and collects every literal regex pattern handed to the
//! configured regex module. Resolution is import-alias aware: `import re as
//! r` makes `r.compile(..)` a hit, `from re import compile as c` makes
//! `c(..)` one. Anything that cannot be statically resolved to the configured
//! module, and any call whose first argument is not a string literal, is
//! skipped without a diagnostic. The extractor under-approximates on purpose;
//! it never guesses.
//!
//! Traversal uses an explicit work list rather than recursion, so dumps of
//! arbitrary depth cannot exhaust the host stack.

use crate::ast::{Node, SourceTree};
use crate::config::ExtractConfig;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// A literal pattern found at a call site, addressed by file and line.
///
/// The derived ordering (file, then line, then pattern) is the report order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternSite {
    pub file: String,
    pub line: usize,
    pub pattern: String,
    /// Resolved name of the called function, e.g. `search` for both
    /// `re.search(..)` and an aliased `from re import search as s; s(..)`.
    pub call: String,
}

/// Import bindings accumulated while walking a single file.
#[derive(Debug, Default)]
struct Bindings {
    /// Names bound to the configured module itself (`re`, or `r` after
    /// `import re as r`).
    modules: HashSet<String>,
    /// Local name to target function, from `from re import ...` forms.
    functions: HashMap<String, String>,
}

/// Extracts pattern sites from syntax dumps.
#[derive(Debug, Clone)]
pub struct Extractor {
    module: String,
    functions: HashSet<String>,
}

impl Extractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            module: config.module.clone(),
            functions: config.functions.iter().cloned().collect(),
        }
    }

    /// Collects every resolvable literal-pattern call site in the tree, in
    /// document order.
    pub fn extract(&self, tree: &SourceTree) -> Vec<PatternSite> {
        let mut sites = Vec::new();
        let mut bindings = Bindings::default();

        // Preorder walk in document order; bindings take effect from the
        // point of import onward, matching runtime name resolution.
        let mut work: Vec<&Node> = vec![&tree.root];
        while let Some(node) = work.pop() {
            match node {
                Node::Import { module, alias, .. } => {
                    if module == &self.module {
                        let bound = alias.as_deref().unwrap_or(module);
                        bindings.modules.insert(bound.to_string());
                    }
                }
                Node::ImportFrom { module, names, .. } => {
                    if module == &self.module {
                        for imported in names {
                            if imported.name == "*" {
                                trace!(file = %tree.file, "star import is not resolvable");
                                continue;
                            }
                            let bound = imported.alias.as_deref().unwrap_or(&imported.name);
                            bindings
                                .functions
                                .insert(bound.to_string(), imported.name.clone());
                        }
                    }
                }
                Node::Call { line, func, args } => {
                    if let Some(call) = self.resolve_call(func, &bindings) {
                        match args.first() {
                            Some(Node::Str { value }) => sites.push(PatternSite {
                                file: tree.file.clone(),
                                line: *line,
                                pattern: value.clone(),
                                call,
                            }),
                            _ => {
                                // Dynamically built patterns are out of scope.
                                trace!(file = %tree.file, line, "first argument is not a string literal");
                            }
                        }
                    }
                    // Arguments may themselves contain calls.
                    push_children(&mut work, node);
                }
                _ => push_children(&mut work, node),
            }
        }
        sites
    }

    /// Resolves a callee expression against the current bindings. Returns the
    /// target function name when the call lands on the configured module's
    /// allowlist, `None` otherwise.
    fn resolve_call(&self, func: &Node, bindings: &Bindings) -> Option<String> {
        match func {
            Node::Attr { object, name } => {
                let Node::Name { id } = object.as_ref() else {
                    return None;
                };
                if bindings.modules.contains(id) && self.functions.contains(name) {
                    return Some(name.clone());
                }
                None
            }
            Node::Name { id } => {
                let target = bindings.functions.get(id)?;
                if self.functions.contains(target) {
                    return Some(target.clone());
                }
                None
            }
            _ => None,
        }
    }
}

/// Pushes child nodes in reverse so the stack pops them in document order.
fn push_children<'a>(work: &mut Vec<&'a Node>, node: &'a Node) {
    match node {
        Node::Module { body } => work.extend(body.iter().rev()),
        Node::Other { children, .. } => work.extend(children.iter().rev()),
        Node::Call { func, args, .. } => {
            work.extend(args.iter().rev());
            work.push(func);
        }
        Node::Attr { object, .. } => work.push(object),
        _ => {}
    }
}
