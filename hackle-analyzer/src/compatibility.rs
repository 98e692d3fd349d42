use crate::analyzer::Analyzer;
use crate::ast::{Name, Node, NodeKind};
use crate::context::Context;
use crate::diagnostics::DiagnosticKind;

/// Braces that pin `$$a[..]` to one reading.
fn has_variable_variable_braces(line: &str) -> bool {
    line.contains('{') && line.contains('}')
}

/// Braces that pin `$o->$p[..]` and `C::$p[..]` to one reading.
fn has_property_braces(line: &str) -> bool {
    ["}[", "]}", ">{", ":{"]
        .iter()
        .any(|pattern| line.contains(pattern))
}

/// `$$name` with one `$` per level of indirection.
fn render_variable_variable(node: &Node) -> Option<String> {
    let mut levels = 0;
    let mut current = node;
    loop {
        match &current.kind {
            NodeKind::Variable(Name::Dynamic(inner)) => {
                levels += 1;
                current = inner;
            }
            NodeKind::Variable(Name::Literal(name)) if levels > 0 => {
                return Some(format!("{}{}", "$".repeat(levels + 1), name));
            }
            _ => return None,
        }
    }
}

fn render_dynamic_property_name(name: &Name) -> Option<String> {
    match &name.dynamic()?.kind {
        NodeKind::Variable(Name::Literal(property)) => Some(format!("${property}")),
        _ => None,
    }
}

impl<'a> Analyzer<'a> {
    /// Warns about array accesses on variable variables and dynamic property
    /// names that PHP 5 and PHP 7 group differently, unless the source line
    /// spells the grouping out with braces.
    pub(crate) fn check_backward_compatibility(&mut self, context: &Context, node: &Node) {
        if !self.config.backward_compatibility_checks {
            return;
        }
        let NodeKind::Dim { base, .. } = &node.kind else {
            return;
        };
        let mut innermost = base.as_ref();
        while let NodeKind::Dim { base, .. } = &innermost.kind {
            innermost = base;
        }

        let (text, is_property) = match &innermost.kind {
            NodeKind::Variable(Name::Dynamic(_)) => match render_variable_variable(innermost) {
                Some(text) => (text, false),
                None => return,
            },
            NodeKind::Prop { object, name } => {
                let (NodeKind::Variable(Name::Literal(object)), Some(property)) =
                    (&object.kind, render_dynamic_property_name(name))
                else {
                    return;
                };
                (format!("${object}->{property}"), true)
            }
            NodeKind::StaticProp { class, name } => {
                let (NodeKind::Name(class), Some(property)) =
                    (&class.kind, render_dynamic_property_name(name))
                else {
                    return;
                };
                (format!("{class}::{property}"), true)
            }
            _ => return,
        };

        let Some(line) = self.sources.line(context.file(), node.line) else {
            tracing::debug!(
                file = context.file(),
                line = node.line,
                "source line unavailable; skipping compatibility check"
            );
            return;
        };
        let braced = if is_property {
            has_property_braces(line)
        } else {
            has_variable_variable_braces(line)
        };
        if braced {
            return;
        }
        self.report_at(
            DiagnosticKind::CompatibilityRisk,
            context,
            node.line,
            format!("Expression may not be PHP 7 compatible: {text}[]"),
        );
    }
}
