use std::collections::HashSet;

use serde::Deserialize;

use crate::ast::{Node, NodeKind};
use crate::codebase::{CallableId, CodeBase, Parameter};
use crate::config::AnalysisConfig;
use crate::context::Context;
use crate::declarations::collect_declarations;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::LoadError;
use crate::source::SourceLookup;
use crate::types::{Type, UnionType};

/// A callable whose body is currently being re-analysed, together with the
/// parameter list it had before the call site speculated on it.
#[derive(Debug, Clone)]
pub(crate) struct Reanalysis {
    pub callee: CallableId,
    pub parameters: Vec<Parameter>,
}

/// Walks files in post-order and runs the semantic checks against a shared
/// code base.
pub struct Analyzer<'a> {
    pub(crate) codebase: &'a mut CodeBase,
    pub(crate) config: AnalysisConfig,
    pub(crate) sources: &'a dyn SourceLookup,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) reanalysis_stack: Vec<Reanalysis>,
    /// Callables whose body has been walked at least once.
    analyzed_bodies: HashSet<CallableId>,
    /// Set while walking a body again, where diagnostics already reported on
    /// an earlier walk are dropped.
    revisiting: bool,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        codebase: &'a mut CodeBase,
        config: AnalysisConfig,
        sources: &'a dyn SourceLookup,
    ) -> Self {
        Self {
            codebase,
            config,
            sources,
            diagnostics: Diagnostics::new(),
            reanalysis_stack: Vec::new(),
            analyzed_bodies: HashSet::new(),
            revisiting: false,
        }
    }

    pub fn config(&self) -> AnalysisConfig {
        self.config
    }

    pub fn codebase(&self) -> &CodeBase {
        &*self.codebase
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Analyzes one file whose declarations are already in the code base and
    /// returns the file's final global context.
    pub fn analyze_file(&mut self, file: &str, root: &Node) -> Context {
        tracing::debug!(file, "analyzing file");
        let context = Context::new(file).with_line(root.line);
        self.analyze_node(context, None, root)
    }

    /// Post-order traversal. Children see the context returned by their
    /// preceding sibling; the node itself is dispatched last.
    pub(crate) fn analyze_node(
        &mut self,
        context: Context,
        parent: Option<&Node>,
        node: &Node,
    ) -> Context {
        let context = context.with_line(node.line);
        match &node.kind {
            NodeKind::ClassDecl(class) => {
                let inner = context.clone().with_class(&class.name);
                self.analyze_node(inner, Some(node), &class.body);
                self.visit(context.clone(), parent, node);
                context
            }
            NodeKind::FunctionDecl(function) => {
                let callee = CallableId::function(&function.name);
                self.analyze_callable_body(&callee, &context);
                self.visit(context.clone(), parent, node);
                context
            }
            NodeKind::MethodDecl(method) => {
                if let Some(class) = context.class() {
                    let callee = CallableId::method(class, &method.name);
                    self.analyze_callable_body(&callee, &context);
                }
                self.visit(context.clone(), parent, node);
                context
            }
            NodeKind::Closure(closure) => {
                let callee = CallableId::closure(context.file(), node.line);
                self.capture_closure_uses(&context, &callee, closure);
                self.analyze_callable_body(&callee, &context);
                self.visit(context.clone(), parent, node);
                // The defining code continues in its own context, not the closure's.
                context
            }
            NodeKind::Foreach {
                subject,
                key,
                value,
                body,
                ..
            } => {
                let mut context = self.analyze_node(context, Some(node), subject);
                let subject_type = self.infer_quietly(&context, subject);
                if let Some(key) = key {
                    let key_type: UnionType = [Type::Int, Type::String].into_iter().collect();
                    self.bind_assignment(&mut context, key, &key_type);
                    context = self.analyze_node(context, Some(node), key);
                }
                self.bind_assignment(&mut context, value, &subject_type.element_types());
                context = self.analyze_node(context, Some(node), value);
                context = self.analyze_node(context, Some(node), body);
                self.visit(context.with_line(node.line), parent, node)
            }
            _ => {
                let mut context = context;
                for child in node.children() {
                    context = self.analyze_node(context, Some(node), child);
                }
                self.visit(context.with_line(node.line), parent, node)
            }
        }
    }

    /// Runs a callable's stored body in its stored scope, in the file and
    /// class it was declared in. `outer` only lends its global scope when it
    /// belongs to the same file. Returns the context at the end of the body.
    pub(crate) fn analyze_callable_body(
        &mut self,
        callee: &CallableId,
        outer: &Context,
    ) -> Option<Context> {
        let method = self.codebase.callable(callee)?;
        let body = method.body.clone()?;
        let file = method.site.file.as_str();
        let globals = if outer.file() == file {
            outer.clone()
        } else {
            Context::new(file)
        };
        let globals = match &method.class {
            Some(class) => globals.with_class(class),
            None => globals.without_class(),
        };
        let context = globals
            .enter(callee.clone(), method.scope.clone())
            .with_line(body.line);

        let revisiting = !self.analyzed_bodies.insert(callee.clone());
        let previous = std::mem::replace(&mut self.revisiting, revisiting);
        let context = self.analyze_node(context, None, &body);
        self.revisiting = previous;
        Some(context)
    }

    /// Copies the types of `use` variables from the defining scope into the
    /// closure's body scope.
    fn capture_closure_uses(
        &mut self,
        context: &Context,
        callee: &CallableId,
        closure: &crate::ast::ClosureDecl,
    ) {
        let site = context.site();
        let Some(method) = self.codebase.callable_mut(callee) else {
            return;
        };
        for captured in &closure.uses {
            let union_type = context.variable_type(&captured.name);
            let variable = method.scope.get_or_create(&captured.name, site.clone());
            variable.union_type.merge(&union_type);
        }
    }

    pub(crate) fn report(
        &mut self,
        kind: DiagnosticKind,
        context: &Context,
        message: impl Into<String>,
    ) {
        self.report_at(kind, context, context.line(), message);
    }

    pub(crate) fn report_at(
        &mut self,
        kind: DiagnosticKind,
        context: &Context,
        line: usize,
        message: impl Into<String>,
    ) {
        if self.revisiting {
            self.diagnostics.push_once(kind, message, context.file(), line);
        } else {
            self.diagnostics.push(kind, message, context.file(), line);
        }
    }

    /// Parameter list as declared, ignoring any speculation in progress.
    pub(crate) fn declared_parameters(&self, callee: &CallableId) -> Vec<Parameter> {
        if let Some(entry) = self
            .reanalysis_stack
            .iter()
            .find(|entry| &entry.callee == callee)
        {
            return entry.parameters.clone();
        }
        self.codebase
            .callable(callee)
            .map(|method| method.parameters.clone())
            .unwrap_or_default()
    }

    pub(crate) fn is_in_trait(&self, context: &Context) -> bool {
        context
            .class()
            .and_then(|class| self.codebase.class(class))
            .map(|class| class.is_trait)
            .unwrap_or(false)
    }
}

/// One input file: its path, its syntax tree and optionally its source text.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub root: Node,
    #[serde(default)]
    pub source: Option<String>,
}

impl SourceUnit {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        serde_json::from_str(text).map_err(|error| LoadError::Document(error.to_string()))
    }
}

#[derive(Debug)]
pub struct Analysis {
    pub codebase: CodeBase,
    pub diagnostics: Diagnostics,
}

/// Collects the declarations of every unit into one code base, then analyzes
/// the units in order.
pub fn analyze_units(
    units: &[SourceUnit],
    config: AnalysisConfig,
    sources: &dyn SourceLookup,
) -> Result<Analysis, LoadError> {
    let mut codebase = CodeBase::with_builtins();
    for unit in units {
        collect_declarations(&mut codebase, &unit.path, &unit.root)?;
    }
    let diagnostics = {
        let mut analyzer = Analyzer::new(&mut codebase, config, sources);
        for unit in units {
            analyzer.analyze_file(&unit.path, &unit.root);
        }
        analyzer.into_diagnostics()
    };
    Ok(Analysis {
        codebase,
        diagnostics,
    })
}
