use indexmap::IndexMap;

use crate::codebase::{CallableId, Site};
use crate::types::UnionType;

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub union_type: UnionType,
    pub site: Site,
    /// Caller variable this binding aliases, for by-reference parameters
    /// bound during call-site analysis.
    pub reference_to: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, union_type: UnionType, site: Site) -> Self {
        Self {
            name: name.into(),
            union_type,
            site,
            reference_to: None,
        }
    }
}

/// Variables visible at a position. Lookups only consult the innermost
/// scope; PHP functions do not see enclosing locals. The parent chain ends
/// at the file's global scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    variables: IndexMap<String, Variable>,
    parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Inserts or replaces the binding for the variable's name.
    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn get_or_create(&mut self, name: &str, site: Site) -> &mut Variable {
        self.variables
            .entry(name.to_string())
            .or_insert_with(|| Variable::new(name, UnionType::empty(), site))
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.parent.as_deref()
    }

    pub fn set_parent(&mut self, parent: Scope) {
        self.parent = Some(Box::new(parent));
    }

    pub fn is_global(&self) -> bool {
        self.parent.is_none()
    }

    pub fn global_scope(&self) -> &Scope {
        let mut scope = self;
        while let Some(parent) = scope.parent.as_deref() {
            scope = parent;
        }
        scope
    }

    /// Removes the parent chain, leaving only this scope's own bindings.
    pub fn detached(&self) -> Scope {
        Scope {
            variables: self.variables.clone(),
            parent: None,
        }
    }
}

/// Where the analyzer is: file, line, scope chain and the enclosing class
/// and callable. Contexts are values; nested scopes get a derived copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    file: String,
    line: usize,
    scope: Scope,
    class: Option<String>,
    callable: Option<CallableId>,
}

impl Context {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: 0,
            scope: Scope::new(),
            class: None,
            callable: None,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn site(&self) -> Site {
        Site::new(self.file.clone(), self.line)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn callable(&self) -> Option<&CallableId> {
        self.callable.as_ref()
    }

    pub fn is_in_global_scope(&self) -> bool {
        self.callable.is_none()
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn without_class(mut self) -> Self {
        self.class = None;
        self
    }

    /// Enters a callable body. `scope` is the callable's own scope; its
    /// parent becomes the global scope of this context.
    pub fn with_callable(mut self, callable: CallableId, mut scope: Scope) -> Self {
        scope.set_parent(self.scope.global_scope().clone());
        self.scope = scope;
        self.callable = Some(callable);
        self
    }

    /// Same as [`Context::with_callable`] but keeps the line unchanged and
    /// returns a fresh value, leaving `self` usable.
    pub fn enter(&self, callable: CallableId, scope: Scope) -> Context {
        self.clone().with_callable(callable, scope)
    }

    /// Marks the closure literal as the enclosing callable without touching
    /// the scope.
    pub fn with_closure(mut self, closure: CallableId) -> Self {
        self.callable = Some(closure);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.scope.variable(name)
    }

    pub fn variable_type(&self, name: &str) -> UnionType {
        self.variable(name)
            .map(|variable| variable.union_type.clone())
            .unwrap_or_default()
    }
}
