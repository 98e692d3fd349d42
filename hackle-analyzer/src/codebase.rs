use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Node;
use crate::context::Scope;
use crate::types::{Type, UnionType};

/// Where a symbol or variable was declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Site {
    pub file: String,
    pub line: usize,
}

impl Site {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn internal() -> Self {
        Self::new("internal", 0)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Stable key of a method, function or closure in the code base. Names are
/// stored lowercased since PHP resolves them case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallableId {
    Function(String),
    Method { class: String, method: String },
}

impl CallableId {
    pub fn function(name: &str) -> Self {
        CallableId::Function(normalize(name))
    }

    pub fn method(class: &str, method: &str) -> Self {
        CallableId::Method {
            class: normalize(class),
            method: method.to_ascii_lowercase(),
        }
    }

    /// Synthesized identity of the closure literal at `file:line`.
    pub fn closure(file: &str, line: usize) -> Self {
        CallableId::Function(closure_name(file, line))
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableId::Function(name) => f.write_str(name),
            CallableId::Method { class, method } => write!(f, "{class}::{method}"),
        }
    }
}

pub(crate) fn closure_name(file: &str, line: usize) -> String {
    format!("{{closure}}:{file}:{line}")
}

fn normalize(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub union_type: UnionType,
    pub is_reference: bool,
    pub is_optional: bool,
    pub is_variadic: bool,
    pub site: Site,
}

impl Parameter {
    pub fn new(name: impl Into<String>, union_type: UnionType, site: Site) -> Self {
        Self {
            name: name.into(),
            union_type,
            is_reference: false,
            is_optional: false,
            is_variadic: false,
            site,
        }
    }

    pub fn by_reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self.is_optional = true;
        self
    }
}

/// A function, method or closure.
#[derive(Debug, Clone)]
pub struct Method {
    pub id: CallableId,
    /// Display name: `foo` or `Foo::bar`.
    pub name: String,
    pub class: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: UnionType,
    /// Set once the return type is being inferred from return statements
    /// rather than taken from a declaration.
    pub is_return_type_undefined: bool,
    pub reference_count: usize,
    pub site: Site,
    pub is_internal: bool,
    pub is_static: bool,
    pub(crate) body: Option<Rc<Node>>,
    pub(crate) scope: Scope,
}

impl Method {
    pub fn new(id: CallableId, name: impl Into<String>, site: Site) -> Self {
        Self {
            id,
            name: name.into(),
            class: None,
            parameters: Vec::new(),
            return_type: UnionType::empty(),
            is_return_type_undefined: false,
            reference_count: 0,
            site,
            is_internal: false,
            is_static: false,
            body: None,
            scope: Scope::default(),
        }
    }

    pub fn internal(name: &str, parameters: Vec<Parameter>, return_type: UnionType) -> Self {
        let mut method = Method::new(CallableId::function(name), name, Site::internal());
        method.parameters = parameters;
        method.return_type = return_type;
        method.is_internal = true;
        method
    }

    pub fn record_usage(&mut self) {
        self.reference_count += 1;
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn body(&self) -> Option<&Node> {
        self.body.as_deref()
    }

    pub fn required_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|parameter| !parameter.is_optional)
            .count()
    }

    pub fn is_variadic(&self) -> bool {
        self.parameters
            .last()
            .map(|parameter| parameter.is_variadic)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub union_type: UnionType,
    pub is_static: bool,
    pub reference_count: usize,
    pub site: Site,
}

impl Property {
    pub fn new(name: impl Into<String>, union_type: UnionType, site: Site) -> Self {
        Self {
            name: name.into(),
            union_type,
            is_static: false,
            reference_count: 0,
            site,
        }
    }

    pub fn record_usage(&mut self) {
        self.reference_count += 1;
    }
}

/// A global or class constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub union_type: UnionType,
    pub reference_count: usize,
    pub site: Site,
}

impl Constant {
    pub fn new(name: impl Into<String>, union_type: UnionType, site: Site) -> Self {
        Self {
            name: name.into(),
            union_type,
            reference_count: 0,
            site,
        }
    }

    pub fn record_usage(&mut self) {
        self.reference_count += 1;
    }
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub parent: Option<String>,
    pub is_trait: bool,
    pub reference_count: usize,
    pub site: Site,
    methods: IndexMap<String, Method>,
    properties: IndexMap<String, Property>,
    constants: IndexMap<String, Constant>,
}

impl Class {
    pub fn new(name: &str, site: Site) -> Self {
        Self {
            name: name.trim_start_matches('\\').to_string(),
            parent: None,
            is_trait: false,
            reference_count: 0,
            site,
            methods: IndexMap::new(),
            properties: IndexMap::new(),
            constants: IndexMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.trim_start_matches('\\').to_string());
        self
    }

    pub fn record_usage(&mut self) {
        self.reference_count += 1;
    }

    pub fn union_type(&self) -> UnionType {
        UnionType::of(Type::class(&self.name))
    }

    /// Adds a method unless one with the same name exists.
    pub fn add_method(&mut self, method: Method) -> bool {
        let key = method.name.rsplit("::").next().unwrap_or(&method.name);
        let key = key.to_ascii_lowercase();
        if self.methods.contains_key(&key) {
            return false;
        }
        self.methods.insert(key, method);
        true
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(&name.to_ascii_lowercase())
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    pub fn add_property(&mut self, property: Property) {
        self.properties
            .entry(property.name.clone())
            .or_insert(property);
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn add_constant(&mut self, constant: Constant) {
        self.constants
            .entry(constant.name.clone())
            .or_insert(constant);
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name)
    }
}

/// Every class, function, closure and constant known to the analysis run.
#[derive(Debug, Clone, Default)]
pub struct CodeBase {
    classes: IndexMap<String, Class>,
    functions: IndexMap<String, Method>,
    constants: IndexMap<String, Constant>,
}

impl CodeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A code base seeded with the internal functions the analyzer knows.
    pub fn with_builtins() -> Self {
        let mut codebase = Self::new();
        let site = Site::internal;
        let ty = |raw: &str| UnionType::from_declaration(raw, None).unwrap_or_default();
        let builtins = [
            Method::internal(
                "strlen",
                vec![Parameter::new("string", ty("string"), site())],
                ty("int"),
            ),
            Method::internal(
                "count",
                vec![
                    Parameter::new("value", ty("array"), site()),
                    Parameter::new("mode", ty("int"), site()).optional(),
                ],
                ty("int"),
            ),
            Method::internal(
                "is_array",
                vec![Parameter::new("value", ty("mixed"), site())],
                ty("bool"),
            ),
            Method::internal(
                "array_push",
                vec![
                    Parameter::new("array", ty("array"), site()).by_reference(),
                    Parameter::new("values", ty("mixed"), site()).variadic(),
                ],
                ty("int"),
            ),
            Method::internal(
                "sprintf",
                vec![
                    Parameter::new("format", ty("string"), site()),
                    Parameter::new("values", ty("mixed"), site()).variadic(),
                ],
                ty("string"),
            ),
            Method::internal(
                "implode",
                vec![
                    Parameter::new("separator", ty("string"), site()),
                    Parameter::new("array", ty("array"), site()),
                ],
                ty("string"),
            ),
            Method::internal(
                "in_array",
                vec![
                    Parameter::new("needle", ty("mixed"), site()),
                    Parameter::new("haystack", ty("array"), site()),
                    Parameter::new("strict", ty("bool"), site()).optional(),
                ],
                ty("bool"),
            ),
            Method::internal(
                "preg_match",
                vec![
                    Parameter::new("pattern", ty("string"), site()),
                    Parameter::new("subject", ty("string"), site()),
                    Parameter::new("matches", ty("string[]"), site())
                        .by_reference()
                        .optional(),
                ],
                ty("int|bool"),
            ),
        ];
        for builtin in builtins {
            codebase.add_function(builtin);
        }
        codebase.add_class(Class::new("Closure", Site::internal()));
        codebase
    }

    /// Adds a class unless one with the same name exists.
    pub fn add_class(&mut self, class: Class) -> bool {
        let key = normalize(&class.name);
        if self.classes.contains_key(&key) {
            return false;
        }
        self.classes.insert(key, class);
        true
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(&normalize(name))
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(&normalize(name))
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes.get_mut(&normalize(name))
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    /// Adds a function or closure unless one with the same identity exists.
    pub fn add_function(&mut self, function: Method) -> bool {
        let CallableId::Function(key) = &function.id else {
            return false;
        };
        if self.functions.contains_key(key) {
            return false;
        }
        self.functions.insert(key.clone(), function);
        true
    }

    pub fn function(&self, name: &str) -> Option<&Method> {
        self.functions.get(&normalize(name))
    }

    pub fn functions(&self) -> impl Iterator<Item = &Method> {
        self.functions.values()
    }

    pub fn add_constant(&mut self, constant: Constant) -> bool {
        if self.constants.contains_key(&constant.name) {
            return false;
        }
        self.constants.insert(constant.name.clone(), constant);
        true
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name.trim_start_matches('\\'))
    }

    pub fn constant_mut(&mut self, name: &str) -> Option<&mut Constant> {
        self.constants.get_mut(name.trim_start_matches('\\'))
    }

    pub fn callable(&self, id: &CallableId) -> Option<&Method> {
        match id {
            CallableId::Function(name) => self.functions.get(name),
            CallableId::Method { class, method } => self.classes.get(class)?.methods.get(method),
        }
    }

    pub fn callable_mut(&mut self, id: &CallableId) -> Option<&mut Method> {
        match id {
            CallableId::Function(name) => self.functions.get_mut(name),
            CallableId::Method { class, method } => {
                self.classes.get_mut(class)?.methods.get_mut(method)
            }
        }
    }

    /// Parent chain of a class, nearest first. Stops at unknown classes and
    /// at inheritance cycles.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut ancestors: Vec<String> = Vec::new();
        let mut current = self.class(name).and_then(|class| class.parent.clone());
        while let Some(parent) = current {
            if normalize(&parent) == normalize(name)
                || ancestors
                    .iter()
                    .any(|seen| seen.eq_ignore_ascii_case(&parent))
            {
                break;
            }
            current = self.class(&parent).and_then(|class| class.parent.clone());
            ancestors.push(parent);
        }
        ancestors
    }

    /// The class itself followed by its ancestors, limited to known classes.
    fn lineage(&self, name: &str) -> Vec<String> {
        let mut lineage = vec![name.to_string()];
        lineage.extend(self.ancestors(name));
        lineage.retain(|class| self.has_class(class));
        lineage
    }

    /// Finds a method on the class or the nearest ancestor declaring it.
    pub fn find_method(&self, class: &str, method: &str) -> Option<CallableId> {
        self.lineage(class).into_iter().find_map(|owner| {
            self.class(&owner)?
                .method(method)
                .map(|found| found.id.clone())
        })
    }

    /// Name of the class (the given one or an ancestor) declaring `property`.
    pub fn find_property(&self, class: &str, property: &str) -> Option<String> {
        self.lineage(class).into_iter().find(|owner| {
            self.class(owner)
                .map(|candidate| candidate.property(property).is_some())
                .unwrap_or(false)
        })
    }

    pub fn property_mut(&mut self, class: &str, property: &str) -> Option<&mut Property> {
        let owner = self.find_property(class, property)?;
        self.class_mut(&owner)?.properties.get_mut(property)
    }

    /// Returns the property, declaring it on `class` when no class in the
    /// lineage has it. `None` only when `class` itself is unknown.
    pub fn get_or_create_property(
        &mut self,
        class: &str,
        property: &str,
        site: Site,
    ) -> Option<&mut Property> {
        let owner = self
            .find_property(class, property)
            .unwrap_or_else(|| class.to_string());
        let owner = self.class_mut(&owner)?;
        Some(
            owner
                .properties
                .entry(property.to_string())
                .or_insert_with(|| Property::new(property, UnionType::empty(), site)),
        )
    }

    pub fn find_class_constant(&self, class: &str, constant: &str) -> Option<String> {
        self.lineage(class).into_iter().find(|owner| {
            self.class(owner)
                .map(|candidate| candidate.constant(constant).is_some())
                .unwrap_or(false)
        })
    }

    pub fn class_constant_mut(&mut self, class: &str, constant: &str) -> Option<&mut Constant> {
        let owner = self.find_class_constant(class, constant)?;
        self.class_mut(&owner)?.constants.get_mut(constant)
    }
}
