use std::rc::Rc;

use crate::ast::{ClassDecl, ConstDecl, Node, NodeKind, ParameterDecl, PropertyDecl};
use crate::codebase::{CallableId, Class, CodeBase, Constant, Method, Parameter, Property, Site};
use crate::context::{Scope, Variable};
use crate::error::LoadError;
use crate::inference::literal_type;
use crate::types::{Type, UnionType};

/// Registers every class, function, method, closure, property and constant
/// declared in `root`. Runs before analysis so that calls may refer to
/// symbols declared later in the file or in later files.
pub fn collect_declarations(
    codebase: &mut CodeBase,
    file: &str,
    root: &Node,
) -> Result<(), LoadError> {
    let mut collector = Collector {
        codebase,
        file,
        classes: Vec::new(),
    };
    collector.collect(root)
}

struct Collector<'a> {
    codebase: &'a mut CodeBase,
    file: &'a str,
    classes: Vec<String>,
}

/// Shape shared by functions, methods and closures.
struct CallableDecl<'n> {
    id: CallableId,
    name: String,
    parameters: &'n [ParameterDecl],
    return_type: Option<&'n str>,
    is_static: bool,
    body: Option<&'n Node>,
    line: usize,
}

impl<'a> Collector<'a> {
    fn site(&self, line: usize) -> Site {
        Site::new(self.file, line)
    }

    fn current_class(&self) -> Option<&str> {
        self.classes.last().map(String::as_str)
    }

    fn collect(&mut self, node: &Node) -> Result<(), LoadError> {
        match &node.kind {
            NodeKind::ClassDecl(class) => return self.collect_class(node, class),
            NodeKind::FunctionDecl(function) => {
                let method = self.build_callable(CallableDecl {
                    id: CallableId::function(&function.name),
                    name: function.name.trim_start_matches('\\').to_string(),
                    parameters: &function.parameters,
                    return_type: function.return_type.as_deref(),
                    is_static: false,
                    body: Some(&function.body),
                    line: node.line,
                })?;
                if !self.codebase.add_function(method) {
                    tracing::debug!(function = %function.name, "duplicate function ignored");
                    return Ok(());
                }
            }
            NodeKind::MethodDecl(method) => {
                let Some(class) = self.current_class().map(str::to_string) else {
                    return Ok(());
                };
                let declared = self.build_callable(CallableDecl {
                    id: CallableId::method(&class, &method.name),
                    name: format!("{}::{}", class, method.name),
                    parameters: &method.parameters,
                    return_type: method.return_type.as_deref(),
                    is_static: method.is_static,
                    body: method.body.as_deref(),
                    line: node.line,
                })?;
                if let Some(owner) = self.codebase.class_mut(&class) {
                    owner.add_method(declared);
                }
            }
            NodeKind::Closure(closure) => {
                let method = self.build_callable(CallableDecl {
                    id: CallableId::closure(self.file, node.line),
                    name: "{closure}".to_string(),
                    parameters: &closure.parameters,
                    return_type: closure.return_type.as_deref(),
                    is_static: closure.is_static,
                    body: Some(&closure.body),
                    line: node.line,
                })?;
                self.codebase.add_function(method);
            }
            NodeKind::PropertyDecl(property) => self.collect_property(node, property)?,
            NodeKind::ClassConstDecl(constant) => {
                let site = self.site(node.line);
                let constant = Constant::new(&constant.name, literal_type(&constant.value), site);
                if let Some(class) = self.current_class().map(str::to_string) {
                    if let Some(owner) = self.codebase.class_mut(&class) {
                        owner.add_constant(constant);
                    }
                }
            }
            NodeKind::ConstDecl(ConstDecl { name, value }) => {
                let name = name.trim_start_matches('\\');
                let constant = Constant::new(name, literal_type(value), self.site(node.line));
                self.codebase.add_constant(constant);
            }
            _ => {}
        }
        for child in node.children() {
            self.collect(child)?;
        }
        Ok(())
    }

    fn collect_class(&mut self, node: &Node, class: &ClassDecl) -> Result<(), LoadError> {
        let mut declared = Class::new(&class.name, self.site(node.line));
        if let Some(parent) = &class.parent {
            declared = declared.with_parent(parent);
        }
        declared.is_trait = class.is_trait;
        let name = declared.name.clone();
        if !self.codebase.add_class(declared) {
            tracing::debug!(class = %name, "duplicate class ignored");
            return Ok(());
        }
        self.classes.push(name);
        let collected = self.collect(&class.body);
        self.classes.pop();
        collected
    }

    fn collect_property(&mut self, node: &Node, property: &PropertyDecl) -> Result<(), LoadError> {
        let Some(class) = self.current_class().map(str::to_string) else {
            return Ok(());
        };
        let union_type = match &property.type_annotation {
            Some(raw) => UnionType::from_declaration(raw, Some(&class))?,
            None => property.default.as_deref().map(literal_type).unwrap_or_default(),
        };
        let mut declared = Property::new(&property.name, union_type, self.site(node.line));
        declared.is_static = property.is_static;
        if let Some(owner) = self.codebase.class_mut(&class) {
            owner.add_property(declared);
        }
        Ok(())
    }

    fn build_callable(&self, declaration: CallableDecl<'_>) -> Result<Method, LoadError> {
        let class = self.current_class();
        let site = self.site(declaration.line);
        let mut method = Method::new(declaration.id, declaration.name, site.clone());
        method.class = class.map(str::to_string);
        method.is_static = declaration.is_static;
        if let Some(raw) = declaration.return_type {
            method.return_type = UnionType::from_declaration(raw, class)?;
        }

        let mut scope = Scope::new();
        for parameter in declaration.parameters {
            let declared = self.build_parameter(parameter, class, &site)?;
            let bound_type = if declared.is_variadic {
                declared.union_type.as_generic_array()
            } else {
                declared.union_type.clone()
            };
            scope.add_variable(Variable::new(&declared.name, bound_type, site.clone()));
            method.parameters.push(declared);
        }
        if let (Some(class), false) = (class, declaration.is_static) {
            scope.add_variable(Variable::new(
                "this",
                UnionType::of(Type::class(class)),
                site.clone(),
            ));
        }
        method.scope = scope;
        method.body = declaration.body.cloned().map(Rc::new);
        Ok(method)
    }

    fn build_parameter(
        &self,
        parameter: &ParameterDecl,
        class: Option<&str>,
        site: &Site,
    ) -> Result<Parameter, LoadError> {
        let default_type = parameter.default.as_deref().map(literal_type);
        let union_type = match (&parameter.type_annotation, &default_type) {
            (Some(raw), Some(default)) => {
                let mut declared = UnionType::from_declaration(raw, class)?;
                if default.contains(&Type::Null) {
                    declared.add(Type::Null);
                }
                declared
            }
            (Some(raw), None) => UnionType::from_declaration(raw, class)?,
            // An untyped parameter defaulting to null stays untyped.
            (None, Some(default)) if !default.contains(&Type::Null) => default.clone(),
            (None, _) => UnionType::empty(),
        };
        let mut declared = Parameter::new(&parameter.name, union_type, site.clone());
        declared.is_reference = parameter.by_ref;
        declared.is_optional = parameter.default.is_some();
        if parameter.variadic {
            declared = declared.variadic();
        }
        Ok(declared)
    }
}
