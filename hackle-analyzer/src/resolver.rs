use crate::analyzer::Analyzer;
use crate::ast::{Name, Node, NodeKind};
use crate::codebase::CallableId;
use crate::context::Context;
use crate::error::ResolveError;

impl<'a> Analyzer<'a> {
    /// Resolves a class reference (`Foo`, `self`, `static`, `parent`) to the
    /// canonical name of a known class.
    pub(crate) fn resolve_class_name(
        &self,
        context: &Context,
        node: &Node,
    ) -> Result<String, ResolveError> {
        let NodeKind::Name(name) = &node.kind else {
            return Err(ResolveError::DynamicName);
        };
        let name = name.trim_start_matches('\\');
        let class = match name.to_ascii_lowercase().as_str() {
            "self" | "static" => context
                .class()
                .ok_or_else(|| ResolveError::NotInClass(name.to_string()))?
                .to_string(),
            "parent" => {
                let class = context
                    .class()
                    .ok_or_else(|| ResolveError::NotInClass(name.to_string()))?;
                self.codebase
                    .class(class)
                    .and_then(|class| class.parent.clone())
                    .ok_or_else(|| ResolveError::NoParent(class.to_string()))?
            }
            _ => name.to_string(),
        };
        self.codebase
            .class(&class)
            .map(|class| class.name.clone())
            .ok_or(ResolveError::UndefinedClass(class))
    }

    /// Classes an expression may evaluate to. Fails with `AmbiguousType` when
    /// the expression has no class type at all.
    pub(crate) fn resolve_classes(
        &mut self,
        context: &Context,
        node: &Node,
    ) -> Result<Vec<String>, ResolveError> {
        let union_type = self.infer_quietly(context, node);
        let mut classes: Vec<String> = Vec::new();
        for name in union_type.class_names() {
            let class = self
                .codebase
                .class(name)
                .ok_or_else(|| ResolveError::UndefinedClass(name.to_string()))?;
            if !classes.contains(&class.name) {
                classes.push(class.name.clone());
            }
        }
        if classes.is_empty() {
            return Err(ResolveError::AmbiguousType);
        }
        Ok(classes)
    }

    pub(crate) fn resolve_function(&self, name: &str) -> Result<CallableId, ResolveError> {
        let name = name.trim_start_matches('\\');
        let found = self.codebase.function(name).or_else(|| {
            // Unqualified calls inside a namespace fall back to the global
            // function.
            let (_, short) = name.rsplit_once('\\')?;
            self.codebase.function(short)
        });
        found
            .map(|function| function.id.clone())
            .ok_or_else(|| ResolveError::UndefinedFunction(name.to_string()))
    }

    pub(crate) fn resolve_method(
        &self,
        class: &str,
        method: &str,
    ) -> Result<CallableId, ResolveError> {
        self.codebase
            .find_method(class, method)
            .ok_or_else(|| ResolveError::UndefinedMethod {
                class: class.to_string(),
                method: method.to_string(),
            })
    }

    /// Classes declaring the property read by `$object->name`, one per
    /// possible receiver class.
    pub(crate) fn resolve_property(
        &mut self,
        context: &Context,
        object: &Node,
        name: &Name,
    ) -> Result<Vec<String>, ResolveError> {
        let property = name.literal().ok_or(ResolveError::DynamicName)?;
        let classes = self.resolve_classes(context, object)?;
        let owners = classes
            .iter()
            .filter_map(|class| self.codebase.find_property(class, property))
            .collect::<Vec<_>>();
        if owners.is_empty() {
            return Err(ResolveError::UndefinedProperty {
                class: classes.first().cloned().unwrap_or_default(),
                property: property.to_string(),
            });
        }
        Ok(owners)
    }

    pub(crate) fn resolve_static_property(
        &self,
        context: &Context,
        class: &Node,
        name: &Name,
    ) -> Result<String, ResolveError> {
        let property = name.literal().ok_or(ResolveError::DynamicName)?;
        let class = self.resolve_class_name(context, class)?;
        self.codebase
            .find_property(&class, property)
            .ok_or_else(|| ResolveError::UndefinedProperty {
                class,
                property: property.to_string(),
            })
    }

    pub(crate) fn resolve_constant(&self, name: &str) -> Result<String, ResolveError> {
        self.codebase
            .constant(name)
            .map(|constant| constant.name.clone())
            .ok_or_else(|| ResolveError::UndefinedConstant(name.to_string()))
    }

    /// Class declaring `Class::NAME`.
    pub(crate) fn resolve_class_constant(
        &self,
        context: &Context,
        class: &Node,
        name: &str,
    ) -> Result<String, ResolveError> {
        let class = self.resolve_class_name(context, class)?;
        self.codebase
            .find_class_constant(&class, name)
            .ok_or_else(|| ResolveError::UndefinedConstant(format!("{class}::{name}")))
    }
}
