use crate::analyzer::Analyzer;
use crate::ast::{Name, Node, NodeKind};
use crate::codebase::CallableId;
use crate::context::Context;
use crate::diagnostics::DiagnosticKind;
use crate::error::ResolveError;
use crate::inference::is_builtin_constant;

impl<'a> Analyzer<'a> {
    /// Post-order handler for a single node. Runs after every child of
    /// `node` has been visited and returns the context for whatever follows.
    pub fn visit(&mut self, context: Context, parent: Option<&Node>, node: &Node) -> Context {
        tracing::trace!(file = context.file(), line = node.line, "visit {}", node.describe());
        match &node.kind {
            NodeKind::Assign { target, value } => self.visit_assign(context, target, value, false),
            NodeKind::AssignRef { target, value } => {
                self.visit_assign(context, target, value, true)
            }
            NodeKind::IfElement {
                condition: Some(condition),
                ..
            }
            | NodeKind::SwitchCase {
                condition: Some(condition),
                ..
            }
            | NodeKind::While { condition, .. }
            | NodeKind::DoWhile { condition, .. }
            | NodeKind::Switch {
                subject: condition, ..
            } => {
                self.infer(&context, condition);
                context
            }
            NodeKind::ExpressionList(expressions) => {
                for expression in expressions {
                    self.infer(&context, expression);
                }
                context
            }
            NodeKind::Foreach { subject, .. } => {
                let subject_type = self.infer(&context, subject);
                if subject_type.is_scalar() {
                    self.report(
                        DiagnosticKind::TypeError,
                        &context,
                        format!("{subject_type} passed to foreach instead of array"),
                    );
                }
                context
            }
            NodeKind::Global { name } => self.visit_global(context, name),
            NodeKind::Static { name, default } => self.visit_static(context, name, default.as_deref()),
            NodeKind::Echo(expression) | NodeKind::Print(expression) => {
                let union_type = self.infer(&context, expression);
                if union_type.is_array_only() {
                    self.report(DiagnosticKind::TypeError, &context, "array to string conversion");
                }
                context
            }
            NodeKind::Variable(_) | NodeKind::Array(_) => {
                self.check_no_op(&context, parent, node);
                context
            }
            NodeKind::StaticProp { class, name } => {
                match self.resolve_static_property(&context, class, name) {
                    Ok(owner) => {
                        if let Some(property) = name
                            .literal()
                            .and_then(|property| self.codebase.property_mut(&owner, property))
                        {
                            property.record_usage();
                        }
                    }
                    Err(error) => tracing::debug!(%error, "unresolved static property"),
                }
                self.check_no_op(&context, parent, node);
                context
            }
            NodeKind::Const { name } => {
                if !is_builtin_constant(name) {
                    match self.resolve_constant(name) {
                        Ok(constant) => {
                            if let Some(constant) = self.codebase.constant_mut(&constant) {
                                constant.record_usage();
                            }
                        }
                        Err(error) => tracing::debug!(%error, "unresolved constant"),
                    }
                }
                self.check_no_op(&context, parent, node);
                context
            }
            NodeKind::ClassConst { class, name } => {
                if !name.eq_ignore_ascii_case("class") {
                    match self.resolve_class_constant(&context, class, name) {
                        Ok(owner) => {
                            if let Some(constant) = self.codebase.class_constant_mut(&owner, name) {
                                constant.record_usage();
                            }
                        }
                        Err(error) => tracing::debug!(%error, "unresolved class constant"),
                    }
                }
                self.check_no_op(&context, parent, node);
                context
            }
            NodeKind::Prop { object, name } => {
                match self.resolve_property(&context, object, name) {
                    Ok(owners) => {
                        if let Some(property) = name.literal() {
                            for owner in owners {
                                if let Some(property) = self.codebase.property_mut(&owner, property)
                                {
                                    property.record_usage();
                                }
                            }
                        }
                    }
                    Err(error) => tracing::debug!(%error, "unresolved property"),
                }
                self.check_no_op(&context, parent, node);
                context
            }
            NodeKind::Closure(_) => {
                self.check_no_op(&context, parent, node);
                let closure = CallableId::closure(context.file(), node.line);
                context.with_closure(closure)
            }
            NodeKind::Return(expression) => self.visit_return(context, expression.as_deref()),
            NodeKind::Call { callee, arguments } => self.visit_call(context, callee, arguments),
            NodeKind::New { class, arguments } => self.visit_new(context, class, arguments),
            NodeKind::Instanceof { class, .. } => {
                if let Err(error) = self.resolve_class_name(&context, class) {
                    if error.is_undefined() {
                        self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
                    }
                }
                context
            }
            NodeKind::StaticCall {
                class,
                method,
                arguments,
            } => self.visit_static_call(context, class, method, arguments),
            NodeKind::MethodCall {
                receiver,
                method,
                arguments,
            } => self.visit_method_call(context, receiver, method, arguments),
            NodeKind::Dim { .. } => {
                let handled_by_parent = parent.map_or(false, |parent| {
                    matches!(
                        parent.kind,
                        NodeKind::Dim { .. }
                            | NodeKind::Assign { .. }
                            | NodeKind::AssignRef { .. }
                            | NodeKind::Call { .. }
                    )
                });
                if !handled_by_parent {
                    self.check_backward_compatibility(&context, node);
                }
                context
            }
            _ => context,
        }
    }

    fn check_no_op(&mut self, context: &Context, parent: Option<&Node>, node: &Node) {
        if parent.map_or(false, Node::is_statement_list) {
            self.report(
                DiagnosticKind::NoOp,
                context,
                format!("no-op {}", node.describe()),
            );
        }
    }

    fn visit_assign(
        &mut self,
        mut context: Context,
        target: &Node,
        value: &Node,
        by_reference: bool,
    ) -> Context {
        let value_type = self.infer(&context, value);
        self.bind_assignment(&mut context, target, &value_type);
        if by_reference {
            self.bind_reference_source(&mut context, value);
        }
        self.check_backward_compatibility(&context, target);
        self.check_backward_compatibility(&context, value);
        context
    }

    fn visit_global(&mut self, mut context: Context, name: &str) -> Context {
        let global_type = context
            .scope()
            .global_scope()
            .variable(name)
            .map(|variable| variable.union_type.clone())
            .unwrap_or_default();
        let site = context.site();
        let variable = context.scope_mut().get_or_create(name, site);
        variable.union_type.merge(&global_type);
        context
    }

    fn visit_static(&mut self, mut context: Context, name: &str, default: Option<&Node>) -> Context {
        let default_type = default
            .map(|default| self.infer(&context, default))
            .unwrap_or_default();
        let site = context.site();
        let variable = context.scope_mut().get_or_create(name, site);
        variable.union_type.merge(&default_type);
        context
    }

    /// Checks a return statement against the enclosing callable's declared
    /// return type, or widens the inferred one.
    fn visit_return(&mut self, context: Context, expression: Option<&Node>) -> Context {
        let Some(callee) = context.callable().cloned() else {
            return context;
        };
        if self.is_in_trait(&context) {
            return context;
        }
        let returned = expression
            .map(|expression| self.infer(&context, expression))
            .unwrap_or_default();

        let Some(method) = self.codebase.callable_mut(&callee) else {
            return context;
        };
        if method.is_return_type_undefined || method.return_type.is_empty() {
            method.is_return_type_undefined = true;
            method.return_type.merge(&returned);
            return context;
        }
        let declared = method.return_type.clone();
        let name = method.name.clone();
        if !returned.can_cast_to(&declared, &*self.codebase) {
            self.report(
                DiagnosticKind::TypeError,
                &context,
                format!("return type of '{name}': expected {declared}, found {returned}"),
            );
        }
        context
    }

    fn visit_call(&mut self, context: Context, callee: &Node, arguments: &[Node]) -> Context {
        self.check_backward_compatibility(&context, callee);
        for argument in arguments {
            self.check_backward_compatibility(&context, argument);
        }

        let target = match &callee.kind {
            NodeKind::Name(name) => match self.resolve_function(name) {
                Ok(function) => function,
                Err(error) => {
                    self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
                    return context;
                }
            },
            NodeKind::Variable(_) | NodeKind::Closure(_) => {
                match self.callees_of(&context, callee).into_iter().next() {
                    Some(closure) => closure,
                    None => return context,
                }
            }
            _ => return context,
        };
        self.analyze_call_site(context, &target, arguments)
    }

    fn visit_new(&mut self, context: Context, class: &Node, arguments: &[Node]) -> Context {
        let class = match self.resolve_class_name(&context, class) {
            Ok(class) => class,
            Err(error) => {
                if error.is_undefined() {
                    self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
                }
                return context;
            }
        };
        if let Some(class) = self.codebase.class_mut(&class) {
            class.record_usage();
        }
        match self.codebase.find_method(&class, "__construct") {
            Some(constructor) => self.analyze_call_site(context, &constructor, arguments),
            None => context,
        }
    }

    fn visit_static_call(
        &mut self,
        context: Context,
        class: &Node,
        method: &Name,
        arguments: &[Node],
    ) -> Context {
        let Some(method) = method.literal() else {
            return context;
        };
        let is_parent = matches!(&class.kind, NodeKind::Name(name) if name.eq_ignore_ascii_case("parent"));

        if method.eq_ignore_ascii_case("__construct") && !is_parent {
            let class = match &class.kind {
                NodeKind::Name(name) => name.clone(),
                _ => "(expression)".to_string(),
            };
            let error = ResolveError::UndefinedMethod {
                class,
                method: method.to_string(),
            };
            self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
            return context;
        }

        let resolved = self
            .resolve_class_name(&context, class)
            .and_then(|class| self.resolve_method(&class, method));
        let callee = match resolved {
            Ok(callee) => callee,
            Err(error) => {
                if error.is_undefined() {
                    self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
                }
                return context;
            }
        };

        if let Some(target) = self.codebase.callable(&callee) {
            if !target.is_static && !is_parent {
                let message = format!(
                    "static call to non-static method {} defined at {}",
                    target.name, target.site
                );
                self.report(DiagnosticKind::StaticCallError, &context, message);
            }
        }
        self.analyze_call_site(context, &callee, arguments)
    }

    fn visit_method_call(
        &mut self,
        context: Context,
        receiver: &Node,
        method: &Name,
        arguments: &[Node],
    ) -> Context {
        let Some(method) = method.literal() else {
            return context;
        };
        let classes = match self.resolve_classes(&context, receiver) {
            Ok(classes) => classes,
            Err(error) => {
                if error.is_undefined() {
                    self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
                }
                return context;
            }
        };
        let callee = classes
            .iter()
            .find_map(|class| self.codebase.find_method(class, method));
        match callee {
            Some(callee) => self.analyze_call_site(context, &callee, arguments),
            None => {
                let error = ResolveError::UndefinedMethod {
                    class: classes.first().cloned().unwrap_or_default(),
                    method: method.to_string(),
                };
                self.report(DiagnosticKind::UndefinedReference, &context, error.to_string());
                context
            }
        }
    }
}
