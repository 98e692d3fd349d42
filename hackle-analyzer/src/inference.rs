use crate::analyzer::Analyzer;
use crate::ast::{BinaryOperator, CastType, Literal, Name, Node, NodeKind, UnaryOperator};
use crate::codebase::{closure_name, CallableId};
use crate::context::Context;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::types::{Type, UnionType};

/// Type of a constant expression, as far as it can be told without a
/// context. Used for defaults of parameters, properties and constants.
pub(crate) fn literal_type(node: &Node) -> UnionType {
    match &node.kind {
        NodeKind::Literal(literal) => UnionType::of(match literal {
            Literal::Int(_) => Type::Int,
            Literal::Float(_) => Type::Float,
            Literal::String(_) => Type::String,
            Literal::Bool(_) => Type::Bool,
            Literal::Null => Type::Null,
        }),
        NodeKind::Array(_) => UnionType::of(Type::Array),
        NodeKind::Const { name } => builtin_constant_type(name).unwrap_or_default(),
        NodeKind::Unary {
            operator: UnaryOperator::Negate | UnaryOperator::Plus,
            operand,
        } => literal_type(operand),
        _ => UnionType::empty(),
    }
}

fn builtin_constant_type(name: &str) -> Option<UnionType> {
    match name.trim_start_matches('\\').to_ascii_lowercase().as_str() {
        "true" | "false" => Some(UnionType::of(Type::Bool)),
        "null" => Some(UnionType::of(Type::Null)),
        _ => None,
    }
}

pub(crate) fn is_builtin_constant(name: &str) -> bool {
    builtin_constant_type(name).is_some()
}

fn only(union: &UnionType, ty: &Type) -> bool {
    !union.is_empty() && union.types().all(|member| member == ty)
}

/// Result of an arithmetic operator. Unknown operands give an unknown result
/// so that call sites can still supply the argument types.
fn arithmetic_type(operator: BinaryOperator, left: &UnionType, right: &UnionType) -> UnionType {
    if left.is_empty() || right.is_empty() {
        return UnionType::empty();
    }
    if operator == BinaryOperator::Modulo {
        return UnionType::of(Type::Int);
    }
    if operator != BinaryOperator::Divide && only(left, &Type::Int) && only(right, &Type::Int) {
        return UnionType::of(Type::Int);
    }
    if left.contains(&Type::Float) || right.contains(&Type::Float) {
        return UnionType::of(Type::Float);
    }
    [Type::Int, Type::Float].into_iter().collect()
}

impl<'a> Analyzer<'a> {
    /// Type of an expression in `context`. May report type errors found in
    /// operators along the way.
    pub(crate) fn infer(&mut self, context: &Context, node: &Node) -> UnionType {
        match &node.kind {
            NodeKind::Literal(_) => literal_type(node),
            NodeKind::Variable(Name::Literal(name)) => match context.variable(name) {
                Some(variable) => variable.union_type.clone(),
                None if name == "this" => context
                    .class()
                    .map(|class| UnionType::of(Type::class(class)))
                    .unwrap_or_default(),
                None => UnionType::empty(),
            },
            NodeKind::Array(items) => {
                if items.is_empty() {
                    return UnionType::of(Type::Array);
                }
                let mut elements = UnionType::empty();
                for item in items {
                    let element = self.infer(context, &item.value);
                    elements.merge(&element);
                }
                if elements.len() == 1 {
                    elements.as_generic_array()
                } else {
                    UnionType::of(Type::Array)
                }
            }
            NodeKind::Dim { base, .. } => {
                let base_type = self.infer(context, base);
                let mut element = base_type.element_types();
                if base_type.contains(&Type::String) {
                    element.add(Type::String);
                }
                element
            }
            NodeKind::Prop { object, name } => {
                let Some(property) = name.literal() else {
                    return UnionType::empty();
                };
                let classes = self
                    .infer_quietly(context, object)
                    .class_names()
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                self.property_type(&classes, property)
            }
            NodeKind::StaticProp { class, name } => {
                let (Some(property), Ok(class)) =
                    (name.literal(), self.resolve_class_name(context, class))
                else {
                    return UnionType::empty();
                };
                self.property_type(&[class], property)
            }
            NodeKind::Const { name } => builtin_constant_type(name).unwrap_or_else(|| {
                self.codebase
                    .constant(name)
                    .map(|constant| constant.union_type.clone())
                    .unwrap_or_default()
            }),
            NodeKind::ClassConst { class, name } => {
                if name.eq_ignore_ascii_case("class") {
                    return UnionType::of(Type::String);
                }
                self.resolve_class_constant(context, class, name)
                    .ok()
                    .and_then(|owner| self.codebase.class(&owner)?.constant(name))
                    .map(|constant| constant.union_type.clone())
                    .unwrap_or_default()
            }
            NodeKind::Call { callee, .. } => {
                let callees = self.callees_of(context, callee);
                self.return_type_of(&callees)
            }
            NodeKind::MethodCall {
                receiver, method, ..
            } => {
                let Some(method) = method.literal() else {
                    return UnionType::empty();
                };
                let classes = self.infer_quietly(context, receiver);
                let callees = classes
                    .class_names()
                    .filter_map(|class| self.codebase.find_method(class, method))
                    .collect::<Vec<_>>();
                self.return_type_of(&callees)
            }
            NodeKind::StaticCall { class, method, .. } => {
                let (Some(method), Ok(class)) =
                    (method.literal(), self.resolve_class_name(context, class))
                else {
                    return UnionType::empty();
                };
                let callees = self.codebase.find_method(&class, method).into_iter().collect::<Vec<_>>();
                self.return_type_of(&callees)
            }
            NodeKind::New { class, .. } => match self.resolve_class_name(context, class) {
                Ok(class) => UnionType::of(Type::class(&class)),
                Err(_) => match &class.kind {
                    NodeKind::Name(name) => UnionType::of(Type::class(name)),
                    _ => UnionType::of(Type::Object),
                },
            },
            NodeKind::Instanceof { .. } => UnionType::of(Type::Bool),
            NodeKind::Binary {
                operator,
                left,
                right,
            } => self.infer_binary(context, node, *operator, left, right),
            NodeKind::Unary { operator, operand } => {
                let operand = self.infer(context, operand);
                match operator {
                    UnaryOperator::Not => UnionType::of(Type::Bool),
                    UnaryOperator::BitwiseNot => UnionType::of(Type::Int),
                    UnaryOperator::Negate | UnaryOperator::Plus => {
                        if only(&operand, &Type::Int) || only(&operand, &Type::Float) {
                            operand
                        } else {
                            [Type::Int, Type::Float].into_iter().collect()
                        }
                    }
                }
            }
            NodeKind::Cast { target, .. } => UnionType::of(match target {
                CastType::Int => Type::Int,
                CastType::Float => Type::Float,
                CastType::String => Type::String,
                CastType::Bool => Type::Bool,
                CastType::Array => Type::Array,
                CastType::Object => Type::Object,
                CastType::Unset => Type::Null,
            }),
            NodeKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let then = self.infer(context, then.as_deref().unwrap_or(condition));
                let otherwise = self.infer(context, otherwise);
                then.merged(&otherwise)
            }
            NodeKind::Closure(_) => {
                UnionType::of(Type::Closure(closure_name(context.file(), node.line)))
            }
            NodeKind::Assign { value, .. } | NodeKind::AssignRef { value, .. } => {
                self.infer(context, value)
            }
            NodeKind::Print(_) => UnionType::of(Type::Int),
            _ => UnionType::empty(),
        }
    }

    /// Same as [`Analyzer::infer`] but drops any diagnostics, for callers that
    /// only need the type of a node another handler already checks.
    pub(crate) fn infer_quietly(&mut self, context: &Context, node: &Node) -> UnionType {
        let saved = std::mem::replace(&mut self.diagnostics, Diagnostics::new());
        let union_type = self.infer(context, node);
        self.diagnostics = saved;
        union_type
    }

    fn infer_binary(
        &mut self,
        context: &Context,
        node: &Node,
        operator: BinaryOperator,
        left: &Node,
        right: &Node,
    ) -> UnionType {
        let left = self.infer(context, left);
        let right = self.infer(context, right);
        if operator.is_arithmetic() {
            match (left.is_array_only(), right.is_array_only()) {
                (true, false) if !right.is_empty() => {
                    self.report_at(
                        DiagnosticKind::TypeError,
                        context,
                        node.line,
                        "Invalid operator: left operand is array and right is not",
                    );
                    return UnionType::of(Type::Array);
                }
                (false, true) if !left.is_empty() => {
                    self.report_at(
                        DiagnosticKind::TypeError,
                        context,
                        node.line,
                        "Invalid operator: right operand is array and left is not",
                    );
                    return UnionType::of(Type::Array);
                }
                (true, true) if operator == BinaryOperator::Add => return left.merged(&right),
                _ => {}
            }
            return arithmetic_type(operator, &left, &right);
        }
        match operator {
            BinaryOperator::Concat => UnionType::of(Type::String),
            BinaryOperator::Coalesce => left.merged(&right),
            BinaryOperator::BitwiseAnd
            | BinaryOperator::BitwiseOr
            | BinaryOperator::BitwiseXor
            | BinaryOperator::ShiftLeft
            | BinaryOperator::ShiftRight => UnionType::of(Type::Int),
            _ => UnionType::of(Type::Bool),
        }
    }

    /// Functions or closures a call expression may invoke.
    pub(crate) fn callees_of(&mut self, context: &Context, callee: &Node) -> Vec<CallableId> {
        match &callee.kind {
            NodeKind::Name(name) => self.resolve_function(name).into_iter().collect(),
            NodeKind::Closure(_) => vec![CallableId::closure(context.file(), callee.line)],
            _ => {
                let callee_type = self.infer_quietly(context, callee);
                callee_type
                    .closure_ids()
                    .map(|id| CallableId::Function(id.to_string()))
                    .filter(|id| self.codebase.callable(id).is_some())
                    .collect()
            }
        }
    }

    fn return_type_of(&self, callees: &[CallableId]) -> UnionType {
        let mut union_type = UnionType::empty();
        for callee in callees {
            if let Some(method) = self.codebase.callable(callee) {
                union_type.merge(&method.return_type);
            }
        }
        union_type
    }

    fn property_type(&self, classes: &[String], property: &str) -> UnionType {
        let mut union_type = UnionType::empty();
        for class in classes {
            let declared = self
                .codebase
                .find_property(class, property)
                .and_then(|owner| self.codebase.class(&owner)?.property(property));
            if let Some(declared) = declared {
                union_type.merge(&declared.union_type);
            }
        }
        union_type
    }
}
