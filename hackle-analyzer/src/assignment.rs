use crate::analyzer::Analyzer;
use crate::ast::{Name, Node, NodeKind};
use crate::context::Context;
use crate::types::UnionType;

impl<'a> Analyzer<'a> {
    /// Binds `value_type` to an assignable expression. Types only grow: the
    /// target's existing type is merged with the new one.
    pub(crate) fn bind_assignment(
        &mut self,
        context: &mut Context,
        target: &Node,
        value_type: &UnionType,
    ) {
        debug_assert!(
            is_assignable(target),
            "not an assignable expression: {:?}",
            target.kind
        );
        match &target.kind {
            NodeKind::Variable(Name::Literal(name)) => {
                let site = context.site();
                let variable = context.scope_mut().get_or_create(name, site);
                variable.union_type.merge(value_type);
            }
            NodeKind::Dim { base, .. } => {
                let array_type = value_type.as_generic_array();
                self.bind_assignment(context, base, &array_type);
            }
            NodeKind::Prop {
                object,
                name: Name::Literal(property),
            } => match self.resolve_classes(context, object) {
                Ok(classes) => {
                    for class in classes {
                        if let Some(property) =
                            self.codebase
                                .get_or_create_property(&class, property, context.site())
                        {
                            property.union_type.merge(value_type);
                        }
                    }
                }
                Err(error) => {
                    tracing::debug!(%error, line = target.line, "property assignment not bound");
                }
            },
            NodeKind::StaticProp {
                class,
                name: Name::Literal(property),
            } => match self.resolve_class_name(context, class) {
                Ok(class) => {
                    if let Some(property) =
                        self.codebase
                            .get_or_create_property(&class, property, context.site())
                    {
                        property.union_type.merge(value_type);
                    }
                }
                Err(error) => {
                    tracing::debug!(%error, line = target.line, "static property assignment not bound");
                }
            },
            NodeKind::ListTarget(elements) => {
                let element_type = value_type.element_types();
                for element in elements {
                    self.bind_assignment(context, element, &element_type);
                }
            }
            NodeKind::Array(items) => {
                let element_type = value_type.element_types();
                for item in items {
                    self.bind_assignment(context, &item.value, &element_type);
                }
            }
            // Names computed at runtime cannot be bound.
            _ => {}
        }
    }

    /// `$a = &$b` leaves `$b` defined even when nothing was assigned to it.
    pub(crate) fn bind_reference_source(&mut self, context: &mut Context, value: &Node) {
        if let NodeKind::Variable(Name::Literal(name)) = &value.kind {
            let site = context.site();
            context.scope_mut().get_or_create(name, site);
        }
    }
}

fn is_assignable(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Variable(_)
            | NodeKind::Dim { .. }
            | NodeKind::Prop { .. }
            | NodeKind::StaticProp { .. }
            | NodeKind::ListTarget(_)
            | NodeKind::Array(_)
    )
}
