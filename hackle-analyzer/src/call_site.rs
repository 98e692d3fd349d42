use crate::analyzer::{Analyzer, Reanalysis};
use crate::arguments::parameter_index;
use crate::ast::{Name, Node, NodeKind};
use crate::codebase::{CallableId, Parameter};
use crate::context::{Context, Scope, Variable};
use crate::diagnostics::DiagnosticKind;
use crate::types::UnionType;

/// Parameters and body scope of a callee before speculation.
struct Snapshot {
    parameters: Vec<Parameter>,
    scope: Scope,
}

/// What speculation left behind for the caller: the final type of every
/// caller variable passed to a by-reference parameter.
type ReferenceResults = Vec<(String, UnionType)>;

impl<'a> Analyzer<'a> {
    /// Validates a call and, outside quick mode, re-analyses the callee with
    /// the argument types merged into its untyped parameters.
    pub(crate) fn analyze_call_site(
        &mut self,
        mut context: Context,
        callee: &CallableId,
        arguments: &[Node],
    ) -> Context {
        let Some(method) = self.codebase.callable_mut(callee) else {
            return context;
        };
        method.record_usage();
        let parameters = self.declared_parameters(callee);
        let argument_types = arguments
            .iter()
            .map(|argument| self.infer(&context, argument))
            .collect::<Vec<_>>();

        for (index, argument) in arguments.iter().enumerate() {
            let Some(position) = parameter_index(&parameters, index) else {
                break;
            };
            if parameters[position].is_reference {
                self.bind_reference_argument(&mut context, argument, None);
            }
        }

        self.verify_call_arguments(&context, callee, &argument_types);

        for (index, argument) in arguments.iter().enumerate() {
            let Some(position) = parameter_index(&parameters, index) else {
                break;
            };
            let parameter = &parameters[position];
            if parameter.is_reference {
                self.bind_reference_argument(&mut context, argument, Some(&parameter.union_type));
            }
        }

        if self.config.quick_mode {
            return context;
        }
        self.reanalyze(context, callee, arguments, &parameters, &argument_types)
    }

    /// Materializes the variable or property passed to a by-reference
    /// parameter in the caller, merging `declared` into it when given.
    fn bind_reference_argument(
        &mut self,
        context: &mut Context,
        argument: &Node,
        declared: Option<&UnionType>,
    ) {
        let site = context.site();
        match &argument.kind {
            NodeKind::Variable(Name::Literal(name)) => {
                let variable = context.scope_mut().get_or_create(name, site);
                if let Some(declared) = declared {
                    variable.union_type.merge(declared);
                }
            }
            NodeKind::Prop {
                object,
                name: Name::Literal(property),
            } => match self.resolve_classes(context, object) {
                Ok(classes) => {
                    for class in classes {
                        let Some(property) =
                            self.codebase
                                .get_or_create_property(&class, property, site.clone())
                        else {
                            continue;
                        };
                        if let Some(declared) = declared {
                            property.union_type.merge(declared);
                        }
                    }
                }
                Err(error) if error.is_undefined() => {
                    self.report(DiagnosticKind::UndefinedReference, context, error.to_string());
                }
                Err(_) => {}
            },
            _ => {}
        }
    }

    fn reanalyze(
        &mut self,
        context: Context,
        callee: &CallableId,
        arguments: &[Node],
        parameters: &[Parameter],
        argument_types: &[UnionType],
    ) -> Context {
        let Some(method) = self.codebase.callable(callee) else {
            return context;
        };
        if method.is_internal {
            return context;
        }
        let snapshot = Snapshot {
            parameters: method.parameters.clone(),
            scope: method.scope.clone(),
        };

        let references = self.speculate(&context, callee, arguments, parameters, argument_types);
        self.restore(callee, snapshot);

        let mut context = context;
        for (name, union_type) in references {
            if let Some(variable) = context.scope_mut().variable_mut(&name) {
                variable.union_type.merge(&union_type);
            }
        }
        context
    }

    /// Merges argument types into the callee's untyped parameters and, if
    /// that changed anything, re-runs the callee body. The caller restores
    /// the callee afterwards whatever happens here.
    fn speculate(
        &mut self,
        context: &Context,
        callee: &CallableId,
        arguments: &[Node],
        declared: &[Parameter],
        argument_types: &[UnionType],
    ) -> ReferenceResults {
        let site = context.site();
        let Some(method) = self.codebase.callable_mut(callee) else {
            return Vec::new();
        };

        let mut changed = false;
        let mut bindings: Vec<(String, String)> = Vec::new();
        for (index, argument) in arguments.iter().enumerate() {
            let Some(position) = parameter_index(declared, index) else {
                break;
            };
            if !declared[position].union_type.is_empty() {
                continue;
            }
            let Some(parameter) = method.parameters.get_mut(position) else {
                continue;
            };
            let argument_type = &argument_types[index];
            changed |= parameter.union_type.merge(argument_type);

            let name = parameter.name.clone();
            let caller_variable = match &argument.kind {
                NodeKind::Variable(Name::Literal(caller)) if parameter.is_reference => {
                    Some(caller.clone())
                }
                _ => None,
            };
            let bound_type = if parameter.is_variadic {
                parameter.union_type.as_generic_array()
            } else {
                parameter.union_type.clone()
            };
            let mut variable = Variable::new(name.clone(), bound_type, site.clone());
            if let Some(caller) = caller_variable {
                variable.union_type = argument_type.clone();
                variable.reference_to = Some(caller.clone());
                bindings.push((name, caller));
            }
            method.scope.add_variable(variable);
        }

        if !changed {
            return Vec::new();
        }
        let is_reentrant = context.callable() == Some(callee)
            || self
                .reanalysis_stack
                .iter()
                .any(|entry| &entry.callee == callee);
        if is_reentrant {
            tracing::debug!(%callee, "skipping re-analysis of callee already being analyzed");
            return Vec::new();
        }

        tracing::debug!(%callee, "re-analyzing with argument types");
        self.reanalysis_stack.push(Reanalysis {
            callee: callee.clone(),
            parameters: declared.to_vec(),
        });
        let outcome = self.analyze_callable_body(callee, context);
        self.reanalysis_stack.pop();

        let Some(outcome) = outcome else {
            return Vec::new();
        };
        bindings
            .into_iter()
            .filter_map(|(parameter, caller)| {
                let variable = outcome.variable(&parameter)?;
                Some((caller, variable.union_type.clone()))
            })
            .collect()
    }

    fn restore(&mut self, callee: &CallableId, snapshot: Snapshot) {
        if let Some(method) = self.codebase.callable_mut(callee) {
            method.parameters = snapshot.parameters;
            method.scope = snapshot.scope;
        }
    }
}
