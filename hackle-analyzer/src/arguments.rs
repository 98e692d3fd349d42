use crate::analyzer::Analyzer;
use crate::codebase::{CallableId, Parameter};
use crate::context::Context;
use crate::diagnostics::DiagnosticKind;
use crate::types::UnionType;

/// Parameter receiving the argument at `index`. Extra arguments go to a
/// trailing variadic parameter.
pub(crate) fn parameter_index(parameters: &[Parameter], index: usize) -> Option<usize> {
    if index < parameters.len() {
        return Some(index);
    }
    match parameters.last() {
        Some(last) if last.is_variadic => Some(parameters.len() - 1),
        _ => None,
    }
}

impl<'a> Analyzer<'a> {
    /// Checks arity and the cast compatibility of every argument against its
    /// declared parameter type.
    pub(crate) fn verify_call_arguments(
        &mut self,
        context: &Context,
        callee: &CallableId,
        argument_types: &[UnionType],
    ) {
        let Some(method) = self.codebase.callable(callee) else {
            return;
        };
        let name = method.name.clone();
        let parameters = self.declared_parameters(callee);
        let required = parameters
            .iter()
            .filter(|parameter| !parameter.is_optional)
            .count();
        let is_variadic = parameters
            .last()
            .map(|parameter| parameter.is_variadic)
            .unwrap_or(false);

        let count = argument_types.len();
        if count < required {
            self.report(
                DiagnosticKind::TypeError,
                context,
                format!(
                    "call with {} arguments to '{}' which requires {}",
                    count, name, required
                ),
            );
        } else if count > parameters.len() && !is_variadic {
            self.report(
                DiagnosticKind::TypeError,
                context,
                format!(
                    "call with {} arguments to '{}' which only takes {}",
                    count,
                    name,
                    parameters.len()
                ),
            );
        }

        for (index, argument_type) in argument_types.iter().enumerate() {
            let Some(position) = parameter_index(&parameters, index) else {
                break;
            };
            let expected = &parameters[position].union_type;
            if expected.is_empty() || argument_type.can_cast_to(expected, &*self.codebase) {
                continue;
            }
            self.report(
                DiagnosticKind::TypeError,
                context,
                format!(
                    "argument {} to '{}': expected {}, found {}",
                    index + 1,
                    name,
                    expected,
                    argument_type
                ),
            );
        }
    }
}
