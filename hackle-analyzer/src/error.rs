use thiserror::Error;

/// Why a name could not be bound to a symbol in the code base.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("call to undefined function {0}()")]
    UndefinedFunction(String),
    #[error("call to undefined method {class}::{method}()")]
    UndefinedMethod { class: String, method: String },
    #[error("reference to undefined class {0}")]
    UndefinedClass(String),
    #[error("reference to undefined constant {0}")]
    UndefinedConstant(String),
    #[error("reference to undefined property {class}::${property}")]
    UndefinedProperty { class: String, property: String },
    #[error("cannot use '{0}' outside of a class")]
    NotInClass(String),
    #[error("class {0} has no parent")]
    NoParent(String),
    #[error("name is computed at runtime")]
    DynamicName,
    #[error("expression does not have a known class type")]
    AmbiguousType,
}

impl ResolveError {
    /// Undefined-reference failures are reported; the rest are ambiguity that
    /// an earlier check already covers or that cannot be decided statically.
    pub fn is_undefined(&self) -> bool {
        matches!(
            self,
            ResolveError::UndefinedFunction(_)
                | ResolveError::UndefinedMethod { .. }
                | ResolveError::UndefinedClass(_)
                | ResolveError::UndefinedConstant(_)
                | ResolveError::UndefinedProperty { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("invalid type expression '{0}'")]
    InvalidType(String),
    #[error("invalid input document: {0}")]
    Document(String),
}
