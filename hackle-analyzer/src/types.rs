use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codebase::CodeBase;
use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Null,
    Array,
    Mixed,
    Callable,
    Object,
    Void,
    Resource,
    Class(String),
    /// `T[]`
    GenericArray(Box<Type>),
    /// A closure literal, carrying the identity of its synthesized function.
    Closure(String),
}

impl Type {
    pub fn class(name: &str) -> Self {
        Type::Class(name.trim_start_matches('\\').to_string())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Float | Type::String | Type::Bool | Type::Null
        )
    }

    pub fn is_array_like(&self) -> bool {
        matches!(self, Type::Array | Type::GenericArray(_))
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name.as_str()),
            Type::Closure(_) => Some("Closure"),
            _ => None,
        }
    }

    /// Whether a value of this type may be used where `target` is expected,
    /// without considering inheritance.
    pub fn can_cast_to(&self, target: &Type) -> bool {
        match (self, target) {
            (from, to) if from == to => true,
            (Type::Mixed, _) | (_, Type::Mixed) => true,
            (Type::Int, Type::Float) => true,
            (Type::GenericArray(_), Type::Array) | (Type::Array, Type::GenericArray(_)) => true,
            (Type::GenericArray(from), Type::GenericArray(to)) => from.can_cast_to(to),
            (Type::Class(from), Type::Class(to)) => from.eq_ignore_ascii_case(to),
            (Type::Class(_) | Type::Closure(_), Type::Object) => true,
            (Type::Closure(_), Type::Closure(_)) => true,
            (Type::Closure(_), Type::Class(name)) | (Type::Class(name), Type::Callable) => {
                name.eq_ignore_ascii_case("closure")
            }
            (Type::Closure(_) | Type::String | Type::Array, Type::Callable) => true,
            _ => false,
        }
    }

    fn parse(raw: &str) -> Result<Self, LoadError> {
        if let Some(element) = raw.strip_suffix("[]") {
            return Ok(Type::GenericArray(Box::new(Type::parse(element)?)));
        }
        let ty = match raw.to_ascii_lowercase().as_str() {
            "int" | "integer" => Type::Int,
            "float" | "double" => Type::Float,
            "string" => Type::String,
            "bool" | "boolean" | "true" | "false" => Type::Bool,
            "null" => Type::Null,
            "array" => Type::Array,
            "mixed" => Type::Mixed,
            "callable" => Type::Callable,
            "object" => Type::Object,
            "void" => Type::Void,
            "resource" => Type::Resource,
            _ => {
                let valid = !raw.is_empty()
                    && raw
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '\\')
                    && !raw.starts_with(|ch: char| ch.is_ascii_digit());
                if !valid {
                    return Err(LoadError::InvalidType(raw.to_string()));
                }
                Type::class(raw)
            }
        };
        Ok(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Bool => f.write_str("bool"),
            Type::Null => f.write_str("null"),
            Type::Array => f.write_str("array"),
            Type::Mixed => f.write_str("mixed"),
            Type::Callable => f.write_str("callable"),
            Type::Object => f.write_str("object"),
            Type::Void => f.write_str("void"),
            Type::Resource => f.write_str("resource"),
            Type::Class(name) => f.write_str(name),
            Type::GenericArray(element) => write!(f, "{element}[]"),
            Type::Closure(_) => f.write_str("Closure"),
        }
    }
}

/// The set of types an expression may have at runtime. An empty set means
/// the type is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnionType {
    types: BTreeSet<Type>,
}

impl UnionType {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(ty: Type) -> Self {
        let mut types = BTreeSet::new();
        types.insert(ty);
        Self { types }
    }

    /// Parses a declared type, resolving `self` and `static` to the declaring
    /// class. `?T` is read as `T|null`.
    pub fn from_declaration(raw: &str, class: Option<&str>) -> Result<Self, LoadError> {
        let mut union = UnionType::empty();
        for part in raw.split('|').map(str::trim).filter(|part| !part.is_empty()) {
            let (part, nullable) = match part.strip_prefix('?') {
                Some(rest) => (rest, true),
                None => (part, false),
            };
            let ty = match (part.to_ascii_lowercase().as_str(), class) {
                ("self" | "static", Some(class)) => Type::class(class),
                _ => Type::parse(part)?,
            };
            union.add(ty);
            if nullable {
                union.add(Type::Null);
            }
        }
        Ok(union)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.types.contains(ty)
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.iter()
    }

    pub fn head(&self) -> Option<&Type> {
        self.types.iter().next()
    }

    pub fn add(&mut self, ty: Type) -> bool {
        self.types.insert(ty)
    }

    /// Adds every type of `other`; returns whether anything was added.
    pub fn merge(&mut self, other: &UnionType) -> bool {
        let before = self.types.len();
        self.types.extend(other.types.iter().cloned());
        self.types.len() != before
    }

    pub fn merged(mut self, other: &UnionType) -> Self {
        self.merge(other);
        self
    }

    /// True when every member is a scalar. The empty type is not scalar.
    pub fn is_scalar(&self) -> bool {
        !self.is_empty() && self.types.iter().all(Type::is_scalar)
    }

    pub fn has_array_like(&self) -> bool {
        self.types.iter().any(Type::is_array_like)
    }

    pub fn is_array_only(&self) -> bool {
        !self.is_empty() && self.types.iter().all(Type::is_array_like)
    }

    /// Element types of the array members: `T` for `T[]`.
    pub fn element_types(&self) -> UnionType {
        let mut elements = UnionType::empty();
        for ty in &self.types {
            match ty {
                Type::GenericArray(element) => {
                    elements.add((**element).clone());
                }
                Type::Mixed => {
                    elements.add(Type::Mixed);
                }
                _ => {}
            }
        }
        elements
    }

    /// `T[]` for every member `T`; the empty type becomes `array`.
    pub fn as_generic_array(&self) -> UnionType {
        if self.is_empty() {
            return UnionType::of(Type::Array);
        }
        self.types
            .iter()
            .map(|ty| Type::GenericArray(Box::new(ty.clone())))
            .collect()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().filter_map(Type::class_name)
    }

    pub fn closure_ids(&self) -> impl Iterator<Item = &str> {
        self.types.iter().filter_map(|ty| match ty {
            Type::Closure(id) => Some(id.as_str()),
            _ => None,
        })
    }

    /// Adds the ancestors of every class member.
    pub fn expanded(&self, codebase: &CodeBase) -> UnionType {
        let mut expanded = self.clone();
        for name in self.class_names() {
            for ancestor in codebase.ancestors(name) {
                expanded.add(Type::class(&ancestor));
            }
        }
        expanded
    }

    /// Whether some member of this type can be used where some member of
    /// `target` is expected. Unknown types on either side always pass.
    pub fn can_cast_to(&self, target: &UnionType, codebase: &CodeBase) -> bool {
        if self.is_empty() || target.is_empty() {
            return true;
        }
        if self.contains(&Type::Mixed) || target.contains(&Type::Mixed) {
            return true;
        }
        let expanded = self.expanded(codebase);
        expanded
            .types
            .iter()
            .any(|from| target.types.iter().any(|to| from.can_cast_to(to)))
    }
}

impl FromIterator<Type> for UnionType {
    fn from_iter<I: IntoIterator<Item = Type>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .types
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join("|");
        f.write_str(&joined)
    }
}

impl FromStr for UnionType {
    type Err = LoadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        UnionType::from_declaration(raw, None)
    }
}

impl TryFrom<String> for UnionType {
    type Error = LoadError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<UnionType> for String {
    fn from(union: UnionType) -> Self {
        union.to_string()
    }
}
