mod analyzer;
mod arguments;
mod assignment;
mod call_site;
mod compatibility;
mod declarations;
mod inference;
mod resolver;
mod visitor;

pub mod ast;
pub mod codebase;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod source;
pub mod types;

pub use crate::analyzer::{analyze_units, Analysis, Analyzer, SourceUnit};
pub use crate::codebase::{CallableId, Class, CodeBase, Constant, Method, Parameter, Property, Site};
pub use crate::config::AnalysisConfig;
pub use crate::context::{Context, Scope, Variable};
pub use crate::declarations::collect_declarations;
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLevel, Diagnostics};
pub use crate::error::{LoadError, ResolveError};
pub use crate::source::{SourceFile, SourceLookup, SourceMap};
pub use crate::types::{Type, UnionType};
