#![allow(dead_code)]

use hackle_analyzer::ast::{
    ArrayItem, BinaryOperator, ClassDecl, ClosureDecl, FunctionDecl, Literal, MethodDecl, Name,
    Node, NodeKind, ParameterDecl, PropertyDecl,
};
use hackle_analyzer::{
    analyze_units, collect_declarations, AnalysisConfig, Analyzer, CodeBase, Context, Diagnostic,
    DiagnosticKind, SourceFile, SourceMap, SourceUnit,
};

pub const FILE: &str = "test.php";

pub struct Outcome {
    pub codebase: CodeBase,
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|diagnostic| format!("{}: {}", diagnostic.kind, diagnostic.message))
            .collect()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.kind == kind)
            .count()
    }

    pub fn return_type(&self, function: &str) -> String {
        self.codebase
            .function(function)
            .map(|function| function.return_type.to_string())
            .unwrap_or_else(|| panic!("function {function} not declared"))
    }
}

pub fn analyze(root: Node) -> Outcome {
    analyze_with(root, AnalysisConfig::default(), None)
}

pub fn analyze_with(root: Node, config: AnalysisConfig, source: Option<&str>) -> Outcome {
    let mut sources = SourceMap::new();
    if let Some(source) = source {
        sources.insert(FILE, SourceFile::new(FILE.into(), source.to_string()));
    }
    let units = vec![SourceUnit {
        path: FILE.to_string(),
        root,
        source: source.map(str::to_string),
    }];
    let analysis = analyze_units(&units, config, &sources).expect("declarations load");
    Outcome {
        codebase: analysis.codebase,
        diagnostics: analysis.diagnostics.into_entries(),
    }
}

/// Analyzes several files as one program, in the order given.
pub fn analyze_files(files: Vec<(&str, Node)>) -> Outcome {
    let units = files
        .into_iter()
        .map(|(path, root)| SourceUnit {
            path: path.to_string(),
            root,
            source: None,
        })
        .collect::<Vec<_>>();
    let analysis = analyze_units(&units, AnalysisConfig::default(), &SourceMap::new())
        .expect("declarations load");
    Outcome {
        codebase: analysis.codebase,
        diagnostics: analysis.diagnostics.into_entries(),
    }
}

/// Analyzes `root` and returns the file's final global context alongside the
/// diagnostics.
pub fn analyze_in_context(root: &Node, config: AnalysisConfig) -> (Context, Outcome) {
    let mut codebase = CodeBase::with_builtins();
    collect_declarations(&mut codebase, FILE, root).expect("declarations load");
    let sources = SourceMap::new();
    let (context, diagnostics) = {
        let mut analyzer = Analyzer::new(&mut codebase, config, &sources);
        let context = analyzer.analyze_file(FILE, root);
        (context, analyzer.into_diagnostics())
    };
    let outcome = Outcome {
        codebase,
        diagnostics: diagnostics.into_entries(),
    };
    (context, outcome)
}

pub fn node(line: usize, kind: NodeKind) -> Node {
    Node::new(line, kind)
}

pub fn stmts(line: usize, statements: Vec<Node>) -> Node {
    node(line, NodeKind::StatementList(statements))
}

pub fn var(line: usize, name: &str) -> Node {
    node(line, NodeKind::Variable(Name::Literal(name.to_string())))
}

pub fn var_var(line: usize, inner: Node) -> Node {
    node(line, NodeKind::Variable(Name::Dynamic(Box::new(inner))))
}

pub fn int(line: usize, value: i64) -> Node {
    node(line, NodeKind::Literal(Literal::Int(value)))
}

pub fn float(line: usize, value: f64) -> Node {
    node(line, NodeKind::Literal(Literal::Float(value)))
}

pub fn string(line: usize, value: &str) -> Node {
    node(line, NodeKind::Literal(Literal::String(value.to_string())))
}

pub fn boolean(line: usize, value: bool) -> Node {
    node(line, NodeKind::Literal(Literal::Bool(value)))
}

pub fn array(line: usize, values: Vec<Node>) -> Node {
    let items = values
        .into_iter()
        .map(|value| ArrayItem { key: None, value })
        .collect();
    node(line, NodeKind::Array(items))
}

pub fn name(line: usize, name: &str) -> Node {
    node(line, NodeKind::Name(name.to_string()))
}

pub fn assign(line: usize, target: Node, value: Node) -> Node {
    node(
        line,
        NodeKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        },
    )
}

pub fn binary(line: usize, operator: BinaryOperator, left: Node, right: Node) -> Node {
    node(
        line,
        NodeKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
    )
}

pub fn call(line: usize, function: &str, arguments: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::Call {
            callee: Box::new(name(line, function)),
            arguments,
        },
    )
}

pub fn call_value(line: usize, callee: Node, arguments: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::Call {
            callee: Box::new(callee),
            arguments,
        },
    )
}

pub fn ret(line: usize, expression: Option<Node>) -> Node {
    node(line, NodeKind::Return(expression.map(Box::new)))
}

pub fn echo(line: usize, expression: Node) -> Node {
    node(line, NodeKind::Echo(Box::new(expression)))
}

pub fn dim(line: usize, base: Node, index: Option<Node>) -> Node {
    node(
        line,
        NodeKind::Dim {
            base: Box::new(base),
            index: index.map(Box::new),
        },
    )
}

pub fn prop(line: usize, object: Node, property: &str) -> Node {
    node(
        line,
        NodeKind::Prop {
            object: Box::new(object),
            name: Name::Literal(property.to_string()),
        },
    )
}

pub fn dynamic_prop(line: usize, object: Node, property: Node) -> Node {
    node(
        line,
        NodeKind::Prop {
            object: Box::new(object),
            name: Name::Dynamic(Box::new(property)),
        },
    )
}

pub fn new(line: usize, class: &str, arguments: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::New {
            class: Box::new(name(line, class)),
            arguments,
        },
    )
}

pub fn method_call(line: usize, receiver: Node, method: &str, arguments: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::MethodCall {
            receiver: Box::new(receiver),
            method: Name::Literal(method.to_string()),
            arguments,
        },
    )
}

pub fn static_call(line: usize, class: &str, method: &str, arguments: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::StaticCall {
            class: Box::new(name(line, class)),
            method: Name::Literal(method.to_string()),
            arguments,
        },
    )
}

pub fn foreach(line: usize, subject: Node, value: Node, body: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::Foreach {
            subject: Box::new(subject),
            key: None,
            value: Box::new(value),
            body: Box::new(stmts(line, body)),
            by_ref: false,
        },
    )
}

pub fn param(name: &str) -> ParameterDecl {
    ParameterDecl {
        name: name.to_string(),
        type_annotation: None,
        by_ref: false,
        variadic: false,
        default: None,
    }
}

pub fn typed_param(name: &str, annotation: &str) -> ParameterDecl {
    ParameterDecl {
        type_annotation: Some(annotation.to_string()),
        ..param(name)
    }
}

pub fn ref_param(name: &str) -> ParameterDecl {
    ParameterDecl {
        by_ref: true,
        ..param(name)
    }
}

pub fn function(
    line: usize,
    name: &str,
    parameters: Vec<ParameterDecl>,
    return_type: Option<&str>,
    body: Vec<Node>,
) -> Node {
    node(
        line,
        NodeKind::FunctionDecl(FunctionDecl {
            name: name.to_string(),
            parameters,
            return_type: return_type.map(str::to_string),
            body: Box::new(stmts(line, body)),
        }),
    )
}

pub fn class(line: usize, name: &str, parent: Option<&str>, members: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::ClassDecl(ClassDecl {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            is_trait: false,
            body: Box::new(stmts(line, members)),
        }),
    )
}

pub fn trait_decl(line: usize, name: &str, members: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::ClassDecl(ClassDecl {
            name: name.to_string(),
            parent: None,
            is_trait: true,
            body: Box::new(stmts(line, members)),
        }),
    )
}

pub fn method(
    line: usize,
    name: &str,
    parameters: Vec<ParameterDecl>,
    return_type: Option<&str>,
    is_static: bool,
    body: Vec<Node>,
) -> Node {
    node(
        line,
        NodeKind::MethodDecl(MethodDecl {
            name: name.to_string(),
            parameters,
            return_type: return_type.map(str::to_string),
            is_static,
            body: Some(Box::new(stmts(line, body))),
        }),
    )
}

pub fn property(line: usize, name: &str, annotation: Option<&str>) -> Node {
    node(
        line,
        NodeKind::PropertyDecl(PropertyDecl {
            name: name.to_string(),
            type_annotation: annotation.map(str::to_string),
            is_static: false,
            default: None,
        }),
    )
}

pub fn closure(line: usize, parameters: Vec<ParameterDecl>, body: Vec<Node>) -> Node {
    node(
        line,
        NodeKind::Closure(ClosureDecl {
            parameters,
            uses: Vec::new(),
            return_type: None,
            is_static: false,
            body: Box::new(stmts(line, body)),
        }),
    )
}
