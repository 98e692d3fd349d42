mod common;

use common::*;
use hackle_analyzer::ast::{BinaryOperator, NodeKind};
use hackle_analyzer::{
    collect_declarations, AnalysisConfig, Analyzer, CallableId, CodeBase, Context, DiagnosticKind,
    SourceMap,
};

#[test]
fn bare_variable_statement_is_a_noop() {
    let outcome = analyze(stmts(
        1,
        vec![assign(1, var(1, "x"), int(1, 1)), var(2, "x")],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.diagnostics.len(), 1, "found {:?}", messages);
    assert_eq!(outcome.count(DiagnosticKind::NoOp), 1, "found {:?}", messages);
    assert!(
        messages[0].contains("no-op variable"),
        "expected no-op message, found {:?}",
        messages
    );
    assert_eq!(outcome.diagnostics[0].line, 2);
}

#[test]
fn each_bare_variable_on_a_line_is_its_own_noop() {
    let outcome = analyze(stmts(1, vec![var(3, "a"), var(3, "b")]));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::NoOp), 2, "found {:?}", messages);
    assert!(outcome.diagnostics.iter().all(|diagnostic| diagnostic.line == 3));
}

#[test]
fn reanalysis_does_not_repeat_body_diagnostics() {
    let outcome = analyze(stmts(
        1,
        vec![
            function(
                1,
                "f",
                vec![param("x")],
                None,
                vec![
                    var(2, "a"),
                    var(2, "b"),
                    call(3, "undefined_helper", vec![]),
                    ret(4, Some(var(4, "x"))),
                ],
            ),
            call(6, "f", vec![int(6, 1)]),
            call(7, "f", vec![string(7, "s")]),
        ],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::NoOp), 2, "found {:?}", messages);
    assert_eq!(
        outcome.count(DiagnosticKind::UndefinedReference),
        1,
        "found {:?}",
        messages
    );
    assert_eq!(outcome.return_type("f"), "int|string");
}

#[test]
fn bare_array_and_property_statements_are_noops() {
    let outcome = analyze(stmts(
        1,
        vec![
            array(1, vec![int(1, 1)]),
            prop(2, var(2, "this"), "missing"),
            node(
                3,
                NodeKind::Const {
                    name: "UNKNOWN".to_string(),
                },
            ),
        ],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::NoOp), 3, "found {:?}", messages);
    assert!(messages.iter().any(|message| message.contains("no-op array")));
    assert!(messages.iter().any(|message| message.contains("no-op property")));
    assert!(messages.iter().any(|message| message.contains("no-op constant")));
}

#[test]
fn expression_used_as_value_is_not_a_noop() {
    let outcome = analyze(stmts(
        1,
        vec![
            assign(1, var(1, "x"), int(1, 1)),
            echo(2, var(2, "x")),
        ],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
}

#[test]
fn foreach_over_scalar_is_a_type_error() {
    let outcome = analyze(stmts(
        1,
        vec![
            assign(1, var(1, "x"), int(1, 1)),
            foreach(2, var(2, "x"), var(2, "value"), vec![]),
        ],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::TypeError), 1, "found {:?}", messages);
    assert!(
        messages[0].contains("int passed to foreach instead of array"),
        "found {:?}",
        messages
    );
}

#[test]
fn foreach_over_array_binds_the_element_type() {
    let root = stmts(
        1,
        vec![
            assign(1, var(1, "list"), array(1, vec![int(1, 1), int(1, 2)])),
            foreach(2, var(2, "list"), var(2, "item"), vec![]),
        ],
    );
    let (context, outcome) = analyze_in_context(&root, AnalysisConfig::default());
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert_eq!(context.variable_type("list").to_string(), "int[]");
    assert_eq!(context.variable_type("item").to_string(), "int");
}

#[test]
fn echo_of_array_is_a_type_error() {
    let outcome = analyze(stmts(
        1,
        vec![echo(1, array(1, vec![string(1, "a")]))],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::TypeError), 1, "found {:?}", messages);
    assert!(messages[0].contains("array to string conversion"));
}

#[test]
fn arithmetic_with_one_array_operand_is_a_type_error() {
    let outcome = analyze(stmts(
        1,
        vec![assign(
            1,
            var(1, "x"),
            binary(1, BinaryOperator::Add, array(1, vec![int(1, 1)]), int(1, 2)),
        )],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::TypeError), 1, "found {:?}", messages);
    assert!(
        messages[0].contains("Invalid operator: left operand is array and right is not"),
        "found {:?}",
        messages
    );
}

#[test]
fn adding_two_arrays_is_fine() {
    let outcome = analyze(stmts(
        1,
        vec![assign(
            1,
            var(1, "x"),
            binary(
                1,
                BinaryOperator::Add,
                array(1, vec![int(1, 1)]),
                array(1, vec![int(1, 2)]),
            ),
        )],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
}

#[test]
fn call_to_undefined_function_is_reported() {
    let outcome = analyze(stmts(1, vec![call(3, "missing", vec![])]));
    let messages = outcome.messages();
    assert_eq!(
        outcome.count(DiagnosticKind::UndefinedReference),
        1,
        "found {:?}",
        messages
    );
    assert!(messages[0].contains("call to undefined function missing()"));
    assert_eq!(outcome.diagnostics[0].line, 3);
}

#[test]
fn unresolvable_method_call_is_reported_once() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(1, "Foo", None, vec![]),
            assign(2, var(2, "foo"), new(2, "Foo", vec![])),
            method_call(3, var(3, "foo"), "bar", vec![]),
        ],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.diagnostics.len(), 1, "found {:?}", messages);
    assert!(
        messages[0].contains("call to undefined method Foo::bar()"),
        "found {:?}",
        messages
    );
}

#[test]
fn method_call_on_untyped_receiver_is_silent() {
    let outcome = analyze(stmts(
        1,
        vec![method_call(1, var(1, "unknown"), "bar", vec![])],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
}

#[test]
fn method_call_through_this_resolves_inherited_methods() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(
                1,
                "Base",
                None,
                vec![method(2, "greet", vec![], Some("string"), false, vec![ret(2, Some(string(2, "hi")))])],
            ),
            class(
                3,
                "Child",
                Some("Base"),
                vec![method(
                    4,
                    "run",
                    vec![],
                    None,
                    false,
                    vec![ret(5, Some(method_call(5, var(5, "this"), "greet", vec![])))],
                )],
            ),
        ],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    let run = outcome
        .codebase
        .callable(&CallableId::method("Child", "run"))
        .expect("Child::run declared");
    assert_eq!(run.return_type.to_string(), "string");
}

#[test]
fn constructor_is_only_callable_through_parent() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(1, "Base", None, vec![method(2, "__construct", vec![], None, false, vec![])]),
            class(
                3,
                "Child",
                Some("Base"),
                vec![
                    method(
                        4,
                        "__construct",
                        vec![],
                        None,
                        false,
                        vec![static_call(5, "parent", "__construct", vec![])],
                    ),
                    method(
                        6,
                        "reset",
                        vec![],
                        None,
                        false,
                        vec![static_call(7, "static", "__construct", vec![])],
                    ),
                ],
            ),
        ],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.diagnostics.len(), 1, "found {:?}", messages);
    assert_eq!(outcome.count(DiagnosticKind::UndefinedReference), 1);
    assert_eq!(outcome.diagnostics[0].line, 7);
}

#[test]
fn static_call_to_instance_method_names_its_definition() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(1, "Greeter", None, vec![method(2, "hello", vec![], None, false, vec![])]),
            static_call(4, "Greeter", "hello", vec![]),
        ],
    ));
    let messages = outcome.messages();
    assert_eq!(
        outcome.count(DiagnosticKind::StaticCallError),
        1,
        "found {:?}",
        messages
    );
    assert!(
        messages[0].contains("defined at test.php:2"),
        "expected definition site, found {:?}",
        messages
    );
}

#[test]
fn static_call_to_static_method_is_fine() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(1, "Util", None, vec![method(2, "make", vec![], None, true, vec![])]),
            static_call(4, "Util", "make", vec![]),
        ],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
}

#[test]
fn new_of_undefined_class_is_reported() {
    let outcome = analyze(stmts(
        1,
        vec![assign(1, var(1, "x"), new(1, "Missing", vec![]))],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.diagnostics.len(), 1, "found {:?}", messages);
    assert!(messages[0].contains("reference to undefined class Missing"));
}

#[test]
fn new_records_class_usage() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(1, "Foo", None, vec![]),
            assign(2, var(2, "a"), new(2, "Foo", vec![])),
            assign(3, var(3, "b"), new(3, "Foo", vec![])),
        ],
    ));
    let foo = outcome.codebase.class("foo").expect("Foo declared");
    assert_eq!(foo.reference_count, 2);
}

#[test]
fn instanceof_undefined_class_is_reported() {
    let outcome = analyze(stmts(
        1,
        vec![assign(
            1,
            var(1, "is"),
            node(
                1,
                NodeKind::Instanceof {
                    subject: Box::new(var(1, "x")),
                    class: Box::new(name(1, "Nowhere")),
                },
            ),
        )],
    ));
    assert_eq!(
        outcome.count(DiagnosticKind::UndefinedReference),
        1,
        "found {:?}",
        outcome.messages()
    );
}

#[test]
fn constants_record_usage_and_unknown_ones_are_swallowed() {
    let outcome = analyze(stmts(
        1,
        vec![
            node(
                1,
                NodeKind::ConstDecl(hackle_analyzer::ast::ConstDecl {
                    name: "LIMIT".to_string(),
                    value: Box::new(int(1, 10)),
                }),
            ),
            echo(2, node(2, NodeKind::Const { name: "LIMIT".to_string() })),
            echo(3, node(3, NodeKind::Const { name: "UNKNOWN".to_string() })),
        ],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    let limit = outcome.codebase.constant("LIMIT").expect("LIMIT declared");
    assert_eq!(limit.reference_count, 1);
    assert_eq!(limit.union_type.to_string(), "int");
}

#[test]
fn global_statement_imports_the_global_type() {
    let outcome = analyze(stmts(
        1,
        vec![
            assign(1, var(1, "counter"), int(1, 0)),
            function(
                2,
                "current",
                vec![],
                None,
                vec![
                    node(3, NodeKind::Global { name: "counter".to_string() }),
                    ret(4, Some(var(4, "counter"))),
                ],
            ),
        ],
    ));
    assert_eq!(outcome.return_type("current"), "int");
}

#[test]
fn static_statement_merges_its_default() {
    let outcome = analyze(stmts(
        1,
        vec![function(
            1,
            "next_id",
            vec![],
            None,
            vec![
                node(
                    2,
                    NodeKind::Static {
                        name: "id".to_string(),
                        default: Some(Box::new(int(2, 0))),
                    },
                ),
                ret(3, Some(var(3, "id"))),
            ],
        )],
    ));
    assert_eq!(outcome.return_type("next_id"), "int");
}

#[test]
fn property_assignment_widens_the_property() {
    let outcome = analyze(stmts(
        1,
        vec![class(
            1,
            "Box",
            None,
            vec![
                property(2, "value", None),
                method(
                    3,
                    "fill",
                    vec![],
                    None,
                    false,
                    vec![assign(4, prop(4, var(4, "this"), "value"), string(4, "x"))],
                ),
            ],
        )],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    let class = outcome.codebase.class("Box").expect("Box declared");
    let value = class.property("value").expect("value declared");
    assert_eq!(value.union_type.to_string(), "string");
}

#[test]
fn closure_handler_returns_a_context_inside_the_closure() {
    let root = stmts(1, vec![closure(2, vec![], vec![])]);
    let mut codebase = CodeBase::with_builtins();
    collect_declarations(&mut codebase, FILE, &root).expect("declarations load");
    let sources = SourceMap::new();
    let mut analyzer = Analyzer::new(&mut codebase, AnalysisConfig::default(), &sources);

    let NodeKind::StatementList(statements) = &root.kind else {
        unreachable!()
    };
    let context = analyzer.visit(Context::new(FILE), Some(&root), &statements[0]);

    assert_eq!(context.callable(), Some(&CallableId::closure(FILE, 2)));
    assert_eq!(analyzer.diagnostics().count(DiagnosticKind::NoOp), 1);
}

#[test]
fn closure_bodies_do_not_leak_into_the_defining_scope() {
    let root = stmts(
        1,
        vec![
            assign(
                2,
                var(2, "task"),
                closure(2, vec![], vec![assign(3, var(3, "inner"), int(3, 1))]),
            ),
            assign(5, var(5, "after"), string(5, "done")),
        ],
    );
    let (context, outcome) = analyze_in_context(&root, AnalysisConfig::default());
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert!(context.callable().is_none());
    assert!(context.variable("inner").is_none());
    assert_eq!(context.variable_type("after").to_string(), "string");
}

#[test]
fn unhandled_nodes_leave_the_context_unchanged() {
    let mut codebase = CodeBase::new();
    let sources = SourceMap::new();
    let mut analyzer = Analyzer::new(&mut codebase, AnalysisConfig::default(), &sources);
    let context = Context::new(FILE).with_line(4);

    let after = analyzer.visit(context.clone(), None, &node(4, NodeKind::Break));

    assert_eq!(after, context);
    assert!(analyzer.diagnostics().is_empty());
}

#[test]
fn calling_a_closure_variable_infers_its_return_type() {
    let root = stmts(
        1,
        vec![
            assign(
                1,
                var(1, "double"),
                closure(
                    1,
                    vec![param("n")],
                    vec![ret(1, Some(binary(1, BinaryOperator::Multiply, var(1, "n"), int(1, 2))))],
                ),
            ),
            assign(2, var(2, "result"), call_value(2, var(2, "double"), vec![int(2, 4)])),
        ],
    );
    let (context, outcome) = analyze_in_context(&root, AnalysisConfig::default());
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert_eq!(context.variable_type("double").to_string(), "Closure");
    assert_eq!(context.variable_type("result").to_string(), "int");
}
