mod common;

use common::*;
use hackle_analyzer::ast::{Node, NodeKind};
use hackle_analyzer::{CallableId, DiagnosticKind};
use proptest::prelude::*;

fn if_return(line: usize, condition: Node, value: Node) -> Node {
    node(
        line,
        NodeKind::If(vec![node(
            line,
            NodeKind::IfElement {
                condition: Some(Box::new(condition)),
                body: Box::new(stmts(line, vec![ret(line, Some(value))])),
            },
        )]),
    )
}

#[test]
fn matching_declared_return_is_silent() {
    let outcome = analyze(stmts(
        1,
        vec![function(1, "answer", vec![], Some("int"), vec![ret(2, Some(int(2, 42)))])],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert_eq!(outcome.return_type("answer"), "int");
}

#[test]
fn mismatched_declared_return_is_reported_once() {
    let outcome = analyze(stmts(
        1,
        vec![function(
            1,
            "answer",
            vec![],
            Some("int"),
            vec![ret(2, Some(string(2, "forty-two")))],
        )],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.diagnostics.len(), 1, "found {:?}", messages);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::TypeError);
    assert_eq!(outcome.diagnostics[0].line, 2);
    assert!(
        messages[0].contains("return type of 'answer': expected int, found string"),
        "found {:?}",
        messages
    );
    assert_eq!(outcome.return_type("answer"), "int");
}

#[test]
fn undeclared_return_type_collects_every_return() {
    let outcome = analyze(stmts(
        1,
        vec![function(
            1,
            "pick",
            vec![param("flag")],
            None,
            vec![
                if_return(2, var(2, "flag"), int(2, 1)),
                if_return(3, var(3, "flag"), string(3, "one")),
                ret(4, Some(node(4, NodeKind::Const { name: "null".into() }))),
            ],
        )],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert_eq!(outcome.return_type("pick"), "int|string|null");
}

#[test]
fn bare_return_adds_nothing() {
    let outcome = analyze(stmts(
        1,
        vec![function(1, "nothing", vec![], None, vec![ret(2, None)])],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert_eq!(outcome.return_type("nothing"), "");
}

#[test]
fn trait_methods_are_not_checked() {
    let outcome = analyze(stmts(
        1,
        vec![trait_decl(
            1,
            "Greets",
            vec![method(
                2,
                "greet",
                vec![],
                Some("int"),
                false,
                vec![ret(3, Some(string(3, "hello")))],
            )],
        )],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    let greet = outcome
        .codebase
        .callable(&CallableId::method("Greets", "greet"))
        .expect("trait method declared");
    assert_eq!(greet.return_type.to_string(), "int");
}

#[test]
fn top_level_return_is_ignored() {
    let outcome = analyze(stmts(1, vec![ret(1, Some(array(1, vec![])))]));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
}

#[test]
fn subclass_satisfies_declared_parent_return() {
    let outcome = analyze(stmts(
        1,
        vec![
            class(1, "Shape", None, vec![]),
            class(2, "Circle", Some("Shape"), vec![]),
            function(
                3,
                "make",
                vec![],
                Some("Shape"),
                vec![ret(4, Some(new(4, "Circle", vec![])))],
            ),
        ],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
}

#[test]
fn nullable_declaration_accepts_null() {
    let outcome = analyze(stmts(
        1,
        vec![function(
            1,
            "maybe",
            vec![],
            Some("?int"),
            vec![ret(2, Some(node(2, NodeKind::Const { name: "null".into() })))],
        )],
    ));
    assert!(outcome.diagnostics.is_empty(), "found {:?}", outcome.messages());
    assert_eq!(outcome.return_type("maybe"), "int|null");
}

#[test]
fn method_returns_are_checked_against_their_class() {
    let outcome = analyze(stmts(
        1,
        vec![class(
            1,
            "Counter",
            None,
            vec![method(
                2,
                "next",
                vec![],
                Some("int"),
                false,
                vec![ret(3, Some(array(3, vec![int(3, 1)])))],
            )],
        )],
    ));
    let messages = outcome.messages();
    assert_eq!(outcome.count(DiagnosticKind::TypeError), 1, "found {:?}", messages);
    assert!(
        messages[0].contains("return type of 'Counter::next': expected int, found int[]"),
        "found {:?}",
        messages
    );
}

fn literal(kind: u8, line: usize) -> (Node, &'static str) {
    match kind {
        0 => (int(line, 1), "int"),
        1 => (float(line, 1.5), "float"),
        2 => (string(line, "s"), "string"),
        _ => (boolean(line, true), "bool"),
    }
}

proptest! {
    /// The inferred return type does not depend on the order of the returns.
    #[test]
    fn inferred_return_type_ignores_statement_order(
        kinds in prop::collection::vec(0u8..4, 1..6).prop_shuffle()
    ) {
        let mut expected = std::collections::BTreeSet::new();
        let body = kinds
            .iter()
            .enumerate()
            .map(|(index, kind)| {
                let line = index + 2;
                let (value, name) = literal(*kind, line);
                expected.insert(name);
                if_return(line, var(line, "flag"), value)
            })
            .collect::<Vec<_>>();
        let outcome = analyze(stmts(
            1,
            vec![function(1, "pick", vec![param("flag")], None, body)],
        ));

        let inferred = outcome.return_type("pick");
        let mut found = inferred.split('|').collect::<Vec<_>>();
        found.sort_unstable();
        let expected = expected.into_iter().collect::<Vec<_>>();
        prop_assert_eq!(found, expected);
    }
}
