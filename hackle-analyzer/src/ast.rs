use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub line: usize,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(line: usize, kind: NodeKind) -> Self {
        Self { line, kind }
    }

    pub fn is_statement_list(&self) -> bool {
        matches!(self.kind, NodeKind::StatementList(_))
    }

    /// Children in evaluation order. The traversal driver visits these before
    /// the node itself.
    pub fn children(&self) -> Vec<&Node> {
        let mut children = Vec::new();
        match &self.kind {
            NodeKind::StatementList(statements)
            | NodeKind::If(statements)
            | NodeKind::ExpressionList(statements)
            | NodeKind::ListTarget(statements) => children.extend(statements.iter()),
            NodeKind::ClassDecl(class) => children.push(class.body.as_ref()),
            NodeKind::FunctionDecl(function) => children.push(function.body.as_ref()),
            NodeKind::MethodDecl(method) => children.extend(method.body.as_deref()),
            NodeKind::Closure(closure) => children.push(closure.body.as_ref()),
            NodeKind::PropertyDecl(property) => children.extend(property.default.as_deref()),
            NodeKind::ClassConstDecl(constant) | NodeKind::ConstDecl(constant) => {
                children.push(constant.value.as_ref())
            }
            NodeKind::IfElement { condition, body } | NodeKind::SwitchCase { condition, body } => {
                children.extend(condition.as_deref());
                children.push(body.as_ref());
            }
            NodeKind::While { condition, body } => {
                children.push(condition.as_ref());
                children.push(body.as_ref());
            }
            NodeKind::DoWhile { body, condition } => {
                children.push(body.as_ref());
                children.push(condition.as_ref());
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                children.extend(init.as_deref());
                children.extend(condition.as_deref());
                children.extend(step.as_deref());
                children.push(body.as_ref());
            }
            NodeKind::Switch { subject, cases } => {
                children.push(subject.as_ref());
                children.extend(cases.iter());
            }
            NodeKind::Foreach {
                subject,
                key,
                value,
                body,
                ..
            } => {
                children.push(subject.as_ref());
                children.extend(key.as_deref());
                children.push(value.as_ref());
                children.push(body.as_ref());
            }
            NodeKind::Static { default, .. } => children.extend(default.as_deref()),
            NodeKind::Echo(inner)
            | NodeKind::Print(inner)
            | NodeKind::Throw(inner)
            | NodeKind::Unset(inner) => children.push(inner.as_ref()),
            NodeKind::Return(expression) => children.extend(expression.as_deref()),
            NodeKind::Assign { target, value } | NodeKind::AssignRef { target, value } => {
                children.push(target.as_ref());
                children.push(value.as_ref());
            }
            NodeKind::Variable(name) => children.extend(name.dynamic()),
            NodeKind::Array(items) => {
                for item in items {
                    children.extend(item.key.as_ref());
                    children.push(&item.value);
                }
            }
            NodeKind::Dim { base, index } => {
                children.push(base.as_ref());
                children.extend(index.as_deref());
            }
            NodeKind::Prop { object, name } => {
                children.push(object.as_ref());
                children.extend(name.dynamic());
            }
            NodeKind::StaticProp { class, name } => {
                children.push(class.as_ref());
                children.extend(name.dynamic());
            }
            NodeKind::ClassConst { class, .. } => children.push(class.as_ref()),
            NodeKind::Call { callee, arguments } => {
                children.push(callee.as_ref());
                children.extend(arguments.iter());
            }
            NodeKind::MethodCall {
                receiver,
                method,
                arguments,
            } => {
                children.push(receiver.as_ref());
                children.extend(method.dynamic());
                children.extend(arguments.iter());
            }
            NodeKind::StaticCall {
                class,
                method,
                arguments,
            } => {
                children.push(class.as_ref());
                children.extend(method.dynamic());
                children.extend(arguments.iter());
            }
            NodeKind::New { class, arguments } => {
                children.push(class.as_ref());
                children.extend(arguments.iter());
            }
            NodeKind::Instanceof { subject, class } => {
                children.push(subject.as_ref());
                children.push(class.as_ref());
            }
            NodeKind::Binary { left, right, .. } => {
                children.push(left.as_ref());
                children.push(right.as_ref());
            }
            NodeKind::Unary { operand, .. } => children.push(operand.as_ref()),
            NodeKind::Cast { subject, .. } => children.push(subject.as_ref()),
            NodeKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                children.push(condition.as_ref());
                children.extend(then.as_deref());
                children.push(otherwise.as_ref());
            }
            NodeKind::Global { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Literal(_)
            | NodeKind::Const { .. }
            | NodeKind::Name(_) => {}
        }
        children
    }

    /// Short description used by no-op diagnostics.
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            NodeKind::Variable(_) => "variable",
            NodeKind::Array(_) => "array",
            NodeKind::Prop { .. } | NodeKind::StaticProp { .. } => "property",
            NodeKind::Const { .. } | NodeKind::ClassConst { .. } => "constant",
            NodeKind::Closure(_) => "closure",
            NodeKind::Literal(_) => "literal",
            _ => "expression",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    StatementList(Vec<Node>),
    ClassDecl(ClassDecl),
    FunctionDecl(FunctionDecl),
    MethodDecl(MethodDecl),
    PropertyDecl(PropertyDecl),
    ClassConstDecl(ConstDecl),
    ConstDecl(ConstDecl),
    If(Vec<Node>),
    IfElement {
        condition: Option<Box<Node>>,
        body: Box<Node>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        condition: Box<Node>,
    },
    For {
        init: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        step: Option<Box<Node>>,
        body: Box<Node>,
    },
    ExpressionList(Vec<Node>),
    Switch {
        subject: Box<Node>,
        cases: Vec<Node>,
    },
    SwitchCase {
        condition: Option<Box<Node>>,
        body: Box<Node>,
    },
    Foreach {
        subject: Box<Node>,
        key: Option<Box<Node>>,
        value: Box<Node>,
        body: Box<Node>,
        #[serde(default)]
        by_ref: bool,
    },
    Global {
        name: String,
    },
    Static {
        name: String,
        default: Option<Box<Node>>,
    },
    Echo(Box<Node>),
    Print(Box<Node>),
    Return(Option<Box<Node>>),
    Break,
    Continue,
    Throw(Box<Node>),
    Unset(Box<Node>),
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    AssignRef {
        target: Box<Node>,
        value: Box<Node>,
    },
    Variable(Name),
    Literal(Literal),
    Array(Vec<ArrayItem>),
    /// `list($a, $b)` on the left-hand side of an assignment.
    ListTarget(Vec<Node>),
    Dim {
        base: Box<Node>,
        index: Option<Box<Node>>,
    },
    Prop {
        object: Box<Node>,
        name: Name,
    },
    StaticProp {
        class: Box<Node>,
        name: Name,
    },
    Const {
        name: String,
    },
    ClassConst {
        class: Box<Node>,
        name: String,
    },
    /// A bare identifier: function name or class reference (`Foo`, `self`,
    /// `static`, `parent`).
    Name(String),
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    MethodCall {
        receiver: Box<Node>,
        method: Name,
        arguments: Vec<Node>,
    },
    StaticCall {
        class: Box<Node>,
        method: Name,
        arguments: Vec<Node>,
    },
    New {
        class: Box<Node>,
        arguments: Vec<Node>,
    },
    Instanceof {
        subject: Box<Node>,
        class: Box<Node>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    Cast {
        target: CastType,
        subject: Box<Node>,
    },
    Conditional {
        condition: Box<Node>,
        then: Option<Box<Node>>,
        otherwise: Box<Node>,
    },
    Closure(ClosureDecl),
}

/// A name slot that is either written literally (`$foo`, `->bar`) or computed
/// from another expression (`$$foo`, `->$bar`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Name {
    Literal(String),
    Dynamic(Box<Node>),
}

impl Name {
    pub fn literal(&self) -> Option<&str> {
        match self {
            Name::Literal(name) => Some(name.as_str()),
            Name::Dynamic(_) => None,
        }
    }

    pub fn dynamic(&self) -> Option<&Node> {
        match self {
            Name::Literal(_) => None,
            Name::Dynamic(node) => Some(node.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_trait: bool,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default)]
    pub return_type: Option<String>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    /// `None` for abstract and interface methods.
    #[serde(default)]
    pub body: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureDecl {
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default)]
    pub uses: Vec<ClosureUse>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureUse {
    pub name: String,
    #[serde(default)]
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(default)]
    pub type_annotation: Option<String>,
    #[serde(default)]
    pub by_ref: bool,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub default: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    #[serde(default)]
    pub type_annotation: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub default: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: String,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItem {
    #[serde(default)]
    pub key: Option<Node>,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Concat,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Xor,
    Coalesce,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
                | BinaryOperator::Power
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastType {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}
