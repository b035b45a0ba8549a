// AST node types for abstraction-layer component definitions.
//
// A component declares parameters, ports, nested component instances
// (subnodes), state variables, aliases and regimes. Every right-hand side,
// trigger and derivative is an `Expr` tree exclusively owned by the component.
// Ports are kept in an arena addressed by `PortId` handles.
//
// Preconditions: produced by the parser, or assembled by hand in tests.
// Postconditions: port handles follow declaration order.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;
use serde::Serialize;

use crate::id::{IdAllocator, PortId};

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Component ──

/// A dynamics component class.
///
/// The port collection is private: ports can only be added through
/// `add_port` (which allocates a handle) and removed through `remove_port`.
/// Duplicate names are representable; `validate` reports them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub name: String,
    pub parameters: Vec<Parameter>,
    ports: Vec<Port>,
    pub subnodes: Vec<Subnode>,
    pub state_variables: Vec<StateVariable>,
    pub aliases: Vec<Alias>,
    pub regimes: Vec<Regime>,
    #[serde(skip)]
    pub span: Span,
    #[serde(skip)]
    ids: IdAllocator,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            ports: Vec::new(),
            subnodes: Vec::new(),
            state_variables: Vec::new(),
            aliases: Vec::new(),
            regimes: Vec::new(),
            span: (0..0).into(),
            ids: IdAllocator::new(),
        }
    }

    /// All ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Append a port and return its handle. Names are not checked here.
    pub fn add_port(&mut self, name: impl Into<String>, kind: PortKind, span: Span) -> PortId {
        let id = self.ids.alloc_port();
        self.ports.push(Port {
            id,
            name: name.into(),
            kind,
            span,
        });
        id
    }

    /// Remove a port by handle, preserving the order of the remaining ports.
    pub fn remove_port(&mut self, id: PortId) -> Option<Port> {
        let pos = self.ports.iter().position(|p| p.id == id)?;
        Some(self.ports.remove(pos))
    }

    pub fn regime(&self, name: &str) -> Option<&Regime> {
        self.regimes.iter().find(|r| r.name == name)
    }
}

// ── Declarations ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(skip)]
    pub span: Span,
}

/// `subnode name : Class` — an unexpanded nested component instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subnode {
    pub name: String,
    pub class: String,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVariable {
    pub name: String,
    #[serde(skip)]
    pub span: Span,
}

/// `alias lhs := rhs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alias {
    pub lhs: String,
    pub rhs: Expr,
    #[serde(skip)]
    pub span: Span,
}

// ── Ports ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub kind: PortKind,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    AnalogSend,
    AnalogReceive,
    AnalogReduce(ReduceOp),
    EventSend,
    EventReceive,
}

impl PortKind {
    pub fn is_analog(self) -> bool {
        matches!(
            self,
            PortKind::AnalogSend | PortKind::AnalogReceive | PortKind::AnalogReduce(_)
        )
    }

    pub fn is_reduce(self) -> bool {
        matches!(self, PortKind::AnalogReduce(_))
    }

    pub fn is_event(self) -> bool {
        matches!(self, PortKind::EventSend | PortKind::EventReceive)
    }

    /// Declaration keywords, e.g. `("analog", "send")`.
    pub fn keywords(self) -> (&'static str, &'static str) {
        match self {
            PortKind::AnalogSend => ("analog", "send"),
            PortKind::AnalogReceive => ("analog", "recv"),
            PortKind::AnalogReduce(_) => ("analog", "reduce"),
            PortKind::EventSend => ("event", "send"),
            PortKind::EventReceive => ("event", "recv"),
        }
    }
}

/// Aggregation applied by a reduce port to its incoming connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceOp {
    Sum,
}

impl ReduceOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ReduceOp::Sum => "+",
        }
    }
}

// ── Regimes and transitions ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regime {
    pub name: String,
    pub time_derivatives: Vec<TimeDerivative>,
    pub on_conditions: Vec<OnCondition>,
    pub on_events: Vec<OnEvent>,
    #[serde(skip)]
    pub span: Span,
}

/// `V' = rhs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeDerivative {
    pub variable: String,
    pub rhs: Expr,
    #[serde(skip)]
    pub span: Span,
}

/// `on trigger -> target { ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnCondition {
    pub trigger: Expr,
    pub assignments: Vec<StateAssignment>,
    pub outputs: Vec<OutputEvent>,
    pub target: Option<String>,
    #[serde(skip)]
    pub span: Span,
}

/// `on event port -> target { ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnEvent {
    pub port: String,
    pub assignments: Vec<StateAssignment>,
    pub outputs: Vec<OutputEvent>,
    pub target: Option<String>,
    #[serde(skip)]
    pub span: Span,
}

/// `lhs := rhs` inside a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateAssignment {
    pub lhs: String,
    pub rhs: Expr,
    #[serde(skip)]
    pub span: Span,
}

/// `emit port` inside a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputEvent {
    pub port: String,
    #[serde(skip)]
    pub span: Span,
}

// ── Expressions ──

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Number(f64),
    /// Free reference to a parameter, port, state variable or alias.
    Symbol(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
    /// `if c1 then v1 elif c2 then v2 else otherwise`
    Piecewise {
        branches: Vec<Branch>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// The literal `0`, the default value for closed ports.
    pub fn zero() -> Self {
        Expr::Number(0.0)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub condition: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength; higher binds tighter. Mirrors the parser's layering.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div => 5,
            BinaryOp::Pow => 7,
        }
    }
}
