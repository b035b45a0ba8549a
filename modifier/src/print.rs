// print.rs — Canonical text form of components and expressions
//
// Display impls emit the same surface syntax the parser accepts, so printing
// and re-parsing yields an equal model (modulo spans). Expressions get the
// minimal parentheses implied by operator precedence.
//
// Preconditions: none.
// Postconditions: output is accepted by `parser::parse` / `parser::parse_expr`
//   for every finite numeric literal.
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::*;

// ── Expressions ──

const PREC_PIECEWISE: u8 = 0;
const PREC_UNARY: u8 = 6;
const PREC_ATOM: u8 = 8;

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(n) if n.is_sign_negative() => PREC_UNARY,
        Expr::Number(_) | Expr::Symbol(_) | Expr::Call { .. } => PREC_ATOM,
        Expr::Unary { .. } => PREC_UNARY,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Piecewise { .. } => PREC_PIECEWISE,
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr, min_prec: u8) -> fmt::Result {
    let parenthesize = expr_precedence(expr) < min_prec;
    if parenthesize {
        write!(f, "(")?;
    }
    match expr {
        Expr::Number(n) => write!(f, "{}", n)?,
        Expr::Symbol(name) => write!(f, "{}", name)?,
        Expr::Unary { op, operand } => {
            let sym = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            };
            write!(f, "{}", sym)?;
            write_expr(f, operand, PREC_UNARY)?;
        }
        Expr::Binary { op, lhs, rhs } => {
            let p = op.precedence();
            let (lhs_min, rhs_min) = match op {
                BinaryOp::Pow => (PREC_ATOM, PREC_UNARY),
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge => (p + 1, p + 1),
                _ => (p, p + 1),
            };
            write_expr(f, lhs, lhs_min)?;
            if *op == BinaryOp::Pow {
                write!(f, "^")?;
            } else {
                write!(f, " {} ", op.symbol())?;
            }
            write_expr(f, rhs, rhs_min)?;
        }
        Expr::Call { func, args } => {
            write!(f, "{}(", func)?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expr(f, arg, PREC_PIECEWISE)?;
            }
            write!(f, ")")?;
        }
        Expr::Piecewise {
            branches,
            otherwise,
        } => {
            for (i, branch) in branches.iter().enumerate() {
                write!(f, "{} ", if i == 0 { "if" } else { " elif" })?;
                write_expr(f, &branch.condition, PREC_PIECEWISE)?;
                write!(f, " then ")?;
                write_expr(f, &branch.value, PREC_PIECEWISE)?;
            }
            write!(f, " else ")?;
            write_expr(f, otherwise, PREC_PIECEWISE)?;
        }
    }
    if parenthesize {
        write!(f, ")")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, PREC_PIECEWISE)
    }
}

// ── Components ──

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (family, role) = self.kind.keywords();
        write!(f, "{} {} {}", family, role, self.name)?;
        if let PortKind::AnalogReduce(op) = self.kind {
            write!(f, " {}", op.symbol())?;
        }
        Ok(())
    }
}

fn write_transition_body(
    f: &mut fmt::Formatter<'_>,
    assignments: &[StateAssignment],
    outputs: &[OutputEvent],
    target: Option<&str>,
) -> fmt::Result {
    if let Some(target) = target {
        write!(f, " -> {}", target)?;
    }
    if assignments.is_empty() && outputs.is_empty() {
        return writeln!(f, " {{}}");
    }
    writeln!(f, " {{")?;
    for a in assignments {
        writeln!(f, "      {} := {}", a.lhs, a.rhs)?;
    }
    for o in outputs {
        writeln!(f, "      emit {}", o.port)?;
    }
    writeln!(f, "    }}")
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  regime {}", self.name)?;
        if self.time_derivatives.is_empty()
            && self.on_conditions.is_empty()
            && self.on_events.is_empty()
        {
            return writeln!(f, " {{}}");
        }
        writeln!(f, " {{")?;
        for d in &self.time_derivatives {
            writeln!(f, "    {}' = {}", d.variable, d.rhs)?;
        }
        for oc in &self.on_conditions {
            write!(f, "    on {}", oc.trigger)?;
            write_transition_body(f, &oc.assignments, &oc.outputs, oc.target.as_deref())?;
        }
        for oe in &self.on_events {
            write!(f, "    on event {}", oe.port)?;
            write_transition_body(f, &oe.assignments, &oe.outputs, oe.target.as_deref())?;
        }
        writeln!(f, "  }}")
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component {}", self.name)?;
        let empty = self.parameters.is_empty()
            && self.ports().is_empty()
            && self.subnodes.is_empty()
            && self.state_variables.is_empty()
            && self.aliases.is_empty()
            && self.regimes.is_empty();
        if empty {
            return writeln!(f, " {{}}");
        }
        writeln!(f, " {{")?;
        for p in &self.parameters {
            writeln!(f, "  param {}", p.name)?;
        }
        for port in self.ports() {
            writeln!(f, "  {}", port)?;
        }
        for s in &self.subnodes {
            writeln!(f, "  subnode {} : {}", s.name, s.class)?;
        }
        for s in &self.state_variables {
            writeln!(f, "  state {}", s.name)?;
        }
        for a in &self.aliases {
            writeln!(f, "  alias {} := {}", a.lhs, a.rhs)?;
        }
        for r in &self.regimes {
            write!(f, "{}", r)?;
        }
        writeln!(f, "}}")
    }
}

/// Print several components as one source file, separated by blank lines.
pub fn print_components(components: &[Component]) -> String {
    components
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
