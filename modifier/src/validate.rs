// validate.rs — Structural checks on a parsed component
//
// Reports name clashes, dangling references between regimes, transitions
// and ports, and expression symbols that resolve to nothing. Validation
// never modifies the component.
//
// Preconditions: none.
// Postconditions: diagnostics are ordered by check, then declaration order.
// Failure modes: none (problems are reported as diagnostics).
// Side effects: none.

use std::collections::{HashMap, HashSet};

use crate::ast::*;
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::query::free_symbols;

/// The implicit time symbol, always in scope.
pub const TIME_SYMBOL: &str = "t";

pub fn validate(component: &Component) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    check_duplicate_ports(component, &mut diags);
    check_duplicate_regimes(component, &mut diags);
    check_transitions(component, &mut diags);
    check_state_targets(component, &mut diags);
    check_send_ports(component, &mut diags);
    check_unresolved_symbols(component, &mut diags);
    diags
}

fn check_duplicate_ports(component: &Component, diags: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<&str, &Port> = HashMap::new();
    for port in component.ports() {
        if let Some(first) = seen.get(port.name.as_str()) {
            diags.push(
                Diagnostic::new(
                    DiagLevel::Error,
                    port.span,
                    format!(
                        "duplicate port `{}` in component `{}`",
                        port.name, component.name
                    ),
                )
                .with_code(codes::E0101_DUPLICATE_PORT)
                .with_related(first.span, "first declared here"),
            );
        } else {
            seen.insert(&port.name, port);
        }
    }
}

fn check_duplicate_regimes(component: &Component, diags: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<&str, &Regime> = HashMap::new();
    for regime in &component.regimes {
        if let Some(first) = seen.get(regime.name.as_str()) {
            diags.push(
                Diagnostic::new(
                    DiagLevel::Error,
                    regime.span,
                    format!("duplicate regime `{}`", regime.name),
                )
                .with_code(codes::E0102_DUPLICATE_REGIME)
                .with_related(first.span, "first declared here"),
            );
        } else {
            seen.insert(&regime.name, regime);
        }
    }
}

fn has_port(component: &Component, name: &str, kind: PortKind) -> bool {
    component
        .ports()
        .iter()
        .any(|p| p.name == name && p.kind == kind)
}

/// Attach the declaration of a same-named port of another role, if any.
fn with_role_mismatch(diag: Diagnostic, component: &Component, name: &str) -> Diagnostic {
    match component.ports().iter().find(|p| p.name == name) {
        Some(port) => {
            let (family, role) = port.kind.keywords();
            diag.with_cause(
                format!("`{}` is declared as `{} {}`", name, family, role),
                Some(port.span),
            )
        }
        None => diag,
    }
}

fn check_target(
    component: &Component,
    target: Option<&str>,
    span: Span,
    diags: &mut Vec<Diagnostic>,
) {
    if let Some(target) = target {
        if component.regime(target).is_none() {
            diags.push(
                Diagnostic::new(
                    DiagLevel::Error,
                    span,
                    format!("transition targets undeclared regime `{}`", target),
                )
                .with_code(codes::E0103_UNKNOWN_TARGET_REGIME),
            );
        }
    }
}

fn check_outputs(component: &Component, outputs: &[OutputEvent], diags: &mut Vec<Diagnostic>) {
    for output in outputs {
        if !has_port(component, &output.port, PortKind::EventSend) {
            let diag = Diagnostic::new(
                DiagLevel::Error,
                output.span,
                format!("`emit {}` does not name an event send port", output.port),
            )
            .with_code(codes::E0105_NOT_EVENT_SEND_PORT)
            .with_hint(format!("declare `event send {}`", output.port));
            diags.push(with_role_mismatch(diag, component, &output.port));
        }
    }
}

fn check_transitions(component: &Component, diags: &mut Vec<Diagnostic>) {
    for regime in &component.regimes {
        for oc in &regime.on_conditions {
            check_target(component, oc.target.as_deref(), oc.span, diags);
            check_outputs(component, &oc.outputs, diags);
        }
        for oe in &regime.on_events {
            if !has_port(component, &oe.port, PortKind::EventReceive) {
                let diag = Diagnostic::new(
                    DiagLevel::Error,
                    oe.span,
                    format!("`on event {}` does not name an event receive port", oe.port),
                )
                .with_code(codes::E0104_NOT_EVENT_RECEIVE_PORT)
                .with_hint(format!("declare `event recv {}`", oe.port));
                diags.push(with_role_mismatch(diag, component, &oe.port));
            }
            check_target(component, oe.target.as_deref(), oe.span, diags);
            check_outputs(component, &oe.outputs, diags);
        }
    }
}

fn check_state_targets(component: &Component, diags: &mut Vec<Diagnostic>) {
    let states: HashSet<&str> = component
        .state_variables
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    let mut report = |name: &str, span: Span, what: &str| {
        if !states.contains(name) {
            diags.push(
                Diagnostic::new(
                    DiagLevel::Error,
                    span,
                    format!("{} targets undeclared state variable `{}`", what, name),
                )
                .with_code(codes::E0106_UNDECLARED_STATE)
                .with_hint(format!("declare `state {}`", name)),
            );
        }
    };
    for regime in &component.regimes {
        for d in &regime.time_derivatives {
            report(&d.variable, d.span, "time derivative");
        }
        let assignments = regime
            .on_conditions
            .iter()
            .flat_map(|oc| &oc.assignments)
            .chain(regime.on_events.iter().flat_map(|oe| &oe.assignments));
        for a in assignments {
            report(&a.lhs, a.span, "assignment");
        }
    }
}

fn check_send_ports(component: &Component, diags: &mut Vec<Diagnostic>) {
    for port in component.ports() {
        if port.kind != PortKind::AnalogSend {
            continue;
        }
        let exposed = component.state_variables.iter().any(|s| s.name == port.name)
            || component.aliases.iter().any(|a| a.lhs == port.name);
        if !exposed {
            diags.push(
                Diagnostic::new(
                    DiagLevel::Warning,
                    port.span,
                    format!(
                        "analog send port `{}` names neither a state variable nor an alias",
                        port.name
                    ),
                )
                .with_code(codes::W0201_DANGLING_SEND_PORT),
            );
        }
    }
}

fn check_unresolved_symbols(component: &Component, diags: &mut Vec<Diagnostic>) {
    let mut known: HashSet<&str> = HashSet::new();
    known.insert(TIME_SYMBOL);
    known.extend(component.parameters.iter().map(|p| p.name.as_str()));
    known.extend(
        component
            .ports()
            .iter()
            .filter(|p| p.kind.is_analog())
            .map(|p| p.name.as_str()),
    );
    known.extend(component.state_variables.iter().map(|s| s.name.as_str()));
    known.extend(component.aliases.iter().map(|a| a.lhs.as_str()));

    for symbol in free_symbols(component) {
        if !known.contains(symbol.as_str()) {
            diags.push(
                Diagnostic::new(
                    DiagLevel::Warning,
                    component.span,
                    format!(
                        "symbol `{}` in component `{}` does not resolve to a parameter, analog port, state variable or alias",
                        symbol, component.name
                    ),
                )
                .with_code(codes::W0202_UNRESOLVED_SYMBOL),
            );
        }
    }
}
