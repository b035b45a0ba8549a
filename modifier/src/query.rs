// query.rs — Shared helpers for querying component-level data
//
// Port filters by role, the unique-match lookup used before any structural
// edit, and symbol-reference queries built on the read-only visitor.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::ast::*;
use crate::visit::{walk_expr, Visitor};

// ── Unique-match lookup ──

/// Failure of `find_unique`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no element matched")]
    NoMatch,
    #[error("{count} elements matched, expected exactly one")]
    Ambiguous { count: usize },
}

/// Return the single element satisfying `predicate`.
///
/// Scans the whole sequence so that an ambiguous match is always reported,
/// even when the first hit comes early.
pub fn find_unique<I, P>(items: I, mut predicate: P) -> Result<I::Item, LookupError>
where
    I: IntoIterator,
    P: FnMut(&I::Item) -> bool,
{
    let mut found = None;
    let mut count = 0;
    for item in items {
        if predicate(&item) {
            count += 1;
            if found.is_none() {
                found = Some(item);
            }
        }
    }
    match (found, count) {
        (Some(item), 1) => Ok(item),
        (None, _) => Err(LookupError::NoMatch),
        (Some(_), count) => Err(LookupError::Ambiguous { count }),
    }
}

// ── Ports by role ──

/// Analog ports of every role (send, receive, reduce) in declaration order.
pub fn analog_ports(component: &Component) -> impl Iterator<Item = &Port> + '_ {
    component.ports().iter().filter(|p| p.kind.is_analog())
}

/// Analog reduce ports in declaration order.
pub fn analog_reduce_ports(component: &Component) -> impl Iterator<Item = &Port> + '_ {
    component.ports().iter().filter(|p| p.kind.is_reduce())
}

pub fn analog_send_ports(component: &Component) -> impl Iterator<Item = &Port> + '_ {
    component
        .ports()
        .iter()
        .filter(|p| p.kind == PortKind::AnalogSend)
}

pub fn analog_receive_ports(component: &Component) -> impl Iterator<Item = &Port> + '_ {
    component
        .ports()
        .iter()
        .filter(|p| p.kind == PortKind::AnalogReceive)
}

pub fn event_ports(component: &Component) -> impl Iterator<Item = &Port> + '_ {
    component.ports().iter().filter(|p| p.kind.is_event())
}

/// Look up a port of any role by name. Duplicates are reported as ambiguous.
pub fn port_named<'a>(component: &'a Component, name: &str) -> Result<&'a Port, LookupError> {
    find_unique(component.ports(), |p| p.name == name)
}

// ── Symbol references ──

struct SymbolCollector {
    symbols: BTreeSet<String>,
}

impl Visitor for SymbolCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Symbol(name) = expr {
            self.symbols.insert(name.clone());
        }
        walk_expr(self, expr);
    }
}

/// All symbols referenced by the component's expressions, sorted.
pub fn free_symbols(component: &Component) -> BTreeSet<String> {
    let mut collector = SymbolCollector {
        symbols: BTreeSet::new(),
    };
    component.accept(&mut collector);
    collector.symbols
}

/// Visitor that stops looking once a reference is found.
struct ReferenceFinder<'a> {
    symbol: &'a str,
    found: bool,
}

impl Visitor for ReferenceFinder<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if self.found {
            return;
        }
        match expr {
            Expr::Symbol(name) if name == self.symbol => self.found = true,
            _ => walk_expr(self, expr),
        }
    }
}

/// True if any expression in the component references `symbol`.
pub fn references_symbol(component: &Component, symbol: &str) -> bool {
    let mut finder = ReferenceFinder {
        symbol,
        found: false,
    };
    component.accept(&mut finder);
    finder.found
}
