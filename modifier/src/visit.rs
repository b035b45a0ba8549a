// visit.rs — Traversal over the expression-bearing parts of a component
//
// Two visitor traits with default recursion:
// - `Visitor`  — read-only traversal (queries, symbol collection)
// - `VisitMut` — in-place rewriting (substitution)
//
// Override the methods for the nodes of interest and call the matching
// `walk_*` function to continue into children; omit it to prune.
//
// Traversal order is deterministic: aliases, then regimes in declaration
// order; within a regime, time derivatives, on-conditions (trigger first,
// then assignments), on-events. Expressions are walked depth first, left to
// right. The port collection is not reachable from either trait.

use crate::ast::*;

// ── Visitor (read-only) ──

pub trait Visitor: Sized {
    fn visit_component(&mut self, component: &Component) {
        walk_component(self, component);
    }

    fn visit_alias(&mut self, alias: &Alias) {
        walk_alias(self, alias);
    }

    fn visit_regime(&mut self, regime: &Regime) {
        walk_regime(self, regime);
    }

    fn visit_time_derivative(&mut self, derivative: &TimeDerivative) {
        walk_time_derivative(self, derivative);
    }

    fn visit_on_condition(&mut self, on_condition: &OnCondition) {
        walk_on_condition(self, on_condition);
    }

    fn visit_on_event(&mut self, on_event: &OnEvent) {
        walk_on_event(self, on_event);
    }

    fn visit_state_assignment(&mut self, assignment: &StateAssignment) {
        walk_state_assignment(self, assignment);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_component<V: Visitor>(v: &mut V, component: &Component) {
    for alias in &component.aliases {
        v.visit_alias(alias);
    }
    for regime in &component.regimes {
        v.visit_regime(regime);
    }
}

pub fn walk_alias<V: Visitor>(v: &mut V, alias: &Alias) {
    v.visit_expr(&alias.rhs);
}

pub fn walk_regime<V: Visitor>(v: &mut V, regime: &Regime) {
    for derivative in &regime.time_derivatives {
        v.visit_time_derivative(derivative);
    }
    for on_condition in &regime.on_conditions {
        v.visit_on_condition(on_condition);
    }
    for on_event in &regime.on_events {
        v.visit_on_event(on_event);
    }
}

pub fn walk_time_derivative<V: Visitor>(v: &mut V, derivative: &TimeDerivative) {
    v.visit_expr(&derivative.rhs);
}

pub fn walk_on_condition<V: Visitor>(v: &mut V, on_condition: &OnCondition) {
    v.visit_expr(&on_condition.trigger);
    for assignment in &on_condition.assignments {
        v.visit_state_assignment(assignment);
    }
}

pub fn walk_on_event<V: Visitor>(v: &mut V, on_event: &OnEvent) {
    for assignment in &on_event.assignments {
        v.visit_state_assignment(assignment);
    }
}

pub fn walk_state_assignment<V: Visitor>(v: &mut V, assignment: &StateAssignment) {
    v.visit_expr(&assignment.rhs);
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Number(_) | Expr::Symbol(_) => {}
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Piecewise {
            branches,
            otherwise,
        } => {
            for branch in branches {
                v.visit_expr(&branch.condition);
                v.visit_expr(&branch.value);
            }
            v.visit_expr(otherwise);
        }
    }
}

// ── VisitMut (in-place) ──

pub trait VisitMut: Sized {
    fn visit_component_mut(&mut self, component: &mut Component) {
        walk_component_mut(self, component);
    }

    fn visit_alias_mut(&mut self, alias: &mut Alias) {
        walk_alias_mut(self, alias);
    }

    fn visit_regime_mut(&mut self, regime: &mut Regime) {
        walk_regime_mut(self, regime);
    }

    fn visit_time_derivative_mut(&mut self, derivative: &mut TimeDerivative) {
        walk_time_derivative_mut(self, derivative);
    }

    fn visit_on_condition_mut(&mut self, on_condition: &mut OnCondition) {
        walk_on_condition_mut(self, on_condition);
    }

    fn visit_on_event_mut(&mut self, on_event: &mut OnEvent) {
        walk_on_event_mut(self, on_event);
    }

    fn visit_state_assignment_mut(&mut self, assignment: &mut StateAssignment) {
        walk_state_assignment_mut(self, assignment);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

pub fn walk_component_mut<V: VisitMut>(v: &mut V, component: &mut Component) {
    for alias in &mut component.aliases {
        v.visit_alias_mut(alias);
    }
    for regime in &mut component.regimes {
        v.visit_regime_mut(regime);
    }
}

pub fn walk_alias_mut<V: VisitMut>(v: &mut V, alias: &mut Alias) {
    v.visit_expr_mut(&mut alias.rhs);
}

pub fn walk_regime_mut<V: VisitMut>(v: &mut V, regime: &mut Regime) {
    for derivative in &mut regime.time_derivatives {
        v.visit_time_derivative_mut(derivative);
    }
    for on_condition in &mut regime.on_conditions {
        v.visit_on_condition_mut(on_condition);
    }
    for on_event in &mut regime.on_events {
        v.visit_on_event_mut(on_event);
    }
}

pub fn walk_time_derivative_mut<V: VisitMut>(v: &mut V, derivative: &mut TimeDerivative) {
    v.visit_expr_mut(&mut derivative.rhs);
}

pub fn walk_on_condition_mut<V: VisitMut>(v: &mut V, on_condition: &mut OnCondition) {
    v.visit_expr_mut(&mut on_condition.trigger);
    for assignment in &mut on_condition.assignments {
        v.visit_state_assignment_mut(assignment);
    }
}

pub fn walk_on_event_mut<V: VisitMut>(v: &mut V, on_event: &mut OnEvent) {
    for assignment in &mut on_event.assignments {
        v.visit_state_assignment_mut(assignment);
    }
}

pub fn walk_state_assignment_mut<V: VisitMut>(v: &mut V, assignment: &mut StateAssignment) {
    v.visit_expr_mut(&mut assignment.rhs);
}

pub fn walk_expr_mut<V: VisitMut>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Number(_) | Expr::Symbol(_) => {}
        Expr::Unary { operand, .. } => v.visit_expr_mut(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr_mut(lhs);
            v.visit_expr_mut(rhs);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                v.visit_expr_mut(arg);
            }
        }
        Expr::Piecewise {
            branches,
            otherwise,
        } => {
            for branch in branches {
                v.visit_expr_mut(&mut branch.condition);
                v.visit_expr_mut(&mut branch.value);
            }
            v.visit_expr_mut(otherwise);
        }
    }
}

// ── Accept entry points ──

impl Component {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit_component(self);
    }

    pub fn accept_mut<V: VisitMut>(&mut self, visitor: &mut V) {
        visitor.visit_component_mut(self);
    }
}
