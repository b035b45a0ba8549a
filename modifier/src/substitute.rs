// substitute.rs — In-place symbol substitution over a component
//
// Replaces every free reference to one symbol with a fixed expression,
// across all expression sites reachable from the component (see `visit`).
// Tree shape is preserved except at the replaced leaves.
//
// Preconditions: none.
// Postconditions: no `Expr::Symbol(symbol)` remains in any expression site,
//   unless `replacement` itself references `symbol`.
// Failure modes: none.
// Side effects: mutates expressions in place; never touches ports or
//   declared names.

use tracing::trace;

use crate::ast::{Component, Expr};
use crate::visit::{walk_expr_mut, VisitMut};

/// Visitor that rewrites `Symbol(symbol)` leaves to `replacement`.
pub struct Substitution<'a> {
    symbol: &'a str,
    replacement: &'a Expr,
    replaced: usize,
}

impl<'a> Substitution<'a> {
    pub fn new(symbol: &'a str, replacement: &'a Expr) -> Self {
        Self {
            symbol,
            replacement,
            replaced: 0,
        }
    }

    /// Number of references rewritten so far.
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

impl VisitMut for Substitution<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        // The replacement is not revisited, so a value that mentions the
        // symbol itself cannot recurse.
        if matches!(&*expr, Expr::Symbol(name) if name.as_str() == self.symbol) {
            *expr = self.replacement.clone();
            self.replaced += 1;
        } else {
            walk_expr_mut(self, expr);
        }
    }
}

/// Substitute `replacement` for every reference to `symbol` in `component`.
///
/// Returns the number of references replaced; zero means the symbol did not
/// occur and nothing changed.
pub fn substitute(component: &mut Component, symbol: &str, replacement: &Expr) -> usize {
    let mut pass = Substitution::new(symbol, replacement);
    component.accept_mut(&mut pass);
    trace!(
        component = %component.name,
        symbol,
        replacement = %replacement,
        replaced = pass.replaced(),
        "substituted symbol"
    );
    pass.replaced()
}

/// Substitute within a single expression tree.
pub fn substitute_expr(expr: &mut Expr, symbol: &str, replacement: &Expr) -> usize {
    let mut pass = Substitution::new(symbol, replacement);
    pass.visit_expr_mut(expr);
    pass.replaced()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::parser::{parse, parse_expr};
    use crate::query::references_symbol;

    fn component(source: &str) -> Component {
        let mut result = parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.components.remove(0)
    }

    fn expr(source: &str) -> Expr {
        parse_expr(source).expect("valid expression")
    }

    #[test]
    fn replaces_every_site() {
        let mut c = component(
            "component C {
                analog recv I
                alias J := I * 2
                regime r {
                    V' = I + (if I > 0 then I else 0)
                    on I > 1 { V := I }
                    on event e { V := f(I) }
                }
            }",
        );
        let n = substitute(&mut c, "I", &Expr::zero());
        assert_eq!(n, 7);
        assert!(!references_symbol(&c, "I"));
        assert_eq!(c.aliases[0].rhs.to_string(), "0 * 2");
        assert_eq!(
            c.regimes[0].time_derivatives[0].rhs.to_string(),
            "0 + (if 0 > 0 then 0 else 0)"
        );
        assert_eq!(c.regimes[0].on_events[0].assignments[0].rhs.to_string(), "f(0)");
    }

    #[test]
    fn ports_and_declared_names_untouched() {
        let mut c = component(
            "component C { analog send V state V regime r { V' = -V on V > 1 { V := 0 } } }",
        );
        substitute(&mut c, "V", &Expr::zero());
        assert_eq!(c.ports()[0].name, "V");
        assert_eq!(c.state_variables[0].name, "V");
        let r = &c.regimes[0];
        assert_eq!(r.time_derivatives[0].variable, "V");
        assert_eq!(r.on_conditions[0].assignments[0].lhs, "V");
        assert_eq!(r.time_derivatives[0].rhs.to_string(), "-0");
    }

    #[test]
    fn absent_symbol_is_a_noop() {
        let mut c = component("component C { alias a := x + y }");
        let before = c.clone();
        assert_eq!(substitute(&mut c, "z", &Expr::zero()), 0);
        assert_eq!(c, before);
    }

    #[test]
    fn second_pass_finds_nothing() {
        let mut c = component("component C { alias a := x + x * x }");
        assert_eq!(substitute(&mut c, "x", &Expr::zero()), 3);
        let after_first = c.clone();
        assert_eq!(substitute(&mut c, "x", &Expr::zero()), 0);
        assert_eq!(c, after_first);
    }

    #[test]
    fn function_names_are_not_symbols() {
        let mut e = expr("exp(exp)");
        assert_eq!(substitute_expr(&mut e, "exp", &Expr::Number(1.0)), 1);
        assert_eq!(e.to_string(), "exp(1)");
    }

    #[test]
    fn self_referencing_replacement_does_not_recurse() {
        let mut e = expr("x + 1");
        let replacement = expr("x * 2");
        assert_eq!(substitute_expr(&mut e, "x", &replacement), 1);
        assert_eq!(
            e,
            Expr::binary(BinaryOp::Add, replacement.clone(), Expr::Number(1.0))
        );
    }

    #[test]
    fn compound_replacement_keeps_precedence_when_printed() {
        let mut e = expr("I * g");
        substitute_expr(&mut e, "I", &expr("a + b"));
        assert_eq!(e.to_string(), "(a + b) * g");
    }
}
