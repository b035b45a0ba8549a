// Parser for abstraction-layer component definitions.
//
// Parses a token stream (from the lexer) into `Component` models. Uses
// chumsky combinators. Expressions are layered by precedence:
// piecewise < `||` < `&&` < comparison < `+ -` < `* /` < unary < `^`.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns the parsed components plus any parse errors.
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: components plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    /// Empty when the parser produced no output.
    pub components: Vec<Component>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a component source file. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = file_parser(source);
    let (components, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors = lex_errors(lex_result.errors);
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        components: components.unwrap_or_default(),
        errors: all_errors,
    }
}

/// Parse a standalone expression, e.g. a replacement value `-70 * mV`.
pub fn parse_expr(source: &str) -> Result<Expr, Vec<Rich<'static, Token, SimpleSpan>>> {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = expr_parser(source).then_ignore(end());
    let (expr, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors = lex_errors(lex_result.errors);
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    match expr {
        Some(expr) if all_errors.is_empty() => Ok(expr),
        _ => Err(all_errors),
    }
}

fn lex_errors(errors: Vec<crate::lexer::LexError>) -> Vec<Rich<'static, Token, SimpleSpan>> {
    errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect()
}

// ── Intermediate items ──
//
// Declarations may appear in any order inside a block; they are collected
// as items first and then grouped into the model.

enum Item {
    Param(Parameter),
    Port(String, PortKind, Span),
    Subnode(Subnode),
    State(StateVariable),
    Alias(Alias),
    Regime(Regime),
}

enum RegimeItem {
    Derivative(TimeDerivative),
    OnCondition(OnCondition),
    OnEvent(OnEvent),
}

enum Action {
    Assign(StateAssignment),
    Emit(OutputEvent),
}

fn build_component(name: String, items: Vec<Item>, span: Span) -> Component {
    let mut component = Component::new(name);
    component.span = span;
    for item in items {
        match item {
            Item::Param(p) => component.parameters.push(p),
            Item::Port(name, kind, span) => {
                component.add_port(name, kind, span);
            }
            Item::Subnode(s) => component.subnodes.push(s),
            Item::State(s) => component.state_variables.push(s),
            Item::Alias(a) => component.aliases.push(a),
            Item::Regime(r) => component.regimes.push(r),
        }
    }
    component
}

fn build_regime(name: String, items: Vec<RegimeItem>, span: Span) -> Regime {
    let mut regime = Regime {
        name,
        time_derivatives: Vec::new(),
        on_conditions: Vec::new(),
        on_events: Vec::new(),
        span,
    };
    for item in items {
        match item {
            RegimeItem::Derivative(d) => regime.time_derivatives.push(d),
            RegimeItem::OnCondition(c) => regime.on_conditions.push(c),
            RegimeItem::OnEvent(e) => regime.on_events.push(e),
        }
    }
    regime
}

fn split_actions(actions: Vec<Action>) -> (Vec<StateAssignment>, Vec<OutputEvent>) {
    let mut assignments = Vec::new();
    let mut outputs = Vec::new();
    for action in actions {
        match action {
            Action::Assign(a) => assignments.push(a),
            Action::Emit(o) => outputs.push(o),
        }
    }
    (assignments, outputs)
}

// ── Shared rules ──

fn ident_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, String, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + Clone + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        source[span.start()..span.end()].to_string()
    })
}

fn expr_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + Clone + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident = ident_parser(source);

    recursive(|expr| {
        // ── Atoms ──

        let number = select! {
            Token::Number(n) => Expr::Number(n),
        };

        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(func, args)| Expr::Call { func, args });

        let symbol = ident.clone().map(Expr::Symbol);

        let atom = choice((
            number,
            call,
            symbol,
            expr.clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        ))
        .boxed();

        // ── Unary and power ──
        //
        // `^` is right-associative and its exponent may carry a sign:
        // `-x^2` is `-(x^2)`, `2^-n` is `2^(-n)`.

        let unary = recursive(|unary| {
            let power = atom
                .clone()
                .then(just(Token::Caret).ignore_then(unary.clone()).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => Expr::binary(BinaryOp::Pow, base, exponent),
                    None => base,
                });
            let prefix = choice((
                just(Token::Minus).to(UnaryOp::Neg),
                just(Token::Bang).to(UnaryOp::Not),
            ));
            prefix
                .then(unary)
                .map(|(op, operand)| Expr::unary(op, operand))
                .or(power)
        })
        .boxed();

        // ── Binary layers ──

        let product = unary
            .clone()
            .foldl(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                ))
                .then(unary)
                .repeated(),
                |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated(),
                |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
            )
            .boxed();

        // Comparisons do not chain: `a < b < c` is a syntax error.
        let comparison = sum
            .clone()
            .then(
                choice((
                    just(Token::EqEq).to(BinaryOp::Eq),
                    just(Token::NotEq).to(BinaryOp::Ne),
                    just(Token::LtEq).to(BinaryOp::Le),
                    just(Token::GtEq).to(BinaryOp::Ge),
                    just(Token::Lt).to(BinaryOp::Lt),
                    just(Token::Gt).to(BinaryOp::Gt),
                ))
                .then(sum)
                .or_not(),
            )
            .map(|(lhs, rest)| match rest {
                Some((op, rhs)) => Expr::binary(op, lhs, rhs),
                None => lhs,
            })
            .boxed();

        let conjunction = comparison
            .clone()
            .foldl(
                just(Token::AndAnd)
                    .to(BinaryOp::And)
                    .then(comparison)
                    .repeated(),
                |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
            )
            .boxed();

        let disjunction = conjunction.clone().foldl(
            just(Token::OrOr)
                .to(BinaryOp::Or)
                .then(conjunction)
                .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        // ── Piecewise: if c then v (elif c then v)* else v ──

        let piecewise = just(Token::If)
            .ignore_then(expr.clone())
            .then_ignore(just(Token::Then))
            .then(expr.clone())
            .then(
                just(Token::Elif)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Then))
                    .then(expr.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then_ignore(just(Token::Else))
            .then(expr)
            .map(|(((condition, value), elifs), otherwise)| {
                let mut branches = vec![Branch { condition, value }];
                branches.extend(
                    elifs
                        .into_iter()
                        .map(|(condition, value)| Branch { condition, value }),
                );
                Expr::Piecewise {
                    branches,
                    otherwise: Box::new(otherwise),
                }
            });

        piecewise.or(disjunction)
    })
}

// ── File parser ──

fn file_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Vec<Component>, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident = ident_parser(source);
    let expr = expr_parser(source);

    // ── Transition bodies ──

    let target = just(Token::Arrow).ignore_then(ident.clone()).or_not();

    let action = {
        let assign = ident
            .clone()
            .then_ignore(just(Token::Assign))
            .then(expr.clone())
            .map_with(|(lhs, rhs), e| {
                Action::Assign(StateAssignment {
                    lhs,
                    rhs,
                    span: e.span(),
                })
            });
        let emit = just(Token::Emit)
            .ignore_then(ident.clone())
            .map_with(|port, e| {
                Action::Emit(OutputEvent {
                    port,
                    span: e.span(),
                })
            });
        assign.or(emit)
    };

    let actions = action
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
        .map(split_actions);

    // ── Regime items ──

    let derivative = ident
        .clone()
        .then_ignore(just(Token::Prime))
        .then_ignore(just(Token::Equals))
        .then(expr.clone())
        .map_with(|(variable, rhs), e| {
            RegimeItem::Derivative(TimeDerivative {
                variable,
                rhs,
                span: e.span(),
            })
        });

    let on_event = just(Token::On)
        .ignore_then(just(Token::Event))
        .ignore_then(ident.clone())
        .then(target.clone())
        .then(actions.clone())
        .map_with(|((port, target), (assignments, outputs)), e| {
            RegimeItem::OnEvent(OnEvent {
                port,
                assignments,
                outputs,
                target,
                span: e.span(),
            })
        });

    let on_condition = just(Token::On)
        .ignore_then(expr.clone())
        .then(target)
        .then(actions)
        .map_with(|((trigger, target), (assignments, outputs)), e| {
            RegimeItem::OnCondition(OnCondition {
                trigger,
                assignments,
                outputs,
                target,
                span: e.span(),
            })
        });

    let regime = just(Token::Regime)
        .ignore_then(ident.clone())
        .then(
            choice((derivative, on_event, on_condition))
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map_with(|(name, items), e| Item::Regime(build_regime(name, items, e.span())));

    // ── Component items ──

    let param = just(Token::Param)
        .ignore_then(ident.clone())
        .map_with(|name, e| {
            Item::Param(Parameter {
                name,
                span: e.span(),
            })
        });

    let analog_port = just(Token::Analog)
        .ignore_then(
            choice((
                just(Token::Send).to(PortKind::AnalogSend),
                just(Token::Recv).to(PortKind::AnalogReceive),
            ))
            .then(ident.clone())
            .or(just(Token::Reduce)
                .ignore_then(ident.clone())
                .then_ignore(just(Token::Plus).or_not())
                .map(|name| (PortKind::AnalogReduce(ReduceOp::Sum), name))),
        )
        .map_with(|(kind, name), e| Item::Port(name, kind, e.span()));

    let event_port = just(Token::Event)
        .ignore_then(choice((
            just(Token::Send).to(PortKind::EventSend),
            just(Token::Recv).to(PortKind::EventReceive),
        )))
        .then(ident.clone())
        .map_with(|(kind, name), e| Item::Port(name, kind, e.span()));

    let subnode = just(Token::Subnode)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Colon))
        .then(ident.clone())
        .map_with(|(name, class), e| {
            Item::Subnode(Subnode {
                name,
                class,
                span: e.span(),
            })
        });

    let state = just(Token::State)
        .ignore_then(ident.clone())
        .map_with(|name, e| {
            Item::State(StateVariable {
                name,
                span: e.span(),
            })
        });

    let alias = just(Token::Alias)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Assign))
        .then(expr)
        .map_with(|(lhs, rhs), e| {
            Item::Alias(Alias {
                lhs,
                rhs,
                span: e.span(),
            })
        });

    let item = choice((param, analog_port, event_port, subnode, state, alias, regime));

    let component = just(Token::Component)
        .ignore_then(ident)
        .then(
            item.repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map_with(|(name, items), e| build_component(name, items, e.span()));

    component
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Component> {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.components
    }

    fn parse_one(source: &str) -> Component {
        let mut components = parse_ok(source);
        assert_eq!(components.len(), 1, "expected 1 component");
        components.remove(0)
    }

    fn expr(source: &str) -> Expr {
        parse_expr(source).unwrap_or_else(|e| panic!("parse_expr({source:?}) failed: {e:?}"))
    }

    fn sym(name: &str) -> Expr {
        Expr::symbol(name)
    }

    // ── Files ──

    #[test]
    fn empty_file() {
        assert!(parse_ok("").is_empty());
        assert!(parse_ok("# only a comment\n\n").is_empty());
    }

    #[test]
    fn empty_component() {
        let c = parse_one("component Empty {}");
        assert_eq!(c.name, "Empty");
        assert!(c.ports().is_empty());
        assert!(c.regimes.is_empty());
    }

    #[test]
    fn multiple_components() {
        let cs = parse_ok("component A {}\ncomponent B { param x }");
        assert_eq!(cs.len(), 2);
        assert_eq!(cs[1].parameters[0].name, "x");
    }

    // ── Declarations ──

    #[test]
    fn ports_in_declaration_order() {
        let c = parse_one(
            "component C {
                analog send V
                analog recv I_ext
                analog reduce I_syn +
                analog reduce I_gap
                event send spike
                event recv reset
            }",
        );
        let ports: Vec<_> = c.ports().iter().map(|p| (p.name.as_str(), p.kind)).collect();
        assert_eq!(
            ports,
            vec![
                ("V", PortKind::AnalogSend),
                ("I_ext", PortKind::AnalogReceive),
                ("I_syn", PortKind::AnalogReduce(ReduceOp::Sum)),
                ("I_gap", PortKind::AnalogReduce(ReduceOp::Sum)),
                ("spike", PortKind::EventSend),
                ("reset", PortKind::EventReceive),
            ]
        );
    }

    #[test]
    fn duplicate_port_names_are_representable() {
        let c = parse_one("component C { analog recv a analog reduce a }");
        assert_eq!(c.ports().len(), 2);
        assert_ne!(c.ports()[0].id, c.ports()[1].id);
    }

    #[test]
    fn params_states_subnodes_aliases() {
        let c = parse_one(
            "component C {
                param tau
                state V
                subnode soma : Soma
                alias I := I_ext + I_syn
            }",
        );
        assert_eq!(c.parameters[0].name, "tau");
        assert_eq!(c.state_variables[0].name, "V");
        assert_eq!(c.subnodes[0].name, "soma");
        assert_eq!(c.subnodes[0].class, "Soma");
        assert_eq!(c.aliases[0].lhs, "I");
        assert_eq!(
            c.aliases[0].rhs,
            Expr::binary(BinaryOp::Add, sym("I_ext"), sym("I_syn"))
        );
    }

    // ── Regimes ──

    #[test]
    fn regime_with_derivative_and_transitions() {
        let c = parse_one(
            "component C {
                regime sub {
                    V' = (I - V) / tau
                    on V > theta -> refractory {
                        V := 0
                        emit spike
                    }
                    on event reset {
                        V := V_reset
                    }
                }
                regime refractory {}
            }",
        );
        assert_eq!(c.regimes.len(), 2);
        let r = &c.regimes[0];
        assert_eq!(r.name, "sub");
        assert_eq!(r.time_derivatives[0].variable, "V");
        assert_eq!(
            r.time_derivatives[0].rhs,
            Expr::binary(
                BinaryOp::Div,
                Expr::binary(BinaryOp::Sub, sym("I"), sym("V")),
                sym("tau")
            )
        );

        let oc = &r.on_conditions[0];
        assert_eq!(oc.trigger, Expr::binary(BinaryOp::Gt, sym("V"), sym("theta")));
        assert_eq!(oc.target.as_deref(), Some("refractory"));
        assert_eq!(oc.assignments[0].lhs, "V");
        assert_eq!(oc.assignments[0].rhs, Expr::zero());
        assert_eq!(oc.outputs[0].port, "spike");

        let oe = &r.on_events[0];
        assert_eq!(oe.port, "reset");
        assert!(oe.target.is_none());
        assert_eq!(oe.assignments[0].rhs, sym("V_reset"));
    }

    #[test]
    fn consecutive_assignments_split_on_identifiers() {
        let c = parse_one(
            "component C { regime r { on event e { a := b c := d + 1 } } }",
        );
        let oe = &c.regimes[0].on_events[0];
        assert_eq!(oe.assignments.len(), 2);
        assert_eq!(oe.assignments[0].rhs, sym("b"));
        assert_eq!(oe.assignments[1].lhs, "c");
    }

    // ── Expressions ──

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(
            expr("a + b * c"),
            Expr::binary(
                BinaryOp::Add,
                sym("a"),
                Expr::binary(BinaryOp::Mul, sym("b"), sym("c"))
            )
        );
        assert_eq!(
            expr("a - b - c"),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, sym("a"), sym("b")),
                sym("c")
            )
        );
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_negation() {
        assert_eq!(
            expr("-x^2"),
            Expr::unary(
                UnaryOp::Neg,
                Expr::binary(BinaryOp::Pow, sym("x"), Expr::Number(2.0))
            )
        );
        assert_eq!(
            expr("a^b^c"),
            Expr::binary(
                BinaryOp::Pow,
                sym("a"),
                Expr::binary(BinaryOp::Pow, sym("b"), sym("c"))
            )
        );
        assert_eq!(
            expr("2^-n"),
            Expr::binary(
                BinaryOp::Pow,
                Expr::Number(2.0),
                Expr::unary(UnaryOp::Neg, sym("n"))
            )
        );
    }

    #[test]
    fn logical_operators() {
        assert_eq!(
            expr("a < b && !c || d"),
            Expr::binary(
                BinaryOp::Or,
                Expr::binary(
                    BinaryOp::And,
                    Expr::binary(BinaryOp::Lt, sym("a"), sym("b")),
                    Expr::unary(UnaryOp::Not, sym("c"))
                ),
                sym("d")
            )
        );
    }

    #[test]
    fn function_calls() {
        assert_eq!(
            expr("exp(-V / k)"),
            Expr::Call {
                func: "exp".into(),
                args: vec![Expr::binary(
                    BinaryOp::Div,
                    Expr::unary(UnaryOp::Neg, sym("V")),
                    sym("k")
                )],
            }
        );
        assert_eq!(
            expr("max(a, b)"),
            Expr::Call {
                func: "max".into(),
                args: vec![sym("a"), sym("b")],
            }
        );
    }

    #[test]
    fn piecewise_with_elif() {
        let e = expr("if V > 0 then 1 elif V < 0 then -1 else 0");
        let Expr::Piecewise {
            branches,
            otherwise,
        } = e
        else {
            panic!("expected Piecewise")
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].value, Expr::unary(UnaryOp::Neg, Expr::Number(1.0)));
        assert_eq!(*otherwise, Expr::zero());
    }

    // ── Errors ──

    #[test]
    fn missing_closing_brace_is_an_error() {
        let result = parse("component C { param x");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn chained_comparison_is_an_error() {
        assert!(parse_expr("a < b < c").is_err());
    }

    #[test]
    fn trailing_operator_is_an_error() {
        assert!(parse_expr("1 +").is_err());
    }

    #[test]
    fn lex_errors_are_merged() {
        let result = parse("component C { param $x }");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn overflowing_literal_is_rejected() {
        assert!(parse_expr("1e999").is_err());
        assert!(parse_expr("-1e999 * x").is_err());
        assert_eq!(parse_expr("1e300").unwrap(), Expr::Number(1e300));
    }
}
