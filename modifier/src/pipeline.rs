// pipeline.rs — Operation scripts and their orchestration
//
// Runs parse → select component → validate → apply operations for one
// model source. Operations come from a `Script`, built either from CLI flags
// or decoded from JSON.
//
// Preconditions: none.
// Postconditions: on success, `Outcome::components` holds every parsed
//   component with the selected one transformed; all warnings are carried.
// Failure modes: parse errors, error-level validation diagnostics, component
//   selection, replacement values that do not parse, modifier failures.
//   Replacement values are parsed before the first operation runs.
// Side effects: emits tracing events.

use std::time::Instant;

use chumsky::error::Rich;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::ast::{Component, Expr};
use crate::diag::{has_errors, Diagnostic};
use crate::lexer::Token;
use crate::modifier::{close_all_reduce_ports, close_analog_port, ClosedPort, ModifyError};
use crate::parser::{parse, parse_expr};
use crate::query::{find_unique, LookupError};
use crate::validate::validate;

// ── Script ──────────────────────────────────────────────────────────────────

/// An ordered list of operations on one component.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Component to modify. May be omitted when the source defines exactly one.
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Operation {
    ClosePort {
        port: String,
        #[serde(default = "default_value")]
        value: String,
    },
    CloseReducePorts {
        #[serde(default)]
        exclude: Vec<String>,
    },
}

fn default_value() -> String {
    "0".to_string()
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to parse model ({} errors)", .errors.len())]
    Parse {
        errors: Vec<Rich<'static, Token>>,
    },

    #[error("component `{component}` is invalid ({} errors)", .diagnostics.iter().filter(|d| d.is_error()).count())]
    InvalidModel {
        component: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("source defines no components")]
    NoComponents,

    #[error("source defines several components ({}); select one", .available.join(", "))]
    ComponentRequired { available: Vec<String> },

    #[error("no component named `{name}`")]
    UnknownComponent { name: String },

    #[error("{count} components are named `{name}`")]
    AmbiguousComponent { name: String, count: usize },

    #[error("replacement value `{value}` for port `{port}` does not parse: {message}")]
    BadValue {
        port: String,
        value: String,
        message: String,
    },

    #[error(transparent)]
    Modify(#[from] ModifyError),

    #[error("invalid operation script: {0}")]
    Script(#[from] serde_json::Error),
}

// ── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Outcome {
    /// Every component from the source, in source order.
    pub components: Vec<Component>,
    /// Index of the modified component in `components`.
    pub selected: usize,
    /// Warnings from validation of the selected component.
    pub diagnostics: Vec<Diagnostic>,
    /// Closed ports in closing order, across all operations.
    pub closed: Vec<ClosedPort>,
}

impl Outcome {
    pub fn component(&self) -> &Component {
        &self.components[self.selected]
    }
}

// ── Run ─────────────────────────────────────────────────────────────────────

/// An operation with its replacement value parsed.
enum Prepared<'s> {
    ClosePort { port: &'s str, value: Expr },
    CloseReducePorts { exclude: Vec<&'s str> },
}

pub fn run(source: &str, script: &Script) -> Result<Outcome, PipelineError> {
    let t = Instant::now();
    let parsed = parse(source);
    if !parsed.errors.is_empty() {
        return Err(PipelineError::Parse {
            errors: parsed.errors,
        });
    }
    let mut components = parsed.components;
    debug!(
        components = components.len(),
        elapsed_us = t.elapsed().as_micros() as u64,
        "parsed model"
    );

    let selected = select(&components, script.component.as_deref())?;
    let component = &mut components[selected];

    let diagnostics = validate(component);
    if has_errors(&diagnostics) {
        return Err(PipelineError::InvalidModel {
            component: component.name.clone(),
            diagnostics,
        });
    }
    debug!(
        component = %component.name,
        warnings = diagnostics.len(),
        "validated component"
    );

    let prepared = prepare(&script.operations)?;
    let mut closed = Vec::new();
    for op in prepared {
        match op {
            Prepared::ClosePort { port, value } => {
                closed.push(close_analog_port(component, port, &value)?);
            }
            Prepared::CloseReducePorts { exclude } => {
                closed.extend(close_all_reduce_ports(component, &exclude)?);
            }
        }
    }
    info!(
        component = %component.name,
        operations = script.operations.len(),
        closed = closed.len(),
        "applied operations"
    );

    Ok(Outcome {
        components,
        selected,
        diagnostics,
        closed,
    })
}

fn select(components: &[Component], name: Option<&str>) -> Result<usize, PipelineError> {
    match name {
        Some(name) => find_unique(0..components.len(), |&i| components[i].name == name).map_err(
            |e| match e {
                LookupError::NoMatch => PipelineError::UnknownComponent {
                    name: name.to_string(),
                },
                LookupError::Ambiguous { count } => PipelineError::AmbiguousComponent {
                    name: name.to_string(),
                    count,
                },
            },
        ),
        None => match components.len() {
            0 => Err(PipelineError::NoComponents),
            1 => Ok(0),
            _ => Err(PipelineError::ComponentRequired {
                available: components.iter().map(|c| c.name.clone()).collect(),
            }),
        },
    }
}

fn prepare(operations: &[Operation]) -> Result<Vec<Prepared<'_>>, PipelineError> {
    operations
        .iter()
        .map(|op| match op {
            Operation::ClosePort { port, value } => {
                let expr = parse_expr(value).map_err(|errors| PipelineError::BadValue {
                    port: port.clone(),
                    value: value.clone(),
                    message: errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; "),
                })?;
                Ok(Prepared::ClosePort {
                    port: port.as_str(),
                    value: expr,
                })
            }
            Operation::CloseReducePorts { exclude } => Ok(Prepared::CloseReducePorts {
                exclude: exclude.iter().map(String::as_str).collect(),
            }),
        })
        .collect()
}
