// modifier.rs — Structural edits on flat components: closing analog ports
//
// Closing a port substitutes a fixed value for every reference to the port
// in the component's expressions, then deletes the port declaration.
//
// Preconditions: the component is flat (checked first, before any mutation).
// Postconditions: on success, the closed port is gone from the port arena
//   and no expression references its name.
// Failure modes: `NotFlat` leaves the component untouched. `NoSuchPort` and
//   `AmbiguousPort` are raised after substitution has already run, so the
//   expressions are rewritten while the port list is not. A failed batch
//   keeps every port it closed before the failure. Nothing is rolled back;
//   callers needing atomicity work on a clone.
// Side effects: mutates the component in place; emits tracing events.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ast::{Component, Expr, Port};
use crate::flat::check_flat;
use crate::query::{analog_ports, analog_reduce_ports, find_unique, LookupError};
use crate::substitute::substitute;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModifyError {
    #[error("component `{component}` is not flat (unexpanded subnodes: {})", .subnodes.join(", "))]
    NotFlat {
        component: String,
        subnodes: Vec<String>,
    },

    #[error("component `{component}` has no analog port named `{port}`")]
    NoSuchPort { component: String, port: String },

    #[error("component `{component}` has {count} analog ports named `{port}`")]
    AmbiguousPort {
        component: String,
        port: String,
        count: usize,
    },

    #[error(
        "closing reduce ports of `{component}` aborted at `{port}` ({} already closed)",
        .closed.len()
    )]
    BatchAborted {
        component: String,
        port: String,
        /// Ports closed before the failure, in closing order.
        closed: Vec<String>,
        #[source]
        source: Box<ModifyError>,
    },
}

/// Record of one closed port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedPort {
    /// The removed declaration.
    pub port: Port,
    /// The value substituted for its references.
    pub value: Expr,
    /// Number of references rewritten.
    pub replaced: usize,
}

/// Close the analog port `port_name`, substituting `value` for it.
///
/// Any analog role may be closed (send, receive or reduce); event ports are
/// never matched.
pub fn close_analog_port(
    component: &mut Component,
    port_name: &str,
    value: &Expr,
) -> Result<ClosedPort, ModifyError> {
    check_flat(component)?;

    let replaced = substitute(component, port_name, value);
    debug!(
        component = %component.name,
        port = port_name,
        value = %value,
        replaced,
        "substituted port references"
    );

    let id = find_unique(analog_ports(component), |p| p.name == port_name)
        .map(|p| p.id)
        .map_err(|e| lookup_error(&component.name, port_name, e))?;

    let port = component
        .remove_port(id)
        .ok_or_else(|| lookup_error(&component.name, port_name, LookupError::NoMatch))?;

    info!(
        component = %component.name,
        port = %port.name,
        replaced,
        "closed analog port"
    );
    Ok(ClosedPort {
        port,
        value: value.clone(),
        replaced,
    })
}

/// Close the analog port `port_name` with the default value `0`.
pub fn close_analog_port_zero(
    component: &mut Component,
    port_name: &str,
) -> Result<ClosedPort, ModifyError> {
    close_analog_port(component, port_name, &Expr::zero())
}

/// Close every analog reduce port not named in `exclude`, each with `0`.
///
/// Ports are closed one at a time in declaration order. The set of ports to
/// close is fixed before the first closure.
pub fn close_all_reduce_ports(
    component: &mut Component,
    exclude: &[&str],
) -> Result<Vec<ClosedPort>, ModifyError> {
    check_flat(component)?;

    let targets: Vec<String> = analog_reduce_ports(component)
        .filter(|p| !exclude.contains(&p.name.as_str()))
        .map(|p| p.name.clone())
        .collect();
    debug!(
        component = %component.name,
        targets = ?targets,
        excluded = ?exclude,
        "closing reduce ports"
    );

    let zero = Expr::zero();
    let mut closed = Vec::with_capacity(targets.len());
    for name in targets {
        match close_analog_port(component, &name, &zero) {
            Ok(record) => closed.push(record),
            Err(source) => {
                warn!(
                    component = %component.name,
                    port = %name,
                    closed = closed.len(),
                    error = %source,
                    "reduce port closure aborted; earlier closures are kept"
                );
                return Err(ModifyError::BatchAborted {
                    component: component.name.clone(),
                    port: name,
                    closed: closed.into_iter().map(|c: ClosedPort| c.port.name).collect(),
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(closed)
}

fn lookup_error(component: &str, port: &str, err: LookupError) -> ModifyError {
    match err {
        LookupError::NoMatch => ModifyError::NoSuchPort {
            component: component.to_string(),
            port: port.to_string(),
        },
        LookupError::Ambiguous { count } => ModifyError::AmbiguousPort {
            component: component.to_string(),
            port: port.to_string(),
            count,
        },
    }
}
