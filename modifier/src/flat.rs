// flat.rs — Flatness guard for structural edits
//
// A component is flat when it holds no unexpanded nested component
// instances. Every modifier entry point calls `check_flat` before touching
// any expression or port.

use crate::ast::Component;
use crate::modifier::ModifyError;

pub fn is_flat(component: &Component) -> bool {
    component.subnodes.is_empty()
}

/// Fail with `ModifyError::NotFlat` unless `component` is flat.
pub fn check_flat(component: &Component) -> Result<(), ModifyError> {
    if is_flat(component) {
        Ok(())
    } else {
        Err(ModifyError::NotFlat {
            component: component.name.clone(),
            subnodes: component.subnodes.iter().map(|s| s.name.clone()).collect(),
        })
    }
}
