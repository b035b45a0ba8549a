// id.rs — Stable handles for component-owned objects
//
// Ports live in an arena owned by their component and are addressed by
// `PortId`. Handles are allocated in declaration order and never reused
// within a component, so a handle taken before a removal still names the
// same port (or nothing) afterwards.

use serde::Serialize;

/// Stable handle for a port within its owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortId(pub u32);

/// Allocator for stable IDs. Produces monotonically increasing IDs in
/// allocation (declaration) order, ensuring deterministic assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdAllocator {
    next_port: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_port(&mut self) -> PortId {
        let id = PortId(self.next_port);
        self.next_port += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_allocated_in_order() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc_port(), PortId(0));
        assert_eq!(ids.alloc_port(), PortId(1));
        assert_eq!(ids.alloc_port(), PortId(2));
    }
}
