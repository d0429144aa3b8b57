//! Process registry - the set of live process ids

use std::collections::HashSet;

use causa_core::{CausalError, CausalResult, ProcessId};

/// Registered processes, kept in creation order
#[derive(Clone, Debug, Default)]
pub struct ProcessRegistry {
    order: Vec<ProcessId>,
    known: HashSet<ProcessId>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        ProcessRegistry::default()
    }

    /// Register a new process
    pub fn register(&mut self, id: ProcessId) -> CausalResult<()> {
        if !self.known.insert(id.clone()) {
            return Err(CausalError::DuplicateProcess(id));
        }
        tracing::debug!(process = %id, total = self.order.len() + 1, "process registered");
        self.order.push(id);
        Ok(())
    }

    #[inline]
    pub fn contains(&self, id: &ProcessId) -> bool {
        self.known.contains(id)
    }

    /// Fail with `UnknownProcess` unless the id is registered
    pub fn ensure(&self, id: &ProcessId) -> CausalResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(CausalError::UnknownProcess(id.clone()))
        }
    }

    /// All ids in creation order
    pub fn ids(&self) -> impl Iterator<Item = &ProcessId> + '_ {
        self.order.iter()
    }

    /// Every registered process except `id`
    pub fn others<'a>(&'a self, id: &'a ProcessId) -> impl Iterator<Item = &'a ProcessId> + 'a {
        self.order.iter().filter(move |other| *other != id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_duplicate() {
        let mut registry = ProcessRegistry::new();
        registry.register(ProcessId::new("P1")).unwrap();

        let err = registry.register(ProcessId::new("P1")).unwrap_err();
        assert_eq!(err, CausalError::DuplicateProcess(ProcessId::new("P1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ensure_unknown() {
        let registry = ProcessRegistry::new();
        assert!(matches!(
            registry.ensure(&ProcessId::new("P9")),
            Err(CausalError::UnknownProcess(_))
        ));
    }

    #[test]
    fn test_others_keeps_creation_order() {
        let mut registry = ProcessRegistry::new();
        for id in ["P2", "P1", "P3"] {
            registry.register(ProcessId::new(id)).unwrap();
        }
        let p1 = ProcessId::new("P1");
        let others: Vec<&str> = registry.others(&p1).map(|id| id.as_str()).collect();
        assert_eq!(others, ["P2", "P3"]);
    }
}
