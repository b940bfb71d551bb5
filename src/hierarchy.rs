//! Containment hierarchy driven by a repeating source.
//!
//! The hierarchy is opened exactly once: container, then run group, then
//! lumi group, after which every item is a record. There is no closing
//! transition; tearing the hierarchy down belongs to whoever owns the session.
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Container,
    RunGroup,
    LumiGroup,
    Record,
}

impl ItemKind {
    pub fn successor(self) -> ItemKind {
        match self {
            ItemKind::Container => ItemKind::RunGroup,
            ItemKind::RunGroup => ItemKind::LumiGroup,
            ItemKind::LumiGroup => ItemKind::Record,
            ItemKind::Record => ItemKind::Record,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Containment {
    state: ItemKind,
}

impl Containment {
    pub fn new() -> Self {
        Self { state: ItemKind::Container }
    }

    pub fn current(&self) -> ItemKind {
        self.state
    }

    /// Return the current state and advance to its successor.
    pub fn next(&mut self) -> ItemKind {
        let v = self.state;
        self.state = v.successor();
        if v != self.state {
            debug!("Containment {:?} -> {:?}", v, self.state);
        }
        v
    }
}

impl Default for Containment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_hierarchy_once_then_records_forever() {
        let mut c = Containment::new();
        assert_eq!(c.current(), ItemKind::Container);
        assert_eq!(c.next(), ItemKind::Container);
        assert_eq!(c.next(), ItemKind::RunGroup);
        assert_eq!(c.next(), ItemKind::LumiGroup);
        for _ in 0..100 {
            assert_eq!(c.next(), ItemKind::Record);
        }
        assert_eq!(c.current(), ItemKind::Record);
    }
}
