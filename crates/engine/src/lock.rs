#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockOwner(pub String);

impl LockOwner {
    pub fn new(id: impl Into<String>) -> Self {
        LockOwner(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEdge {
    /// First owner arrived; the page must stop scrolling.
    Engaged,
    /// Last owner left; native scrolling resumes.
    Released,
}

/// Reference-counted page scroll lock. Components acquire and release under
/// their own owner id; the DOM overflow style is only touched on the edges
/// this ledger reports, so independent scroll-jack instances cannot strand
/// the page in a locked state.
#[derive(Debug, Default)]
pub struct ScrollLockLedger {
    owners: Vec<LockOwner>,
}

impl ScrollLockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(&self) -> bool {
        !self.owners.is_empty()
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn holds(&self, owner: &LockOwner) -> bool {
        self.owners.contains(owner)
    }

    /// Acquiring twice under the same owner is a no-op; one release is
    /// always enough to balance one logical hold.
    pub fn acquire(&mut self, owner: LockOwner) -> Option<LockEdge> {
        if self.owners.contains(&owner) {
            return None;
        }
        self.owners.push(owner);
        if self.owners.len() == 1 {
            Some(LockEdge::Engaged)
        } else {
            None
        }
    }

    /// Releasing an un-held lock is a no-op, never an error.
    pub fn release(&mut self, owner: &LockOwner) -> Option<LockEdge> {
        let before = self.owners.len();
        self.owners.retain(|held| held != owner);
        if before > 0 && self.owners.is_empty() {
            Some(LockEdge::Released)
        } else {
            None
        }
    }

    /// Defensive teardown: drop every owner at once. Used when a guard
    /// detects a lock held with no live component behind it.
    pub fn release_all(&mut self) -> Option<LockEdge> {
        if self.owners.is_empty() {
            return None;
        }
        self.owners.clear();
        Some(LockEdge::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_owner_round_trip() {
        let mut ledger = ScrollLockLedger::new();
        let hero = LockOwner::new("hero-jack");

        assert!(!ledger.locked());
        assert_eq!(ledger.acquire(hero.clone()), Some(LockEdge::Engaged));
        assert!(ledger.locked());
        assert_eq!(ledger.release(&hero), Some(LockEdge::Released));
        assert!(!ledger.locked());
    }

    #[test]
    fn second_owner_produces_no_edges() {
        let mut ledger = ScrollLockLedger::new();
        let hero = LockOwner::new("hero-jack");
        let values = LockOwner::new("values-jack");

        assert_eq!(ledger.acquire(hero.clone()), Some(LockEdge::Engaged));
        assert_eq!(ledger.acquire(values.clone()), None);

        // First release keeps the page locked for the remaining owner.
        assert_eq!(ledger.release(&hero), None);
        assert!(ledger.locked());
        assert_eq!(ledger.release(&values), Some(LockEdge::Released));
    }

    #[test]
    fn double_acquire_needs_only_one_release() {
        let mut ledger = ScrollLockLedger::new();
        let hero = LockOwner::new("hero-jack");

        assert_eq!(ledger.acquire(hero.clone()), Some(LockEdge::Engaged));
        assert_eq!(ledger.acquire(hero.clone()), None);
        assert_eq!(ledger.owner_count(), 1);
        assert_eq!(ledger.release(&hero), Some(LockEdge::Released));
    }

    #[test]
    fn releasing_unheld_lock_is_a_noop() {
        let mut ledger = ScrollLockLedger::new();
        let ghost = LockOwner::new("ghost");
        assert_eq!(ledger.release(&ghost), None);
        assert!(!ledger.locked());
    }

    #[test]
    fn release_all_clears_every_owner() {
        let mut ledger = ScrollLockLedger::new();
        ledger.acquire(LockOwner::new("a"));
        ledger.acquire(LockOwner::new("b"));
        assert_eq!(ledger.release_all(), Some(LockEdge::Released));
        assert!(!ledger.locked());
        assert_eq!(ledger.release_all(), None);
    }

    #[test]
    fn any_interleaving_ends_unlocked_when_all_owners_release() {
        let mut ledger = ScrollLockLedger::new();
        let owners: Vec<LockOwner> = (0..4)
            .map(|i| LockOwner::new(format!("jack-{i}")))
            .collect();

        for owner in &owners {
            ledger.acquire(owner.clone());
        }
        // Unmount in an arbitrary order, one of them twice.
        ledger.release(&owners[2]);
        ledger.release(&owners[0]);
        ledger.release(&owners[2]);
        ledger.release(&owners[3]);
        assert!(ledger.locked());
        ledger.release(&owners[1]);
        assert!(!ledger.locked());
    }
}
