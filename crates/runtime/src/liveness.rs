use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mount flag shared between a widget and its in-flight async continuations.
///
/// Every continuation checks [`Liveness::is_alive`] before touching state;
/// once revoked, a flag never becomes alive again.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Returns `true` if this call performed the transition.
    pub fn revoke(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::Liveness;

    #[test]
    fn revoke_is_shared_and_one_way() {
        let a = Liveness::new();
        let b = a.clone();
        assert!(b.is_alive());
        assert!(a.revoke());
        assert!(!b.is_alive());
        assert!(!b.revoke());
    }
}
