/// Probes whether a graphics context can be created, using a throwaway
/// surface that is discarded immediately.
pub trait GraphicsProbe {
    fn probe(&self) -> bool;
}

/// Probe with a fixed answer, for headless drivers and tests.
#[derive(Debug, Copy, Clone)]
pub struct StaticProbe(pub bool);

impl GraphicsProbe for StaticProbe {
    fn probe(&self) -> bool {
        self.0
    }
}

impl<F: Fn() -> bool> GraphicsProbe for F {
    fn probe(&self) -> bool {
        self()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ContextState {
    #[default]
    Active,
    Lost,
}

#[cfg(test)]
mod tests {
    use super::{GraphicsProbe, StaticProbe};

    #[test]
    fn probes() {
        assert!(StaticProbe(true).probe());
        assert!(!(|| false).probe());
    }
}
