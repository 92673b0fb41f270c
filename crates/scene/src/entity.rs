use foundation::handles::Handle;

/// Generational entity handle. A despawned slot is reused with a bumped
/// generation, so stale ids never alias a new entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(pub Handle);

impl EntityId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }

    pub fn generation(&self) -> u32 {
        self.0.generation()
    }
}
