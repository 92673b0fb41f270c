use crate::components::{Drawable3D, Transform};
use crate::entity::EntityId;
use foundation::handles::Handle;

#[derive(Debug, Default)]
pub struct World {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    parents: Vec<Option<EntityId>>,
    transforms: Vec<Option<Transform>>,
    drawables_3d: Vec<Option<Drawable3D>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let idx = index as usize;
            self.alive[idx] = true;
            return EntityId(Handle::new(index, self.generations[idx]));
        }

        let index = self.generations.len() as u32;
        let idx = index as usize;
        self.ensure_capacity(idx);
        self.alive[idx] = true;
        EntityId(Handle::new(index, 0))
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        let idx = entity.index() as usize;
        self.alive.get(idx).copied().unwrap_or(false)
            && self.generations.get(idx).copied() == Some(entity.generation())
    }

    pub fn entity_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Removes `entity` and all of its descendants. Returns `false` for stale ids.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        for child in self.children(entity) {
            self.despawn(child);
        }

        let idx = entity.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.parents[idx] = None;
        self.transforms[idx] = None;
        self.drawables_3d[idx] = None;
        self.free.push(entity.index());
        true
    }

    /// Re-parents `child` under `parent`. Both must be alive and the link must
    /// not create a cycle.
    pub fn attach(&mut self, child: EntityId, parent: EntityId) -> bool {
        if child == parent || !self.is_alive(child) || !self.is_alive(parent) {
            return false;
        }
        if self.ancestors(parent).any(|a| a == child) {
            return false;
        }
        self.parents[child.index() as usize] = Some(parent);
        true
    }

    /// Clears the parent link. Returns `true` if `child` had a parent.
    pub fn detach(&mut self, child: EntityId) -> bool {
        if !self.is_alive(child) {
            return false;
        }
        self.parents[child.index() as usize].take().is_some()
    }

    pub fn parent(&self, child: EntityId) -> Option<EntityId> {
        if !self.is_alive(child) {
            return None;
        }
        self.parents[child.index() as usize]
    }

    /// Direct children in ascending index order.
    pub fn children(&self, parent: EntityId) -> Vec<EntityId> {
        self.parents
            .iter()
            .enumerate()
            .filter(|(idx, p)| self.alive[*idx] && **p == Some(parent))
            .map(|(idx, _)| EntityId(Handle::new(idx as u32, self.generations[idx])))
            .collect()
    }

    pub fn is_descendant_of(&self, entity: EntityId, root: EntityId) -> bool {
        self.is_alive(entity) && (entity == root || self.ancestors(entity).any(|a| a == root))
    }

    fn ancestors(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(self.parent(entity), move |p| self.parent(*p))
    }

    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) {
        if self.is_alive(entity) {
            self.transforms[entity.index() as usize] = Some(transform);
        }
    }

    pub fn transform(&self, entity: EntityId) -> Option<Transform> {
        if !self.is_alive(entity) {
            return None;
        }
        self.transforms[entity.index() as usize]
    }

    pub fn transform_mut(&mut self, entity: EntityId) -> Option<&mut Transform> {
        if !self.is_alive(entity) {
            return None;
        }
        self.transforms[entity.index() as usize].as_mut()
    }

    pub fn set_drawable_3d(&mut self, entity: EntityId, drawable: Drawable3D) {
        if self.is_alive(entity) {
            self.drawables_3d[entity.index() as usize] = Some(drawable);
        }
    }

    pub fn drawable_3d(&self, entity: EntityId) -> Option<Drawable3D> {
        if !self.is_alive(entity) {
            return None;
        }
        self.drawables_3d[entity.index() as usize]
    }

    pub fn drawables_3d(&self) -> Vec<(EntityId, Transform, Drawable3D)> {
        self.collect_drawables(|_| true)
    }

    /// Drawables attached (directly or transitively) under `root`.
    pub fn drawables_3d_under(&self, root: EntityId) -> Vec<(EntityId, Transform, Drawable3D)> {
        self.collect_drawables(|entity| self.is_descendant_of(entity, root))
    }

    fn collect_drawables(
        &self,
        keep: impl Fn(EntityId) -> bool,
    ) -> Vec<(EntityId, Transform, Drawable3D)> {
        let mut out = Vec::new();
        for (idx, drawable) in self.drawables_3d.iter().enumerate() {
            let Some(drawable) = drawable else { continue };
            if !self.alive[idx] {
                continue;
            }
            let Some(transform) = self.transforms.get(idx).and_then(|t| *t) else {
                continue;
            };
            let entity = EntityId(Handle::new(idx as u32, self.generations[idx]));
            if keep(entity) {
                out.push((entity, transform, *drawable));
            }
        }
        out
    }

    fn ensure_capacity(&mut self, idx: usize) {
        if self.generations.len() <= idx {
            let new_len = idx + 1;
            self.generations.resize(new_len, 0);
            self.alive.resize(new_len, false);
            self.parents.resize(new_len, None);
            self.transforms.resize(new_len, None);
            self.drawables_3d.resize(new_len, None);
        }
    }
}
