use gpu::renderer::RenderFrame;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// A data layer attached to the globe object.
pub trait Layer {
    fn id(&self) -> LayerId;

    /// Number of rendered items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all data; the layer stays attached but renders nothing.
    fn clear(&mut self);

    /// Appends this layer's draw batch. Empty layers encode nothing.
    fn encode(&self, frame: &mut RenderFrame);
}
