/// Rendering-hint size carried by `EntitySpawnPayload`; server-side gameplay has no use for it,
/// so it lives only in the client mirror.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpriteSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation(pub f32);
