use alloc::string::String;

use super::ComponentStorage;

// -----------------------------------------------------------------------------
// Component

/// Data that can be attached to an entity.
///
/// Storage slots are default-constructed before they are written, and values
/// are cloned when a prefab is instantiated, hence the `Default + Clone`
/// bounds.
///
/// # Examples
///
/// ```
/// use ts_ecs::component::{Component, ComponentStorage};
///
/// #[derive(Clone, Default)]
/// struct Position(f32, f32);
/// impl Component for Position {}
///
/// #[derive(Clone, Default)]
/// struct Highlight(u32);
/// impl Component for Highlight {
///     const STORAGE: ComponentStorage = ComponentStorage::Sparse;
/// }
/// ```
pub trait Component: Clone + Default + Send + Sync + 'static {
    const STORAGE: ComponentStorage = ComponentStorage::Dense;

    /// When `true`, prefab instantiation does not copy this component.
    const NO_CLONE: bool = false;
}

// -----------------------------------------------------------------------------
// Name

/// Debug name of an entity, attached by `create_entity(Some(name))`.
///
/// Sparse, so naming an entity does not change its archetype. Not copied
/// from prefabs to their instances.
#[derive(Clone, Default, Debug, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Component for Name {
    const STORAGE: ComponentStorage = ComponentStorage::Sparse;
    const NO_CLONE: bool = true;
}

impl Name {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}
