use core::cmp::Ordering;
use core::fmt::{Debug, Display};
use core::hash::Hash;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Entity

/// A handle to an entity: an index into the address table plus the version
/// of the slot at the time the handle was issued.
///
/// Index `0` is reserved, so [`Entity::NULL`] never refers to a live entity.
/// Deleting an entity bumps the version of its slot, which invalidates every
/// outstanding handle before the index is reused.
///
/// Command buffers hand out *deferred* handles, which have the high bit of
/// the index set and version `u32::MAX`. They are placeholders until the
/// buffer commits and are rejected by every manager operation.
///
/// # Examples
///
/// ```
/// use ts_ecs::entity::Entity;
///
/// let entity = Entity::new(7, 2);
/// assert_eq!(entity.to_string(), "7v2");
/// assert_eq!(Entity::from_bits(entity.to_bits()), entity);
/// assert!(Entity::NULL.is_null());
/// ```
#[derive(Clone, Copy)]
pub struct Entity {
    index: u32,
    version: u32,
}

impl Entity {
    /// The reserved handle that refers to nothing.
    pub const NULL: Entity = Entity {
        index: 0,
        version: 0,
    };

    const DEFERRED_BIT: u32 = 1 << 31;

    #[inline(always)]
    pub const fn new(index: u32, version: u32) -> Self {
        Self { index, version }
    }

    /// The `n`-th deferred handle of a command buffer.
    #[inline(always)]
    pub(crate) const fn deferred(n: u32) -> Self {
        Self {
            index: Self::DEFERRED_BIT | n,
            version: u32::MAX,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline(always)]
    pub const fn version(self) -> u32 {
        self.version
    }

    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.index == 0
    }

    #[inline(always)]
    pub const fn is_deferred(self) -> bool {
        self.index & Self::DEFERRED_BIT != 0 && self.version == u32::MAX
    }

    /// Position of a deferred handle within its command buffer.
    #[inline(always)]
    pub(crate) const fn deferred_index(self) -> Option<u32> {
        if self.is_deferred() {
            Some(self.index & !Self::DEFERRED_BIT)
        } else {
            None
        }
    }

    /// Packs the handle into a `u64`, version in the high half.
    #[inline(always)]
    pub const fn to_bits(self) -> u64 {
        ((self.version as u64) << 32) | self.index as u64
    }

    /// The inverse of [`to_bits`](Self::to_bits).
    #[inline(always)]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            version: (bits >> 32) as u32,
        }
    }
}

impl Default for Entity {
    #[inline(always)]
    fn default() -> Self {
        Self::NULL
    }
}

impl PartialEq for Entity {
    #[inline(always)]
    fn eq(&self, other: &Entity) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Eq for Entity {}

impl PartialOrd for Entity {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entity {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bits().cmp(&other.to_bits())
    }
}

impl Hash for Entity {
    #[inline(always)]
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_bits());
    }
}

impl Debug for Entity {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.deferred_index() {
            _ if self.is_null() => f.pad("NULL"),
            Some(n) => f.pad(&alloc::format!("deferred#{n}")),
            None => f.pad(&alloc::format!("{}v{}", self.index, self.version)),
        }
    }
}

impl Serialize for Entity {
    #[inline(always)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.to_bits())
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let bits: u64 = Deserialize::deserialize(deserializer)?;
        let entity = Entity::from_bits(bits);
        if entity.is_deferred() {
            return Err(Error::custom(
                "Attempting to deserialize a deferred entity.",
            ));
        }
        Ok(entity)
    }
}

// -----------------------------------------------------------------------------
// Tests
