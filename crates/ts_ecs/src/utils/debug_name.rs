use core::fmt;

use crate::cfg;

const ANONYMOUS_NAME: &str = "_unknown_";

// -----------------------------------------------------------------------------
// DebugName

/// A type name that is only recorded while runtime checks are compiled in.
///
/// Error messages use it to name the offending component. With checks
/// compiled out (see [`cfg::DEBUG`]) every name prints as `_unknown_`.
///
/// # Examples
///
/// ```
/// use ts_ecs::utils::DebugName;
///
/// let name = DebugName::type_name::<Vec<u32>>();
/// if ts_ecs::cfg::DEBUG {
///     assert_eq!(name.to_string(), "Vec<u32>");
/// }
/// assert_eq!(DebugName::anonymous().to_string(), "_unknown_");
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DebugName {
    name: &'static str,
}

impl DebugName {
    /// Captures the name of `T`.
    #[inline]
    pub fn type_name<T: ?Sized>() -> Self {
        if cfg::DEBUG {
            Self {
                name: core::any::type_name::<T>(),
            }
        } else {
            Self::anonymous()
        }
    }

    /// A name that always prints as `_unknown_`.
    #[inline(always)]
    pub const fn anonymous() -> Self {
        Self {
            name: ANONYMOUS_NAME,
        }
    }

    /// The full path as returned by [`core::any::type_name`].
    #[inline(always)]
    pub const fn full_path(&self) -> &'static str {
        self.name
    }
}

/// Writes `path` with every module prefix stripped, keeping generic syntax.
///
/// `alloc::vec::Vec<core::option::Option<u8>>` becomes `Vec<Option<u8>>`.
fn write_short(path: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut segment_start = 0;
    for (index, c) in path.char_indices() {
        if matches!(c, '<' | '>' | '(' | ')' | '[' | ']' | ',' | ';' | ' ' | '&') {
            f.write_str(last_segment(&path[segment_start..index]))?;
            f.write_str(&path[index..index + c.len_utf8()])?;
            segment_start = index + c.len_utf8();
        }
    }
    f.write_str(last_segment(&path[segment_start..]))
}

#[inline]
fn last_segment(segment: &str) -> &str {
    segment.rsplit("::").next().unwrap_or(segment)
}

impl fmt::Display for DebugName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_short(self.name, f)
    }
}

impl fmt::Debug for DebugName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_short(self.name, f)
    }
}
