/// Shorthand for [`Default::default()`], mostly used in struct update syntax.
///
/// # Example
///
/// ```
/// use ts_utils::default;
///
/// #[derive(Default)]
/// struct Limits {
///     rows: usize,
///     pages: usize,
/// }
///
/// let limits = Limits { rows: 64, ..default() };
/// assert_eq!(limits.pages, 0);
/// ```
#[inline(always)]
pub fn default<T: Default>() -> T {
    T::default()
}
