use enum_iterator::IntoEnumIterator;

/// Policy for reads whose coordinate leaves the logical domain.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Boundary<T> {
    /// Toroidal: an out-of-range coordinate re-enters on the opposite edge.
    Wrap,
    /// Out-of-domain reads yield the fill value instead of touching storage.
    Remove(T),
}

/// How a grid realizes its boundary policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoEnumIterator)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Padding {
    /// Storage is extended by `radius` cells on every side. The band is
    /// refreshed once per step, making stencil reads branch-free.
    Halo,
    /// No extra storage. Every neighbor read is bounds-checked and redirected
    /// at access time, so no refresh pass is needed.
    Conditional,
}
