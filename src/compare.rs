//! Key ordering used by the map.

/// Strict weak ordering over keys ("less than").
///
/// An ordering that is not a strict weak ordering gives unspecified (but memory safe) results.
pub trait Compare<K: ?Sized> {
    /// Is `a` ordered before `b`?
    fn less(&self, a: &K, b: &K) -> bool;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OrdLess;

impl<K: Ord + ?Sized> Compare<K> for OrdLess {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}
