/// Declares an index newtype together with a vector that can only be indexed by it.
///
/// Every stage of the pipeline keeps its records in arenas like these, so
/// that the cyclic contour structure can be expressed with plain indices.
macro_rules! typed_vec {
    ($(#[$meta:meta])* $idx_name:ident, $vec_name:ident, $dbg_prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
        pub struct $idx_name(pub usize);

        impl std::fmt::Debug for $idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $dbg_prefix, self.0)
            }
        }

        #[doc = concat!("A vector indexed by [`", stringify!($idx_name), "`].")]
        #[derive(Clone, PartialEq, serde::Serialize)]
        pub struct $vec_name<T> {
            inner: Vec<T>,
        }

        #[allow(dead_code)]
        impl<T> $vec_name<T> {
            /// Creates an empty vector with room for `cap` elements.
            pub fn with_capacity(cap: usize) -> Self {
                Self {
                    inner: Vec::with_capacity(cap),
                }
            }

            /// All the indices that are valid for this vector, in increasing order.
            pub fn indices(&self) -> impl Iterator<Item = $idx_name> {
                (0..self.inner.len()).map($idx_name)
            }

            /// The length of this vector.
            pub fn len(&self) -> usize {
                self.inner.len()
            }

            /// Are we empty?
            pub fn is_empty(&self) -> bool {
                self.inner.is_empty()
            }

            /// Appends an element and returns the index it was stored at.
            pub fn push(&mut self, elt: T) -> $idx_name {
                self.inner.push(elt);
                $idx_name(self.inner.len() - 1)
            }

            /// Iterates over the elements together with their indices.
            pub fn iter(&self) -> impl Iterator<Item = ($idx_name, &T)> + '_ {
                self.inner
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| ($idx_name(idx), t))
            }

            /// Iterates over the elements without their indices.
            pub fn values(&self) -> std::slice::Iter<'_, T> {
                self.inner.iter()
            }
        }

        impl<T: Clone> $vec_name<T> {
            /// Creates a vector of `size` copies of `value`.
            #[allow(dead_code)]
            pub fn filled(value: T, size: usize) -> Self {
                Self {
                    inner: vec![value; size],
                }
            }
        }

        impl<T> Default for $vec_name<T> {
            fn default() -> Self {
                Self { inner: Vec::new() }
            }
        }

        impl<T> std::ops::Index<$idx_name> for $vec_name<T> {
            type Output = T;

            fn index(&self, index: $idx_name) -> &T {
                &self.inner[index.0]
            }
        }

        impl<T> std::ops::IndexMut<$idx_name> for $vec_name<T> {
            fn index_mut(&mut self, index: $idx_name) -> &mut T {
                &mut self.inner[index.0]
            }
        }

        impl<T> FromIterator<T> for $vec_name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                Self {
                    inner: iter.into_iter().collect(),
                }
            }
        }

        impl<T: std::fmt::Debug> std::fmt::Debug for $vec_name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut map = f.debug_map();
                for (idx, elt) in self.iter() {
                    map.entry(&idx, elt);
                }
                map.finish()
            }
        }
    };
}
