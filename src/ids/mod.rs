pub mod vector;

/// Generate an `Index` module which contains an index type and the
/// associated containers. We manipulate several kinds of indices (nodes,
/// variables) and, for sanity, prevent any confusion between them by using
/// distinct types, derived with this macro together with the needed
/// utilities (display, vectors indexed by the opaque indices, etc.).
///
/// The `ident` parameter is the name of the module to declare.
#[macro_export]
macro_rules! generate_index_type {
    ($name:ident) => {
        #[allow(non_snake_case)]
        pub mod $name {
            index_vec::define_index_type! {
                pub struct Id = usize;
                // Must fit in an u32 for serialization.
                MAX_INDEX = u32::MAX as usize;
            }

            pub type Vector<T> = $crate::ids::vector::Vector<Id, T>;

            impl std::fmt::Display for Id {
                fn fmt(
                    &self,
                    f: &mut std::fmt::Formatter<'_>,
                ) -> std::result::Result<(), std::fmt::Error> {
                    f.write_str(self.index().to_string().as_str())
                }
            }
        }
    };
}
