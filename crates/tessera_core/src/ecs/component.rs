// component.rs - Component marker trait and static component type lists
//
// Components are identified by Rust `TypeId`s; each registry compacts those
// into its own small index range (see `type_map.rs`).

use std::any::{type_name, TypeId};

/// Trait for data attachable to an entity.
///
/// Blanket-implemented for every `'static + Send + Sync + Clone` type.
/// `Clone` lets pools be deep-copied for scene duplication and lets a prefab
/// be instantiated any number of times. `Send + Sync` allows partitioned
/// parallel iteration.
pub trait Component: 'static + Sized + Send + Sync + Clone {
    /// Human-readable name for diagnostics.
    fn component_name() -> &'static str {
        type_name::<Self>()
    }
}

impl<T: 'static + Send + Sync + Clone> Component for T {}

/// A static list of component types, written as a tuple: `(Position, Velocity)`.
///
/// Used wherever an operation names several component types at once:
/// `has_all`, `has_any`, `remove_all`, view exclusion lists and queries.
pub trait ComponentSet: 'static {
    /// Number of types in the list.
    const LEN: usize;

    /// Visit every `(TypeId, name)` pair in declaration order.
    fn each_type<V: FnMut(TypeId, &'static str)>(visit: V);

    /// Collect the declared names (diagnostics only).
    fn names() -> Vec<&'static str> {
        let mut names = Vec::with_capacity(Self::LEN);
        Self::each_type(|_, name| names.push(name));
        names
    }
}

impl ComponentSet for () {
    const LEN: usize = 0;

    fn each_type<V: FnMut(TypeId, &'static str)>(_visit: V) {}
}

macro_rules! impl_component_set {
    ($($T:ident),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            const LEN: usize = [$(stringify!($T)),+].len();

            fn each_type<V: FnMut(TypeId, &'static str)>(mut visit: V) {
                $( visit(TypeId::of::<$T>(), <$T as Component>::component_name()); )+
            }
        }
    };
}

impl_component_set!(T1);
impl_component_set!(T1, T2);
impl_component_set!(T1, T2, T3);
impl_component_set!(T1, T2, T3, T4);
impl_component_set!(T1, T2, T3, T4, T5);
impl_component_set!(T1, T2, T3, T4, T5, T6);
impl_component_set!(T1, T2, T3, T4, T5, T6, T7);
impl_component_set!(T1, T2, T3, T4, T5, T6, T7, T8);
