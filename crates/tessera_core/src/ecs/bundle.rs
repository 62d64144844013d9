//! Component bundles for creating entities

use super::component::Component;
use super::{EntityId, Registry, RegistryError};

/// A group of component values added to an entity together, in tuple order.
pub trait Bundle: Send + Sync + 'static {
    /// Make sure every type of the bundle has a pool.
    fn register(registry: &mut Registry) -> Result<(), RegistryError>;

    /// Add each component to `id`. Types the entity already has keep their
    /// current value.
    fn add_to(self, registry: &mut Registry, id: EntityId) -> Result<(), RegistryError>;
}

// Implement for 1..=8 components
macro_rules! impl_bundle {
    ($($T:ident $value:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            fn register(registry: &mut Registry) -> Result<(), RegistryError> {
                $( registry.register::<$T>()?; )+
                Ok(())
            }

            fn add_to(self, registry: &mut Registry, id: EntityId) -> Result<(), RegistryError> {
                let ($($value,)+) = self;
                $( registry.add(id, $value)?; )+
                Ok(())
            }
        }
    };
}

impl_bundle!(T1 v1);
impl_bundle!(T1 v1, T2 v2);
impl_bundle!(T1 v1, T2 v2, T3 v3);
impl_bundle!(T1 v1, T2 v2, T3 v3, T4 v4);
impl_bundle!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5);
impl_bundle!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5, T6 v6);
impl_bundle!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5, T6 v6, T7 v7);
impl_bundle!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5, T6 v6, T7 v7, T8 v8);
