//! Global properties are process-wide configuration values stored in the [`Context`]. They are
//! set once, at start-up, and read by the engines that need them. A second attempt to set a
//! property is an error, so a value observed by one request is the value observed by all.
//!
//! ```rust
//! use zssn::{define_global_property, Context, ContextGlobalPropertiesExt};
//!
//! define_global_property!(ServerName, String);
//!
//! let mut context = Context::new();
//! context.set_global_property_value(ServerName, "north-camp".to_string()).unwrap();
//! assert_eq!(context.get_global_property_value(ServerName).unwrap(), "north-camp");
//! ```
use std::any::{Any, TypeId};

use crate::context::Context;
use crate::error::ZssnError;
use crate::{define_data_plugin, HashMap};

/// Defines a global property `$global_property` with value type `$value`. An optional third
/// argument names a validator `fn(&$value) -> Result<(), ZssnError>`.
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate:expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn name() -> &'static str {
                stringify!($global_property)
            }

            fn validate(value: &$value) -> Result<(), $crate::error::ZssnError> {
                $validate(value)
            }
        }
    };
    ($global_property:ident, $value:ty) => {
        $crate::define_global_property!($global_property, $value, |_| Ok(()));
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any {
    type Value: Any;

    fn name() -> &'static str;

    /// # Errors
    /// Returns a `ZssnError` if `value` is not acceptable for this property.
    fn validate(value: &Self::Value) -> Result<(), ZssnError>;
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    HashMap<TypeId, Box<dyn Any>>,
    HashMap::default()
);

pub trait ContextGlobalPropertiesExt {
    /// Sets the value of a global property.
    ///
    /// # Errors
    /// Returns a `ZssnError::ConfigError` if the value fails validation or the property was
    /// already set.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), ZssnError>;

    /// Returns the value of a global property, or `None` if it was never set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), ZssnError> {
        T::validate(&value)?;
        let container = self.get_data_mut(GlobalPropertiesPlugin);
        if container.contains_key(&TypeId::of::<T>()) {
            return Err(ZssnError::ConfigError(format!(
                "global property {} is already set",
                T::name()
            )));
        }
        container.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data(GlobalPropertiesPlugin)?
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }
}
