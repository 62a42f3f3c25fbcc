//! The `Context` owns every piece of ledger state. Modules keep their data in _data plugins_,
//! type-keyed containers created on first use, and expose their operations as extension traits
//! on `Context` (`ContextSurvivorsExt`, `ContextTradeExt`, ...).
//!
//! A `Context` is single-owner. Concurrent callers reach it through [`crate::web_api`], which
//! funnels every request to the thread that owns it, so each operation observes and produces a
//! consistent state.
use std::any::{Any, TypeId};

use crate::HashMap;

/// A type-keyed container of module data held by the [`Context`].
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a data plugin `$plugin` holding a `$data_container`, created from `$default`.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

pub struct Context {
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            data_plugins: HashMap::default(),
        }
    }

    /// Returns the data container of `plugin`, creating it if necessary.
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .expect("data plugin registered with a foreign container type")
    }

    /// Returns the data container of `plugin` if it has been created.
    #[allow(clippy::needless_pass_by_value)]
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
