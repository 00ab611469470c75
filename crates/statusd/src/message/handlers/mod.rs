//! Built-in handlers that answer requests from the entity store.

mod instances;
mod statistics;
mod users;

pub use instances::InstancesHandler;
pub use statistics::StatisticsHandler;
pub use users::UsersHandler;

use crate::persistence::EntityStore;

use super::errors::DispatchError;

/// Fails with [`DispatchError::InvalidArguments`] unless the instance is
/// stored.
fn require_instance(store: &dyn EntityStore, instance_name: &str) -> Result<(), DispatchError> {
    match store.find_instance(instance_name)? {
        Some(_) => Ok(()),
        None => Err(DispatchError::invalid_arguments(format!(
            "unknown instance: {instance_name}"
        ))),
    }
}
