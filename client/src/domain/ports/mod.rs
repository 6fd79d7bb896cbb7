//! Domain ports for the two external collaborators: the remote services and
//! the durable local store.

mod macros;
pub(crate) use macros::define_port_error;

mod local_store;
mod remote_client;

pub use local_store::{LocalStore, LocalStoreError, LocalStoreExt};
#[cfg(test)]
pub use remote_client::MockRemoteClient;
pub use remote_client::{RemoteClient, RemoteClientError};
