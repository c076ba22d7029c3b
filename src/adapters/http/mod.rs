//! HTTP adapters onto external collaborators.

pub mod container_client;
pub mod rig_registry_client;

pub use container_client::HttpContainerClient;
pub use rig_registry_client::HttpRigRegistryClient;
