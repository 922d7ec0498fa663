//! Named clients owned by the application.

// self
use crate::{_prelude::*, client::VaultClient, error::ConfigError};

/// Name to [`VaultClient`] map for applications that talk to several services.
///
/// The registry is an ordinary value; share it (e.g. behind an `Arc`) rather than relying on
/// process-wide state.
#[derive(Debug, Default)]
pub struct ClientRegistry {
	clients: RwLock<HashMap<String, VaultClient>>,
}
impl ClientRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `client` under `name`; names cannot be re-booted until cleared.
	pub fn boot(&self, name: impl Into<String>, client: VaultClient) -> Result<VaultClient> {
		let name = name.into();
		let mut clients = self.clients.write();

		if clients.contains_key(&name) {
			return Err(ConfigError::InstanceAlreadyBooted { name }.into());
		}

		clients.insert(name, client.clone());

		Ok(client)
	}

	/// Returns the client registered under `name`.
	pub fn get(&self, name: &str) -> Result<VaultClient> {
		self.clients
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| ConfigError::UnknownInstance { name: name.to_owned() }.into())
	}

	/// Removes the client registered under `name`, returning it.
	pub fn clear(&self, name: &str) -> Option<VaultClient> {
		self.clients.write().remove(name)
	}

	/// Removes every client.
	pub fn clear_all(&self) {
		self.clients.write().clear();
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names = self.clients.read().keys().cloned().collect::<Vec<_>>();

		names.sort();

		names
	}
}
