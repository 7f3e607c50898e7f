// self
use crate::{
	_prelude::*,
	config::{Config, ConfigOption},
	provider::Supermarket,
};

/// Constructor stored in a [`Registry`].
pub type Creator =
	Arc<dyn Fn(&CancellationToken, &Config) -> Result<Box<dyn Supermarket>> + Send + Sync>;

/// Thread-safe map from provider names to constructors.
///
/// Registering a name twice replaces the earlier constructor.
#[derive(Default)]
pub struct Registry {
	creators: RwLock<HashMap<String, Creator>>,
}
impl Registry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `creator` under `name`, replacing any previous registration.
	pub fn register<F>(&self, name: impl Into<String>, creator: F)
	where
		F: 'static + Fn(&CancellationToken, &Config) -> Result<Box<dyn Supermarket>> + Send + Sync,
	{
		let name = name.into();
		let replaced = self.creators.write().insert(name.clone(), Arc::new(creator)).is_some();

		tracing::info!(provider = %name, replaced, "registry: registered provider");
	}

	/// Builds the provider registered under `name`.
	///
	/// `options` are applied in order over [`Config::default`]; required fields are not checked
	/// here. Constructor errors are returned unchanged.
	pub fn create(
		&self,
		ctx: &CancellationToken,
		name: &str,
		options: impl IntoIterator<Item = ConfigOption>,
	) -> Result<Box<dyn Supermarket>> {
		// Clone the constructor so the lock is not held while it runs.
		let creator = self
			.creators
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| Error::NotRegistered { name: name.to_owned() })?;
		let config = Config::from_options(options);

		creator(ctx, &config)
	}

	/// Registered names in alphabetical order.
	pub fn available(&self) -> Vec<String> {
		let mut names = self.creators.read().keys().cloned().collect::<Vec<_>>();

		names.sort();

		names
	}
}
impl Debug for Registry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registry").field("providers", &self.available()).finish()
	}
}
