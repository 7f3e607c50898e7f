//! Provider capability set and the named-constructor registry.
//!
//! A [`Supermarket`] binds an [`Authenticator`] and a [`PromotionService`] that share one
//! decorated transport. Vendors expose a [`Creator`] and are looked up by name through an
//! explicit [`Registry`] owned by the host process.

pub mod safeway;

mod registry;

pub use registry::*;

// self
use crate::{_prelude::*, auth::Authenticator, promotion::PromotionService};

/// Vendor implementation of the authentication and promotion capabilities.
pub trait Supermarket
where
	Self: Send + Sync,
{
	/// Authentication capability.
	fn authenticator(&self) -> Result<&dyn Authenticator>;

	/// Promotion capability.
	fn promotion(&self) -> Result<&dyn PromotionService>;
}
