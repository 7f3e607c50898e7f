//! Vendor-agnostic promotion model and the promotion capability.
//!
//! Providers shape vendor payloads into [`Promotion`]/[`ClipDeal`] snapshots. Clipping a deal
//! never mutates the snapshot; callers re-fetch to observe server-side changes.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::ClipRejection};

/// Boxed future returned by [`PromotionService`] operations.
pub type PromotionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Lists promotions and clips deals for the authenticated user.
pub trait PromotionService
where
	Self: Send + Sync,
{
	/// Lists the clip deals available for the configured store.
	///
	/// Filters a provider does not support are ignored, never rejected.
	fn clip_deals<'a>(
		&'a self,
		ctx: &'a CancellationToken,
		options: &'a PromotionSearchOptions,
	) -> PromotionFuture<'a, Vec<ClipDeal>>;

	/// Clips `deal`, checking [`Promotion::check_clippable`] before any request is sent.
	fn clip_deal<'a>(&'a self, ctx: &'a CancellationToken, deal: &'a ClipDeal)
	-> PromotionFuture<'a, ()>;
}

/// Promotion kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
	/// Digital deal activated by clipping.
	ClipDeal,
	/// Coupon.
	Coupon,
	/// Weekly circular sale.
	WeeklySale,
	/// Clearance markdown.
	Clearance,
	/// Buy one, get one.
	Bogo,
	/// Mix and match bundle.
	MixAndMatch,
	/// Loyalty program reward.
	LoyaltyReward,
}
impl PromotionType {
	/// Returns the stable wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ClipDeal => "clip_deal",
			Self::Coupon => "coupon",
			Self::WeeklySale => "weekly_sale",
			Self::Clearance => "clearance",
			Self::Bogo => "bogo",
			Self::MixAndMatch => "mix_and_match",
			Self::LoyaltyReward => "loyalty_reward",
		}
	}
}
impl Display for PromotionType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Vendor-agnostic promotion snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
	/// Brand name.
	pub brand: String,
	/// Category names.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub categories: Vec<String>,
	/// Identifier; never empty for a usable promotion.
	pub id: String,
	/// Human-readable description.
	pub description: String,
	/// Fine print.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub disclaimer: String,
	/// Promotion kind, when the vendor reports one.
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<PromotionType>,
	/// Image identifier.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub image_id: String,
	/// Applicable product codes.
	#[serde(default)]
	pub upcs: Vec<String>,
	/// Minimum purchase quantity.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_purchase_quantity: Option<f64>,
	/// Maximum purchase quantity.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_purchase_quantity: Option<f64>,
	/// Price.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	/// Vendor code that targets the clip action.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub promo_code: Option<String>,
	/// Vendor type paired with the promo code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub promo_type: Option<String>,
	/// Vendor program.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub program_type: Option<String>,
	/// Vendor status code.
	pub status: String,
	/// Vendor usage type.
	pub usage_type: String,
	/// Start of validity.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub start_date: Option<OffsetDateTime>,
	/// End of validity.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub end_date: Option<OffsetDateTime>,
	/// Removed by the vendor.
	pub is_deleted: bool,
	/// Can be clipped.
	pub is_clippable: bool,
	/// Shown in the vendor app.
	pub is_displayable: bool,
	/// Already clipped.
	pub is_clipped: bool,
	/// Original vendor record.
	#[serde(default, skip_serializing)]
	pub source: serde_json::Value,
}
impl Promotion {
	/// Checks the clip preconditions in order: id, promo code/type, clipped, clippable, deleted.
	///
	/// Returns the promo code and type a clip request needs.
	pub fn check_clippable(&self) -> Result<(&str, &str), Error> {
		let reject = |reason| Err(Error::ClipRejected { id: self.id.clone(), reason });

		if self.id.is_empty() {
			return reject(ClipRejection::MissingId);
		}

		let (Some(code), Some(kind)) = (self.promo_code.as_deref(), self.promo_type.as_deref())
		else {
			return reject(ClipRejection::MissingPromoCode);
		};

		if self.is_clipped {
			reject(ClipRejection::AlreadyClipped)
		} else if !self.is_clippable {
			reject(ClipRejection::NotClippable)
		} else if self.is_deleted {
			reject(ClipRejection::Deleted)
		} else {
			Ok((code, kind))
		}
	}

	/// Buckets the promotion for the clip loop.
	pub fn classify(&self) -> Disposition {
		if self.is_clipped {
			Disposition::AlreadyClipped
		} else if !self.is_clippable {
			Disposition::Ignored
		} else if self.is_deleted {
			Disposition::Deleted
		} else {
			Disposition::Eligible
		}
	}
}

/// A promotion eligible for the clip action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipDeal {
	/// Promotion snapshot.
	#[serde(flatten)]
	pub promotion: Promotion,
	/// The deal is consumed once clipped.
	#[serde(default)]
	pub expires_after_clip: bool,
	/// When the deal was clipped.
	#[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
	pub clipped_at: Option<OffsetDateTime>,
}
impl Deref for ClipDeal {
	type Target = Promotion;

	fn deref(&self) -> &Self::Target {
		&self.promotion
	}
}

/// Advisory listing filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionSearchOptions {
	/// Promotion kind.
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<PromotionType>,
	/// Category name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// Product identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_id: Option<String>,
	/// Only clipped promotions.
	#[serde(default)]
	pub clipped_only: Option<bool>,
}

/// Classification bucket of a deal, evaluated in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
	/// `is_clipped` is set.
	AlreadyClipped,
	/// `is_clippable` is unset.
	Ignored,
	/// `is_deleted` is set.
	Deleted,
	/// A clip should be attempted.
	Eligible,
}
