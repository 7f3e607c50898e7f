// crates.io
use serde::{Deserializer, de::Error as _};
// self
use crate::{
	_prelude::*,
	promotion::{ClipDeal, Promotion},
};

/// Gallery listing payload; both arrays may be absent or null.
#[derive(Debug, Default, Deserialize)]
pub struct GalleryResponse {
	/// Coupons.
	#[serde(default)]
	pub cc: Option<Vec<serde_json::Value>>,
	/// Personalized deals.
	#[serde(default)]
	pub pd: Option<Vec<serde_json::Value>>,
}
impl GalleryResponse {
	/// Raw offer records, coupons first.
	pub fn into_records(self) -> Vec<serde_json::Value> {
		self.cc.unwrap_or_default().into_iter().chain(self.pd.unwrap_or_default()).collect()
	}
}

/// One gallery offer. Null values decode as their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Offer {
	/// Brand name.
	#[serde(deserialize_with = "nullable")]
	pub brand: String,
	/// Clip identifier; may be empty.
	#[serde(deserialize_with = "nullable")]
	pub clip_id: String,
	/// Offer description.
	#[serde(deserialize_with = "nullable")]
	pub description: String,
	/// Fine print.
	#[serde(deserialize_with = "nullable")]
	pub disclaimer: String,
	/// External offer identifier, used when `clip_id` is empty.
	#[serde(rename = "extlOfferId", deserialize_with = "nullable")]
	pub external_offer_id: String,
	/// Category hierarchy.
	#[serde(deserialize_with = "nullable")]
	pub hierarchies: Hierarchies,
	/// Image identifier.
	#[serde(deserialize_with = "nullable")]
	pub image_id: String,
	/// Applicable product codes.
	#[serde(deserialize_with = "nullable")]
	pub upcs: Vec<String>,
	/// Minimum purchase quantity; `0` when unset.
	#[serde(rename = "minPurchaseQty", deserialize_with = "nullable")]
	pub min_purchase_quantity: f64,
	/// Maximum purchase quantity; `0` when unset.
	#[serde(rename = "maxPurchaseQty", deserialize_with = "nullable")]
	pub max_purchase_quantity: f64,
	/// Price.
	pub price: Option<f64>,
	/// Offer id sent as the clip item id.
	#[serde(deserialize_with = "nullable")]
	pub offer_id: String,
	/// Offer program sent as the clip item type.
	#[serde(deserialize_with = "nullable")]
	pub offer_pgm: String,
	/// Offer program type.
	#[serde(deserialize_with = "nullable")]
	pub offer_program_type: String,
	/// `C` when clipped, `U` otherwise.
	#[serde(deserialize_with = "nullable")]
	pub status: String,
	/// Usage type.
	#[serde(deserialize_with = "nullable")]
	pub usage_type: String,
	/// Start of validity.
	#[serde(deserialize_with = "epoch_millis")]
	pub start_date: Option<OffsetDateTime>,
	/// End of validity.
	#[serde(deserialize_with = "epoch_millis")]
	pub end_date: Option<OffsetDateTime>,
	/// When the offer was clipped.
	#[serde(rename = "clipTs", deserialize_with = "epoch_millis")]
	pub clipped_at: Option<OffsetDateTime>,
	/// Removed by the vendor.
	#[serde(deserialize_with = "nullable")]
	pub deleted: bool,
	/// Can be clipped.
	#[serde(deserialize_with = "nullable")]
	pub is_clippable: bool,
	/// Shown in the app.
	#[serde(deserialize_with = "nullable")]
	pub is_displayable: bool,
}
impl Offer {
	/// Status of an offer the user already clipped.
	pub const CLIPPED: &str = "C";

	/// Maps the offer into the vendor-agnostic model, keeping `source` as the raw record.
	pub fn into_clip_deal(self, source: serde_json::Value) -> ClipDeal {
		let id = if self.clip_id.is_empty() { self.external_offer_id } else { self.clip_id };

		ClipDeal {
			promotion: Promotion {
				brand: self.brand,
				categories: self.hierarchies.categories,
				id,
				description: self.description,
				disclaimer: self.disclaimer,
				kind: None,
				image_id: self.image_id,
				upcs: self.upcs,
				min_purchase_quantity: non_zero(self.min_purchase_quantity),
				max_purchase_quantity: non_zero(self.max_purchase_quantity),
				price: self.price,
				promo_code: non_empty(self.offer_id),
				promo_type: non_empty(self.offer_pgm),
				program_type: non_empty(self.offer_program_type),
				is_clipped: self.status == Self::CLIPPED,
				status: self.status,
				usage_type: self.usage_type,
				start_date: self.start_date,
				end_date: self.end_date,
				is_deleted: self.deleted,
				is_clippable: self.is_clippable,
				is_displayable: self.is_displayable,
				source,
			},
			expires_after_clip: false,
			clipped_at: self.clipped_at,
		}
	}
}

/// Category hierarchy of an offer.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Hierarchies {
	/// Category names.
	#[serde(deserialize_with = "nullable")]
	pub categories: Vec<String>,
	/// Event names.
	#[serde(deserialize_with = "nullable")]
	pub events: Vec<String>,
}

/// Clip request body; the offer is sent once per clip type.
#[derive(Debug, Serialize)]
pub struct ClipRequest<'a> {
	/// Clip items.
	pub items: [ClipItem<'a>; 2],
}
impl<'a> ClipRequest<'a> {
	/// Builds the `C` + `L` item pair for `offer_id`/`offer_pgm`.
	pub fn new(offer_id: &'a str, offer_pgm: &'a str) -> Self {
		Self {
			items: [
				ClipItem { clip_type: "C", item_id: offer_id, item_type: offer_pgm },
				ClipItem { clip_type: "L", item_id: offer_id, item_type: offer_pgm },
			],
		}
	}
}

/// One clip item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipItem<'a> {
	/// `C` (clip) or `L` (list).
	pub clip_type: &'a str,
	/// Offer id.
	pub item_id: &'a str,
	/// Offer program.
	pub item_type: &'a str,
}

/// Clip response body.
#[derive(Debug, Default, Deserialize)]
pub struct ClipResponse {
	/// Per-item outcomes.
	#[serde(default)]
	pub items: Vec<ClipResult>,
}

/// Per-item clip outcome.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClipResult {
	/// Echoed clip type.
	pub clip_type: Option<String>,
	/// Echoed offer id.
	pub item_id: Option<String>,
	/// Echoed offer program.
	pub item_type: Option<String>,
	/// Vendor status code.
	pub status: Option<i64>,
	/// Clip identifier.
	pub clip_id: Option<String>,
	/// Clip timestamp.
	pub clip_ts: Option<String>,
	/// Vendor check flag.
	pub checked: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Millis {
	Int(i64),
	Float(f64),
	Text(String),
}

/// Decodes epoch milliseconds given as a number or a numeric string; null and `""` yield `None`.
pub fn epoch_millis<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	let millis = match Option::<Millis>::deserialize(deserializer)? {
		None => return Ok(None),
		Some(Millis::Int(value)) => value,
		Some(Millis::Float(value)) => value as i64,
		Some(Millis::Text(text)) if text.trim().is_empty() => return Ok(None),
		Some(Millis::Text(text)) => text.trim().parse::<i64>().map_err(|e| {
			D::Error::custom(format!("timestamp `{text}` is not epoch milliseconds: {e}"))
		})?,
	};

	OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
		.map(Some)
		.map_err(D::Error::custom)
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_zero(value: f64) -> Option<f64> {
	(value != 0.0).then_some(value)
}

fn non_empty(value: String) -> Option<String> {
	(!value.is_empty()).then_some(value)
}
