// crates.io
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::Config,
	error::{ApiError, ConfigError, TransportError},
	http::TransportClient,
	promotion::{ClipDeal, PromotionFuture, PromotionSearchOptions, PromotionService},
	provider::safeway::{ClipRequest, ClipResponse, DEFAULT_API_BASE, GalleryResponse, Offer},
};

const LIST_PATH: &str = "/abs/pub/mobile/j4u/api/ecomgallery";
const CLIP_PATH: &str = "/abs/pub/mobile/j4u/api/offers/clip";
const CLIP_API_KEY: &str = "appandroid";

/// Promotion service backed by the J4U gallery and clip endpoints.
#[derive(Debug)]
pub struct SafewayPromotions {
	client: TransportClient,
	list_url: Url,
	clip_url: Url,
	api_key: String,
	app_version: String,
	store_id: String,
}
impl SafewayPromotions {
	/// Binds the service to an authorized `client`.
	pub fn new(client: TransportClient, config: &Config) -> Result<Self> {
		let base = match &config.api_base {
			Some(url) => url.clone(),
			None => Url::parse(DEFAULT_API_BASE).map_err(ConfigError::from)?,
		};
		let mut list_url = base.join(LIST_PATH).map_err(ConfigError::from)?;
		let mut clip_url = base.join(CLIP_PATH).map_err(ConfigError::from)?;

		list_url
			.query_pairs_mut()
			.append_pair("storeId", &config.store_id)
			.append_pair("offerPgm", "PD-CC")
			.append_pair("includeRedeemedBonusOffers", "y");
		clip_url.query_pairs_mut().append_pair("storeId", &config.store_id);

		Ok(Self {
			client,
			list_url,
			clip_url,
			api_key: config.api_key.clone(),
			app_version: config.app_version.clone(),
			store_id: config.store_id.clone(),
		})
	}

	/// Listing endpoint, including the store query.
	pub fn list_url(&self) -> &Url {
		&self.list_url
	}

	/// Clip endpoint, including the store query.
	pub fn clip_url(&self) -> &Url {
		&self.clip_url
	}

	fn identify(&self, builder: RequestBuilder, api_key: &str) -> RequestBuilder {
		builder
			.header("content-type", "application/json")
			.header("storeid", &self.store_id)
			.header("x-swy_api_key", api_key)
	}

	async fn fetch(
		&self,
		ctx: &CancellationToken,
		options: &PromotionSearchOptions,
	) -> Result<Vec<ClipDeal>> {
		const OPERATION: &str = "list clip deals";

		if *options != PromotionSearchOptions::default() {
			tracing::debug!(?options, "promotion: search filters are not supported, ignoring");
		}

		let builder = self
			.identify(self.client.get(self.list_url.clone()), &self.api_key)
			.header("appversion", &self.app_version);
		let response = self.client.send(ctx, builder).await?;
		let body = read_ok(ctx, OPERATION, response).await?;
		let gallery = decode::<GalleryResponse>(OPERATION, &body)?;
		let records = gallery.into_records();
		let mut by_status = BTreeMap::from([("C".to_owned(), 0_usize), ("U".to_owned(), 0)]);
		let mut deals = Vec::with_capacity(records.len());

		tracing::info!(count = records.len(), "promotion: found clip deals");

		for record in records {
			let offer = serde_path_to_error::deserialize::<_, Offer>(&record)
				.map_err(|source| ApiError::Decode { operation: OPERATION, source })?;

			*by_status.entry(offer.status.clone()).or_default() += 1;
			deals.push(offer.into_clip_deal(record));
		}
		for (status, count) in &by_status {
			tracing::info!(%status, count, "promotion: clip deals by status");
		}

		Ok(deals)
	}

	async fn clip(&self, ctx: &CancellationToken, deal: &ClipDeal) -> Result<()> {
		const OPERATION: &str = "clip deal";

		let (code, kind) = deal.check_clippable()?;
		let body = serde_json::to_vec(&ClipRequest::new(code, kind))
			.map_err(|source| ApiError::Encode { operation: OPERATION, source })?;
		let builder = self.identify(self.client.post(self.clip_url.clone()), CLIP_API_KEY).body(body);
		let response = self.client.send(ctx, builder).await?;
		let body = read_ok(ctx, OPERATION, response).await?;
		let clipped = decode::<ClipResponse>(OPERATION, &body)?;

		tracing::debug!(id = %deal.id, items = clipped.items.len(), "promotion: clip response");

		Ok(())
	}
}
impl PromotionService for SafewayPromotions {
	fn clip_deals<'a>(
		&'a self,
		ctx: &'a CancellationToken,
		options: &'a PromotionSearchOptions,
	) -> PromotionFuture<'a, Vec<ClipDeal>> {
		Box::pin(self.fetch(ctx, options))
	}

	fn clip_deal<'a>(
		&'a self,
		ctx: &'a CancellationToken,
		deal: &'a ClipDeal,
	) -> PromotionFuture<'a, ()> {
		Box::pin(self.clip(ctx, deal))
	}
}

async fn read_ok(
	ctx: &CancellationToken,
	operation: &'static str,
	response: Response,
) -> Result<Vec<u8>> {
	let status = response.status();

	if status != StatusCode::OK {
		return Err(ApiError::Status { operation, status: status.as_u16() }.into());
	}

	tokio::select! {
		biased;
		_ = ctx.cancelled() => Err(Error::Cancelled),
		body = response.bytes() => Ok(body.map_err(TransportError::from)?.to_vec()),
	}
}

fn decode<T>(operation: &'static str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ApiError::Decode { operation, source }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::ConfigOption;

	fn service(base: Option<&str>) -> SafewayPromotions {
		let mut options = vec![
			ConfigOption::ApiKey("key".into()),
			ConfigOption::StoreId("1234".into()),
			ConfigOption::AppVersion("2025.1.0".into()),
		];

		if let Some(base) = base {
			options.push(ConfigOption::ApiBase(Url::parse(base).expect("Base URL should parse.")));
		}

		SafewayPromotions::new(TransportClient::default(), &Config::from_options(options))
			.expect("Service should build.")
	}

	#[test]
	fn endpoints_default_to_public_origin() {
		let service = service(None);

		assert_eq!(
			service.list_url().as_str(),
			"https://www.safeway.com/abs/pub/mobile/j4u/api/ecomgallery?storeId=1234&offerPgm=PD-CC&includeRedeemedBonusOffers=y"
		);
		assert_eq!(
			service.clip_url().as_str(),
			"https://www.safeway.com/abs/pub/mobile/j4u/api/offers/clip?storeId=1234"
		);
	}

	#[test]
	fn endpoints_follow_api_base_override() {
		let service = service(Some("http://127.0.0.1:8080"));

		assert!(service.list_url().as_str().starts_with("http://127.0.0.1:8080/abs/pub/"));
	}

	#[test]
	fn identity_headers_are_set() {
		let service = service(None);
		let request = service
			.identify(service.client.get(service.list_url.clone()), "key")
			.build()
			.expect("Request should build.");
		let headers = request.headers();

		assert_eq!(headers["content-type"], "application/json");
		assert_eq!(headers["storeid"], "1234");
		assert_eq!(headers["x-swy_api_key"], "key");
	}

	#[test]
	fn decode_errors_name_the_path() {
		let err = decode::<GalleryResponse>("list clip deals", br#"{"cc": 5}"#)
			.expect_err("Numbers are not arrays.");

		assert!(matches!(
			err,
			Error::Api(ApiError::Decode { ref source, .. }) if source.path().to_string() == "cc"
		));
	}
}
