//! Resource endpoints: instruments, K-lines, indicators, reviews, trades.
//!
//! Everything here goes through [`ApiClient::send`], so token renewal
//! applies uniformly.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::{
    BatchCalculateRequest, DashboardStats, IndicatorPoint, IndicatorRecord, Instrument, KLine,
    KlineSyncRequest, ListPayload, NewInstrument, ReviewDraft, ReviewRecord, TradeLog,
};

use super::{ApiClient, ApiError, ApiRequest, Transport};

/// Bars requested per chart load.
pub const DEFAULT_KLINE_PAGE_SIZE: u32 = 100;

impl<T: Transport> ApiClient<T> {
    // ===== Helpers =====

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let response = self.send(request).await?.into_success()?;
        response.json()
    }

    async fn fetch_list<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<R>, ApiError> {
        let payload: ListPayload<R> = self.fetch(request).await?;
        Ok(payload.into_vec())
    }

    async fn submit<R: DeserializeOwned, B: Serialize>(&self, request: ApiRequest, body: &B) -> Result<R, ApiError> {
        self.fetch(request.json(body)?).await
    }

    // ===== Instruments =====

    pub async fn list_instruments(&self) -> Result<Vec<Instrument>, ApiError> {
        let instruments: Vec<Instrument> = self.fetch_list(ApiRequest::get(self.url("instruments/"))).await?;
        debug!(count = instruments.len(), "Fetched instruments");
        Ok(instruments)
    }

    pub async fn create_instrument(&self, instrument: &NewInstrument) -> Result<Instrument, ApiError> {
        instrument.validate()?;
        let created: Instrument = self
            .submit(ApiRequest::post(self.url("instruments/")), instrument)
            .await?;
        info!(symbol = %created.symbol, id = created.id, "Instrument created");
        Ok(created)
    }

    pub async fn update_instrument(&self, instrument: &Instrument) -> Result<Instrument, ApiError> {
        let url = self.url(&format!("instruments/{}/", instrument.id));
        self.submit(ApiRequest::put(url), instrument).await
    }

    /// Ask the backend to import recent bars. Returns the backend's summary.
    pub async fn sync_klines(&self, request: &KlineSyncRequest) -> Result<serde_json::Value, ApiError> {
        request.validate()?;
        let summary = self
            .submit(ApiRequest::post(self.url("klines/batch-import/")), request)
            .await?;
        info!(days = request.days, "K-line sync requested");
        Ok(summary)
    }

    // ===== K-lines =====

    pub async fn list_klines(&self, instrument_id: i64, page_size: u32) -> Result<Vec<KLine>, ApiError> {
        let request = ApiRequest::get(self.url("klines/"))
            .query("instrument", instrument_id)
            .query("page_size", page_size);
        let bars: Vec<KLine> = self.fetch_list(request).await?;
        debug!(instrument_id, count = bars.len(), "Fetched K-lines");
        Ok(bars)
    }

    // ===== Indicators =====

    pub async fn list_indicators(&self) -> Result<Vec<IndicatorRecord>, ApiError> {
        self.fetch_list(ApiRequest::get(self.url("indicators/"))).await
    }

    /// One overlay series (e.g. `MA5`) for an instrument.
    pub async fn fetch_indicator_series(&self, instrument_id: i64, key: &str) -> Result<Vec<IndicatorPoint>, ApiError> {
        let request = ApiRequest::get(self.url("indicators/"))
            .query("instrument", instrument_id)
            .query("indicator_type", key);
        self.fetch_list(request).await
    }

    /// Several overlay series, fetched one after another.
    pub async fn fetch_indicator_overlays(
        &self,
        instrument_id: i64,
        keys: &[String],
    ) -> Result<BTreeMap<String, Vec<IndicatorPoint>>, ApiError> {
        let mut overlays = BTreeMap::new();
        for key in keys {
            let series = self.fetch_indicator_series(instrument_id, key).await?;
            overlays.insert(key.clone(), series);
        }
        Ok(overlays)
    }

    pub async fn batch_calculate_indicators(&self, request: &BatchCalculateRequest) -> Result<serde_json::Value, ApiError> {
        request.validate()?;
        let summary = self
            .submit(ApiRequest::post(self.url("indicators/batch-calculate/")), request)
            .await?;
        info!(
            instruments = request.instrument_ids.len(),
            indicators = request.indicator_types.len(),
            "Indicator calculation requested"
        );
        Ok(summary)
    }

    // ===== Reviews =====

    pub async fn list_reviews(&self) -> Result<Vec<ReviewRecord>, ApiError> {
        self.fetch_list(ApiRequest::get(self.url("reviews/"))).await
    }

    pub async fn get_review(&self, id: i64) -> Result<ReviewRecord, ApiError> {
        self.fetch(ApiRequest::get(self.url(&format!("reviews/{}/", id)))).await
    }

    pub async fn create_review(&self, draft: &ReviewDraft) -> Result<ReviewRecord, ApiError> {
        let payload = draft.to_payload()?;
        let created: ReviewRecord = self.submit(ApiRequest::post(self.url("reviews/")), &payload).await?;
        info!(id = created.id, "Review created");
        Ok(created)
    }

    pub async fn update_review(&self, id: i64, draft: &ReviewDraft) -> Result<ReviewRecord, ApiError> {
        let payload = draft.to_payload()?;
        self.submit(ApiRequest::put(self.url(&format!("reviews/{}/", id))), &payload)
            .await
    }

    pub async fn delete_review(&self, id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(self.url(&format!("reviews/{}/", id))))
            .await?
            .into_success()?;
        info!(id, "Review deleted");
        Ok(())
    }

    // ===== Trades =====

    pub async fn list_trades(&self) -> Result<Vec<TradeLog>, ApiError> {
        self.fetch_list(ApiRequest::get(self.url("trades/"))).await
    }

    // ===== Dashboard =====

    /// Counts and P/L for the dashboard, from three concurrent list calls.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let (instruments, reviews, trades) =
            futures::try_join!(self.list_instruments(), self.list_reviews(), self.list_trades())?;
        Ok(DashboardStats::compute(&instruments, &reviews, &trades))
    }
}
