//! fundgz valuation feed client
//!
//! The feed answers `GET /js/{code}.js` with a JSONP body of the form
//! `jsonpgz({...});`. All payload fields are strings, and `gztime` is a
//! minute-resolution China Standard Time timestamp.

use crate::error::{AppError, Result};
use crate::models::Valuation;
use crate::valuation::ValuationSource;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

static ENVELOPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"jsonpgz\((.*)\);").expect("valid envelope regex"));

const GZTIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Raw payload inside the envelope
#[derive(Debug, Deserialize)]
struct GzPayload {
    #[serde(default)]
    name: Option<String>,
    /// Prior net value
    #[serde(default)]
    dwjz: Option<String>,
    /// Estimated current value
    #[serde(default)]
    gsz: Option<String>,
    #[serde(default)]
    gztime: Option<String>,
}

/// HTTP client for the fundgz feed
pub struct FundGzClient {
    client: Client,
    base_url: Url,
}

impl FundGzClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Endpoint for one instrument, with a cache-busting `rt` parameter
    fn endpoint(&self, instrument_id: &str) -> Result<Url> {
        if instrument_id.is_empty() || !instrument_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::fetch(instrument_id, "invalid instrument id"));
        }

        let mut url = self.base_url.join(&format!("js/{}.js", instrument_id))?;
        url.query_pairs_mut()
            .append_pair("rt", &Utc::now().timestamp_millis().to_string());
        Ok(url)
    }
}

#[async_trait]
impl ValuationSource for FundGzClient {
    fn id(&self) -> &'static str {
        "fundgz"
    }

    async fn fetch_valuation(&self, instrument_id: &str) -> Result<Valuation> {
        let url = self.endpoint(instrument_id)?;
        tracing::debug!("Fetching valuation for {} from {}", instrument_id, url);

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_response(instrument_id, &body)
    }
}

/// Extract the JSON text wrapped by the `jsonpgz(...);` envelope
pub fn unwrap_envelope(body: &str) -> Option<&str> {
    ENVELOPE_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse a full response body into a valuation
pub fn parse_response(instrument_id: &str, body: &str) -> Result<Valuation> {
    let json = unwrap_envelope(body)
        .ok_or_else(|| AppError::parse(instrument_id, "response is not a jsonpgz envelope"))?;

    let payload: GzPayload = serde_json::from_str(json)
        .map_err(|e| AppError::parse(instrument_id, format!("invalid payload: {}", e)))?;

    let gztime = payload
        .gztime
        .as_deref()
        .ok_or_else(|| AppError::fetch(instrument_id, "payload has no gztime"))?;

    Ok(Valuation {
        prior_valuation: parse_value(instrument_id, "dwjz", payload.dwjz.as_deref())?,
        current_valuation: parse_value(instrument_id, "gsz", payload.gsz.as_deref())?,
        source_timestamp: parse_gztime(instrument_id, gztime)?,
        name: payload.name.filter(|n| !n.is_empty()),
    })
}

/// Missing or empty values read as zero
fn parse_value(instrument_id: &str, field: &str, raw: Option<&str>) -> Result<f64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(0.0);
    }

    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::fetch(instrument_id, format!("{} is not a number: {}", field, raw)))?;

    if !value.is_finite() || value < 0.0 {
        return Err(AppError::fetch(
            instrument_id,
            format!("{} out of range: {}", field, raw),
        ));
    }

    Ok(value)
}

/// Interpret `gztime` as China Standard Time
fn parse_gztime(instrument_id: &str, raw: &str) -> Result<DateTime<Utc>> {
    let naive = GZTIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| AppError::fetch(instrument_id, format!("unreadable gztime: {}", raw)))?;

    Shanghai
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| AppError::fetch(instrument_id, format!("ambiguous gztime: {}", raw)))
}
