//! Airtable-backed booking store
//!
//! Records are filtered server-side with `filterByFormula` and paged with
//! `offset`. Airtable reports failures either through the HTTP status or an
//! `error` member in the body; both surface as [`StoreError::Api`].

use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{
    BookingRecord, BookingStore, FIELD_PICKUP_DATE, FIELD_PICKUP_TIME, FIELD_QUANTITY,
    NewBooking, SlotKey, StoreError, lenient_quantity,
};
use crate::config::AirtableConfig;

#[derive(Deserialize)]
struct ListRecordsPage {
    records: Vec<RawRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct RawRecord {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct AirtableStore {
    client: reqwest::Client,
    api_key: String,
    table_url: Url,
}

impl AirtableStore {
    pub fn new(client: reqwest::Client, config: &AirtableConfig) -> Result<Self, StoreError> {
        let mut table_url = Url::parse(&config.api_base)
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {e}", config.api_base)))?;
        table_url
            .path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(config.api_base.clone()))?
            .pop_if_empty()
            .extend(["v0", config.base_id.as_str(), config.table_name.as_str()]);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            table_url,
        })
    }

    async fn fetch_page(
        &self,
        formula: &str,
        offset: Option<&str>,
    ) -> Result<ListRecordsPage, StoreError> {
        let mut req = self
            .client
            .get(self.table_url.clone())
            .bearer_auth(&self.api_key)
            .query(&[("filterByFormula", formula)]);
        if let Some(offset) = offset {
            req = req.query(&[("offset", offset)]);
        }

        let body = read_json(req.send().await?).await?;
        serde_json::from_value(body).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl BookingStore for AirtableStore {
    async fn find_bookings(&self, slot: &SlotKey) -> Result<Vec<BookingRecord>, StoreError> {
        let formula = slot_formula(slot);
        let mut bookings = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let page = self.fetch_page(&formula, offset.as_deref()).await?;
            bookings.extend(page.records.into_iter().map(|r| to_booking(r, slot)));

            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    return Err(StoreError::InvalidResponse(format!(
                        "pagination offset {next} repeated"
                    )));
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::debug!(slot = %slot, records = bookings.len(), "Fetched bookings from Airtable");
        Ok(bookings)
    }

    async fn record_booking(&self, booking: &NewBooking) -> Result<String, StoreError> {
        let body = json!({
            "records": [{ "fields": booking_fields(booking) }],
            "typecast": true,
        });

        let response = self
            .client
            .post(self.table_url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let created = read_json(response).await?;

        created["records"][0]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| StoreError::InvalidResponse(format!("no record id in {created}")))
    }
}

/// Read a JSON body, turning error statuses and error payloads into `StoreError::Api`
async fn read_json(response: reqwest::Response) -> Result<Value, StoreError> {
    let status = response.status();
    let text = response.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if let Some(message) = body.as_ref().and_then(error_message) {
        return Err(StoreError::Api {
            status: status.as_u16(),
            message,
        });
    }
    if !status.is_success() {
        return Err(StoreError::Api {
            status: status.as_u16(),
            message: text,
        });
    }
    body.ok_or_else(|| StoreError::InvalidResponse("body is not JSON".to_string()))
}

/// Airtable uses both `{"error": "NOT_FOUND"}` and `{"error": {"type", "message"}}`
fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => Some(
            obj.get("message")
                .or_else(|| obj.get("type"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        ),
        other => Some(other.to_string()),
    }
}

/// `AND({pickupDate}='D',{pickupTime}='T')` with the values escaped
fn slot_formula(slot: &SlotKey) -> String {
    format!(
        "AND({{{}}}='{}',{{{}}}='{}')",
        FIELD_PICKUP_DATE,
        escape_formula_string(&slot.pickup_date),
        FIELD_PICKUP_TIME,
        escape_formula_string(&slot.pickup_time),
    )
}

fn escape_formula_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn to_booking(record: RawRecord, slot: &SlotKey) -> BookingRecord {
    let text = |field: &str, fallback: &str| {
        record
            .fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    };
    BookingRecord {
        pickup_date: text(FIELD_PICKUP_DATE, &slot.pickup_date),
        pickup_time: text(FIELD_PICKUP_TIME, &slot.pickup_time),
        quantity: lenient_quantity(record.fields.get(FIELD_QUANTITY)),
        id: record.id,
    }
}

fn booking_fields(booking: &NewBooking) -> Value {
    let mut fields = Map::new();
    fields.insert("orderNumber".into(), json!(booking.order_number));
    fields.insert(FIELD_PICKUP_DATE.into(), json!(booking.pickup_date));
    fields.insert(FIELD_PICKUP_TIME.into(), json!(booking.pickup_time));
    fields.insert(FIELD_QUANTITY.into(), json!(booking.quantity));
    fields.insert("items".into(), json!(booking.items));
    if let Some(email) = &booking.customer_email {
        fields.insert("customerEmail".into(), json!(email));
    }
    if let Some(amount) = booking
        .amount_total
        .and_then(|cents| Decimal::new(cents, 2).to_f64())
    {
        fields.insert("amountTotal".into(), json!(amount));
    }
    if let Some(session_id) = &booking.checkout_session_id {
        fields.insert("checkoutSessionId".into(), json!(session_id));
    }
    Value::Object(fields)
}
