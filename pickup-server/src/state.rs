//! Application state for pickup-server

use std::sync::Arc;

use crate::availability::{AvailabilityChecker, ReservationLedger};
use crate::config::{BookingStoreConfig, Config};
use crate::store::{AirtableStore, BookingStore, InMemoryBookingStore};
use crate::stripe::{PROCESSED_EVENT_RETENTION, ProcessedEvents, StripeClient};
use crate::zapier::ZapierClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
///
/// Cheap to clone; every field is `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Availability check over the configured booking store
    pub checker: AvailabilityChecker,
    pub stripe: StripeClient,
    /// `None` when `ZAPIER_WEBHOOK_URL` is not set
    pub zapier: Option<ZapierClient>,
    /// In-flight reservations (reserve admission mode)
    pub ledger: Arc<ReservationLedger>,
    /// Stripe event ids already handled
    pub processed_events: Arc<ProcessedEvents>,
}

impl AppState {
    /// Build state with the booking store selected by `BOOKING_STORE`
    pub fn new(config: Config) -> Result<Self, BoxError> {
        let http = build_http_client(&config)?;
        let store: Arc<dyn BookingStore> = match &config.booking_store {
            BookingStoreConfig::Airtable(airtable) => {
                tracing::info!(
                    base_id = %airtable.base_id,
                    table = %airtable.table_name,
                    "Using Airtable booking store"
                );
                Arc::new(AirtableStore::new(http.clone(), airtable)?)
            }
            BookingStoreConfig::Memory => {
                if config.is_production() {
                    tracing::warn!("Using in-memory booking store in production");
                }
                tracing::info!("Using in-memory booking store, bookings are lost on restart");
                Arc::new(InMemoryBookingStore::new())
            }
        };
        Self::assemble(config, http, store)
    }

    /// Build state around an existing booking store
    pub fn with_store(config: Config, store: Arc<dyn BookingStore>) -> Result<Self, BoxError> {
        let http = build_http_client(&config)?;
        Self::assemble(config, http, store)
    }

    fn assemble(
        config: Config,
        http: reqwest::Client,
        store: Arc<dyn BookingStore>,
    ) -> Result<Self, BoxError> {
        let checker = AvailabilityChecker::new(
            store,
            config.capacity.clone(),
            config.unknown_slot_policy,
        );
        let stripe = StripeClient::new(http.clone(), &config.stripe)?;
        let zapier = config
            .zapier_webhook_url
            .as_ref()
            .map(|url| ZapierClient::new(http.clone(), url.clone()));
        if zapier.is_none() {
            tracing::warn!("ZAPIER_WEBHOOK_URL not set, Zapier forwarding disabled");
        }

        Ok(Self {
            ledger: Arc::new(ReservationLedger::new(config.reservation_ttl)),
            processed_events: Arc::new(ProcessedEvents::new()),
            config: Arc::new(config),
            checker,
            stripe,
            zapier,
        })
    }

    /// Periodic cleanup of in-process bookkeeping
    pub fn sweep(&self) {
        let events = self.processed_events.sweep(PROCESSED_EVENT_RETENTION);
        let reservations = self.ledger.purge_expired();
        if events > 0 || reservations > 0 {
            tracing::info!(events, reservations, "Swept expired webhook ids and reservations");
        }
    }
}

/// One outbound client for Stripe, Airtable and Zapier
fn build_http_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .user_agent(concat!("pickup-server/", env!("CARGO_PKG_VERSION")))
        .build()
}
