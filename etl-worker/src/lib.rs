//! ETL worker - keeps park wait times and schedules in the shared store fresh.
//!
//! # Architecture
//!
//! ```text
//!   Scheduler (experiences every N s, schedules every M s)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       SyncOrchestrator                   │
//! │  - Visit each tracked park in order      │
//! │  - Skip parks with no data               │
//! └─────────────────────────────────────────┘
//!          ↓                    ↓
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │  ApiClient           │  │  Transformer         │
//! │  - Retry + backoff   │  │  - Experience sets   │
//! │  - TokenManager      │  │  - Park records      │
//! └──────────────────────┘  └──────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       ParkStore (atomic replace)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Wiring
//!
//! ```no_run
//! use etl_worker::clock::{SystemClock, TokioSleeper};
//! use etl_worker::{ApiClient, Scheduler, SyncOrchestrator, TokenManager};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use themepark_times::config::StoreConfig;
//! use themepark_times::ParkStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let http = reqwest::Client::new();
//! let tokens = Arc::new(TokenManager::new(
//!     http.clone(),
//!     "https://authorization.go.com/token".to_string(),
//!     "WDPRO-MOBILE.MDX.WDW.ANDROID-PROD".to_string(),
//!     Arc::new(SystemClock),
//! ));
//! let client = ApiClient::new(
//!     http,
//!     "https://api.wdpro.disney.go.com".to_string(),
//!     tokens,
//!     Arc::new(TokioSleeper),
//! );
//! let store = ParkStore::open(&StoreConfig::default())?;
//!
//! let orchestrator = SyncOrchestrator::new(Arc::new(client), Arc::new(store));
//! Scheduler::new(
//!     Arc::new(orchestrator),
//!     Duration::from_secs(60),
//!     Duration::from_secs(3600),
//! )
//! .run()
//! .await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod orchestrator;
pub mod scheduler;
pub mod token;
pub mod transformer;

pub use client::ApiClient;
pub use config::WorkerConfig;
pub use orchestrator::{CycleReport, RecordSink, SyncOrchestrator, UpstreamSource};
pub use scheduler::{JobRunner, Scheduler, SyncJob};
pub use token::{AccessToken, TokenManager};
