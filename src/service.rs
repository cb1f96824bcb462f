use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::analytics::{hotspots, AnalyticsSummary, GroupPatterns, Hotspots};
use crate::dataset::{load_trips_csv, sample_trips};
use crate::error::PredictorError;
use crate::forest::ForestParams;
use crate::model::{parse_arrival_time, TrainedModel};
use crate::types::{PlanOut, PredictRequest, TrainOut, TripRecord};

pub type ApiError = (StatusCode, Json<Value>);

// ---------- Server state ----------

/// The model is published behind a lock and handed out as `Arc` snapshots, so
/// predictions never hold the lock while computing and a retrain only blocks
/// readers for the pointer swap.
#[derive(Clone)]
pub struct AppState {
    model: Arc<RwLock<Option<Arc<TrainedModel>>>>,
    trips: Arc<RwLock<Arc<Vec<TripRecord>>>>,
    train_lock: Arc<Mutex<()>>,
    params: ForestParams,
    hotspots_top_n: usize,
    /// Server-side corpus location; the bundled sample when unset.
    trips_path: Option<String>,
}

impl AppState {
    pub fn new(params: ForestParams, hotspots_top_n: usize) -> Self {
        Self {
            model: Arc::new(RwLock::new(None)),
            trips: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            train_lock: Arc::new(Mutex::new(())),
            params,
            hotspots_top_n,
            trips_path: None,
        }
    }

    pub fn with_trips_path(mut self, trips_path: Option<String>) -> Self {
        self.trips_path = trips_path;
        self
    }

    /// Read the configured training corpus. Only the operator picks the file.
    pub fn load_corpus(&self) -> anyhow::Result<Vec<TripRecord>> {
        match &self.trips_path {
            Some(path) => load_trips_csv(path),
            None => {
                let trips = sample_trips()?;
                tracing::warn!("TRIPS_PATH not set; training on the bundled {}-trip sample", trips.len());
                Ok(trips)
            }
        }
    }

    pub fn model(&self) -> Option<Arc<TrainedModel>> {
        self.model.read().clone()
    }

    pub fn trips(&self) -> Arc<Vec<TripRecord>> {
        self.trips.read().clone()
    }

    /// Fit a model on `trips` and publish it together with the corpus.
    /// Concurrent calls are serialized; in-flight predictions keep their snapshot.
    pub fn retrain(&self, trips: Vec<TripRecord>) -> Result<Arc<TrainedModel>, PredictorError> {
        let _guard = self.train_lock.lock();
        let model = Arc::new(TrainedModel::fit(&trips, &self.params)?);
        *self.trips.write() = Arc::new(trips);
        *self.model.write() = Some(model.clone());
        Ok(model)
    }
}

fn error_response(err: &PredictorError) -> ApiError {
    let status = match err {
        PredictorError::Untrained => StatusCode::SERVICE_UNAVAILABLE,
        PredictorError::TimeParse(_)
        | PredictorError::InvalidGroupSize(_)
        | PredictorError::DepartureOutOfRange(_)
        | PredictorError::EmptyCorpus
        | PredictorError::Dataset { .. } => StatusCode::BAD_REQUEST,
        PredictorError::Forest(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

// ---------- Handlers ----------

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let model = state.model();
    Json(json!({
        "status": "ok",
        "trained": model.is_some(),
        "trips": model.map(|m| m.trained_on()).unwrap_or(0),
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PlanOut>, ApiError> {
    let model = state
        .model()
        .ok_or_else(|| error_response(&PredictorError::Untrained))?;
    let time = parse_arrival_time(&req.arrival_time).map_err(|e| error_response(&e))?;
    let date = req.date.unwrap_or_else(|| Local::now().date_naive());

    let plan = model
        .plan(&req.pickup, &req.dropoff, date.and_time(time), req.group_size)
        .map_err(|e| error_response(&e))?;

    if std::env::var("LOG_PRED").ok().as_deref() == Some("1") {
        tracing::info!(
            "predict pickup={:?}({}) dropoff={:?}({}) arrival={} {} group={} travel={:.1} buffer={} depart={}",
            req.pickup,
            plan.pickup_zone,
            req.dropoff,
            plan.dropoff_zone,
            date,
            time,
            req.group_size,
            plan.predicted_minutes,
            plan.buffer_minutes,
            plan.departure_time()
        );
    }

    Ok(Json(PlanOut::from(&plan)))
}

/// Retrain from the configured corpus, picking up any changes to the file.
pub async fn train(State(state): State<AppState>) -> Result<Json<TrainOut>, ApiError> {
    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Arc<TrainedModel>, ApiError> {
        let trips = worker.load_corpus().map_err(|e| internal(format!("{:#}", e)))?;
        worker.retrain(trips).map_err(|e| error_response(&e))
    })
    .await
    .map_err(internal)?;

    let model = result?;
    tracing::info!("retrained model on {} trips", model.trained_on());
    Ok(Json(TrainOut {
        trips: model.trained_on(),
        zones: model.encoder().zones(),
        trained_at: model.trained_at(),
    }))
}

pub async fn analytics(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(AnalyticsSummary::from_trips(&state.trips()))
}

pub async fn patterns(State(state): State<AppState>) -> Json<GroupPatterns> {
    Json(GroupPatterns::from_trips(&state.trips()))
}

#[derive(Debug, Deserialize)]
pub struct HotspotsQuery {
    pub top_n: Option<usize>,
}

pub async fn top_hotspots(
    State(state): State<AppState>,
    Query(q): Query<HotspotsQuery>,
) -> Json<Hotspots> {
    let top_n = q.top_n.unwrap_or(state.hotspots_top_n);
    Json(hotspots(&state.trips(), top_n))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/train", post(train))
        .route("/analytics", get(analytics))
        .route("/patterns", get(patterns))
        .route("/hotspots", get(top_hotspots))
        .with_state(state)
}
