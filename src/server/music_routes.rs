//! Music search and subscription routes

use crate::catalog::{CatalogError, SearchCriteria, Subscriptions};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::metrics::record_error;
use super::session::Session;
use super::state::{GuardedCatalogService, ServerState};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct MessageBody {
    message: &'static str,
}

const NO_SUBSCRIPTIONS_MESSAGE: &str = "No music subscribed";

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            CatalogError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            CatalogError::InvalidCriteria => (StatusCode::BAD_REQUEST, "invalid_criteria"),
            CatalogError::StoreUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable")
            }
            CatalogError::MalformedRecord(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "malformed_record")
            }
            CatalogError::ItemNotFound(_) => (StatusCode::NOT_FOUND, "item_not_found"),
            CatalogError::NotSubscribed(_) => (StatusCode::NOT_FOUND, "not_subscribed"),
        };
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        record_error(kind, status.as_u16());
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Raw query string. Blank fields, whitespace-only included, are treated as absent.
#[derive(Deserialize, Debug, Default)]
struct SearchQuery {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
}

impl SearchQuery {
    fn into_criteria(self) -> Result<SearchCriteria, String> {
        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("year must be an integer, got '{}'", raw))?,
            ),
        };
        Ok(SearchCriteria {
            title: self.title,
            artist: self.artist,
            album: self.album,
            year,
        })
    }
}

async fn search(
    _session: Session,
    State(catalog): State<GuardedCatalogService>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let criteria = match query.into_criteria() {
        Ok(criteria) => criteria,
        Err(error) => return (StatusCode::BAD_REQUEST, Json(ErrorBody { error })).into_response(),
    };
    match catalog.search(&criteria).await {
        Ok(items) => Json(items).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_subscriptions(
    session: Session,
    State(catalog): State<GuardedCatalogService>,
) -> Response {
    match catalog.list_subscriptions(&session.principal_id).await {
        Ok(Subscriptions::NoSubscriptions) => Json(MessageBody {
            message: NO_SUBSCRIPTIONS_MESSAGE,
        })
        .into_response(),
        Ok(Subscriptions::Items(items)) => Json(items).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn subscribe(
    session: Session,
    State(catalog): State<GuardedCatalogService>,
    Path(id): Path<String>,
) -> Response {
    match catalog.subscribe(&session.principal_id, &id).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn unsubscribe(
    session: Session,
    State(catalog): State<GuardedCatalogService>,
    Path(id): Path<String>,
) -> Response {
    match catalog.unsubscribe(&session.principal_id, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn make_music_routes(state: ServerState) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/{id}", post(subscribe).delete(unsubscribe))
        .with_state(state)
}
