use crate::catalog::Catalog;
use crate::datastore::Client;
use crate::report;
use crate::share::ShareState;
use crate::types::{Dataset, DatasetInfo};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

const INDEX_HTML: &str = include_str!("index.html");

pub struct App {
    pub client: Client,
    pub catalog: Mutex<Catalog>,
    pub search_limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

pub async fn run(app: Arc<App>, addr: SocketAddr) {
    info!("Serving dashboard on http://{}", addr);
    warp::serve(routes(app).with(warp::log("how_rare::web")))
        .run(addr)
        .await;
}

pub fn routes(
    app: Arc<App>,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let with_app = warp::any().map(move || app.clone());

    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(INDEX_HTML));
    let report = warp::get()
        .and(warp::path!("api" / "report"))
        .and(raw_query())
        .and(with_app.clone())
        .and_then(handle_report);
    let vehicles = warp::get()
        .and(warp::path!("api" / "vehicles"))
        .and(warp::query::<SearchParams>())
        .and(with_app)
        .and_then(handle_search);
    let datasets = warp::get().and(warp::path!("api" / "datasets")).map(|| {
        let infos: Vec<DatasetInfo> = Dataset::ALL.iter().rev().map(|&d| DatasetInfo::from(d)).collect();
        warp::reply::json(&infos)
    });

    index
        .or(report)
        .or(vehicles)
        .or(datasets)
        .recover(handle_rejection)
}

/// The query string as-is, empty when absent. Share links are parsed
/// leniently so a repeated key never turns into a non-JSON rejection.
fn raw_query() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
}

async fn handle_report(query: String, app: Arc<App>) -> Result<WithStatus<Json>, Infallible> {
    let state = ShareState::from_query(&query);
    match report::build(&app.client, &state).await {
        Ok(report) => Ok(warp::reply::with_status(
            warp::reply::json(&report),
            StatusCode::OK,
        )),
        Err(e) => Ok(error_reply(StatusCode::BAD_REQUEST, &e.to_string())),
    }
}

async fn handle_search(
    params: SearchParams,
    app: Arc<App>,
) -> Result<WithStatus<Json>, Infallible> {
    let term = params.q.unwrap_or_default();
    let result = app.catalog.lock().await.search(&term, app.search_limit);
    match result {
        Ok(vehicles) => Ok(warp::reply::with_status(
            warp::reply::json(&vehicles),
            StatusCode::OK,
        )),
        Err(e) => {
            error!("Error searching catalog for {:?}: {}", term, e);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Vehicle search failed",
            ))
        }
    }
}

async fn handle_rejection(err: warp::Rejection) -> Result<WithStatus<Json>, Infallible> {
    if err.is_not_found() {
        Ok(error_reply(StatusCode::NOT_FOUND, "Route not found"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid query string"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        Ok(error_reply(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        ))
    } else {
        error!("Unhandled rejection: {:?}", err);
        Ok(error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        ))
    }
}

fn error_reply(status: StatusCode, message: &str) -> WithStatus<Json> {
    warp::reply::with_status(
        warp::reply::json(&json!({ "status": "error", "message": message })),
        status,
    )
}
