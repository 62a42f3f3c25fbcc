//! The HTTP/JSON surface of the ledger.
//!
//! The server runs on its own thread with a tokio runtime. Handlers never touch the [`Context`]:
//! each request is forwarded over a channel to the thread that owns it, which executes requests
//! one at a time in [`ContextWebApiExt::run_web_api`] and answers on a oneshot channel.
//!
//! | Route                | Methods             |
//! |----------------------|---------------------|
//! | `/survivors`         | `GET`, `POST`       |
//! | `/survivors/{id}`    | `GET`, `PATCH`, `DELETE` |
//! | `/survivors/trade`   | `POST`              |
//! | `/survivors/record`  | `GET`               |
//! | `/reports`           | `GET`, `POST`       |
//! | `/reports/{id}`      | `GET`               |
//! | `/inventories`       | `GET`               |
//! | `/inventories/{id}`  | `GET`               |
//!
//! Other methods on these routes answer 405 (`method_not_allowed`) and unknown paths answer 404
//! (`not_found`). Errors are returned as `{"error": <kind>, "message": <text>}`.
use std::net::SocketAddr;
use std::thread;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::context::Context;
use crate::error::ZssnError;
use crate::fleet::ContextFleetExt;
use crate::infection::{ContextInfectionExt, NewReport, ReportId};
use crate::inventory::{ContextInventoryExt, Inventory, InventoryId};
use crate::ledger::ContextLedgerExt;
use crate::survivors::{ContextSurvivorsExt, Location, NewSurvivor, Survivor, SurvivorId};
use crate::trade::{ContextTradeExt, TradeRequest};
use crate::{debug, define_data_plugin, error, info};

// Requests waiting for the context owner.
const REQUEST_QUEUE_DEPTH: usize = 32;

define_data_plugin!(ApiPlugin, Option<mpsc::Receiver<ApiRequest>>, None);

/// What a request asks the context owner to do.
#[derive(Debug)]
enum Endpoint {
    ListSurvivors,
    CreateSurvivor(Value),
    GetSurvivor(String),
    UpdateLocation(String, Value),
    RemoveSurvivor(String),
    Trade(Value),
    FleetReport,
    ListReports,
    CreateReport(Value),
    GetReport(String),
    ListInventories,
    GetInventory(String),
    /// A body that could not be read as JSON.
    Malformed(String),
}

// Input to the context owner.
struct ApiRequest {
    endpoint: Endpoint,
    rx: oneshot::Sender<ApiResponse>,
}

// Output of the context owner.
struct ApiResponse {
    status: StatusCode,
    body: Option<Value>,
}

impl ApiResponse {
    fn json<T: Serialize>(status: StatusCode, body: &T) -> Result<ApiResponse, ZssnError> {
        Ok(ApiResponse {
            status,
            body: Some(serde_json::to_value(body)?),
        })
    }

    fn error(err: &ZssnError) -> ApiResponse {
        let status = match err {
            ZssnError::NotFound { .. } => StatusCode::NOT_FOUND,
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiResponse::rejection(status, err.kind(), &err.to_string())
    }

    fn rejection(status: StatusCode, kind: &str, message: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: Some(json!({
                "error": kind,
                "message": message,
            })),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// A survivor together with its inventory.
#[derive(Serialize)]
struct SurvivorView<'a> {
    #[serde(flatten)]
    survivor: &'a Survivor,
    inventory: Option<&'a Inventory>,
}

fn survivor_view<'a>(context: &'a Context, survivor: &'a Survivor) -> SurvivorView<'a> {
    SurvivorView {
        survivor,
        inventory: context.ledger().inventory(survivor.inventory),
    }
}

fn parse_id(raw: &str) -> Result<usize, ZssnError> {
    raw.parse()
        .map_err(|_| ZssnError::ValidationError(format!("{raw:?} is not a valid id")))
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ZssnError> {
    serde_json::from_value(body).map_err(|err| ZssnError::ValidationError(err.to_string()))
}

fn dispatch(context: &mut Context, endpoint: Endpoint) -> Result<ApiResponse, ZssnError> {
    match endpoint {
        Endpoint::ListSurvivors => {
            let context = &*context;
            let survivors = context.list_survivors();
            let views: Vec<SurvivorView> = survivors
                .iter()
                .map(|survivor| survivor_view(context, survivor))
                .collect();
            ApiResponse::json(StatusCode::OK, &views)
        }
        Endpoint::CreateSurvivor(body) => {
            let registration: NewSurvivor = parse_body(body)?;
            let (survivor, _) = context.register_survivor(registration)?;
            ApiResponse::json(StatusCode::CREATED, &survivor_view(context, &survivor))
        }
        Endpoint::GetSurvivor(raw) => {
            let survivor = context.get_survivor(SurvivorId::new(parse_id(&raw)?))?;
            ApiResponse::json(StatusCode::OK, &survivor_view(context, &survivor))
        }
        Endpoint::UpdateLocation(raw, body) => {
            let id = SurvivorId::new(parse_id(&raw)?);
            let location: Location = parse_body(body)?;
            let survivor = context.update_location(id, location)?;
            ApiResponse::json(StatusCode::OK, &survivor_view(context, &survivor))
        }
        Endpoint::RemoveSurvivor(raw) => {
            context.remove_survivor(SurvivorId::new(parse_id(&raw)?))?;
            Ok(ApiResponse {
                status: StatusCode::NO_CONTENT,
                body: None,
            })
        }
        Endpoint::Trade(body) => {
            let request: TradeRequest = parse_body(body)?;
            let (first, second) = context.execute_trade(request)?;
            ApiResponse::json(StatusCode::OK, &[first, second])
        }
        Endpoint::FleetReport => ApiResponse::json(StatusCode::OK, &context.compute_fleet_report()?),
        Endpoint::ListReports => ApiResponse::json(StatusCode::OK, &context.list_reports()),
        Endpoint::CreateReport(body) => {
            let report: NewReport = parse_body(body)?;
            let filed = context.register_report(report)?;
            ApiResponse::json(StatusCode::CREATED, &filed.report)
        }
        Endpoint::GetReport(raw) => {
            let report = context.get_report(ReportId::new(parse_id(&raw)?))?;
            ApiResponse::json(StatusCode::OK, &report)
        }
        Endpoint::ListInventories => {
            ApiResponse::json(StatusCode::OK, &context.list_inventories())
        }
        Endpoint::GetInventory(raw) => {
            let inventory = context.get_inventory(InventoryId::new(parse_id(&raw)?))?;
            ApiResponse::json(StatusCode::OK, &inventory)
        }
        Endpoint::Malformed(reason) => Err(ZssnError::ValidationError(reason)),
    }
}

fn handle_request(context: &mut Context, endpoint: Endpoint) -> ApiResponse {
    debug!("Handling {endpoint:?}");
    match dispatch(context, endpoint) {
        Ok(response) => response,
        Err(err) => {
            if !err.is_client_error() {
                error!("Request failed: {err}");
            }
            ApiResponse::error(&err)
        }
    }
}

#[derive(Clone)]
struct ApiEndpointServer {
    sender: mpsc::Sender<ApiRequest>,
}

async fn forward(state: &ApiEndpointServer, endpoint: Endpoint) -> ApiResponse {
    let (tx, rx) = oneshot::channel::<ApiResponse>();
    if state
        .sender
        .send(ApiRequest { endpoint, rx: tx })
        .await
        .is_err()
    {
        return ApiResponse::error(&ZssnError::from("the ledger is not accepting requests"));
    }
    match rx.await {
        Ok(response) => response,
        Err(_) => ApiResponse::error(&ZssnError::from("the ledger dropped the request")),
    }
}

fn body_or_malformed(
    body: Result<Json<Value>, JsonRejection>,
    endpoint: impl FnOnce(Value) -> Endpoint,
) -> Endpoint {
    match body {
        Ok(Json(body)) => endpoint(body),
        Err(rejection) => Endpoint::Malformed(rejection.body_text()),
    }
}

async fn list_survivors(State(state): State<ApiEndpointServer>) -> ApiResponse {
    forward(&state, Endpoint::ListSurvivors).await
}

async fn create_survivor(
    State(state): State<ApiEndpointServer>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    forward(&state, body_or_malformed(body, Endpoint::CreateSurvivor)).await
}

async fn get_survivor(
    State(state): State<ApiEndpointServer>,
    Path(id): Path<String>,
) -> ApiResponse {
    forward(&state, Endpoint::GetSurvivor(id)).await
}

async fn update_location(
    State(state): State<ApiEndpointServer>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let endpoint = body_or_malformed(body, |body| Endpoint::UpdateLocation(id, body));
    forward(&state, endpoint).await
}

async fn remove_survivor(
    State(state): State<ApiEndpointServer>,
    Path(id): Path<String>,
) -> ApiResponse {
    forward(&state, Endpoint::RemoveSurvivor(id)).await
}

async fn trade(
    State(state): State<ApiEndpointServer>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    forward(&state, body_or_malformed(body, Endpoint::Trade)).await
}

async fn fleet_report(State(state): State<ApiEndpointServer>) -> ApiResponse {
    forward(&state, Endpoint::FleetReport).await
}

async fn list_reports(State(state): State<ApiEndpointServer>) -> ApiResponse {
    forward(&state, Endpoint::ListReports).await
}

async fn create_report(
    State(state): State<ApiEndpointServer>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    forward(&state, body_or_malformed(body, Endpoint::CreateReport)).await
}

async fn get_report(
    State(state): State<ApiEndpointServer>,
    Path(id): Path<String>,
) -> ApiResponse {
    forward(&state, Endpoint::GetReport(id)).await
}

async fn list_inventories(State(state): State<ApiEndpointServer>) -> ApiResponse {
    forward(&state, Endpoint::ListInventories).await
}

async fn get_inventory(
    State(state): State<ApiEndpointServer>,
    Path(id): Path<String>,
) -> ApiResponse {
    forward(&state, Endpoint::GetInventory(id)).await
}

// Answered on the server thread; these never reach the context owner.
async fn method_not_allowed(method: Method, uri: Uri) -> ApiResponse {
    ApiResponse::rejection(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        &format!("Method \"{method}\" not allowed on {}", uri.path()),
    )
}

async fn unknown_route(uri: Uri) -> ApiResponse {
    ApiResponse::rejection(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("No route for {}", uri.path()),
    )
}

fn router(state: ApiEndpointServer) -> Router {
    Router::new()
        .route("/survivors", get(list_survivors).post(create_survivor))
        .route("/survivors/trade", post(trade))
        .route("/survivors/record", get(fleet_report))
        .route(
            "/survivors/{id}",
            get(get_survivor)
                .patch(update_location)
                .delete(remove_survivor),
        )
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/{id}", get(get_report))
        .route("/inventories", get(list_inventories))
        .route("/inventories/{id}", get(get_inventory))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(unknown_route)
        .with_state(state)
}

#[tokio::main]
async fn serve(
    sender: mpsc::Sender<ApiRequest>,
    addr: SocketAddr,
    ready: std::sync::mpsc::Sender<Result<SocketAddr, ZssnError>>,
) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            let _ = ready.send(Err(ZssnError::ZssnError(format!(
                "Could not bind to {addr}: {err}"
            ))));
            return;
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(local_addr) => local_addr,
        Err(err) => {
            let _ = ready.send(Err(err.into()));
            return;
        }
    };

    let app = router(ApiEndpointServer { sender });

    // Notify the caller that we are ready.
    let _ = ready.send(Ok(local_addr));
    info!("Listening on http://{local_addr}");
    if let Err(err) = axum::serve(listener, app).await {
        error!("Web API server stopped: {err}");
    }
}

pub trait ContextWebApiExt {
    /// Starts the web server on `addr` and returns the address it is bound to, which differs
    /// from `addr` when port 0 was requested. Requests queue up until
    /// [`ContextWebApiExt::run_web_api`] is called.
    ///
    /// # Errors
    /// Returns a `ZssnError` if the API is already set up or the address cannot be bound.
    fn setup_web_api(&mut self, addr: SocketAddr) -> Result<SocketAddr, ZssnError>;

    /// Executes requests from the web server until it stops.
    ///
    /// # Errors
    /// Returns a `ZssnError` if [`ContextWebApiExt::setup_web_api`] was not called.
    fn run_web_api(&mut self) -> Result<(), ZssnError>;
}

impl ContextWebApiExt for Context {
    fn setup_web_api(&mut self, addr: SocketAddr) -> Result<SocketAddr, ZssnError> {
        if self.get_data(ApiPlugin).is_some_and(Option::is_some) {
            return Err(ZssnError::ZssnError(String::from(
                "HTTP API already initialized",
            )));
        }
        let (api_to_ctx_send, api_to_ctx_recv) = mpsc::channel::<ApiRequest>(REQUEST_QUEUE_DEPTH);

        // Start the API server
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<SocketAddr, ZssnError>>();
        thread::spawn(move || serve(api_to_ctx_send, addr, ready_tx));
        let local_addr = ready_rx
            .recv()
            .map_err(|_| ZssnError::from("web API thread exited before binding"))??;

        *self.get_data_mut(ApiPlugin) = Some(api_to_ctx_recv);
        Ok(local_addr)
    }

    fn run_web_api(&mut self) -> Result<(), ZssnError> {
        let mut receiver = self
            .get_data_mut(ApiPlugin)
            .take()
            .ok_or_else(|| ZssnError::from("HTTP API is not initialized"))?;

        while let Some(request) = receiver.blocking_recv() {
            let response = handle_request(self, request.endpoint);
            // The client may have gone away; there is nobody left to tell.
            let _ = request.rx.send(response);
        }
        info!("Web API closed");
        Ok(())
    }
}
