use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use mealplan_core::PlanError;
use mealplan_core::models::{IngredientSummary, RecipeSummary, SavedPlan};
use mealplan_core::planner::PlanRequest;
use mealplan_core::service::{PlanView, PlannerSession};

use crate::commands::make_rng;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<PlannerSession>>,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    fn new(session: PlannerSession, rng: StdRng) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    fn session(&self) -> MutexGuard<'_, PlannerSession> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RecipeQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct PlanBody {
    #[serde(flatten)]
    request: PlanRequest,
    /// Fixes the tie-breaking noise for this one request.
    seed: Option<u64>,
}

#[derive(Serialize)]
struct SavedPlanResponse {
    index: usize,
    #[serde(flatten)]
    plan: SavedPlan,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NothingToSave => Self::Conflict(err.to_string()),
            PlanError::UnknownRecipe(_) | PlanError::UnknownSavedPlan(_) => {
                Self::BadRequest(err.to_string())
            }
            PlanError::InvalidPlanSize
            | PlanError::PlanSizeOutOfRange { .. }
            | PlanError::InsufficientRecipes { .. } => Self::Unprocessable(err.to_string()),
        }
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Json<Vec<RecipeSummary>> {
    let session = state.session();
    let recipes = session
        .search(&query.q)
        .into_iter()
        .map(|row| session.dataset().recipe_summary(row))
        .collect();
    Json(recipes)
}

async fn list_ingredients(State(state): State<AppState>) -> Json<Vec<IngredientSummary>> {
    Json(state.session().dataset().ingredient_summaries())
}

async fn build_plan(
    State(state): State<AppState>,
    Json(body): Json<PlanBody>,
) -> Result<Json<PlanView>, ApiError> {
    let mut session = state.session();
    let view = if let Some(seed) = body.seed {
        session.submit(&body.request, &mut StdRng::seed_from_u64(seed))?
    } else {
        let mut rng = state
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        session.submit(&body.request, &mut *rng)?
    };
    Ok(Json(view))
}

async fn save_plan(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SavedPlanResponse>), ApiError> {
    let mut session = state.session();
    let plan = session.save_current_plan()?.clone();
    let index = session.saved_plans().len() - 1;
    Ok((StatusCode::CREATED, Json(SavedPlanResponse { index, plan })))
}

async fn list_saved_plans(State(state): State<AppState>) -> Json<Vec<SavedPlan>> {
    Json(state.session().saved_plans().to_vec())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes))
        .route("/api/ingredients", get(list_ingredients))
        .route("/api/plan", post(build_plan))
        .route("/api/plans", get(list_saved_plans))
        .route("/api/plans/save", post(save_plan))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    session: PlannerSession,
    port: u16,
    bind: &str,
    rng_seed: Option<u64>,
) -> anyhow::Result<()> {
    let recipes = session.table().len();
    let app = build_router(AppState::new(session, make_rng(rng_seed)));

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(recipes, %bind, port, "Server started");
    eprintln!("Serving {recipes} recipes");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const CSV: &str = "\
Recipe Name,Cuisine,Ingredients: Produce,Ingredients: Pantry
Garlic Pasta,Italian,\"Garlic, Basil, Tomato\",\"Spaghetti, Olive Oil\"
Caprese Salad,Italian,\"Tomato, Basil\",Olive Oil
Bruschetta,Italian,\"Tomato, Garlic, Basil\",\"Bread, Olive Oil\"
Pancakes,American,,\"Flour, Sugar, Eggs, Milk\"
";

    fn test_app() -> Router {
        let session = PlannerSession::from_csv(CSV.as_bytes()).unwrap();
        build_router(AppState::new(session, StdRng::seed_from_u64(0)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, json: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_recipes_returns_all() {
        let response = test_app()
            .oneshot(
                axum::http::Request::get("/api/recipes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 4);
        assert_eq!(json[0]["name"], "Garlic Pasta");
        assert_eq!(json[0]["metadata"]["Cuisine"], "Italian");
    }

    #[tokio::test]
    async fn search_recipes_by_ingredient() {
        let response = test_app()
            .oneshot(
                axum::http::Request::get("/api/recipes?q=olive%20oil")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Garlic Pasta", "Caprese Salad", "Bruschetta"]);
    }

    #[tokio::test]
    async fn list_ingredients_with_types() {
        let response = test_app()
            .oneshot(
                axum::http::Request::get("/api/ingredients")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        let basil = json
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["token"] == "basil")
            .unwrap();
        assert_eq!(basil["ingredient_type"], "Produce");
        assert_eq!(basil["recipes"], 3);
    }

    #[tokio::test]
    async fn plan_with_seed_is_deterministic() {
        let body = serde_json::json!({
            "recipes_per_meal_plan": 3,
            "seed_recipes": ["Caprese Salad"],
            "seed": 42
        });

        let first = body_json(test_app().oneshot(post_json("/api/plan", &body)).await.unwrap()).await;
        let second = body_json(test_app().oneshot(post_json("/api/plan", &body)).await.unwrap()).await;

        assert_eq!(first["status"], "planned");
        assert_eq!(first["plan"]["recipe_names"].as_array().unwrap().len(), 3);
        assert_eq!(first["plan"]["source"], "search");
        assert!(first["chart"]["cells"].is_array());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn plan_without_seeds_reports_no_selection() {
        let body = serde_json::json!({ "recipes_per_meal_plan": 3 });
        let response = test_app()
            .oneshot(post_json("/api/plan", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "no_selection");
        assert!(json.get("chart").is_none());
    }

    #[tokio::test]
    async fn plan_too_large_is_unprocessable() {
        let body = serde_json::json!({
            "recipes_per_meal_plan": 9,
            "seed_recipes": ["Pancakes"]
        });
        let response = test_app()
            .oneshot(post_json("/api/plan", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(
            json["error"],
            "Not enough recipes: requested 9, but the dataset only has 4"
        );
    }

    #[tokio::test]
    async fn plan_size_zero_is_unprocessable() {
        let body = serde_json::json!({
            "recipes_per_meal_plan": 0,
            "seed_recipes": ["Pancakes"]
        });
        let response = test_app()
            .oneshot(post_json("/api/plan", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn saved_plan_is_returned_verbatim() {
        let body = serde_json::json!({
            "recipes_per_meal_plan": 2,
            "seed_recipes": ["Pancakes"],
            "saved_meal_plan": ["Bruschetta", "Garlic Pasta"]
        });
        let json = body_json(test_app().oneshot(post_json("/api/plan", &body)).await.unwrap()).await;

        assert_eq!(json["plan"]["source"], "saved");
        assert_eq!(
            json["plan"]["recipe_names"],
            serde_json::json!(["Garlic Pasta", "Bruschetta"])
        );
    }

    #[tokio::test]
    async fn save_without_plan_conflicts() {
        let response = test_app()
            .oneshot(
                axum::http::Request::post("/api/plans/save")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No meal plan to save yet");
    }

    #[tokio::test]
    async fn save_then_list_plans() {
        let app = test_app();
        let body = serde_json::json!({
            "recipes_per_meal_plan": 2,
            "seed_recipes": ["Caprese Salad", "Pancakes"]
        });
        let planned = body_json(app.clone().oneshot(post_json("/api/plan", &body)).await.unwrap()).await;
        assert_eq!(planned["plan"]["source"], "seeds");

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::post("/api/plans/save")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved = body_json(response).await;
        assert_eq!(saved["index"], 0);
        assert_eq!(saved["label"], "Caprese Salad, Pancakes");

        let response = app
            .oneshot(
                axum::http::Request::get("/api/plans")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let plans = body_json(response).await;
        assert_eq!(plans.as_array().unwrap().len(), 1);
        assert_eq!(
            plans[0]["recipe_names"],
            serde_json::json!(["Caprese Salad", "Pancakes"])
        );
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let padding = "x".repeat(BODY_LIMIT + 1);
        let body = serde_json::json!({
            "recipes_per_meal_plan": 2,
            "seed_recipes": [padding]
        });
        let response = test_app()
            .oneshot(post_json("/api/plan", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let response = test_app()
            .oneshot(
                axum::http::Request::get("/api/plans")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[test]
    fn plan_errors_map_to_status() {
        let status = |err: PlanError| ApiError::from(err).into_response().status();
        assert_eq!(status(PlanError::NothingToSave), StatusCode::CONFLICT);
        assert_eq!(status(PlanError::InvalidPlanSize), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status(PlanError::UnknownRecipe("Soup".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PlanError::PlanSizeOutOfRange { size: 9, min: 3, max: 7 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(PlanError::UnknownSavedPlan(4)), StatusCode::BAD_REQUEST);
    }
}
