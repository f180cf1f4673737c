//! `axum` HTTP facade (spec §6.1), generalising the teacher's single
//! `/v1/schedule/solve` route to the full invocation surface. Thin: every
//! handler parses its request, delegates to the library-level functions in
//! [`crate`], and maps [`SchedulerError`] to a status code.

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, trace};
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintInfo;
use crate::domain::{Assignment, ComparisonReport, MetricScore, Problem, SolveOutcome};
use crate::error::SchedulerError;

impl From<SchedulerError> for (StatusCode, String) {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::ParseError { .. }
            | SchedulerError::UnknownSolver(_)
            | SchedulerError::UnknownConstraint(_)
            | SchedulerError::InvalidAssignment(_) => StatusCode::BAD_REQUEST,
            SchedulerError::BackendError(_) | SchedulerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, err.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseProblemRequest {
    instance_text: String,
    #[serde(default = "default_instance_name")]
    name: String,
}

fn default_instance_name() -> String {
    "instance".to_string()
}

#[derive(Debug, Serialize)]
struct SolverName {
    name: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolveRequest {
    problem: Problem,
    solver: String,
    #[serde(default)]
    active_constraints: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateRequest {
    problem: Problem,
    assignment: Assignment,
    #[serde(default)]
    active_constraints: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareRequest {
    problem: Problem,
    solver_a: String,
    solver_b: String,
    #[serde(default)]
    active_constraints: Vec<String>,
}

async fn parse_problem_handler(
    Json(req): Json<ParseProblemRequest>,
) -> Result<Json<Problem>, (StatusCode, String)> {
    let problem = crate::ingest::parse_problem(&req.instance_text, req.name)?;
    Ok(Json(problem))
}

async fn list_solvers_handler() -> Json<Vec<SolverName>> {
    Json(crate::factory::list_solvers().into_iter().map(|name| SolverName { name }).collect())
}

async fn list_constraints_handler() -> Json<Vec<ConstraintInfo>> {
    Json(crate::constraints::list_constraints())
}

async fn solve_handler(Json(req): Json<SolveRequest>) -> Result<Json<SolveOutcome>, (StatusCode, String)> {
    trace!("solve request for solver {}", req.solver);
    let outcome =
        tokio::task::spawn_blocking(move || crate::solve(&req.problem, &req.solver, &req.active_constraints))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("solver task panicked: {e}")))??;
    Ok(Json(outcome))
}

async fn evaluate_handler(Json(req): Json<EvaluateRequest>) -> Result<Json<Vec<MetricScore>>, (StatusCode, String)> {
    let scores = crate::evaluate(&req.problem, &req.assignment, &req.active_constraints)?;
    Ok(Json(scores))
}

async fn compare_handler(Json(req): Json<CompareRequest>) -> Result<Json<ComparisonReport>, (StatusCode, String)> {
    info!("comparing {} vs {}", req.solver_a, req.solver_b);
    let report = tokio::task::spawn_blocking(move || {
        crate::compare(&req.problem, &req.solver_a, &req.solver_b, &req.active_constraints)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("compare task panicked: {e}")))??;
    Ok(Json(report))
}

fn build_router() -> Router {
    Router::new()
        .route("/v1/problems", post(parse_problem_handler))
        .route("/v1/solvers", get(list_solvers_handler))
        .route("/v1/constraints", get(list_constraints_handler))
        .route("/v1/solve", post(solve_handler))
        .route("/v1/evaluate", post(evaluate_handler))
        .route("/v1/compare", post(compare_handler))
}

pub async fn run_server(addr: &str) {
    let app = build_router();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("server running at http://{}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn list_solvers_returns_every_registered_name() {
        let app = build_router();
        let response = app
            .oneshot(Request::builder().uri("/v1/solvers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn problems_route_rejects_malformed_instance_text() {
        let app = build_router();
        let body = serde_json::json!({ "instanceText": "not a valid instance" });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/problems")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
