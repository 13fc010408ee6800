//! JSON 数据接口
//!
//! - GET /series?codes=600000,510300 - 多只代码
//! - GET /series/{code} - 单只代码，其余参数相同

use actix_web::{web, HttpResponse, Result};

use super::{bad_request, no_data, AppState};
use crate::models::{ApiResponse, VisualizeQuery};
use crate::services::report::{build_report, DashboardRequest};
use crate::utils::time::beijing_today;

pub async fn get_series(
    state: web::Data<AppState>,
    query: web::Query<VisualizeQuery>,
) -> Result<HttpResponse> {
    let request = match DashboardRequest::from_query(&query, &state.config.data, beijing_today()) {
        Ok(request) => request,
        Err(e) => return Ok(bad_request(e)),
    };
    Ok(respond(&state, &request).await)
}

pub async fn get_single_series(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<VisualizeQuery>,
) -> Result<HttpResponse> {
    let code = path.into_inner();
    let request =
        match DashboardRequest::single(&code, &query, &state.config.data, beijing_today()) {
            Ok(request) => request,
            Err(e) => return Ok(bad_request(e)),
        };
    Ok(respond(&state, &request).await)
}

async fn respond(state: &AppState, request: &DashboardRequest) -> HttpResponse {
    let report = build_report(&state.fetcher, request).await;
    if report.is_empty() {
        return no_data(&report);
    }

    let mut warnings = request.warnings();
    warnings.extend(report.failure_messages());
    warnings.extend(report.warnings.iter().cloned());
    HttpResponse::Ok().json(ApiResponse::success(report).with_warnings(warnings))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/series")
            .route("", web::get().to(get_series))
            .route("/{code}", web::get().to(get_single_series)),
    );
}
