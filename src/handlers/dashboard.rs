use actix_web::{web, HttpResponse, Result};

use super::AppState;
use crate::models::VisualizeQuery;
use crate::services::dashboard::{render_page, DashboardState};
use crate::services::report::{build_report, DashboardRequest};
use crate::utils::time::beijing_today;
use crate::utils::validators::ValidationError;

/// 可视化页面
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<VisualizeQuery>,
) -> Result<HttpResponse> {
    let today = beijing_today();
    let page_state = match DashboardRequest::from_query(&query, &state.config.data, today) {
        Ok(request) => {
            let report = build_report(&state.fetcher, &request).await;
            if report.is_empty() {
                DashboardState::Empty {
                    failures: report.failure_messages(),
                    request,
                }
            } else {
                DashboardState::Ready { request, report }
            }
        }
        Err(ValidationError::EmptyInput) => DashboardState::Prompt { error: None },
        Err(e) => DashboardState::Prompt {
            error: Some(e.to_string()),
        },
    };

    let html = render_page(&page_state, &query, &state.config, today);
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
}
