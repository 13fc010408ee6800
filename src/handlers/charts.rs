//! SVG 图表接口
//!
//! 查询参数与 /series 相同，额外支持 `range` 区间

use actix_web::{http::header, web, HttpResponse, Result};

use super::{bad_request, no_data, AppState};
use crate::models::{ApiResponse, VisualizeQuery};
use crate::services::chart::ChartKind;
use crate::services::report::{build_report, DashboardRequest};
use crate::utils::time::beijing_today;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

pub async fn get_chart(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<VisualizeQuery>,
) -> Result<HttpResponse> {
    let kind = match path.parse::<ChartKind>() {
        Ok(kind) => kind,
        Err(e) => return Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(e))),
    };
    let request = match DashboardRequest::from_query(&query, &state.config.data, beijing_today()) {
        Ok(request) => request,
        Err(e) => return Ok(bad_request(e)),
    };

    let report = build_report(&state.fetcher, &request).await;
    if report.is_empty() {
        return Ok(no_data(&report));
    }

    let visible = request.range.apply(&report.series);
    match state.charts.render(kind, &visible, report.normalized) {
        Ok(svg) => Ok(svg_response(svg)),
        Err(e) => {
            log::error!("图表渲染失败: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())))
        }
    }
}

/// 空页面上展示的示例图表
pub async fn get_example_chart(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.charts.example_chart() {
        Ok(svg) => Ok(svg_response(svg)),
        Err(e) => {
            log::error!("示例图表渲染失败: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())))
        }
    }
}

fn svg_response(svg: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(SVG_CONTENT_TYPE)
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(svg)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/charts")
            .route("/example.svg", web::get().to(get_example_chart))
            .route("/{kind}", web::get().to(get_chart)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::state;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    const QUERY: &str = "codes=600000,510300&start_date=2023-01-01&end_date=2023-12-31";

    #[actix_web::test]
    async fn test_chart_kinds() {
        let app = test::init_service(App::new().app_data(state()).configure(config)).await;

        for kind in ["price", "volume", "returns"] {
            let req = test::TestRequest::get()
                .uri(&format!("/charts/{}.svg?{}&range=1m", kind, QUERY))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", kind);
            assert_eq!(
                resp.headers().get(header::CONTENT_TYPE).unwrap(),
                SVG_CONTENT_TYPE
            );
            let body = test::read_body(resp).await;
            assert!(String::from_utf8_lossy(&body).contains("<svg"));
        }
    }

    #[actix_web::test]
    async fn test_example_chart() {
        let app = test::init_service(App::new().app_data(state()).configure(config)).await;
        let req = test::TestRequest::get().uri("/charts/example.svg").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_chart_errors() {
        let app = test::init_service(App::new().app_data(state()).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/charts/pie.svg?{}", QUERY))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri(&format!("/charts/price.svg?{}&range=2w", QUERY))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/charts/price.svg?codes=999999&start_date=2023-01-01&end_date=2023-12-31")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
