use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Result};

use super::{bad_request, no_data, AppState};
use crate::models::{ApiResponse, VisualizeQuery};
use crate::services::export::{export, ExportKind};
use crate::services::report::{build_report, DashboardRequest};
use crate::utils::time::{beijing_now, beijing_today};

/// 下载数据文件，文件名带代码和时间戳
pub async fn download(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<VisualizeQuery>,
) -> Result<HttpResponse> {
    let kind = match path.parse::<ExportKind>() {
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

    match export(kind, &report, beijing_now().naive_local()) {
        Ok(file) => {
            log::info!("生成下载文件: {} ({} 字节)", file.filename, file.body.len());
            Ok(HttpResponse::Ok()
                .content_type(file.content_type)
                .insert_header(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(file.filename)],
                })
                .body(file.body))
        }
        Err(e) => {
            log::error!("生成下载文件失败: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/export/{file}", web::get().to(download));
}
