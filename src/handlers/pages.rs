use axum::Json;

use crate::models::StaticPage;

#[utoipa::path(
    get,
    path = "/pages/about/",
    responses((status = 200, description = "About the project", body = StaticPage))
)]
pub async fn about() -> Json<StaticPage> {
    Json(StaticPage {
        title: "About".to_string(),
        body: "Blogicum is a place to publish posts about whatever matters to you, \
               grouped by category and location."
            .to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/pages/rules/",
    responses((status = 200, description = "Community rules", body = StaticPage))
)]
pub async fn rules() -> Json<StaticPage> {
    Json(StaticPage {
        title: "Rules".to_string(),
        body: "Be polite. Post only what you have the right to publish. \
               Comments that break these rules are removed."
            .to_string(),
    })
}
