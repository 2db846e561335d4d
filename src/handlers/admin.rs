//! Back-office handlers. JSON in, JSON out.
//!
//! Every handler resolves the `AuthUser` and checks `is_staff` before touching
//! the repository.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    authorization::ensure_staff,
    error::{AppError, AppResult},
    forms::{CategoryForm, LocationForm, UserForm},
    models::{Category, Location, Post, PublicationUpdate, User},
    visibility::PostQuery,
};

// --- Users ---

/// create_user
///
/// [Admin Route] Mirrors an account created by the identity provider, so that its
/// JWTs resolve to a local user.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = UserForm,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 403, description = "Not staff"),
        (status = 422, description = "Invalid or duplicate username")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(form): Json<UserForm>,
) -> AppResult<(StatusCode, Json<User>)> {
    ensure_staff(&user)?;
    let created = state.repo.create_user(form.clean()?).await?;

    tracing::info!(user_id = created.id, username = %created.username, "User mirrored");
    Ok((StatusCode::CREATED, Json(created)))
}

// --- Categories ---

#[utoipa::path(
    get,
    path = "/admin/categories",
    responses(
        (status = 200, description = "Every category, published or not", body = [Category]),
        (status = 403, description = "Not staff")
    )
)]
pub async fn list_categories(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Category>>> {
    ensure_staff(&user)?;
    Ok(Json(state.repo.list_categories().await?))
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CategoryForm,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 422, description = "Invalid form or duplicate slug")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> AppResult<(StatusCode, Json<Category>)> {
    ensure_staff(&user)?;
    let category = state.repo.create_category(form.clean()?).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryForm,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Invalid form or duplicate slug")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> AppResult<Json<Category>> {
    ensure_staff(&user)?;
    state
        .repo
        .update_category(id, form.clean()?)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("category"))
}

/// delete_category
///
/// [Admin Route] Posts filed under the category survive without one, and drop
/// out of the public listings.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    ensure_staff(&user)?;
    if state.repo.delete_category(id).await? {
        tracing::info!(category_id = id, "Category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("category"))
    }
}

// --- Locations ---

#[utoipa::path(
    get,
    path = "/admin/locations",
    responses(
        (status = 200, description = "Every location", body = [Location]),
        (status = 403, description = "Not staff")
    )
)]
pub async fn list_locations(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Location>>> {
    ensure_staff(&user)?;
    Ok(Json(state.repo.list_locations().await?))
}

#[utoipa::path(
    post,
    path = "/admin/locations",
    request_body = LocationForm,
    responses(
        (status = 201, description = "Created", body = Location),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn create_location(
    user: AuthUser,
    State(state): State<AppState>,
    Json(form): Json<LocationForm>,
) -> AppResult<(StatusCode, Json<Location>)> {
    ensure_staff(&user)?;
    let location = state.repo.create_location(form.clean()?).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[utoipa::path(
    put,
    path = "/admin/locations/{id}",
    params(("id" = i64, Path, description = "Location id")),
    request_body = LocationForm,
    responses(
        (status = 200, description = "Updated", body = Location),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_location(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<LocationForm>,
) -> AppResult<Json<Location>> {
    ensure_staff(&user)?;
    state
        .repo
        .update_location(id, form.clean()?)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("location"))
}

#[utoipa::path(
    delete,
    path = "/admin/locations/{id}",
    params(("id" = i64, Path, description = "Location id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_location(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    ensure_staff(&user)?;
    if state.repo.delete_location(id).await? {
        tracing::info!(location_id = id, "Location deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("location"))
    }
}

// --- Posts ---

/// list_posts
///
/// [Admin Route] Every post, whatever its publication state, newest first.
#[utoipa::path(
    get,
    path = "/admin/posts",
    responses(
        (status = 200, description = "Every post", body = [Post]),
        (status = 403, description = "Not staff")
    )
)]
pub async fn list_posts(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    ensure_staff(&user)?;
    Ok(Json(state.repo.find_posts(&PostQuery::unrestricted()).await?))
}

/// update_post_publication
///
/// [Admin Route] Publishes, hides or reschedules any post.
#[utoipa::path(
    patch,
    path = "/admin/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    request_body = PublicationUpdate,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post_publication(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<PublicationUpdate>,
) -> AppResult<Json<Post>> {
    ensure_staff(&user)?;
    let post = state
        .repo
        .set_post_publication(id, update)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    tracing::info!(post_id = post.id, is_published = post.is_published, "Publication changed");
    Ok(Json(post))
}
