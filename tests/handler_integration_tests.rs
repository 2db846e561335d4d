use async_trait::async_trait;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use blogicum::{
    AppError, AppState, MemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    forms::{CategoryForm, CommentForm, PostForm},
    handlers::{admin, blog},
    models::{
        Category, CategoryInput, Comment, Location, LocationInput, NewUser, Post, PostInput,
        ProfileUpdate, PublicationUpdate, User,
    },
    pagination::PageParams,
    repository::{RepoError, RepoResult, Repository},
    visibility::PostQuery,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::test;

// --- FAILING REPOSITORY ---

// Every call fails the way a dropped database connection would.
struct FailingRepo;

fn outage<T>() -> RepoResult<T> {
    Err(RepoError::Sqlx(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Repository for FailingRepo {
    async fn get_user(&self, _id: i64) -> RepoResult<Option<User>> {
        outage()
    }
    async fn get_user_by_username(&self, _username: &str) -> RepoResult<Option<User>> {
        outage()
    }
    async fn create_user(&self, _user: NewUser) -> RepoResult<User> {
        outage()
    }
    async fn update_profile(&self, _id: i64, _update: ProfileUpdate) -> RepoResult<Option<User>> {
        outage()
    }
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        outage()
    }
    async fn get_category(&self, _id: i64) -> RepoResult<Option<Category>> {
        outage()
    }
    async fn get_category_by_slug(&self, _slug: &str) -> RepoResult<Option<Category>> {
        outage()
    }
    async fn create_category(&self, _input: CategoryInput) -> RepoResult<Category> {
        outage()
    }
    async fn update_category(&self, _id: i64, _input: CategoryInput) -> RepoResult<Option<Category>> {
        outage()
    }
    async fn delete_category(&self, _id: i64) -> RepoResult<bool> {
        outage()
    }
    async fn list_locations(&self) -> RepoResult<Vec<Location>> {
        outage()
    }
    async fn get_location(&self, _id: i64) -> RepoResult<Option<Location>> {
        outage()
    }
    async fn create_location(&self, _input: LocationInput) -> RepoResult<Location> {
        outage()
    }
    async fn update_location(&self, _id: i64, _input: LocationInput) -> RepoResult<Option<Location>> {
        outage()
    }
    async fn delete_location(&self, _id: i64) -> RepoResult<bool> {
        outage()
    }
    async fn find_posts(&self, _query: &PostQuery) -> RepoResult<Vec<Post>> {
        outage()
    }
    async fn count_posts(&self, _query: &PostQuery) -> RepoResult<usize> {
        outage()
    }
    async fn get_post(&self, _id: i64) -> RepoResult<Option<Post>> {
        outage()
    }
    async fn create_post(&self, _author_id: i64, _input: PostInput) -> RepoResult<Post> {
        outage()
    }
    async fn update_post(&self, _id: i64, _author_id: i64, _input: PostInput) -> RepoResult<Option<Post>> {
        outage()
    }
    async fn delete_post(&self, _id: i64, _author_id: i64) -> RepoResult<bool> {
        outage()
    }
    async fn set_post_publication(&self, _id: i64, _update: PublicationUpdate) -> RepoResult<Option<Post>> {
        outage()
    }
    async fn list_comments(&self, _post_id: i64) -> RepoResult<Vec<Comment>> {
        outage()
    }
    async fn find_comment(&self, _id: i64, _post_id: i64, _author_id: i64) -> RepoResult<Option<Comment>> {
        outage()
    }
    async fn create_comment(&self, _post_id: i64, _author_id: i64, _text: String) -> RepoResult<Comment> {
        outage()
    }
    async fn update_comment(&self, _id: i64, _author_id: i64, _text: String) -> RepoResult<Option<Comment>> {
        outage()
    }
    async fn delete_comment(&self, _id: i64, _author_id: i64) -> RepoResult<bool> {
        outage()
    }
}

// --- Helper Functions ---

fn create_test_state(repo: Arc<dyn Repository>) -> AppState {
    AppState {
        repo,
        config: AppConfig::default(),
    }
}

fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        username: user.username.clone(),
        is_staff: user.is_staff,
    }
}

/// A memory repository with `alice`, staff `root`, a published `travel`
/// category and one public post by alice.
async fn seeded() -> (Arc<MemoryRepository>, User, User, Post) {
    let repo = Arc::new(MemoryRepository::new());
    let alice = repo
        .create_user(NewUser {
            username: "alice".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let root = repo
        .create_user(NewUser {
            username: "root".to_string(),
            is_staff: true,
            ..Default::default()
        })
        .await
        .unwrap();
    let travel = repo
        .create_category(CategoryInput {
            title: "Travel".to_string(),
            description: String::new(),
            slug: "travel".to_string(),
            is_published: true,
        })
        .await
        .unwrap();
    let post = repo
        .create_post(
            alice.id,
            PostInput {
                title: "Trip".to_string(),
                text: "Went places".to_string(),
                pub_date: Utc::now() - Duration::days(1),
                image: None,
                category_id: travel.id,
                location_id: None,
            },
        )
        .await
        .unwrap();

    (repo, alice, root, post)
}

// --- Tests ---

#[test]
async fn test_index_returns_first_page() {
    let (repo, _, _, post) = seeded().await;
    let state = create_test_state(repo);

    let Json(page) = blog::index(State(state), Query(PageParams::default()))
        .await
        .unwrap();

    assert_eq!(page.page_obj.number, 1);
    assert_eq!(page.page_obj.object_list, vec![post]);
}

#[test]
async fn test_post_detail_for_missing_post_is_not_found() {
    let (repo, _, _, _) = seeded().await;
    let state = create_test_state(repo);

    let result = blog::post_detail(None, State(state), Path(999)).await;

    assert!(matches!(result, Err(AppError::NotFound("post"))));
}

#[test]
async fn test_edit_post_by_stranger_is_permission_denied() {
    let (repo, _, root, post) = seeded().await;
    let state = create_test_state(repo);

    let result = blog::edit_post(
        Some(auth_user(&root)),
        State(state),
        Path(post.id),
        Form(PostForm::from(&post)),
    )
    .await;

    match result {
        Err(AppError::PermissionDenied { redirect_to }) => {
            assert_eq!(redirect_to, format!("/posts/{}/", post.id))
        }
        other => panic!("expected a redirect to the post, got {:?}", other.map(|_| ())),
    }
}

#[test]
async fn test_edit_post_round_trips_own_form() {
    let (repo, alice, _, post) = seeded().await;
    let state = create_test_state(repo.clone());

    let mut form = PostForm::from(&post);
    form.title = "Trip, revised".to_string();

    let redirect = blog::edit_post(Some(auth_user(&alice)), State(state), Path(post.id), Form(form))
        .await
        .unwrap();

    assert_eq!(redirect.into_response().status(), StatusCode::SEE_OTHER);
    let stored = repo.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Trip, revised");
    assert_eq!(stored.pub_date, post.pub_date);
}

#[test]
async fn test_add_comment_rejects_empty_text() {
    let (repo, alice, _, post) = seeded().await;
    let state = create_test_state(repo);

    let result = blog::add_comment(
        auth_user(&alice),
        State(state),
        Path(post.id),
        Form(CommentForm::default()),
    )
    .await;

    match result {
        Err(AppError::Validation(errors)) => assert!(errors.get("text").is_some()),
        other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
async fn test_edit_comment_form_for_foreign_comment_is_not_found() {
    let (repo, alice, root, post) = seeded().await;
    let comment = repo
        .create_comment(post.id, alice.id, "Mine".to_string())
        .await
        .unwrap();
    let state = create_test_state(repo);

    let result = blog::edit_comment_form(auth_user(&root), State(state), Path((post.id, comment.id))).await;

    assert!(matches!(result, Err(AppError::NotFound("comment"))));
}

#[test]
async fn test_admin_list_posts_forbidden_for_non_staff() {
    let (repo, alice, _, _) = seeded().await;
    let state = create_test_state(repo);

    let result = admin::list_posts(auth_user(&alice), State(state)).await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test]
async fn test_admin_create_category_rejects_bad_slug() {
    let (repo, _, root, _) = seeded().await;
    let state = create_test_state(repo);

    let form = CategoryForm {
        title: "Food".to_string(),
        description: String::new(),
        slug: "food & drink".to_string(),
        is_published: true,
    };
    let result = admin::create_category(auth_user(&root), State(state), Json(form)).await;

    match result {
        Err(AppError::Validation(errors)) => assert!(errors.get("slug").is_some()),
        other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
async fn test_admin_update_missing_category_is_not_found() {
    let (repo, _, root, _) = seeded().await;
    let state = create_test_state(repo);

    let form = CategoryForm {
        title: "Food".to_string(),
        description: String::new(),
        slug: "food".to_string(),
        is_published: true,
    };
    let result = admin::update_category(auth_user(&root), State(state), Path(404), Json(form)).await;

    assert!(matches!(result, Err(AppError::NotFound("category"))));
}

#[test]
async fn test_repository_outage_is_internal_server_error() {
    let state = create_test_state(Arc::new(FailingRepo));

    let result = blog::index(State(state), Query(PageParams::default())).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Repository(_)));
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
