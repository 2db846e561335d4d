use blogicum::{
    AppError, MemoryRepository,
    forms::{CategoryForm, CommentForm, LocationForm, PostForm, ProfileForm, UserForm, parse_pub_date},
    models::{CategoryInput, LocationInput, Post},
    repository::Repository,
};
use chrono::{TimeZone, Utc};

// --- Test Utilities ---

async fn repo_with_choices() -> (MemoryRepository, i64, i64) {
    let repo = MemoryRepository::new();
    let category = repo
        .create_category(CategoryInput {
            title: "Travel".to_string(),
            description: String::new(),
            slug: "travel".to_string(),
            is_published: true,
        })
        .await
        .unwrap();
    let location = repo
        .create_location(LocationInput {
            name: "Island".to_string(),
            is_published: true,
        })
        .await
        .unwrap();
    (repo, category.id, location.id)
}

fn valid_post_form(category_id: i64) -> PostForm {
    PostForm {
        title: "Hello".to_string(),
        text: "World".to_string(),
        pub_date: "2024-05-01T09:30".to_string(),
        category: category_id.to_string(),
        location: String::new(),
        image: String::new(),
    }
}

fn field_errors(result: Result<impl std::fmt::Debug, AppError>) -> blogicum::forms::FieldErrors {
    match result {
        Err(AppError::Validation(errors)) => errors,
        other => panic!("expected validation errors, got {:?}", other),
    }
}

// --- Post Form ---

#[tokio::test]
async fn test_post_form_cleans_into_input() {
    let (repo, category_id, location_id) = repo_with_choices().await;
    let mut form = valid_post_form(category_id);
    form.location = location_id.to_string();
    form.image = "  posts/hello.png ".to_string();

    let input = form.clean(&repo).await.unwrap();

    assert_eq!(input.title, "Hello");
    assert_eq!(input.category_id, category_id);
    assert_eq!(input.location_id, Some(location_id));
    assert_eq!(input.image.as_deref(), Some("posts/hello.png"));
    assert_eq!(input.pub_date, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
}

#[tokio::test]
async fn test_post_form_requires_category() {
    let (repo, _, _) = repo_with_choices().await;
    let mut form = valid_post_form(0);
    form.category = String::new();

    let errors = field_errors(form.clean(&repo).await);

    assert_eq!(
        errors.get("category"),
        Some(&["This field is required.".to_string()][..])
    );
}

#[tokio::test]
async fn test_post_form_rejects_unknown_references() {
    let (repo, category_id, _) = repo_with_choices().await;
    let mut form = valid_post_form(category_id + 100);
    form.location = "999".to_string();

    let errors = field_errors(form.clean(&repo).await);

    assert!(errors.get("category").is_some());
    assert!(errors.get("location").is_some());
    assert!(errors.get("title").is_none());
}

#[tokio::test]
async fn test_post_form_rejects_overlong_title() {
    let (repo, category_id, _) = repo_with_choices().await;
    let mut form = valid_post_form(category_id);
    form.title = "x".repeat(257);

    let errors = field_errors(form.clean(&repo).await);

    assert!(errors.get("title").is_some());
}

#[tokio::test]
async fn test_post_form_prefills_from_post() {
    let post = Post {
        id: 3,
        title: "Existing".to_string(),
        pub_date: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
        category_id: Some(7),
        ..Default::default()
    };

    let form = PostForm::from(&post);

    assert_eq!(form.title, "Existing");
    assert_eq!(form.category, "7");
    assert_eq!(form.location, "");
    assert_eq!(parse_pub_date(&form.pub_date), Ok(post.pub_date));
}

#[tokio::test]
async fn test_post_form_missing_fields_become_field_errors() {
    let (repo, _, _) = repo_with_choices().await;
    let form: PostForm = serde_json::from_str("{}").unwrap();

    let errors = field_errors(form.clean(&repo).await);

    for field in ["title", "text", "pub_date", "category"] {
        assert!(errors.get(field).is_some(), "no error for {field}");
    }
    assert!(errors.get("location").is_none());
}

#[test]
fn test_parse_pub_date_formats() {
    let expected = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    assert_eq!(parse_pub_date("2024-05-01"), Ok(expected));
    assert_eq!(parse_pub_date("2024-05-01T00:00"), Ok(expected));
    assert_eq!(parse_pub_date("2024-05-01 00:00:00"), Ok(expected));
    assert_eq!(parse_pub_date("2024-05-01T02:00:00+02:00"), Ok(expected));
    assert!(parse_pub_date("").is_err());
    assert!(parse_pub_date("yesterday").is_err());
}

// --- Comment & Profile Forms ---

#[test]
fn test_comment_form_rejects_whitespace() {
    let form = CommentForm {
        text: " \n ".to_string(),
    };

    let errors = field_errors(form.clean());

    assert!(errors.get("text").is_some());
}

#[test]
fn test_profile_form_validates_email() {
    let form = ProfileForm {
        email: "nope".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
    };

    let errors = field_errors(form.clean());

    assert!(errors.get("email").is_some());
}

// --- Back Office Forms ---

#[test]
fn test_category_form_slug_rules() {
    let form = CategoryForm {
        title: "Travel".to_string(),
        description: String::new(),
        slug: "travel_2024-eu".to_string(),
        is_published: true,
    };
    assert_eq!(form.clean().unwrap().slug, "travel_2024-eu");

    let form = CategoryForm {
        title: "Travel".to_string(),
        description: String::new(),
        slug: "путешествия".to_string(),
        is_published: true,
    };
    assert!(field_errors(form.clean()).get("slug").is_some());
}

#[test]
fn test_back_office_forms_default_to_published() {
    let category: CategoryForm =
        serde_json::from_str(r#"{"title": "T", "slug": "t"}"#).unwrap();
    let location: LocationForm = serde_json::from_str(r#"{"name": "Island"}"#).unwrap();

    assert!(category.is_published);
    assert!(location.clean().unwrap().is_published);
}

#[test]
fn test_empty_payloads_deserialize_and_fail_validation() {
    let comment: CommentForm = serde_json::from_str("{}").unwrap();
    assert!(field_errors(comment.clean()).get("text").is_some());

    let profile: ProfileForm = serde_json::from_str("{}").unwrap();
    assert!(field_errors(profile.clean()).get("email").is_some());

    let category: CategoryForm = serde_json::from_str("{}").unwrap();
    let errors = field_errors(category.clean());
    assert!(errors.get("title").is_some());
    assert!(errors.get("slug").is_some());

    let user: UserForm = serde_json::from_str("{}").unwrap();
    assert!(field_errors(user.clean()).get("username").is_some());
}

#[test]
fn test_user_form_username_rules() {
    let form = UserForm {
        username: "carol.smith+blog".to_string(),
        email: "carol@example.com".to_string(),
        ..Default::default()
    };
    assert_eq!(form.clean().unwrap().username, "carol.smith+blog");

    let form = UserForm {
        username: "carol/smith".to_string(),
        email: "carol@example.com".to_string(),
        ..Default::default()
    };
    assert!(field_errors(form.clean()).get("username").is_some());
}
