//! Form payloads and their cleaning into validated inputs.
//!
//! Field constraints are declared with `validator`; checks that need the
//! datastore (does the chosen category exist?) run in the `clean` methods.
//! Every failure is collected into [`FieldErrors`] so the whole form can be
//! redisplayed at once.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::{AppError, AppResult},
    models::{
        CategoryInput, Comment, LocationInput, NewUser, Post, PostInput, ProfileUpdate, User,
    },
    repository::Repository,
};

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice.";

/// FieldErrors
///
/// Field name to messages, serialized as-is into the 422 response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Starts from the outcome of `validator`'s field checks.
    pub fn from_validation(result: Result<(), ValidationErrors>) -> Self {
        let mut errors = Self::default();
        if let Err(failed) = result {
            for (field, field_errors) in failed.field_errors() {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| err.code.to_string());
                    errors.add(field.to_string(), message);
                }
            }
        }
        errors
    }

    fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

// --- Post ---

/// PostForm
///
/// Select and date inputs arrive as raw strings, as browsers send them; an empty
/// select submits `""`. Missing fields deserialize as empty and are reported by
/// `clean`, after the handler has checked who is asking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PostForm {
    #[validate(length(min = 1, max = 256, message = "Title must be between 1 and 256 characters."))]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
    /// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD`; naive values are UTC.
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub image: String,
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.to_rfc3339(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            image: post.image.clone().unwrap_or_default(),
        }
    }
}

impl PostForm {
    pub async fn clean(self, repo: &dyn Repository) -> AppResult<PostInput> {
        let mut errors = FieldErrors::from_validation(self.validate());

        let pub_date = match parse_pub_date(&self.pub_date) {
            Ok(date) => Some(date),
            Err(message) => {
                errors.add("pub_date", message);
                None
            }
        };

        let category_id = match parse_choice(&self.category) {
            Ok(Some(id)) => match repo.get_category(id).await? {
                Some(category) => Some(category.id),
                None => {
                    errors.add("category", INVALID_CHOICE);
                    None
                }
            },
            Ok(None) => {
                errors.add("category", REQUIRED);
                None
            }
            Err(_) => {
                errors.add("category", INVALID_CHOICE);
                None
            }
        };

        let location_id = match parse_choice(&self.location) {
            Ok(Some(id)) => {
                if repo.get_location(id).await?.is_none() {
                    errors.add("location", INVALID_CHOICE);
                }
                Some(id)
            }
            Ok(None) => None,
            Err(_) => {
                errors.add("location", INVALID_CHOICE);
                None
            }
        };

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(PostInput {
                title: self.title,
                text: self.text,
                pub_date,
                image: non_empty(self.image),
                category_id,
                location_id,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Accepts the formats a date or datetime-local input produces, plus RFC 3339.
pub fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(REQUIRED);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or("Enter a valid date/time.")
}

fn parse_choice(raw: &str) -> Result<Option<i64>, std::num::ParseIntError> {
    let raw = raw.trim();
    if raw.is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// --- Comment ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl From<&Comment> for CommentForm {
    fn from(comment: &Comment) -> Self {
        Self {
            text: comment.text.clone(),
        }
    }
}

impl CommentForm {
    pub fn clean(self) -> AppResult<String> {
        let mut errors = FieldErrors::from_validation(self.validate());
        if self.text.trim().is_empty() && errors.get("text").is_none() {
            errors.add("text", REQUIRED);
        }
        errors.into_result()?;
        Ok(self.text)
    }
}

// --- Profile ---

/// ProfileForm
///
/// The username is not part of the form: it identifies the profile URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

impl ProfileForm {
    pub fn clean(self) -> AppResult<ProfileUpdate> {
        FieldErrors::from_validation(self.validate()).into_result()?;
        Ok(ProfileUpdate {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

// --- Back office ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(
        length(min = 1, max = 64),
        custom(function = "validate_slug")
    )]
    pub slug: String,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
}

impl CategoryForm {
    pub fn clean(self) -> AppResult<CategoryInput> {
        FieldErrors::from_validation(self.validate()).into_result()?;
        Ok(CategoryInput {
            title: self.title,
            description: self.description,
            slug: self.slug,
            is_published: self.is_published,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct LocationForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
}

impl LocationForm {
    pub fn clean(self) -> AppResult<LocationInput> {
        FieldErrors::from_validation(self.validate()).into_result()?;
        Ok(LocationInput {
            name: self.name,
            is_published: self.is_published,
        })
    }
}

/// UserForm
///
/// Mirrors an identity-provider account into the local `users` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UserForm {
    #[validate(
        length(min = 1, max = 150),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
    pub is_staff: bool,
}

impl UserForm {
    pub fn clean(self) -> AppResult<NewUser> {
        FieldErrors::from_validation(self.validate()).into_result()?;
        Ok(NewUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_staff: self.is_staff,
        })
    }
}

fn published_by_default() -> bool {
    true
}

/// Latin letters, digits, hyphen and underscore only.
fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("slug").with_message(
            "Use only Latin letters, digits, hyphens and underscores.".into(),
        ))
    }
}

/// Letters, digits and `@.+-_`, as profile URLs require.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Use only letters, digits and @/./+/-/_ characters.".into(),
        ))
    }
}
