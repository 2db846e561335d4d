//! Ownership rules for mutating posts and comments.
//!
//! Only the author may edit or delete a post or a comment. What a refused actor
//! sees differs by resource: a post bounces the actor back to its detail page,
//! while a comment is reported as missing.

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Comment, Post},
    urls,
};

/// Owned
///
/// A resource with an author, and the outcome shown to anyone else who tries to
/// change it.
pub trait Owned {
    fn author_id(&self) -> i64;
    fn denial(&self) -> AppError;
}

impl Owned for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }

    fn denial(&self) -> AppError {
        AppError::PermissionDenied {
            redirect_to: urls::post_detail(self.id),
        }
    }
}

impl Owned for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }

    fn denial(&self) -> AppError {
        AppError::NotFound("comment")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// authorize_mutation
///
/// `Allowed` only when `actor` is the resource's author. Anonymous actors are
/// always denied.
pub fn authorize_mutation<R: Owned + ?Sized>(resource: &R, actor: Option<&AuthUser>) -> Access {
    match actor {
        Some(user) if user.id == resource.author_id() => Access::Allowed,
        _ => Access::Denied,
    }
}

/// ensure_can_mutate
///
/// [`authorize_mutation`] turned into the resource's denial error.
pub fn ensure_can_mutate<R: Owned + ?Sized>(resource: &R, actor: Option<&AuthUser>) -> AppResult<()> {
    match authorize_mutation(resource, actor) {
        Access::Allowed => Ok(()),
        Access::Denied => Err(resource.denial()),
    }
}

/// Back-office gate for the `/admin` routes.
pub fn ensure_staff(user: &AuthUser) -> AppResult<()> {
    if user.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
