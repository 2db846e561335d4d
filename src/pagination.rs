use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::{error::AppResult, models::Post, repository::Repository, visibility::PostQuery};

/// Number of posts shown on every paginated listing.
pub const PAGE_SIZE: usize = 10;

/// PageParams
///
/// The `?page=` query parameter. It is kept as a raw string so that garbage input
/// falls back to the first page instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Requested page number, 1-based. Out-of-range values are clamped.
    pub page: Option<String>,
}

impl PageParams {
    /// The requested page number: missing or non-numeric input gives 1 and
    /// anything below 1 is raised to 1. The upper bound is applied by [`PageWindow::new`].
    pub fn number(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|n| usize::try_from(n.max(1)).unwrap_or(usize::MAX))
            .unwrap_or(1)
    }
}

/// Page
///
/// One slice of an ordered sequence plus the metadata a listing template needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    /// 1-based number of this page, always within `1..=num_pages`.
    pub number: usize,
    pub num_pages: usize,
    /// Total number of items across all pages.
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

/// PageWindow
///
/// Where page `requested` falls in a sequence of `count` items, clamped into the
/// valid range. Listings use it to fetch only that page from the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub per_page: usize,
}

impl PageWindow {
    pub fn new(count: usize, requested: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);

        Self {
            number: requested.clamp(1, num_pages),
            num_pages,
            count,
            per_page,
        }
    }

    pub fn offset(&self) -> usize {
        (self.number - 1) * self.per_page
    }

    pub fn into_page<T>(self, object_list: Vec<T>) -> Page<T> {
        Page {
            object_list,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.number > 1,
            has_next: self.number < self.num_pages,
        }
    }
}

/// Cuts `items` into pages of [`PAGE_SIZE`] and returns page `requested`,
/// clamped into the valid range. An empty sequence still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, requested: usize) -> Page<T> {
    paginate_by(items, requested, PAGE_SIZE)
}

pub fn paginate_by<T>(items: Vec<T>, requested: usize, per_page: usize) -> Page<T> {
    let window = PageWindow::new(items.len(), requested, per_page);
    let object_list = items
        .into_iter()
        .skip(window.offset())
        .take(window.per_page)
        .collect();

    window.into_page(object_list)
}

/// paginate_posts
///
/// Counts the matches of `query`, then fetches only the posts of the requested
/// page.
pub async fn paginate_posts(
    repo: &dyn Repository,
    query: PostQuery,
    requested: usize,
) -> AppResult<Page<Post>> {
    let count = repo.count_posts(&query).await?;
    let window = PageWindow::new(count, requested, PAGE_SIZE);
    let posts = repo
        .find_posts(&query.window(window.offset(), window.per_page))
        .await?;

    Ok(window.into_page(posts))
}
