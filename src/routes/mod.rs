/// Router Module Index
///
/// The routing table, split by who may reach each route. Access control is applied
/// per router in `create_router`.

/// Routes any visitor may reach. Handlers apply the visibility rules themselves;
/// post editing lives here because refusals redirect instead of demanding a login.
pub mod public;

/// Routes behind the `AuthUser` middleware. No session means a redirect to login.
pub mod authenticated;

/// Back-office routes, nested under `/admin`. Handlers require `is_staff`.
pub mod admin;
