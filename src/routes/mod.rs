/// Router Module Index
///
/// Splits the route table by access level so the auth layer is applied to a
/// whole module at once rather than per handler.

/// Routes that are never behind auth (health checks).
pub mod public;

/// The `/api/v1/orders` resource. Wrapped in the bearer-token middleware
/// when `AppConfig::auth_enabled` is set.
pub mod orders;
