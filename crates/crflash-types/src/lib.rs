/// Shared types for the crflash workspace.
///
/// `models` holds the domain shapes served to clients; `api` holds the
/// request bodies and the JWT claims. Wire format is camelCase JSON,
/// database columns are snake_case; the rename attributes here are the
/// single place that mapping lives.

pub mod api;
pub mod models;
