/// Middleware modules for the API server
///
/// - Security headers
///
/// Authentication lives in `tasqar_shared::auth::middleware` so other
/// services can reuse it.

pub mod security;
