//! Backend endpoint paths, relative to the configured base URL.

pub const POST_AUTH_EMAIL_LOGIN: &str = "/auth/email/login";
pub const POST_EMAIL_REGISTER: &str = "/email/register";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const GET_AUTH_ME: &str = "/auth/me";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
