#![allow(dead_code)]

use qbit::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const LOGIN_PATH: &str = "/api/v2/auth/login";
pub const INFO_PATH: &str = "/api/v2/torrents/info";
pub const CATEGORIES_PATH: &str = "/api/v2/torrents/categories";
pub const SET_CATEGORY_PATH: &str = "/api/v2/torrents/setCategory";

/// Cookie set by a successful login.
pub const SID: &str = "SID=hZ3pR9kq0u7TzLx1";

pub fn config(server: &MockServer) -> Config {
    Config::new(server.uri(), "admin", "adminadmin")
}

pub fn login_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("set-cookie", format!("{SID}; HttpOnly; path=/"))
        .set_body_string("Ok.")
}

/// What qBittorrent answers to calls without a valid session.
pub fn forbidden() -> ResponseTemplate {
    ResponseTemplate::new(403).set_body_string("Forbidden.")
}

pub async fn mount_login(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(login_ok())
        .expect(times)
        .named("login")
        .mount(server)
        .await;
}

pub fn without_session(request: &Request) -> bool {
    !request.headers.contains_key("cookie")
}

pub async fn requests_to(server: &MockServer, to: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == to)
        .collect()
}
