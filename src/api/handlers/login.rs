use axum::extract::Form;
use axum::response::{Html, IntoResponse, Redirect};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::pages;
use crate::access::ACCESS_COOKIE;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub p: String,
}

/// Route: GET /pwd
pub async fn login_page() -> Html<String> {
    pages::render("Password", LOGIN_FORM)
}

/// Route: POST /pwd
///
/// Stores the submitted value as the access cookie. It is checked by the
/// access gate on the next request, not here.
pub async fn login(jar: CookieJar, Form(form): Form<LoginForm>) -> impl IntoResponse {
    let cookie = Cookie::build((ACCESS_COOKIE, form.p)).path("/").build();
    (jar.add(cookie), Redirect::to("/"))
}

const LOGIN_FORM: &str = r#"<form method="post" action="/pwd">
  <input type="password" name="p" placeholder="Password" autofocus>
  <button type="submit">Enter</button>
</form>"#;
