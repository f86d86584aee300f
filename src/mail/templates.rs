//! HTML bodies for outgoing mail, rendered with askama from `templates/email/`.
//! Every interpolated value is HTML-escaped.

use askama::Template;
use chrono::{Datelike, Utc};

pub const WELCOME_SUBJECT: &str = "Welcome to the Atlas Portal";
pub const FORGOT_PASSWORD_SUBJECT: &str = "Forgot Password";

fn current_year() -> i32 {
    Utc::now().year()
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
pub struct WelcomeEmail<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    url: &'a str,
    year: i32,
}

impl<'a> WelcomeEmail<'a> {
    pub fn new(first_name: &'a str, last_name: &'a str, email: &'a str, url: &'a str) -> Self {
        Self {
            first_name,
            last_name,
            email,
            url,
            year: current_year(),
        }
    }
}

#[derive(Template)]
#[template(path = "email/forgot_password.html")]
pub struct ForgotPasswordEmail<'a> {
    url: &'a str,
    year: i32,
}

impl<'a> ForgotPasswordEmail<'a> {
    pub fn new(url: &'a str) -> Self {
        Self { url, year: current_year() }
    }
}
