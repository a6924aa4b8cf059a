//! Interactive login steps
//!
//! Drives a [`BrowserSession`] through the account login form and returns the
//! cookies of the authenticated session. Every step is bounded by the same
//! deadline; any failure aborts the whole flow.

use std::future::Future;
use tokio::time::{Instant, timeout_at};

use super::browser::{BrowserSession, SignalMatcher, SignalOutcome};
use crate::{Error, Result, config::settings::CredentialSettings, types::HarvestedCookie};

pub const LOGIN_FORM: &str = "#login-form";
pub const ID_FIELD: &str = "#id_email_2";
pub const PASSWORD_FIELD: &str = "#id_password_3";
pub const SUBMIT_BUTTON: &str = "form#login-form button.submit";

/// Login form automation for one account
#[derive(Debug)]
pub struct LoginFlow<'a> {
    credentials: &'a CredentialSettings,
    login_url: &'a str,
    signal: &'a SignalMatcher,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        credentials: &'a CredentialSettings,
        login_url: &'a str,
        signal: &'a SignalMatcher,
    ) -> Self {
        Self {
            credentials,
            login_url,
            signal,
        }
    }

    /// Log in and harvest the resulting cookies
    pub async fn run<S>(&self, browser: &mut S, deadline: Instant) -> Result<Vec<HarvestedCookie>>
    where
        S: BrowserSession + ?Sized,
    {
        step("prepare", deadline, browser.prepare()).await?;
        step("navigate", deadline, browser.navigate(self.login_url)).await?;
        step(
            "wait_for_form",
            deadline,
            browser.wait_for_element(LOGIN_FORM, deadline),
        )
        .await?;
        step(
            "fill_id",
            deadline,
            browser.set_form_field(ID_FIELD, &self.credentials.id),
        )
        .await?;
        step(
            "fill_password",
            deadline,
            browser.set_form_field(PASSWORD_FIELD, &self.credentials.password),
        )
        .await?;
        step("submit", deadline, browser.click(SUBMIT_BUTTON)).await?;

        let outcome = step(
            "wait_for_signal",
            deadline,
            browser.wait_for_signal(self.signal, deadline),
        )
        .await?;
        if outcome == SignalOutcome::TimedOut {
            return Err(Error::login_flow(
                "wait_for_signal",
                format!("timed out waiting for {}", self.signal.url()),
            ));
        }

        let cookies = step("harvest_cookies", deadline, browser.harvest_cookies()).await?;
        if cookies.is_empty() {
            return Err(Error::login_flow(
                "harvest_cookies",
                "browser returned no cookies",
            ));
        }

        tracing::info!("Login completed, harvested {} cookies", cookies.len());
        Ok(cookies)
    }
}

/// Run one step under the deadline, tagging failures with the step name
async fn step<T>(
    name: &str,
    deadline: Instant,
    action: impl Future<Output = Result<T>>,
) -> Result<T> {
    tracing::debug!("Login step: {}", name);
    match timeout_at(deadline, action).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err @ Error::LoginFlow { .. })) => Err(err),
        Ok(Err(err)) => Err(Error::login_flow(name, err.to_string())),
        Err(_) => Err(Error::login_flow(name, "deadline exceeded")),
    }
}
