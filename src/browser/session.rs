//! Page automation over DevTools
//!
//! Element lookups, form input and clicks are done with `Runtime.evaluate`;
//! selectors and values are embedded as JSON string literals.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, sleep, timeout_at};

use super::{
    cdp::{CdpConnection, CdpEvent},
    launcher::BrowserProcess,
};
use crate::{
    Error, Result,
    session::{BrowserSession, SignalMatcher, SignalOutcome},
    types::HarvestedCookie,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Page-side helper: rendered with a non-empty box and not `visibility: hidden`
const VISIBLE_JS: &str = "const visible = el => { const r = el.getBoundingClientRect(); \
    return r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden'; };";

/// One attached page of a launched browser
#[derive(Debug)]
pub struct CdpSession {
    connection: CdpConnection,
    session_id: String,
    events: broadcast::Receiver<CdpEvent>,
    _process: Option<BrowserProcess>,
}

impl CdpSession {
    /// Open a page and attach to it
    pub async fn attach(connection: CdpConnection, process: BrowserProcess) -> Result<Self> {
        Self::attach_inner(connection, Some(process)).await
    }

    async fn attach_inner(
        connection: CdpConnection,
        process: Option<BrowserProcess>,
    ) -> Result<Self> {
        let target = connection
            .call("Target.createTarget", json!({ "url": "about:blank" }), None)
            .await?;
        let target_id = string_field(&target, "targetId")?;

        let attached = connection
            .call(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = string_field(&attached, "sessionId")?;
        let events = connection.subscribe();

        Ok(Self {
            connection,
            session_id,
            events,
            _process: process,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.connection
            .call(method, params, Some(&self.session_id))
            .await
    }

    /// Evaluate `expression` in the page and return its value
    async fn evaluate(&self, expression: String) -> Result<Value> {
        let reply = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(details) = reply.get("exceptionDetails") {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("script exception");
            return Err(Error::browser(text.to_string()));
        }

        Ok(reply["result"]["value"].clone())
    }

    async fn element_visible(&self, selector: &str) -> Result<bool> {
        let expression = format!(
            "(() => {{ {} const el = document.querySelector({}); \
             return el !== null && visible(el); }})()",
            VISIBLE_JS,
            js_string(selector)
        );
        Ok(self.evaluate(expression).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn prepare(&mut self) -> Result<()> {
        self.call("Page.enable", json!({})).await?;
        self.call("Network.enable", json!({})).await?;
        self.call("Network.clearBrowserCookies", json!({})).await?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let reply = self.call("Page.navigate", json!({ "url": url })).await?;
        match reply["errorText"].as_str() {
            Some(error) if !error.is_empty() => Err(Error::browser(format!(
                "Navigation to {} failed: {}",
                url, error
            ))),
            _ => Ok(()),
        }
    }

    async fn wait_for_element(&mut self, selector: &str, deadline: Instant) -> Result<()> {
        // Evaluation fails while a navigation swaps the execution context.
        let mut last_error = None;
        loop {
            match self.element_visible(selector).await {
                Ok(true) => return Ok(()),
                Ok(false) => last_error = None,
                Err(e) => {
                    tracing::debug!("Lookup of {} failed, retrying: {}", selector, e);
                    last_error = Some(e);
                }
            }
            if Instant::now() + POLL_INTERVAL >= deadline {
                return Err(last_error.unwrap_or_else(|| {
                    Error::browser(format!("Element {} did not appear", selector))
                }));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn set_form_field(&mut self, selector: &str, value: &str) -> Result<()> {
        let focus = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             el.focus(); if (el.select) el.select(); return true; }})()",
            js_string(selector)
        );
        if !self.evaluate(focus).await?.as_bool().unwrap_or(false) {
            return Err(Error::browser(format!("Element {} not found", selector)));
        }

        self.call("Input.insertText", json!({ "text": value })).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let click = format!(
            "(() => {{ {} const el = document.querySelector({}); if (!el) return 'missing'; \
             if (!visible(el)) return 'hidden'; el.click(); return 'clicked'; }})()",
            VISIBLE_JS,
            js_string(selector)
        );
        match self.evaluate(click).await?.as_str() {
            Some("clicked") => Ok(()),
            Some("hidden") => Err(Error::browser(format!("Element {} is not visible", selector))),
            _ => Err(Error::browser(format!("Element {} not found", selector))),
        }
    }

    async fn wait_for_signal(
        &mut self,
        matcher: &SignalMatcher,
        deadline: Instant,
    ) -> Result<SignalOutcome> {
        loop {
            let event = match timeout_at(deadline, self.events.recv()).await {
                Err(_) => return Ok(SignalOutcome::TimedOut),
                Ok(Ok(event)) => event,
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::debug!("Skipped {} browser events", skipped);
                    continue;
                }
                Ok(Err(RecvError::Closed)) => {
                    return Err(Error::browser("DevTools connection closed"));
                }
            };

            if event.method != "Network.responseReceived" {
                continue;
            }
            if event
                .session_id
                .as_deref()
                .is_some_and(|id| id != self.session_id)
            {
                continue;
            }
            if event.params["response"]["url"]
                .as_str()
                .is_some_and(|url| matcher.matches(url))
            {
                tracing::debug!("Login signal received from {}", matcher.url());
                return Ok(SignalOutcome::Received);
            }
        }
    }

    async fn harvest_cookies(&mut self) -> Result<Vec<HarvestedCookie>> {
        let reply = self.call("Network.getAllCookies", json!({})).await?;
        let cookies = serde_json::from_value(reply["cookies"].clone())?;
        Ok(cookies)
    }
}

fn string_field(value: &Value, field: &str) -> Result<String> {
    value[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::browser(format!("DevTools reply is missing {}", field)))
}

/// Quote `value` as a JavaScript string literal
fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}
