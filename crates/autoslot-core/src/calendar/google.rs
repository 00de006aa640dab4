//! Google Calendar v3 backend.
//!
//! Authentication is not handled here: the gateway is given a bearer access
//! token (usually read from an environment variable). Requests are issued
//! with reqwest on a private current-thread tokio runtime so callers stay
//! synchronous.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{CalendarGateway, EventColor, ExternalEvent, NewEvent};
use crate::error::GatewayError;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Upper bound on pages fetched by one `list_events` call.
const MAX_PAGES: usize = 50;

pub struct GoogleCalendar {
    http: Client,
    runtime: tokio::runtime::Runtime,
    base_url: Url,
    calendar_id: String,
    token: String,
}

impl GoogleCalendar {
    pub fn new(token: impl Into<String>, calendar_id: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_base_url(DEFAULT_BASE_URL, token, calendar_id)
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(
        base_url: &str,
        token: impl Into<String>,
        calendar_id: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Runtime(format!("invalid base url '{base_url}': {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Runtime(e.to_string()))?;

        Ok(Self {
            http: Client::new(),
            runtime,
            base_url,
            calendar_id: calendar_id.into(),
            token: token.into(),
        })
    }

    /// Read the access token from `var`.
    pub fn from_env(var: &str, calendar_id: impl Into<String>) -> Result<Self, GatewayError> {
        let token = std::env::var(var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GatewayError::Unauthorized(format!("set {var} to a Google access token")))?;
        Self::new(token, calendar_id)
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| GatewayError::Runtime("base url cannot hold a path".to_string()))?;
            segments
                .pop_if_empty()
                .extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Issue a request and return the decoded JSON body (`Null` when empty).
    fn call(&self, method: Method, url: Url, body: Option<Value>, subject: &str) -> Result<Value, GatewayError> {
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.runtime.block_on(execute(request, subject))
    }
}

async fn execute(request: RequestBuilder, subject: &str) -> Result<Value, GatewayError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(error_for_status(status, text, subject));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
}

impl CalendarGateway for GoogleCalendar {
    fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, GatewayError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut url = self.events_url(None)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &from.to_rfc3339())
                    .append_pair("timeMax", &to.to_rfc3339())
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime");
                if let Some(token) = page_token.as_deref() {
                    query.append_pair("pageToken", token);
                }
            }

            let body = self.call(Method::GET, url, None, &self.calendar_id)?;
            let page: WirePage =
                serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

            for item in page.items {
                // All-day entries carry only a date and do not block time.
                if !item.is_timed() || item.is_cancelled() {
                    continue;
                }
                events.push(item.into_event()?);
            }

            pages += 1;
            match page.next_page_token {
                None => break,
                Some(_) if pages >= MAX_PAGES => {
                    // A partial busy set would let placement overlap unseen events.
                    tracing::warn!(calendar = %self.calendar_id, pages, "event listing did not finish");
                    return Err(GatewayError::Decode(format!(
                        "event listing exceeded {MAX_PAGES} pages"
                    )));
                }
                Some(token) => page_token = Some(token),
            }
        }

        events.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(events)
    }

    fn add_event(&mut self, event: &NewEvent) -> Result<ExternalEvent, GatewayError> {
        let mut body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": { "dateTime": event.start.to_rfc3339() },
            "end": { "dateTime": event.end.to_rfc3339() },
        });
        if let Some(color) = event.color {
            body["colorId"] = json!(color.id().to_string());
        }

        let url = self.events_url(None)?;
        let created = self.call(Method::POST, url, Some(body), &event.summary)?;
        let wire: WireEvent =
            serde_json::from_value(created).map_err(|e| GatewayError::Decode(e.to_string()))?;
        wire.into_event()
    }

    fn get_event(&self, id: &str) -> Result<ExternalEvent, GatewayError> {
        let url = self.events_url(Some(id))?;
        let body = self.call(Method::GET, url, None, id)?;
        let wire: WireEvent =
            serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if wire.is_cancelled() {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        wire.into_event()
    }

    fn delete_event(&mut self, id: &str) -> Result<(), GatewayError> {
        let url = self.events_url(Some(id))?;
        self.call(Method::DELETE, url, None, id).map(|_| ())
    }
}

fn error_for_status(status: StatusCode, body: String, subject: &str) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => GatewayError::NotFound(subject.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized(body),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        _ => GatewayError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    items: Vec<WireEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(rename = "colorId")]
    color_id: Option<String>,
    start: Option<WireTime>,
    end: Option<WireTime>,
}

#[derive(Debug, Deserialize)]
struct WireTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl WireTime {
    fn parse(&self) -> Result<DateTime<Utc>, GatewayError> {
        if let Some(raw) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| GatewayError::Decode(format!("bad dateTime '{raw}': {e}")));
        }
        let raw = self
            .date
            .as_deref()
            .ok_or_else(|| GatewayError::Decode("event time has neither dateTime nor date".into()))?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
            .map_err(|e| GatewayError::Decode(format!("bad date '{raw}': {e}")))
    }
}

impl WireEvent {
    fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    fn is_timed(&self) -> bool {
        self.start.as_ref().is_some_and(|t| t.date_time.is_some())
    }

    fn into_event(self) -> Result<ExternalEvent, GatewayError> {
        let id = self
            .id
            .ok_or_else(|| GatewayError::Decode("event without id".into()))?;
        let start = self
            .start
            .as_ref()
            .ok_or_else(|| GatewayError::Decode(format!("event {id} has no start")))?
            .parse()?;
        let end = self
            .end
            .as_ref()
            .ok_or_else(|| GatewayError::Decode(format!("event {id} has no end")))?
            .parse()?;
        let color = self
            .color_id
            .as_deref()
            .and_then(|c| c.parse::<u8>().ok())
            .and_then(EventColor::from_id);

        Ok(ExternalEvent {
            id,
            start,
            end,
            summary: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            color,
        })
    }
}
