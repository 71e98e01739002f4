//! Google Calendar wrapper tools: list calendars, list upcoming events,
//! create, update, and delete events.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::util::http;

use super::Tool;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Pre-authenticated Calendar API client shared by the calendar tools.
pub struct CalendarClient {
    access_token: String,
}

impl CalendarClient {
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        debug!(path, "Calendar API GET");
        let response = http::client()
            .get(format!("{CALENDAR_API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        debug!(path, "Calendar API POST");
        let response = http::client()
            .post(format!("{CALENDAR_API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn put(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        debug!(path, "Calendar API PUT");
        let response = http::client()
            .put(format!("{CALENDAR_API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        debug!(path, "Calendar API DELETE");
        let response = http::client()
            .delete(format!("{CALENDAR_API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Calendar API returned {status}: {body}");
        }
        Ok(())
    }

    async fn into_json(response: reqwest::Response) -> anyhow::Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Calendar API returned {status}: {body}");
        }
        Ok(response.json().await?)
    }
}

// ====== JSON -> text reshaping ======

fn format_calendars(data: &Value) -> String {
    let calendars: Vec<String> = data["items"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|c| {
            format!(
                "- {} (ID: {})",
                c["summary"].as_str().unwrap_or("?"),
                c["id"].as_str().unwrap_or("?")
            )
        })
        .collect();

    if calendars.is_empty() {
        return "No calendars found.".to_string();
    }
    format!("Available Calendars:\n{}", calendars.join("\n"))
}

/// All-day events carry `date` instead of `dateTime`.
fn event_time(bound: &Value) -> &str {
    bound["dateTime"]
        .as_str()
        .or_else(|| bound["date"].as_str())
        .unwrap_or("?")
}

fn format_events(data: &Value, days_ahead: u64) -> String {
    let events: Vec<String> = data["items"]
        .as_array()
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, event)| {
            format!(
                "{}. Summary: {}\n   Start: {}\n   End: {}\n   Event ID: {}",
                i + 1,
                event["summary"].as_str().unwrap_or("No Title"),
                event_time(&event["start"]),
                event_time(&event["end"]),
                event["id"].as_str().unwrap_or(""),
            )
        })
        .collect();

    if events.is_empty() {
        return format!("No upcoming events found in the next {days_ahead} days.");
    }
    format!("Upcoming Events:\n{}", events.join("\n\n"))
}

fn format_event_confirmation(action: &str, event: &Value) -> String {
    format!(
        "Event {action} successfully!\nEvent ID: {}\nEvent Link: {}",
        event["id"].as_str().unwrap_or(""),
        event["htmlLink"].as_str().unwrap_or("No link available"),
    )
}

/// Overlay the provided fields onto an existing event, leaving everything
/// else untouched (read-modify-write update).
fn apply_event_updates(
    event: &mut Value,
    summary: Option<&str>,
    description: Option<&str>,
    start_time: Option<&str>,
    end_time: Option<&str>,
) {
    if let Some(s) = summary {
        event["summary"] = json!(s);
    }
    if let Some(d) = description {
        event["description"] = json!(d);
    }
    if let Some(t) = start_time {
        event["start"]["dateTime"] = json!(t);
    }
    if let Some(t) = end_time {
        event["end"]["dateTime"] = json!(t);
    }
}

fn calendar_id_param(params: &HashMap<String, serde_json::Value>) -> String {
    params
        .get("calendar_id")
        .and_then(|v| v.as_str())
        .unwrap_or("primary")
        .to_string()
}

// ====== Tools ======

/// List all calendars visible to the account.
pub struct ListCalendarsTool {
    client: Arc<CalendarClient>,
}

impl ListCalendarsTool {
    pub fn new(client: Arc<CalendarClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListCalendarsTool {
    fn name(&self) -> &str {
        "calendar_list_calendars"
    }

    fn description(&self) -> &str {
        "List all available calendars in the Google Calendar account."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: HashMap<String, serde_json::Value>) -> String {
        match self.client.get("users/me/calendarList").await {
            Ok(data) => format_calendars(&data),
            Err(e) => format!("Error listing calendars: {e}"),
        }
    }
}

/// List upcoming events from a calendar.
pub struct ListEventsTool {
    client: Arc<CalendarClient>,
}

impl ListEventsTool {
    pub fn new(client: Arc<CalendarClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListEventsTool {
    fn name(&self) -> &str {
        "calendar_list_events"
    }

    fn description(&self) -> &str {
        "List upcoming events for a calendar (default: primary) within a look-ahead window."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "calendar_id": {"type": "string", "description": "Calendar ID (default 'primary')"},
                "max_results": {"type": "integer", "description": "Maximum events to return (default 10)", "minimum": 1},
                "days_ahead": {"type": "integer", "description": "How many days to look ahead (default 30)", "minimum": 1}
            }
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let calendar_id = calendar_id_param(&params);
        let max_results = params
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(10);
        let days_ahead = params
            .get("days_ahead")
            .and_then(|v| v.as_u64())
            .unwrap_or(30);

        let now = Utc::now();
        let time_min = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = (now + Duration::days(days_ahead as i64))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let path = format!(
            "calendars/{}/events?timeMin={}&timeMax={}&maxResults={}&singleEvents=true&orderBy=startTime",
            urlencoding::encode(&calendar_id),
            urlencoding::encode(&time_min),
            urlencoding::encode(&time_max),
            max_results,
        );

        match self.client.get(&path).await {
            Ok(data) => format_events(&data, days_ahead),
            Err(e) => format!("Error listing events: {e}"),
        }
    }
}

/// Create a new calendar event.
pub struct CreateEventTool {
    client: Arc<CalendarClient>,
}

impl CreateEventTool {
    pub fn new(client: Arc<CalendarClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "calendar_create_event"
    }

    fn description(&self) -> &str {
        "Create a new event in a calendar (default: primary). Times are ISO format, UTC."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string", "description": "Event title"},
                "start_time": {"type": "string", "description": "Start time (YYYY-MM-DDTHH:MM:SS)"},
                "end_time": {"type": "string", "description": "End time (YYYY-MM-DDTHH:MM:SS)"},
                "description": {"type": "string", "description": "Event description"},
                "calendar_id": {"type": "string", "description": "Calendar ID (default 'primary')"}
            },
            "required": ["summary", "start_time", "end_time"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let (summary, start_time, end_time) = match (
            params.get("summary").and_then(|v| v.as_str()),
            params.get("start_time").and_then(|v| v.as_str()),
            params.get("end_time").and_then(|v| v.as_str()),
        ) {
            (Some(s), Some(start), Some(end)) => (s, start, end),
            _ => {
                return "Error: 'summary', 'start_time' and 'end_time' parameters are required"
                    .to_string()
            }
        };
        let calendar_id = calendar_id_param(&params);

        let mut event = json!({
            "summary": summary,
            "start": { "dateTime": start_time, "timeZone": "UTC" },
            "end": { "dateTime": end_time, "timeZone": "UTC" },
        });
        if let Some(description) = params.get("description").and_then(|v| v.as_str()) {
            event["description"] = json!(description);
        }

        let path = format!("calendars/{}/events", urlencoding::encode(&calendar_id));
        match self.client.post(&path, &event).await {
            Ok(created) => format_event_confirmation("created", &created),
            Err(e) => format!("Error creating event: {e}"),
        }
    }
}

/// Update fields of an existing calendar event.
pub struct UpdateEventTool {
    client: Arc<CalendarClient>,
}

impl UpdateEventTool {
    pub fn new(client: Arc<CalendarClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for UpdateEventTool {
    fn name(&self) -> &str {
        "calendar_update_event"
    }

    fn description(&self) -> &str {
        "Update title, times or description of an existing event; unspecified fields are kept."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "event_id": {"type": "string", "description": "ID of the event to update"},
                "summary": {"type": "string", "description": "New event title"},
                "start_time": {"type": "string", "description": "New start time (YYYY-MM-DDTHH:MM:SS)"},
                "end_time": {"type": "string", "description": "New end time (YYYY-MM-DDTHH:MM:SS)"},
                "description": {"type": "string", "description": "New event description"},
                "calendar_id": {"type": "string", "description": "Calendar ID (default 'primary')"}
            },
            "required": ["event_id"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let event_id = match params.get("event_id").and_then(|v| v.as_str()) {
            Some(id) => id,
            None => return "Error: 'event_id' parameter is required".to_string(),
        };
        let calendar_id = calendar_id_param(&params);

        let path = format!(
            "calendars/{}/events/{}",
            urlencoding::encode(&calendar_id),
            urlencoding::encode(event_id),
        );

        let mut event = match self.client.get(&path).await {
            Ok(event) => event,
            Err(e) => return format!("Error updating event: {e}"),
        };

        apply_event_updates(
            &mut event,
            params.get("summary").and_then(|v| v.as_str()),
            params.get("description").and_then(|v| v.as_str()),
            params.get("start_time").and_then(|v| v.as_str()),
            params.get("end_time").and_then(|v| v.as_str()),
        );

        match self.client.put(&path, &event).await {
            Ok(updated) => format_event_confirmation("updated", &updated),
            Err(e) => format!("Error updating event: {e}"),
        }
    }
}

/// Delete an event from a calendar.
pub struct DeleteEventTool {
    client: Arc<CalendarClient>,
}

impl DeleteEventTool {
    pub fn new(client: Arc<CalendarClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for DeleteEventTool {
    fn name(&self) -> &str {
        "calendar_delete_event"
    }

    fn description(&self) -> &str {
        "Delete an event from a calendar (default: primary) by event ID."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "event_id": {"type": "string", "description": "ID of the event to delete"},
                "calendar_id": {"type": "string", "description": "Calendar ID (default 'primary')"}
            },
            "required": ["event_id"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let event_id = match params.get("event_id").and_then(|v| v.as_str()) {
            Some(id) => id,
            None => return "Error: 'event_id' parameter is required".to_string(),
        };
        let calendar_id = calendar_id_param(&params);

        let path = format!(
            "calendars/{}/events/{}",
            urlencoding::encode(&calendar_id),
            urlencoding::encode(event_id),
        );

        match self.client.delete(&path).await {
            Ok(()) => format!(
                "Event with ID {event_id} deleted successfully from calendar {calendar_id}."
            ),
            Err(e) => format!("Error deleting event: {e}"),
        }
    }
}
