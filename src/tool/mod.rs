pub mod calendar;
pub mod gmail;
pub mod spotify;
pub mod weather;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::spotify::{DesktopLauncher, Player, WebApiClient};

/// Trait for agent tools.
///
/// `execute` always returns a human-readable string: results and vendor
/// failures alike are rendered as text for the hosting agent, never raised.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls.
    fn name(&self) -> &str;

    /// Description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for tool parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with given parameters.
    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String;
}

/// Extension trait for Tool to convert to OpenAI function schema.
pub trait ToolSchema: Tool {
    fn to_schema(&self) -> serde_json::Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

impl<T: Tool + ?Sized> ToolSchema for T {}

/// Lock-free tool registry using DashMap.
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Register a tool.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|r| r.value().clone())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions in OpenAI format.
    pub fn get_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|entry| entry.value().to_schema())
            .collect()
    }

    /// Execute a tool by name with given parameters.
    pub async fn execute(&self, name: &str, params: HashMap<String, serde_json::Value>) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => t.value().clone(),
            None => return format!("Error: Tool '{name}' not found"),
        };

        debug!("Executing tool: {}", name);
        tool.execute(params).await
    }

    /// Get list of registered tool names.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the full tool set from configuration.
///
/// Every vendor client is constructed here and injected into its tools;
/// nothing reaches for ambient credentials at call time.
pub fn default_registry(config: &Config) -> ToolRegistry {
    let registry = ToolRegistry::new();

    let gmail = Arc::new(gmail::GmailClient::new(config.google.access_token.clone()));
    registry.register(Arc::new(gmail::ListLabelsTool::new(gmail.clone())));
    registry.register(Arc::new(gmail::ListRecentTool::new(gmail.clone())));
    registry.register(Arc::new(gmail::ReadEmailTool::new(gmail.clone())));
    registry.register(Arc::new(gmail::SendEmailTool::new(gmail.clone())));
    registry.register(Arc::new(gmail::ReplyEmailTool::new(gmail)));

    let calendar = Arc::new(calendar::CalendarClient::new(
        config.google.access_token.clone(),
    ));
    registry.register(Arc::new(calendar::ListCalendarsTool::new(calendar.clone())));
    registry.register(Arc::new(calendar::ListEventsTool::new(calendar.clone())));
    registry.register(Arc::new(calendar::CreateEventTool::new(calendar.clone())));
    registry.register(Arc::new(calendar::UpdateEventTool::new(calendar.clone())));
    registry.register(Arc::new(calendar::DeleteEventTool::new(calendar)));

    let weather = Arc::new(weather::WeatherClient::new(config.weather.api_key.clone()));
    registry.register(Arc::new(weather::CurrentWeatherTool::new(weather.clone())));
    registry.register(Arc::new(weather::ForecastTool::new(weather)));
    registry.register(Arc::new(weather::LocateTool));

    let player = Player::new(
        WebApiClient::new(config.spotify.access_token.clone()),
        DesktopLauncher,
        config.spotify.search_limit,
    );
    registry.register(Arc::new(spotify::SearchAndPlayTool::new(player)));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new();
        let out = registry.execute("nope", HashMap::new()).await;
        assert_eq!(out, "Error: Tool 'nope' not found");
    }

    #[test]
    fn test_default_registry_contents() {
        let registry = default_registry(&Config::default());
        for name in [
            "gmail_list_labels",
            "gmail_list_recent",
            "gmail_read",
            "gmail_send",
            "gmail_reply",
            "calendar_list_calendars",
            "calendar_list_events",
            "calendar_create_event",
            "calendar_update_event",
            "calendar_delete_event",
            "weather_current",
            "weather_forecast",
            "locate",
            "spotify_play",
        ] {
            assert!(registry.has(name), "missing tool {name}");
        }
        assert_eq!(registry.len(), 14);
    }

    #[test]
    fn test_schema_export_shape() {
        let registry = default_registry(&Config::default());
        for def in registry.get_definitions() {
            assert_eq!(def["type"], "function");
            assert!(def["function"]["name"].is_string());
            assert_eq!(def["function"]["parameters"]["type"], "object");
        }
    }
}
