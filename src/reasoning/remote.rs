//! Async remote drift classifier
//!
//! Model-agnostic HTTP client for calling LLM APIs. Supports both
//! Anthropic and OpenAI-compatible APIs. The remote only classifies drift
//! and writes alert text; the drift math itself is always local.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, RinksideError};
use crate::drift::detector::DriftStats;
use crate::reasoning::{Alert, Cause, Classification, CorrectiveAction, DriftBrief};

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Async client for the remote reasoning capability
pub struct RemoteClassifier {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

const SYSTEM_PROMPT: &str = "You are an operations analyst for a hockey arena's food and \
beverage program. You are given real-time drift data (actual sales vs forecast) for one \
concession stand and must classify WHY the drift is happening.\n\
\n\
CONTEXT:\n\
- Games run pre-game, three 20-minute periods, two intermissions. Demand peaks pre-game \
and at the breaks.\n\
- Prep deliberately underpredicts (75-95% of forecast by perishability); only recommend \
scaling up when actuals clearly exceed prep.\n\
\n\
CAUSES: untagged_promo, stand_outage, weather, redistribution, noise, unknown.\n\
\n\
RESPOND WITH JSON ONLY:\n\
{\n\
  \"cause\": \"one of the causes above\",\n\
  \"confidence\": 0.0-1.0,\n\
  \"actions\": [{\"stand\": \"...\", \"action\": \
\"increase_prep|decrease_prep|redistribute|hold\", \"item\": \"...\", \
\"quantity_change_pct\": 15}],\n\
  \"alert_text\": \"2-3 sentences for the shift manager\"\n\
}";

impl RemoteClassifier {
    /// Create a new classifier with explicit configuration
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // DeepSeek, OpenAI, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    /// Create a classifier from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to Anthropic API)
    /// Optional: LLM_MODEL
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| RinksideError::ReasoningUnavailable("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self::new(api_key, api_url, model))
    }

    /// Classify a drift brief into a cause + corrective actions.
    pub async fn classify(&self, brief: &DriftBrief) -> Result<Classification> {
        let user = build_user_message(brief);
        let response = self.complete(SYSTEM_PROMPT, &user).await?;
        let json = extract_json(&response)?;
        let wire: WireClassification = serde_json::from_str(json).map_err(|e| {
            RinksideError::ReasoningUnavailable(format!(
                "unparseable classification: {} - response: {}",
                e, response
            ))
        })?;
        Ok(wire.into_classification(brief))
    }

    /// Narrative post-game recap layered over the deterministic summary.
    pub async fn post_game_report(
        &self,
        stats: &DriftStats,
        alerts: &[Alert],
        opponent: &str,
    ) -> Result<String> {
        let alert_lines: String = alerts
            .iter()
            .map(|a| {
                format!(
                    "- {} at {}: {:?} ({:.0}% confidence)\n",
                    a.stand,
                    a.window_label,
                    a.cause,
                    a.confidence * 100.0
                )
            })
            .collect();
        let user = format!(
            "Write a 4-6 sentence post-game recap for the concessions manager.\n\
             GAME: vs {}\n\
             WINDOWS: {}/{} processed\n\
             CUMULATIVE DRIFT: {:+.1}%\n\
             TOTALS: {:.0} actual vs {:.0} forecast\n\
             SIGNALS: {} warning, {} critical\n\
             ALERTS:\n{}",
            opponent,
            stats.windows_processed,
            stats.total_windows,
            stats.cumulative_drift * 100.0,
            stats.total_actual,
            stats.total_forecast,
            stats.warning_signals,
            stats.critical_signals,
            if alert_lines.is_empty() {
                "- none\n".to_string()
            } else {
                alert_lines
            },
        );
        self.complete(
            "You write concise, plain-language operations recaps for arena concessions staff.",
            &user,
        )
        .await
    }

    /// Send a completion request to the LLM
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
        }
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RinksideError::ReasoningUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RinksideError::ReasoningUnavailable(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| RinksideError::ReasoningUnavailable(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| RinksideError::ReasoningUnavailable("Empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RinksideError::ReasoningUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RinksideError::ReasoningUnavailable(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| RinksideError::ReasoningUnavailable(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| RinksideError::ReasoningUnavailable("Empty response".into()))
    }
}

fn build_user_message(brief: &DriftBrief) -> String {
    let overrides = if brief.active_overrides.is_empty() {
        "none".to_string()
    } else {
        brief.active_overrides.join("; ")
    };
    let recent: Vec<String> = brief
        .recent_cumulative
        .iter()
        .map(|d| format!("{:+.0}%", d * 100.0))
        .collect();
    format!(
        "STAND: {} at {}\n\
         GAME: vs {} | attendance {} | archetype {}\n\
         VOLUME DRIFT: {:+.0}% this window | CUMULATIVE: {:+.1}%\n\
         MIX DRIFT: {} | TIMING DRIFT: {:+.2}\n\
         TREND: {:?} | STATUS: {:?} (was {:?})\n\
         STANDS OVER/UNDER FORECAST THIS WINDOW: {}/{}\n\
         KNOWN OVERRIDES: {}\n\
         RECENT VENUE CUMULATIVE DRIFT: {}\n\
         \n\
         Classify the drift cause and recommend actions. Respond with JSON only.",
        brief.stand,
        brief.window_label,
        brief.opponent,
        brief.attendance,
        brief.archetype.as_str(),
        brief.volume_drift * 100.0,
        brief.cumulative_drift * 100.0,
        brief
            .mix_drift
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "unknown".into()),
        brief.timing_drift,
        brief.trend,
        brief.status,
        brief.prev_status,
        brief.stands_over,
        brief.stands_under,
        overrides,
        recent.join(", "),
    )
}

/// Extract a JSON object from an LLM response (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response.find('{').ok_or_else(|| {
        RinksideError::ReasoningUnavailable("No JSON found in response".into())
    })?;
    let end = response.rfind('}').ok_or_else(|| {
        RinksideError::ReasoningUnavailable("No JSON found in response".into())
    })?;
    if end < start {
        return Err(RinksideError::ReasoningUnavailable(
            "Malformed JSON in response".into(),
        ));
    }
    Ok(&response[start..=end])
}

// Wire format the model responds in
#[derive(Deserialize)]
struct WireClassification {
    cause: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    actions: Vec<WireAction>,
    #[serde(default)]
    alert_text: String,
}

fn default_confidence() -> f64 {
    0.5
}

#[derive(Deserialize)]
struct WireAction {
    stand: String,
    action: String,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    quantity_change_pct: i32,
}

impl WireClassification {
    fn into_classification(self, brief: &DriftBrief) -> Classification {
        let actions = self
            .actions
            .into_iter()
            .map(|a| CorrectiveAction {
                stand: a.stand,
                action: match a.action.as_str() {
                    "increase_prep" => crate::reasoning::ActionKind::IncreasePrep,
                    "decrease_prep" => crate::reasoning::ActionKind::DecreasePrep,
                    "redistribute" => crate::reasoning::ActionKind::Redistribute,
                    _ => crate::reasoning::ActionKind::Hold,
                },
                item: a.item,
                quantity_change_pct: a.quantity_change_pct,
            })
            .collect();
        Classification {
            cause: Cause::from_wire(&self.cause),
            confidence: self.confidence.clamp(0.0, 1.0),
            alert_text: if self.alert_text.is_empty() {
                format!(
                    "{} drifting {:+.0}% vs forecast.",
                    brief.stand,
                    brief.volume_drift * 100.0
                )
            } else {
                self.alert_text
            },
            actions,
        }
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format (DeepSeek, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
