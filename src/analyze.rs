//! Photo Diagnosis
//!
//! Single-shot "what is this and what will it cost" analysis of a tenant or
//! homeowner photo. Used by the lead capture flow to estimate a repair cost
//! before a contact is recorded.

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::ai::reply::str_field;
use crate::ai::{parse_json_reply, ModelBackend, ModelRequest};
use crate::media::Upload;
use crate::storage::{RiskLevel, TicketStatus};

/// Descriptions at or below this length are treated as too vague to diagnose
const MIN_DESCRIPTION_CHARS: usize = 20;

const FOLLOW_UP_FALLBACK: &str =
    "Could you please describe the issue you're experiencing and share a photo if possible?";

const DIAGNOSIS_FALLBACK: &str = "I was able to review your issue. Based on what I can see, I recommend having a professional take a look to provide an accurate assessment.";

/// Tradesperson's assessment of a single issue
///
/// Models sometimes send `null` for fields they have nothing to say about;
/// those read as empty rather than rejecting the diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_cost_range: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trade_category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommended_action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub safety_warning: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_diy: bool,
    #[serde(default)]
    pub diy_instructions: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Diagnosis {
    /// Conservative answer used when the model cannot produce one
    pub fn unavailable() -> Self {
        Self {
            issue_title: "Maintenance Issue Identified".to_string(),
            severity: "Medium".to_string(),
            estimated_cost_range: "Varies".to_string(),
            trade_category: "General".to_string(),
            explanation: "Unable to complete detailed analysis.".to_string(),
            recommended_action: "Schedule a professional inspection".to_string(),
            safety_warning: "None identified".to_string(),
            can_diy: false,
            diy_instructions: None,
        }
    }
}

/// Response of the analyze endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub response: String,
    pub diagnosis: Option<Diagnosis>,
    pub risk_level: Option<RiskLevel>,
    pub needs_more_info: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Photo diagnosis over a model backend
pub struct Diagnoser {
    backend: Arc<dyn ModelBackend>,
}

impl Diagnoser {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    /// Diagnose when both a photo and a real description are present,
    /// otherwise ask for what is missing
    pub async fn analyze(&self, description: &str, image: Option<&Upload>) -> AnalysisResult {
        let description = description.trim();
        let has_description = description.chars().count() > MIN_DESCRIPTION_CHARS;

        match image {
            Some(image) if has_description => self.diagnose(description, image).await,
            _ => self.gather_more_info(description, image.is_some(), has_description).await,
        }
    }

    async fn gather_more_info(
        &self,
        description: &str,
        has_image: bool,
        has_description: bool,
    ) -> AnalysisResult {
        let prompt = follow_up_prompt(description, has_image, has_description);

        match self.backend.generate(ModelRequest::text(prompt)).await {
            Ok(reply) => {
                let map = parse_json_reply(&reply);
                AnalysisResult {
                    response: str_field(&map, "response")
                        .unwrap_or_else(|| FOLLOW_UP_FALLBACK.to_string()),
                    diagnosis: None,
                    risk_level: None,
                    needs_more_info: true,
                    recommended_status: None,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Follow-up question generation failed");
                AnalysisResult {
                    response: FOLLOW_UP_FALLBACK.to_string(),
                    diagnosis: None,
                    risk_level: None,
                    needs_more_info: true,
                    recommended_status: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn diagnose(&self, description: &str, image: &Upload) -> AnalysisResult {
        let request = ModelRequest::text(diagnosis_prompt(description))
            .with_inline(image.content_type.clone(), image.data.clone());

        let reply = match self.backend.generate(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Diagnosis generation failed");
                return unavailable(e.to_string());
            }
        };

        let map = parse_json_reply(&reply);
        let diagnosis = match map.get("diagnosis").cloned().map(serde_json::from_value::<Diagnosis>) {
            Some(Ok(d)) => d,
            Some(Err(e)) => return unavailable(format!("Malformed diagnosis: {}", e)),
            None => {
                let reason = str_field(&map, "parse_error")
                    .unwrap_or_else(|| "Model reply had no diagnosis".to_string());
                return unavailable(reason);
            }
        };

        let risk_level = str_field(&map, "risk_level")
            .and_then(|r| RiskLevel::parse_loose(&r))
            .or_else(|| RiskLevel::parse_loose(&diagnosis.severity).or(Some(RiskLevel::Yellow)));

        let recommended_status = str_field(&map, "recommended_status")
            .and_then(|s| s.split_whitespace().next().map(str::to_string))
            .and_then(|s| s.parse::<TicketStatus>().ok());

        AnalysisResult {
            response: str_field(&map, "response").unwrap_or_else(|| diagnosis.explanation.clone()),
            diagnosis: Some(diagnosis),
            risk_level,
            needs_more_info: false,
            recommended_status,
            error: None,
        }
    }
}

fn unavailable(error: String) -> AnalysisResult {
    AnalysisResult {
        response: DIAGNOSIS_FALLBACK.to_string(),
        diagnosis: Some(Diagnosis::unavailable()),
        risk_level: Some(RiskLevel::Yellow),
        needs_more_info: false,
        recommended_status: Some(TicketStatus::Open),
        error: Some(error),
    }
}

fn follow_up_prompt(description: &str, has_image: bool, has_description: bool) -> String {
    let context = if description.is_empty() {
        "No description yet.".to_string()
    } else {
        format!("User: {}", description)
    };

    format!(
        r#"You are a helpful maintenance assistant for Fix-It AI.
Your goal is to gather enough information to diagnose a maintenance issue.

Current conversation:
{context}

Current status:
- Has image: {has_image}
- Has detailed description: {has_description}

Based on what's missing, ask a helpful follow-up question to better understand the issue.
If no image has been provided, politely ask if they can share a photo.
If the description is vague, ask specific questions about:
- Location of the issue
- When they first noticed it
- Any sounds, smells, or visible damage
- Whether it's affecting daily use

Keep your response conversational, brief, and helpful.
Return ONLY a JSON object:
{{
    "response": "Your follow-up question or message",
    "needs_more_info": true
}}"#
    )
}

fn diagnosis_prompt(description: &str) -> String {
    format!(
        r#"You are a Master Tradesperson with decades of experience in property maintenance.
Analyze this maintenance issue based on the description and image provided.

Description:
{description}

Provide a complete diagnosis. Return ONLY a JSON object:
{{
    "response": "A friendly summary explaining what you found",
    "diagnosis": {{
        "issue_title": "Brief title of the issue",
        "severity": "Low, Medium, or High",
        "estimated_cost_range": "Estimated repair cost in USD, e.g., '$50-$150'",
        "trade_category": "Electrical, Plumbing, HVAC, Roofing, General, Carpentry, Painting, Appliance",
        "explanation": "2-3 sentences explaining the issue",
        "recommended_action": "Immediate next step",
        "safety_warning": "Any safety concerns or 'None'",
        "can_diy": true/false,
        "diy_instructions": "If DIY is possible, brief instructions. Otherwise null"
    }},
    "risk_level": "Green (minor/cosmetic), Yellow (needs attention soon), or Red (urgent/safety issue)",
    "needs_more_info": false,
    "recommended_status": "Deflected (if DIY), Escalated (if needs pro), or Open (if unclear)"
}}

Risk Level Guidelines:
- GREEN: Cosmetic issues, minor wear, non-urgent items that can wait
- YELLOW: Functional issues that need attention within days/weeks, potential to worsen
- RED: Safety hazards, water damage, electrical issues, anything needing immediate professional attention"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scripted::ScriptedBackend;
    use serde_json::json;

    const DESCRIPTION: &str = "Water is dripping from the ceiling above my bathtub";

    fn photo() -> Upload {
        Upload::new("image/jpeg", vec![0xff, 0xd8, 0xff])
    }

    #[tokio::test]
    async fn test_asks_for_photo_without_image() {
        let backend = Arc::new(
            ScriptedBackend::new().with_reply(r#"{"response": "Could you share a photo?"}"#),
        );
        let diagnoser = Diagnoser::new(backend.clone());

        let result = diagnoser.analyze(DESCRIPTION, None).await;

        assert!(result.needs_more_info);
        assert!(result.diagnosis.is_none());
        assert_eq!(result.response, "Could you share a photo?");
        assert!(backend.last_prompt().contains("Has image: false"));
        assert!(!backend.requests()[0].has_attachment());
    }

    #[tokio::test]
    async fn test_short_description_needs_more_info() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("not json at all"));
        let diagnoser = Diagnoser::new(backend.clone());

        let result = diagnoser.analyze("leak", Some(&photo())).await;

        assert!(result.needs_more_info);
        assert_eq!(result.response, "not json at all");
        assert!(backend.last_prompt().contains("Has detailed description: false"));
    }

    #[tokio::test]
    async fn test_full_diagnosis() {
        let reply = json!({
            "response": "Looks like a failed tub drain seal.",
            "diagnosis": {
                "issue_title": "Leaking drain seal",
                "severity": "Medium",
                "estimated_cost_range": "$150-$300",
                "trade_category": "Plumbing",
                "explanation": "The seal has failed.",
                "recommended_action": "Call a plumber",
                "safety_warning": "None",
                "can_diy": false,
                "diy_instructions": null
            },
            "risk_level": "Yellow (needs attention soon)",
            "needs_more_info": false,
            "recommended_status": "Escalated (if needs pro)"
        });
        let backend = Arc::new(ScriptedBackend::new().with_reply(format!("```json\n{}\n```", reply)));
        let diagnoser = Diagnoser::new(backend.clone());

        let result = diagnoser.analyze(DESCRIPTION, Some(&photo())).await;

        assert!(!result.needs_more_info);
        let diagnosis = result.diagnosis.unwrap();
        assert_eq!(diagnosis.estimated_cost_range, "$150-$300");
        assert_eq!(result.risk_level, Some(RiskLevel::Yellow));
        assert_eq!(result.recommended_status, Some(TicketStatus::Escalated));
        assert!(backend.requests()[0].has_attachment());
    }

    #[tokio::test]
    async fn test_model_failure_returns_conservative_diagnosis() {
        let backend = Arc::new(ScriptedBackend::new().with_failure("timeout"));
        let diagnoser = Diagnoser::new(backend);

        let result = diagnoser.analyze(DESCRIPTION, Some(&photo())).await;

        assert_eq!(result.diagnosis, Some(Diagnosis::unavailable()));
        assert_eq!(result.risk_level, Some(RiskLevel::Yellow));
        assert_eq!(result.recommended_status, Some(TicketStatus::Open));
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_reply_without_diagnosis_is_unavailable() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("I can't see the image"));
        let diagnoser = Diagnoser::new(backend);

        let result = diagnoser.analyze(DESCRIPTION, Some(&photo())).await;

        assert_eq!(result.diagnosis.unwrap().estimated_cost_range, "Varies");
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_null_fields_keep_diagnosis() {
        let reply = json!({
            "response": "A loose P-trap under the sink.",
            "diagnosis": {
                "issue_title": "Loose P-trap",
                "severity": "Low",
                "estimated_cost_range": "$0-$20",
                "trade_category": "Plumbing",
                "explanation": null,
                "recommended_action": "Hand-tighten the slip nuts",
                "safety_warning": null,
                "can_diy": null,
                "diy_instructions": null
            },
            "risk_level": "Green"
        });
        let backend = Arc::new(ScriptedBackend::new().with_reply(reply.to_string()));
        let diagnoser = Diagnoser::new(backend);

        let result = diagnoser.analyze(DESCRIPTION, Some(&photo())).await;

        assert!(result.error.is_none());
        let diagnosis = result.diagnosis.unwrap();
        assert_eq!(diagnosis.issue_title, "Loose P-trap");
        assert_eq!(diagnosis.safety_warning, "");
        assert_eq!(diagnosis.explanation, "");
        assert!(!diagnosis.can_diy);
        assert_eq!(result.risk_level, Some(RiskLevel::Green));
    }
}
