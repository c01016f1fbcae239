//! Move-in / Move-out Video Audit
//!
//! A move-in walkthrough becomes the unit's baseline. A move-out walkthrough is
//! compared against that baseline and only new damage is reported.
//!
//! Both modes upload the video to the model's file store, ask for a JSON
//! report, then delete the upload. Rows for the admin dashboard are written as
//! one audit item per room (move-in) or per new damage (move-out).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::ai::reply::{bool_field, str_field};
use crate::ai::{parse_json_reply, ModelBackend, ModelRequest};
use crate::media::Upload;
use crate::storage::{NewAuditItem, Store, StorageError};

/// Which walkthrough is being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditMode {
    #[serde(rename = "move-in")]
    MoveIn,
    #[serde(rename = "move-out")]
    MoveOut,
}

impl AuditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditMode::MoveIn => "move-in",
            AuditMode::MoveOut => "move-out",
        }
    }
}

impl FromStr for AuditMode {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "move-in" => Ok(AuditMode::MoveIn),
            "move-out" => Ok(AuditMode::MoveOut),
            other => Err(AuditError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for AuditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("mode must be 'move-in' or 'move-out', got '{0}'")]
    InvalidMode(String),

    #[error("No move-in baseline found for unit '{0}'")]
    NoBaseline(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of one audit
///
/// `fields` carries the model's report as-is (rooms, new_damages,
/// deductions...). The remaining fields are filled in locally and win over
/// any same-named keys the model returns.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub unit_id: String,
    pub mode: AuditMode,
    pub success: bool,
    pub audit_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AuditReport {
    fn new(unit_id: &str, mode: AuditMode, mut fields: Map<String, Value>) -> Self {
        for key in ["unit_id", "mode", "success", "audit_date", "error", "saved"] {
            fields.remove(key);
        }

        Self {
            unit_id: unit_id.to_string(),
            mode,
            success: true,
            audit_date: Utc::now().to_rfc3339(),
            error: None,
            saved: None,
            fields,
        }
    }

    fn failed(unit_id: &str, mode: AuditMode, error: impl Into<String>) -> Self {
        let mut report = Self::new(unit_id, mode, Map::new());
        report.success = false;
        report.error = Some(error.into());
        match mode {
            AuditMode::MoveIn => {
                report.fields.insert("baseline_description".to_string(), Value::Null);
            }
            AuditMode::MoveOut => {
                report.fields.insert("new_damages".to_string(), Value::Array(Vec::new()));
            }
        }
        report
    }

    /// Text stored as the unit's baseline
    pub fn baseline_summary(&self) -> Option<String> {
        str_field(&self.fields, "baseline_description")
            .or_else(|| str_field(&self.fields, "unit_summary"))
    }

    /// One item per documented room
    pub fn room_items(&self) -> Vec<NewAuditItem> {
        objects(&self.fields, "rooms")
            .map(|room| {
                let name = str_field(room, "name").unwrap_or_else(|| "Unknown".to_string());
                NewAuditItem {
                    item: str_field(room, "details").unwrap_or_else(|| name.clone()),
                    room: name,
                    condition: str_field(room, "overall_condition")
                        .unwrap_or_else(|| "Unknown".to_string()),
                    is_new: false,
                    estimated_cost: None,
                }
            })
            .collect()
    }

    /// One item per damage not present at move-in
    pub fn damage_items(&self) -> Vec<NewAuditItem> {
        objects(&self.fields, "new_damages")
            .map(|damage| {
                let mut condition =
                    str_field(damage, "severity").unwrap_or_else(|| "Unknown".to_string());
                if bool_field(damage, "wear_and_tear") == Some(true) {
                    condition.push_str(" (wear and tear)");
                }
                NewAuditItem {
                    item: str_field(damage, "description")
                        .unwrap_or_else(|| "Unspecified damage".to_string()),
                    room: str_field(damage, "location").unwrap_or_else(|| "Unknown".to_string()),
                    condition,
                    is_new: true,
                    estimated_cost: str_field(damage, "estimated_repair_cost"),
                }
            })
            .collect()
    }

    pub fn new_damage_count(&self) -> usize {
        objects(&self.fields, "new_damages").count()
    }
}

fn objects<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    map.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Runs audits and records their results
pub struct VideoAuditor {
    backend: Arc<dyn ModelBackend>,
    store: Arc<Store>,
}

impl VideoAuditor {
    pub fn new(backend: Arc<dyn ModelBackend>, store: Arc<Store>) -> Self {
        Self { backend, store }
    }

    pub async fn run(
        &self,
        mode: AuditMode,
        unit_id: &str,
        video: Upload,
    ) -> Result<AuditReport, AuditError> {
        match mode {
            AuditMode::MoveIn => self.move_in(unit_id, video).await,
            AuditMode::MoveOut => self.move_out(unit_id, video).await,
        }
    }

    /// Record a baseline for the unit, replacing any previous one
    pub async fn move_in(&self, unit_id: &str, video: Upload) -> Result<AuditReport, AuditError> {
        let mut report = self
            .analyze_video(AuditMode::MoveIn, unit_id, video, move_in_prompt())
            .await;

        if !report.success {
            return Ok(report);
        }

        let Some(summary) = report.baseline_summary() else {
            tracing::warn!(unit_id = %unit_id, "Move-in report had no baseline description");
            return Ok(report);
        };

        let baseline_json = Value::Object(report.fields.clone());
        let rooms = report.room_items();
        self.store
            .replace_move_in(unit_id, &summary, Some(&baseline_json), &rooms)?;
        report.saved = Some(true);

        tracing::info!(unit_id = %unit_id, rooms = rooms.len(), "Saved move-in baseline");
        Ok(report)
    }

    /// Compare against the stored baseline and record new damage
    pub async fn move_out(&self, unit_id: &str, video: Upload) -> Result<AuditReport, AuditError> {
        let baseline = self
            .store
            .get_baseline(unit_id)?
            .and_then(|b| b.move_in_video_summary)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AuditError::NoBaseline(unit_id.to_string()))?;

        let report = self
            .analyze_video(AuditMode::MoveOut, unit_id, video, move_out_prompt(&baseline))
            .await;

        if report.success {
            let damages = self.store.insert_audit_items(unit_id, &report.damage_items())?;
            tracing::info!(unit_id = %unit_id, damages, "Recorded move-out audit");
        }

        Ok(report)
    }

    async fn analyze_video(
        &self,
        mode: AuditMode,
        unit_id: &str,
        video: Upload,
        prompt: String,
    ) -> AuditReport {
        let mime_type = video.content_type.clone();
        let size = video.len();

        let handle = match self.backend.upload_media(video.data, &mime_type).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(unit_id = %unit_id, %mode, error = %e, "Video upload failed");
                return AuditReport::failed(unit_id, mode, e.to_string());
            }
        };
        tracing::debug!(unit_id = %unit_id, media = %handle.name, size, "Video uploaded");

        let request = ModelRequest::text(prompt).with_media(handle.clone());
        let result = self.backend.generate(request).await;

        if let Err(e) = self.backend.delete_media(&handle).await {
            tracing::warn!(media = %handle.name, error = %e, "Failed to delete uploaded video");
        }

        match result {
            Ok(reply) => AuditReport::new(unit_id, mode, parse_json_reply(&reply)),
            Err(e) => {
                tracing::error!(unit_id = %unit_id, %mode, error = %e, "Video analysis failed");
                AuditReport::failed(unit_id, mode, e.to_string())
            }
        }
    }
}

fn move_in_prompt() -> String {
    r#"You are a professional property inspector conducting a move-in inspection.
Analyze this video walkthrough and create a detailed baseline description of the unit's condition.

For each room or area visible, document:
1. Overall condition (Excellent, Good, Fair, Poor)
2. Walls: paint condition, marks, holes, damage
3. Floors: type, condition, scratches, stains
4. Ceilings: condition, stains, cracks
5. Windows and doors: condition, operation notes
6. Fixtures: lights, outlets, switches
7. Appliances (if visible): condition, any damage
8. Bathroom fixtures (if visible): sink, toilet, tub or shower
9. Any existing damage or wear that should be documented

This baseline will be compared against the move-out walkthrough.

Return ONLY a JSON object:
{
    "unit_summary": "Brief overall description of the unit",
    "rooms": [
        {
            "name": "Room name (e.g., Living Room, Kitchen, Bedroom 1)",
            "overall_condition": "Excellent/Good/Fair/Poor",
            "details": "Condition and any existing damage"
        }
    ],
    "existing_damage": ["Pre-existing damage items"],
    "baseline_description": "A comprehensive narrative suitable for future comparison",
    "notes": "Any additional observations"
}"#
    .to_string()
}

fn move_out_prompt(baseline: &str) -> String {
    format!(
        r#"You are a professional property inspector conducting a move-out inspection.
Compare this video walkthrough against the move-in baseline and identify ONLY NEW damage.

MOVE-IN BASELINE DESCRIPTION:
{baseline}

Your task:
1. Watch the move-out video carefully
2. Compare the current condition against the baseline
3. List only damage that is NOT documented in the baseline
4. Decide whether each item is normal wear and tear or tenant-caused

Return ONLY a JSON object:
{{
    "unit_summary": "Brief overall assessment of move-out condition",
    "comparison_result": "Better than baseline / Same as baseline / Worse than baseline",
    "new_damages": [
        {{
            "location": "Room or area",
            "description": "What the damage is",
            "severity": "Minor / Moderate / Severe",
            "wear_and_tear": true,
            "estimated_repair_cost": "Cost estimate in USD",
            "notes": "Additional context"
        }}
    ],
    "deductions_recommended": [
        {{
            "item": "Damage item",
            "amount": "Dollar amount",
            "justification": "Why this is the tenant's responsibility"
        }}
    ],
    "total_estimated_deductions": "Total dollar amount",
    "notes": "Any additional observations"
}}

Be fair: normal wear and tear is the landlord's responsibility."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scripted::ScriptedBackend;
    use serde_json::json;

    fn video() -> Upload {
        Upload::new("video/mp4", vec![0u8; 64])
    }

    fn move_in_reply() -> String {
        json!({
            "unit_summary": "Two bedroom unit in good shape",
            "rooms": [
                {"name": "Kitchen", "overall_condition": "Good", "details": "Small chip on counter"},
                {"name": "Bathroom", "overall_condition": "Excellent", "details": "Like new"}
            ],
            "existing_damage": ["Chip on kitchen counter"],
            "baseline_description": "Kitchen counter has a small chip. Bathroom like new.",
            "unit_id": "spoofed"
        })
        .to_string()
    }

    fn auditor(backend: Arc<ScriptedBackend>) -> (VideoAuditor, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        (VideoAuditor::new(backend, store.clone()), store)
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("move-in".parse::<AuditMode>().unwrap(), AuditMode::MoveIn);
        assert_eq!("move-out".parse::<AuditMode>().unwrap(), AuditMode::MoveOut);
        assert!(matches!(
            "inspection".parse::<AuditMode>(),
            Err(AuditError::InvalidMode(_))
        ));
    }

    #[tokio::test]
    async fn test_move_in_saves_baseline_and_rooms() {
        let backend = Arc::new(ScriptedBackend::new().with_reply(move_in_reply()));
        let (auditor, store) = auditor(backend.clone());

        let report = auditor.move_in("4B", video()).await.unwrap();

        assert!(report.success);
        assert_eq!(report.saved, Some(true));
        assert_eq!(report.unit_id, "4B");

        let baseline = store.get_baseline("4B").unwrap().unwrap();
        assert_eq!(
            baseline.move_in_video_summary.as_deref(),
            Some("Kitchen counter has a small chip. Bathroom like new.")
        );
        assert!(baseline.baseline_json.is_some());

        let items = store.list_audit_items("4B").unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.is_new));

        assert_eq!(backend.uploaded(), vec!["files/test-0:video/mp4:64"]);
        assert_eq!(backend.deleted(), vec!["files/test-0"]);
        assert!(backend.requests()[0].has_attachment());
    }

    #[tokio::test]
    async fn test_repeat_move_in_replaces_rooms() {
        let second = json!({
            "unit_summary": "Repainted unit",
            "rooms": [{"name": "Living Room", "overall_condition": "Excellent", "details": "Fresh paint"}],
            "baseline_description": "Living room freshly painted."
        })
        .to_string();
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply(move_in_reply())
                .with_reply(second),
        );
        let (auditor, store) = auditor(backend);

        auditor.move_in("4B", video()).await.unwrap();
        auditor.move_in("4B", video()).await.unwrap();

        let items = store.list_audit_items("4B").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].room, "Living Room");
        assert_eq!(
            store.get_baseline("4B").unwrap().unwrap().move_in_video_summary.as_deref(),
            Some("Living room freshly painted.")
        );
    }

    #[tokio::test]
    async fn test_move_out_requires_baseline() {
        let backend = Arc::new(ScriptedBackend::new());
        let (auditor, _store) = auditor(backend.clone());

        let err = auditor.move_out("9Z", video()).await.unwrap_err();

        assert!(matches!(err, AuditError::NoBaseline(ref unit) if unit == "9Z"));
        assert!(backend.uploaded().is_empty());
    }

    #[tokio::test]
    async fn test_move_out_records_new_damage() {
        let move_out = json!({
            "comparison_result": "Worse than baseline",
            "new_damages": [
                {
                    "location": "Living Room",
                    "description": "Hole in drywall",
                    "severity": "Moderate",
                    "wear_and_tear": false,
                    "estimated_repair_cost": "$200"
                },
                {
                    "location": "Bedroom",
                    "description": "Faded paint",
                    "severity": "Minor",
                    "wear_and_tear": true
                }
            ],
            "total_estimated_deductions": "$200"
        });
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply(move_in_reply())
                .with_reply(move_out.to_string()),
        );
        let (auditor, store) = auditor(backend.clone());

        auditor.move_in("4B", video()).await.unwrap();
        let report = auditor.move_out("4B", video()).await.unwrap();

        assert!(report.success);
        assert_eq!(report.new_damage_count(), 2);
        assert!(backend.last_prompt().contains("Kitchen counter has a small chip"));

        let damages: Vec<_> = store
            .list_audit_items("4B")
            .unwrap()
            .into_iter()
            .filter(|i| i.is_new)
            .collect();
        assert_eq!(damages.len(), 2);
        let hole = damages.iter().find(|d| d.item == "Hole in drywall").unwrap();
        assert_eq!(hole.estimated_cost.as_deref(), Some("$200"));
        let paint = damages.iter().find(|d| d.item == "Faded paint").unwrap();
        assert_eq!(paint.condition, "Minor (wear and tear)");
    }

    #[tokio::test]
    async fn test_model_failure_is_reported_not_saved() {
        let backend = Arc::new(ScriptedBackend::new().with_failure("quota exceeded"));
        let (auditor, store) = auditor(backend.clone());

        let report = auditor.move_in("4B", video()).await.unwrap();

        assert!(!report.success);
        assert!(report.error.unwrap().contains("quota exceeded"));
        assert!(store.get_baseline("4B").unwrap().is_none());
        assert_eq!(backend.deleted().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure() {
        let backend = Arc::new(ScriptedBackend::new().failing_uploads());
        let (auditor, _store) = auditor(backend.clone());

        let report = auditor.move_in("4B", video()).await.unwrap();

        assert!(!report.success);
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn test_report_serialization_overrides_model_keys() {
        let fields = parse_json_reply(&move_in_reply());
        let report = AuditReport::new("4B", AuditMode::MoveIn, fields);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["unit_id"], "4B");
        assert_eq!(value["mode"], "move-in");
        assert_eq!(value["rooms"].as_array().unwrap().len(), 2);
    }
}
