use serde::{Deserialize, Serialize};

use crate::models::{ClientStage, StageIcon};

/// A task skeleton inside a template: title plus completion flag, nothing else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// A stage stripped of identity and timer state, ready to be instantiated
/// under a fresh stage_id on any client. This is also the clipboard payload
/// shape, so the serde field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSkeleton {
    pub stage_name: String,
    #[serde(default, deserialize_with = "icon_or_default")]
    pub stage_icon: StageIcon,
    pub tasks: Vec<TemplateTask>,
}

/// Payloads from other sources may carry a null or unrecognized icon;
/// both fall back to the default
fn icon_or_default<'de, D>(deserializer: D) -> Result<StageIcon, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(StageIcon::parse(name.as_deref()))
}

impl StageSkeleton {
    /// Snapshot a stage into a skeleton. Task order is preserved, identity
    /// and timer fields are dropped.
    pub fn capture(stage: &ClientStage) -> Self {
        Self {
            stage_name: stage.stage_name.clone(),
            stage_icon: stage.stage_icon,
            tasks: stage
                .tasks
                .iter()
                .map(|t| TemplateTask {
                    title: t.title.clone(),
                    completed: t.completed,
                })
                .collect(),
        }
    }
}

/// A named, persisted collection of stage skeletons (single stage or a
/// whole board)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardTemplate {
    pub id: Option<i64>,
    pub name: String,
    pub stages: Vec<StageSkeleton>,
    pub created_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StageTask;

    #[test]
    fn test_capture_strips_identity_and_timers() {
        let mut stage = ClientStage::new("c1", "contact", "Contact", StageIcon::Send, 3);
        stage.started_ts = Some(1_700_000_000);
        stage.target_working_days = Some(7);
        let mut done = StageTask::new("c1", "contact", "Call", 0);
        done.completed = true;
        done.completed_ts = Some(1_700_000_100);
        stage.tasks.push(done);
        stage.tasks.push(StageTask::new("c1", "contact", "Send docs", 1));

        let skeleton = StageSkeleton::capture(&stage);
        assert_eq!(skeleton.stage_name, "Contact");
        assert_eq!(skeleton.stage_icon, StageIcon::Send);
        assert_eq!(skeleton.tasks.len(), 2);
        assert_eq!(skeleton.tasks[0].title, "Call");
        assert!(skeleton.tasks[0].completed);
        assert!(!skeleton.tasks[1].completed);
    }

    #[test]
    fn test_skeleton_json_shape() {
        let skeleton = StageSkeleton {
            stage_name: "Contact".into(),
            stage_icon: StageIcon::Phone,
            tasks: vec![TemplateTask { title: "Call".into(), completed: false }],
        };
        let json = serde_json::to_string(&skeleton).unwrap();
        assert!(json.contains("\"stage_name\":\"Contact\""));
        assert!(json.contains("\"tasks\""));
        let back: StageSkeleton = serde_json::from_str(&json).unwrap();
        assert_eq!(back, skeleton);
    }

    #[test]
    fn test_null_or_unknown_icon_falls_back() {
        let s: StageSkeleton =
            serde_json::from_str(r#"{"stage_name":"S","stage_icon":null,"tasks":[]}"#).unwrap();
        assert_eq!(s.stage_icon, StageIcon::Phone);
        let s: StageSkeleton =
            serde_json::from_str(r#"{"stage_name":"S","stage_icon":"Rocket","tasks":[]}"#).unwrap();
        assert_eq!(s.stage_icon, StageIcon::Phone);
        let s: StageSkeleton = serde_json::from_str(r#"{"stage_name":"S","tasks":[]}"#).unwrap();
        assert_eq!(s.stage_icon, StageIcon::Phone);
    }
}
