use serde::{Deserialize, Serialize};

use crate::models::task::StageTask;

/// Icon shown on a stage card. The set is fixed; anything unrecognized
/// falls back to Phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageIcon {
    Phone,
    FolderOpen,
    Send,
    MapPin,
}

impl StageIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageIcon::Phone => "Phone",
            StageIcon::FolderOpen => "FolderOpen",
            StageIcon::Send => "Send",
            StageIcon::MapPin => "MapPin",
        }
    }

    /// Parse an icon name, falling back to Phone for unknown or missing values
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("FolderOpen") => StageIcon::FolderOpen,
            Some("Send") => StageIcon::Send,
            Some("MapPin") => StageIcon::MapPin,
            _ => StageIcon::Phone,
        }
    }
}

impl Default for StageIcon {
    fn default() -> Self {
        StageIcon::Phone
    }
}

/// One pipeline step on a client's board, with its ordered tasks.
///
/// `stage_id` is either a well-known literal (the seeded defaults) or a
/// generated `custom_<uuid>`. `sort_order` defines the board position;
/// only the relative order matters, gaps are fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStage {
    pub id: Option<i64>,
    pub client_id: String,
    pub stage_id: String,
    pub stage_name: String,
    pub stage_icon: StageIcon,
    pub sort_order: i64,
    pub folder_id: Option<String>,
    pub tasks: Vec<StageTask>,
    // Timer state: started_ts and target_working_days are set and cleared
    // together. timer_display_style is 1-5.
    pub started_ts: Option<i64>,
    pub target_working_days: Option<i64>,
    pub timer_display_style: i64,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl ClientStage {
    /// Create a new stage skeleton (not yet persisted)
    pub fn new(client_id: &str, stage_id: &str, stage_name: &str, stage_icon: StageIcon, sort_order: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            client_id: client_id.to_string(),
            stage_id: stage_id.to_string(),
            stage_name: stage_name.to_string(),
            stage_icon,
            sort_order,
            folder_id: None,
            tasks: Vec::new(),
            started_ts: None,
            target_working_days: None,
            timer_display_style: 1,
            created_ts: now,
            modified_ts: now,
        }
    }

    /// Generate a fresh identifier for a user-created stage
    pub fn custom_id() -> String {
        format!("custom_{}", uuid::Uuid::new_v4())
    }

    /// Whether a deadline timer is currently running on this stage
    pub fn timer_active(&self) -> bool {
        self.started_ts.is_some() && self.target_working_days.is_some()
    }
}

/// Stages seeded onto a fresh board: (stage_id, name, icon).
/// Deleting them is allowed and they are not restored.
pub const DEFAULT_STAGES: &[(&str, &str, StageIcon)] = &[
    ("contact", "Client contact", StageIcon::Phone),
    ("info", "Information file", StageIcon::FolderOpen),
    ("submission", "Submission", StageIcon::Send),
    ("control", "Site inspection", StageIcon::MapPin),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_round_trip() {
        assert_eq!(StageIcon::parse(Some("Phone")), StageIcon::Phone);
        assert_eq!(StageIcon::parse(Some("FolderOpen")), StageIcon::FolderOpen);
        assert_eq!(StageIcon::parse(Some("Send")), StageIcon::Send);
        assert_eq!(StageIcon::parse(Some("MapPin")), StageIcon::MapPin);
    }

    #[test]
    fn test_icon_fallback() {
        assert_eq!(StageIcon::parse(None), StageIcon::Phone);
        assert_eq!(StageIcon::parse(Some("Rocket")), StageIcon::Phone);
        assert_eq!(StageIcon::default(), StageIcon::Phone);
    }

    #[test]
    fn test_custom_id_prefix() {
        let id = ClientStage::custom_id();
        assert!(id.starts_with("custom_"));
        assert_ne!(id, ClientStage::custom_id());
    }

    #[test]
    fn test_timer_active() {
        let mut stage = ClientStage::new("c1", "contact", "Contact", StageIcon::Phone, 0);
        assert!(!stage.timer_active());
        stage.started_ts = Some(1_700_000_000);
        stage.target_working_days = Some(10);
        assert!(stage.timer_active());
    }
}
