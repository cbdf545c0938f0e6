// Stage copy/paste. Two sources, tried in order: the in-memory copy made
// in this session, then the system clipboard (which may hold a payload
// copied from another client, or arbitrary unrelated text). System
// clipboard trouble is never surfaced: the in-memory path keeps working.

use anyhow::Result;

use crate::models::{ClientStage, StageSkeleton};

/// Plain-text clipboard access. Split out as a trait so tests can swap in
/// an in-process fake instead of the real system clipboard.
pub trait PlatformClipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
    fn read_text(&mut self) -> Result<String>;
}

/// System clipboard backed by arboard. Construction is lazy and failure is
/// remembered, so a headless environment degrades to in-memory-only.
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                log::warn!("system clipboard unavailable: {}", e);
                None
            }
        };
        Self { inner }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformClipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        match &mut self.inner {
            Some(clipboard) => {
                clipboard.set_text(text.to_string())?;
                Ok(())
            }
            None => anyhow::bail!("system clipboard unavailable"),
        }
    }

    fn read_text(&mut self) -> Result<String> {
        match &mut self.inner {
            Some(clipboard) => Ok(clipboard.get_text()?),
            None => anyhow::bail!("system clipboard unavailable"),
        }
    }
}

/// Where keyboard focus is when a shortcut arrives. Paste must never steal
/// Ctrl+V from a focused text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusContext {
    TextInput,
    Board,
}

/// Validate a clipboard string as a stage payload: JSON with a non-empty
/// `stage_name` string and a `tasks` array. Anything else is None.
pub fn parse_payload(text: &str) -> Option<StageSkeleton> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let name_ok = value
        .get("stage_name")
        .and_then(|v| v.as_str())
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    let tasks_ok = value.get("tasks").map(|v| v.is_array()).unwrap_or(false);
    if !name_ok || !tasks_ok {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Holds the in-memory copied stage and bridges to the system clipboard
pub struct StageClipboard<C: PlatformClipboard> {
    copied: Option<StageSkeleton>,
    platform: C,
}

impl StageClipboard<SystemClipboard> {
    pub fn system() -> Self {
        Self::with_platform(SystemClipboard::new())
    }
}

impl<C: PlatformClipboard> StageClipboard<C> {
    pub fn with_platform(platform: C) -> Self {
        Self {
            copied: None,
            platform,
        }
    }

    pub fn has_copy(&self) -> bool {
        self.copied.is_some()
    }

    /// Snapshot a stage. The payload is held in memory and, best-effort,
    /// written to the system clipboard as JSON for cross-client transfer.
    pub fn copy_stage(&mut self, stage: &ClientStage) -> StageSkeleton {
        let payload = StageSkeleton::capture(stage);
        if let Ok(json) = serde_json::to_string(&payload) {
            if let Err(e) = self.platform.write_text(&json) {
                log::warn!("could not write stage to system clipboard: {}", e);
            }
        }
        self.copied = Some(payload.clone());
        payload
    }

    /// Resolve the payload to paste: in-memory copy first, then a
    /// validated read of the system clipboard. None means nothing pasteable
    /// anywhere, which is an expected outcome, not an error.
    pub fn take_payload(&mut self) -> Option<StageSkeleton> {
        if let Some(payload) = &self.copied {
            return Some(payload.clone());
        }
        match self.platform.read_text() {
            Ok(text) => parse_payload(&text),
            Err(_) => None,
        }
    }

    /// Shortcut predicate for Ctrl/Cmd+V: fires only outside text inputs
    /// and only when an in-memory copy exists (the system-clipboard
    /// fallback is reserved for the explicit paste action)
    pub fn shortcut_triggers_paste(
        &self,
        ctrl_or_cmd: bool,
        key: char,
        focus: FocusContext,
    ) -> bool {
        ctrl_or_cmd
            && key.eq_ignore_ascii_case(&'v')
            && focus != FocusContext::TextInput
            && self.has_copy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StageIcon, StageTask};

    /// In-process clipboard double; `fail_writes` simulates denial
    #[derive(Default)]
    struct FakeClipboard {
        text: Option<String>,
        fail_writes: bool,
    }

    impl PlatformClipboard for FakeClipboard {
        fn write_text(&mut self, text: &str) -> Result<()> {
            if self.fail_writes {
                anyhow::bail!("denied");
            }
            self.text = Some(text.to_string());
            Ok(())
        }

        fn read_text(&mut self) -> Result<String> {
            self.text.clone().ok_or_else(|| anyhow::anyhow!("empty"))
        }
    }

    fn sample_stage() -> ClientStage {
        let mut stage = ClientStage::new("c1", "contact", "Contact", StageIcon::Phone, 0);
        let mut task = StageTask::new("c1", "contact", "Call", 0);
        task.completed = true;
        stage.tasks.push(task);
        stage
    }

    #[test]
    fn test_copy_keeps_in_memory_and_writes_platform() {
        let mut clipboard = StageClipboard::with_platform(FakeClipboard::default());
        clipboard.copy_stage(&sample_stage());
        assert!(clipboard.has_copy());
        let written = clipboard.platform.text.clone().unwrap();
        assert!(written.contains("\"stage_name\":\"Contact\""));
    }

    #[test]
    fn test_copy_survives_platform_denial() {
        let mut clipboard = StageClipboard::with_platform(FakeClipboard {
            fail_writes: true,
            ..Default::default()
        });
        clipboard.copy_stage(&sample_stage());
        assert!(clipboard.has_copy());
        assert!(clipboard.take_payload().is_some());
    }

    #[test]
    fn test_copy_is_a_snapshot() {
        let mut clipboard = StageClipboard::with_platform(FakeClipboard::default());
        let mut stage = sample_stage();
        clipboard.copy_stage(&stage);

        // Edit the source after copying
        stage.stage_name = "Renamed".to_string();
        stage.tasks.clear();

        let payload = clipboard.take_payload().unwrap();
        assert_eq!(payload.stage_name, "Contact");
        assert_eq!(payload.tasks.len(), 1);
    }

    #[test]
    fn test_paste_falls_back_to_platform() {
        let mut clipboard = StageClipboard::with_platform(FakeClipboard {
            text: Some(r#"{"stage_name":"From elsewhere","tasks":[{"title":"T"}]}"#.into()),
            fail_writes: false,
        });
        let payload = clipboard.take_payload().unwrap();
        assert_eq!(payload.stage_name, "From elsewhere");
        assert_eq!(payload.tasks.len(), 1);
        assert!(!payload.tasks[0].completed);
    }

    #[test]
    fn test_unrelated_clipboard_text_is_silent_noop() {
        let mut clipboard = StageClipboard::with_platform(FakeClipboard {
            text: Some("hello".into()),
            fail_writes: false,
        });
        assert!(clipboard.take_payload().is_none());
    }

    #[test]
    fn test_payload_validation() {
        assert!(parse_payload(r#"{"stage_name":"S","tasks":[]}"#).is_some());
        // Missing tasks
        assert!(parse_payload(r#"{"stage_name":"S"}"#).is_none());
        // Empty name
        assert!(parse_payload(r#"{"stage_name":"  ","tasks":[]}"#).is_none());
        // tasks not an array
        assert!(parse_payload(r#"{"stage_name":"S","tasks":3}"#).is_none());
        // Not JSON at all
        assert!(parse_payload("hello").is_none());
        // Task entry missing its title
        assert!(parse_payload(r#"{"stage_name":"S","tasks":[{"completed":true}]}"#).is_none());
    }

    #[test]
    fn test_shortcut_requires_copy_and_board_focus() {
        let mut clipboard = StageClipboard::with_platform(FakeClipboard::default());
        assert!(!clipboard.shortcut_triggers_paste(true, 'v', FocusContext::Board));

        clipboard.copy_stage(&sample_stage());
        assert!(clipboard.shortcut_triggers_paste(true, 'v', FocusContext::Board));
        assert!(clipboard.shortcut_triggers_paste(true, 'V', FocusContext::Board));
        assert!(!clipboard.shortcut_triggers_paste(true, 'v', FocusContext::TextInput));
        assert!(!clipboard.shortcut_triggers_paste(false, 'v', FocusContext::Board));
        assert!(!clipboard.shortcut_triggers_paste(true, 'c', FocusContext::Board));
    }
}
