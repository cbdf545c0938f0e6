use std::collections::HashSet;

/// Multi-select state for bulk operations. Tasks and stages are selected
/// independently.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    tasks: HashSet<i64>,
    stages: HashSet<String>,
}

impl Selection {
    pub fn toggle_task(&mut self, task_id: i64) {
        if !self.tasks.insert(task_id) {
            self.tasks.remove(&task_id);
        }
    }

    pub fn toggle_stage(&mut self, stage_id: &str) {
        if !self.stages.insert(stage_id.to_string()) {
            self.stages.remove(stage_id);
        }
    }

    pub fn select_tasks<I: IntoIterator<Item = i64>>(&mut self, task_ids: I) {
        self.tasks = task_ids.into_iter().collect();
    }

    pub fn select_stages<I: IntoIterator<Item = String>>(&mut self, stage_ids: I) {
        self.stages = stage_ids.into_iter().collect();
    }

    pub fn clear_tasks(&mut self) {
        self.tasks.clear();
    }

    pub fn clear_stages(&mut self) {
        self.stages.clear();
    }

    pub fn is_task_selected(&self, task_id: i64) -> bool {
        self.tasks.contains(&task_id)
    }

    pub fn is_stage_selected(&self, stage_id: &str) -> bool {
        self.stages.contains(stage_id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn task_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.tasks.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn stage_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stages.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop selected ids that no longer exist in the refreshed snapshot
    pub fn retain_existing(&mut self, task_ids: &HashSet<i64>, stage_ids: &HashSet<String>) {
        self.tasks.retain(|id| task_ids.contains(id));
        self.stages.retain(|id| stage_ids.contains(id));
    }
}
