// Template workflows: capture a board (or one stage) as a reusable named
// skeleton collection, and apply a saved template to any client. Applying
// reuses the paste append semantics, one stage at a time.

use anyhow::Result;

use crate::models::{BoardTemplate, ClientStage, StageSkeleton};
use crate::store::StageStore;

/// Capture every stage on the board, in sort order, stripped of identity
/// and timer state
pub fn capture_board(stages: &[ClientStage]) -> Vec<StageSkeleton> {
    let mut ordered: Vec<&ClientStage> = stages.iter().collect();
    ordered.sort_by_key(|s| s.sort_order);
    ordered.iter().map(|s| StageSkeleton::capture(s)).collect()
}

/// Save one stage as a named template
pub fn save_stage_template<S: StageStore>(
    store: &mut S,
    name: &str,
    stage: &ClientStage,
) -> Result<()> {
    store.save_template(name, &[StageSkeleton::capture(stage)])
}

/// Save the whole board as a named template
pub fn save_board_template<S: StageStore>(
    store: &mut S,
    name: &str,
    stages: &[ClientStage],
) -> Result<()> {
    store.save_template(name, &capture_board(stages))
}

/// Instantiate every stage of a template onto the client's board, appended
/// in template order. Returns the created stages.
pub fn apply_template<S: StageStore>(
    store: &mut S,
    client_id: &str,
    template: &BoardTemplate,
) -> Result<Vec<ClientStage>> {
    let mut created = Vec::with_capacity(template.stages.len());
    for skeleton in &template.stages {
        created.push(store.paste_stage(client_id, skeleton)?);
    }
    Ok(created)
}

/// Copy a whole board from one client to another, skeleton by skeleton
pub fn copy_board<S: StageStore>(
    store: &mut S,
    from_client: &str,
    to_client: &str,
) -> Result<Vec<ClientStage>> {
    let stages = store.fetch_stages(from_client)?;
    let skeletons = capture_board(&stages);
    let mut created = Vec::with_capacity(skeletons.len());
    for skeleton in &skeletons {
        created.push(store.paste_stage(to_client, skeleton)?);
    }
    Ok(created)
}
