// Output formatting utilities

use anyhow::Result;
use chrono::NaiveDate;

use crate::badge::{render, BadgeStyle};
use crate::models::{ClientStage, StageTask};
use crate::progress::{progress, StagePhase, StageProgressModel};
use crate::workdays::{calculate_day_counter, WorkCalendar};

fn ts_to_date(ts: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

/// Render the timer badge for a stage or task, if one is running.
/// A stored target that can no longer be computed (bad data) renders as
/// no badge rather than an error.
pub fn timer_badge(
    started_ts: Option<i64>,
    target_working_days: Option<i64>,
    style_index: i64,
    completed_ts: Option<i64>,
    today: NaiveDate,
    calendar: &WorkCalendar,
) -> Option<String> {
    let started_on = ts_to_date(started_ts?)?;
    let target = target_working_days?;
    let completed_on = completed_ts.and_then(ts_to_date);
    let counter = calculate_day_counter(started_on, completed_on, target, today, calendar).ok()?;
    Some(render(
        BadgeStyle::from_index(style_index),
        &counter,
        target,
        started_on,
        calendar,
    ))
}

fn stage_badge(stage: &ClientStage, today: NaiveDate, calendar: &WorkCalendar) -> Option<String> {
    timer_badge(
        stage.started_ts,
        stage.target_working_days,
        stage.timer_display_style,
        None,
        today,
        calendar,
    )
}

fn task_badge(task: &StageTask, today: NaiveDate, calendar: &WorkCalendar) -> Option<String> {
    timer_badge(
        task.started_ts,
        task.target_working_days,
        task.timer_display_style,
        task.completed_ts,
        today,
        calendar,
    )
}

fn phase_label(phase: StagePhase) -> &'static str {
    match phase {
        StagePhase::Completed => "done",
        StagePhase::Active => "active",
        StagePhase::Future => "queued",
    }
}

fn completed_count(stage: &ClientStage) -> usize {
    stage.tasks.iter().filter(|t| t.completed).count()
}

/// Compact one-line-per-stage table view of the board
pub fn format_board_table(
    model: &StageProgressModel,
    stages: &[&ClientStage],
    today: NaiveDate,
    calendar: &WorkCalendar,
) -> String {
    if stages.is_empty() {
        return "No stages found.".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:<28} {:<8} {:<9} {:<7} {}\n",
        "ID", "Stage", "Phase", "Progress", "Tasks", "Timer"
    ));
    out.push_str(&format!("{}\n", "-".repeat(72)));

    for stage in stages {
        let index = model
            .stages()
            .iter()
            .position(|s| s.stage_id == stage.stage_id);
        let phase = index.map(|i| phase_label(model.phase(i))).unwrap_or("?");
        let badge = stage_badge(stage, today, calendar).unwrap_or_default();
        // Custom stage ids are long uuids; show a short prefix
        let short_id: String = stage.stage_id.chars().take(12).collect();
        out.push_str(&format!(
            "{:<12} {:<28} {:<8} {:<9} {:<7} {}\n",
            short_id,
            stage.stage_name,
            phase,
            format!("{}%", progress(stage)),
            format!("{}/{}", completed_count(stage), stage.tasks.len()),
            badge,
        ));
    }
    out
}

/// Card view: one block per stage with its task checklist
pub fn format_board_cards(
    model: &StageProgressModel,
    stages: &[&ClientStage],
    today: NaiveDate,
    calendar: &WorkCalendar,
) -> String {
    if stages.is_empty() {
        return "No stages found.".to_string();
    }

    let mut out = String::new();
    for (n, stage) in stages.iter().enumerate() {
        if n > 0 {
            out.push('\n');
        }
        let index = model
            .stages()
            .iter()
            .position(|s| s.stage_id == stage.stage_id);
        let phase = index.map(|i| phase_label(model.phase(i))).unwrap_or("?");
        let mut header = format!(
            "[{}] {} ({}, {}%)",
            stage.stage_icon.as_str(),
            stage.stage_name,
            phase,
            progress(stage)
        );
        if let Some(badge) = stage_badge(stage, today, calendar) {
            header.push_str(&format!("  [{}]", badge));
        }
        out.push_str(&header);
        out.push('\n');

        if stage.tasks.is_empty() {
            out.push_str("  (no tasks)\n");
            continue;
        }
        for task in &stage.tasks {
            let checkbox = if task.completed { "[x]" } else { "[ ]" };
            let mut line = format!(
                "  {} {} {}",
                checkbox,
                task.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                task.title
            );
            if let Some(badge) = task_badge(task, today, calendar) {
                line.push_str(&format!("  [{}]", badge));
            }
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Machine-readable board dump
pub fn format_board_json(
    model: &StageProgressModel,
    stages: &[&ClientStage],
    today: NaiveDate,
    calendar: &WorkCalendar,
) -> Result<String> {
    let json_stages: Vec<serde_json::Value> = stages
        .iter()
        .map(|stage| {
            let index = model
                .stages()
                .iter()
                .position(|s| s.stage_id == stage.stage_id);
            let phase = index.map(|i| phase_label(model.phase(i))).unwrap_or("?");
            serde_json::json!({
                "id": stage.id,
                "stage_id": stage.stage_id,
                "stage_name": stage.stage_name,
                "stage_icon": stage.stage_icon.as_str(),
                "sort_order": stage.sort_order,
                "folder_id": stage.folder_id,
                "phase": phase,
                "progress": progress(stage),
                "timer": stage_badge(stage, today, calendar),
                "tasks": stage.tasks.iter().map(|task| {
                    serde_json::json!({
                        "id": task.id,
                        "title": task.title,
                        "completed": task.completed,
                        "completed_ts": task.completed_ts,
                        "sort_order": task.sort_order,
                        "timer": task_badge(task, today, calendar),
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&json_stages)?)
}
