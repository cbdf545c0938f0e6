use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};

use crate::board::{BoardCommand, BoardController, Confirmation, MoveDirection, ViewMode};
use crate::cli::error::{parse_done_date, user_error, validate_task_id, validate_template_name};
use crate::cli::output::{format_board_cards, format_board_json, format_board_table};
use crate::clipboard::StageClipboard;
use crate::models::{split_bulk_titles, StageIcon, TaskStyle};
use crate::store::{SqliteStore, StageStore};
use crate::templates;
use crate::workdays::WorkCalendar;

#[derive(Parser)]
#[command(name = "stagetrack")]
#[command(about = "Track client stages, tasks, and working-day deadlines")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Client whose board the command operates on
    #[arg(short = 'c', long, global = true, default_value = "default")]
    pub client: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the client's board
    Board {
        /// Render as a compact table instead of cards
        #[arg(long)]
        table: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Show only stages in this folder
        #[arg(long)]
        folder: Option<String>,
    },
    /// Stage management commands
    Stage {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Task management commands
    Task {
        #[command(subcommand)]
        subcommand: TaskCommands,
    },
    /// Deadline timer commands
    Timer {
        #[command(subcommand)]
        subcommand: TimerCommands,
    },
    /// Board template commands
    Template {
        #[command(subcommand)]
        subcommand: TemplateCommands,
    },
}

#[derive(ValueEnum, Clone, Copy)]
pub enum MoveArg {
    Up,
    Down,
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// Add a new stage at the end of the board
    Add {
        /// Stage name
        name: String,
        /// Stage icon (Phone, FolderOpen, Send, MapPin)
        #[arg(long, default_value = "Phone")]
        icon: String,
    },
    /// Rename a stage (and optionally change its icon)
    Rename {
        /// Stage ID
        stage_id: String,
        /// New stage name
        name: String,
        /// New icon; current icon is kept when omitted
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a stage and all its tasks
    Delete {
        /// Stage ID
        stage_id: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Move a stage one position up or down
    Move {
        /// Stage ID
        stage_id: String,
        /// Direction to move
        direction: MoveArg,
    },
    /// Move a stage from one board position to another
    Reorder {
        /// Current position (0-based)
        from: usize,
        /// Target position (0-based)
        to: usize,
    },
    /// File a stage under a folder, or unfile it
    Folder {
        /// Stage ID
        stage_id: String,
        /// Folder name
        folder: Option<String>,
        /// Remove the stage from its folder
        #[arg(long)]
        clear: bool,
    },
    /// Copy a stage to the clipboard
    Copy {
        /// Stage ID
        stage_id: String,
    },
    /// Paste the copied stage onto this client's board
    Paste,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a stage
    Add {
        /// Stage ID
        stage_id: String,
        /// Task title
        title: Vec<String>,
    },
    /// Add several tasks at once, one per argument
    Bulk {
        /// Stage ID
        stage_id: String,
        /// Task titles
        titles: Vec<String>,
    },
    /// Toggle a task between open and completed
    Toggle {
        /// Task ID
        task_id: String,
    },
    /// Change a task's title
    Edit {
        /// Task ID
        task_id: String,
        /// New title
        title: Vec<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        task_id: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Set a task's display style
    Style {
        /// Task ID
        task_id: String,
        /// Background color token
        #[arg(long)]
        background: Option<String>,
        /// Text color token
        #[arg(long)]
        color: Option<String>,
        /// Render the title in bold
        #[arg(long)]
        bold: bool,
    },
    /// Override a task's completion date, or clear it to reopen the task
    DoneDate {
        /// Task ID
        task_id: String,
        /// Completion date (YYYY-MM-DD)
        date: Option<String>,
        /// Clear the date and reopen the task
        #[arg(long)]
        clear: bool,
    },
    /// Move a task from one position to another within its stage
    Reorder {
        /// Stage ID
        stage_id: String,
        /// Current position (0-based)
        from: usize,
        /// Target position (0-based)
        to: usize,
    },
}

#[derive(Subcommand)]
pub enum TimerCommands {
    /// Start a deadline timer
    Start {
        /// Target in working days (1-365)
        #[arg(allow_hyphen_values = true)]
        days: i64,
        /// Stage to time
        #[arg(long)]
        stage: Option<String>,
        /// Task to time
        #[arg(long)]
        task: Option<String>,
    },
    /// Stop a running timer
    Stop {
        /// Stage whose timer to stop
        #[arg(long)]
        stage: Option<String>,
        /// Task whose timer to stop
        #[arg(long)]
        task: Option<String>,
    },
    /// Cycle the timer badge display style
    Cycle {
        /// Stage whose badge to cycle
        #[arg(long)]
        stage: Option<String>,
        /// Task whose badge to cycle
        #[arg(long)]
        task: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Save the board (or one stage) as a named template
    Save {
        /// Template name
        name: String,
        /// Save only this stage
        #[arg(long)]
        stage: Option<String>,
    },
    /// Append a template's stages to this client's board
    Apply {
        /// Template name
        name: String,
    },
    /// List saved templates
    List,
    /// Delete a template
    Delete {
        /// Template name
        name: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Board {
            table,
            json,
            folder,
        } => handle_board(&cli.client, table, json, folder),
        Commands::Stage { subcommand } => handle_stage(&cli.client, subcommand),
        Commands::Task { subcommand } => handle_task(&cli.client, subcommand),
        Commands::Timer { subcommand } => handle_timer(&cli.client, subcommand),
        Commands::Template { subcommand } => handle_template(&cli.client, subcommand),
    }
}

fn open_board(client: &str) -> Result<BoardController<SqliteStore>> {
    let store = SqliteStore::open().context("Failed to connect to database")?;
    BoardController::open(store, client)
}

/// Prompt for a yes/no confirmation; `yes` skips the prompt
fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    eprint!("{} [y/N]: ", prompt);
    std::io::Write::flush(&mut std::io::stderr())
        .map_err(|e| anyhow::anyhow!("Failed to flush stderr: {}", e))?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn handle_board(client: &str, table: bool, json: bool, folder: Option<String>) -> Result<()> {
    let mut board = open_board(client)?;
    if table {
        board.view_mode = ViewMode::Table;
    }
    board.set_folder_filter(folder);

    let today = Local::now().date_naive();
    let calendar = WorkCalendar::default();
    let stages = board.visible_stages();

    let rendered = if json {
        format_board_json(board.model(), &stages, today, &calendar)?
    } else if board.view_mode == ViewMode::Table {
        format_board_table(board.model(), &stages, today, &calendar)
    } else {
        format_board_cards(board.model(), &stages, today, &calendar)
    };
    println!("{}", rendered);
    Ok(())
}

fn handle_stage(client: &str, cmd: StageCommands) -> Result<()> {
    let mut board = open_board(client)?;

    match cmd {
        StageCommands::Add { name, icon } => {
            let icon = StageIcon::parse(Some(&icon));
            board.dispatch(
                BoardCommand::AddStage {
                    name: name.clone(),
                    icon,
                },
                Confirmation::Declined,
            )?;
            println!("Created stage '{}'", name);
            Ok(())
        }
        StageCommands::Rename {
            stage_id,
            name,
            icon,
        } => {
            let current_icon = match board.model().stage(&stage_id) {
                Some(stage) => stage.stage_icon,
                None => user_error(&format!("Stage '{}' not found", stage_id)),
            };
            let icon = icon
                .map(|name| StageIcon::parse(Some(&name)))
                .unwrap_or(current_icon);
            board.dispatch(
                BoardCommand::UpdateStage {
                    stage_id,
                    name: name.clone(),
                    icon,
                },
                Confirmation::Declined,
            )?;
            println!("Renamed stage to '{}'", name);
            Ok(())
        }
        StageCommands::Delete { stage_id, yes } => {
            let (name, task_count) = match board.model().stage(&stage_id) {
                Some(stage) => (stage.stage_name.clone(), stage.tasks.len()),
                None => user_error(&format!("Stage '{}' not found", stage_id)),
            };
            if !confirm(
                &format!("Delete stage '{}' and its {} task(s)?", name, task_count),
                yes,
            )? {
                println!("Cancelled.");
                return Ok(());
            }
            board.dispatch(
                BoardCommand::DeleteStage { stage_id },
                Confirmation::Confirmed,
            )?;
            println!("Deleted stage '{}'", name);
            Ok(())
        }
        StageCommands::Move {
            stage_id,
            direction,
        } => {
            let direction = match direction {
                MoveArg::Up => MoveDirection::Up,
                MoveArg::Down => MoveDirection::Down,
            };
            board.dispatch(
                BoardCommand::MoveStage {
                    stage_id,
                    direction,
                },
                Confirmation::Declined,
            )?;
            println!("Moved stage");
            Ok(())
        }
        StageCommands::Reorder { from, to } => {
            board.dispatch(
                BoardCommand::ReorderStages { from, to },
                Confirmation::Declined,
            )?;
            println!("Reordered stages");
            Ok(())
        }
        StageCommands::Folder {
            stage_id,
            folder,
            clear,
        } => {
            let folder_id = if clear {
                None
            } else {
                match folder {
                    Some(folder) => Some(folder),
                    None => user_error("A folder name is required unless --clear is given"),
                }
            };
            let label = folder_id.clone();
            board.dispatch(
                BoardCommand::SetStageFolder {
                    stage_id: stage_id.clone(),
                    folder_id,
                },
                Confirmation::Declined,
            )?;
            match label {
                Some(folder) => println!("Filed stage '{}' under '{}'", stage_id, folder),
                None => println!("Unfiled stage '{}'", stage_id),
            }
            Ok(())
        }
        StageCommands::Copy { stage_id } => {
            let stage = match board.model().stage(&stage_id) {
                Some(stage) => stage,
                None => user_error(&format!("Stage '{}' not found", stage_id)),
            };
            let mut clipboard = StageClipboard::system();
            let payload = clipboard.copy_stage(stage);
            println!(
                "Copied stage '{}' ({} tasks)",
                payload.stage_name,
                payload.tasks.len()
            );
            Ok(())
        }
        StageCommands::Paste => {
            let mut clipboard = StageClipboard::system();
            match clipboard.take_payload() {
                Some(payload) => {
                    let name = payload.stage_name.clone();
                    board.dispatch(
                        BoardCommand::PasteStage { payload },
                        Confirmation::Declined,
                    )?;
                    println!("Pasted stage '{}'", name);
                }
                None => println!("Nothing to paste."),
            }
            Ok(())
        }
    }
}

fn handle_task(client: &str, cmd: TaskCommands) -> Result<()> {
    let mut board = open_board(client)?;

    match cmd {
        TaskCommands::Add { stage_id, title } => {
            let title = title.join(" ");
            board.dispatch(
                BoardCommand::AddTask {
                    stage_id,
                    title: title.clone(),
                },
                Confirmation::Declined,
            )?;
            println!("Added task '{}'", title);
            Ok(())
        }
        TaskCommands::Bulk { stage_id, titles } => {
            let text = titles.join("\n");
            let created = split_bulk_titles(&text).len();
            board.dispatch(
                BoardCommand::AddBulkTasks { stage_id, text },
                Confirmation::Declined,
            )?;
            println!("Added {} task(s)", created);
            Ok(())
        }
        TaskCommands::Toggle { task_id } => {
            let task_id = parse_task_id(&task_id);
            board.dispatch(
                BoardCommand::ToggleTask { task_id },
                Confirmation::Declined,
            )?;
            match board.model().task(task_id) {
                Some(task) if task.completed => println!("Completed task {}", task_id),
                _ => println!("Reopened task {}", task_id),
            }
            Ok(())
        }
        TaskCommands::Edit { task_id, title } => {
            let task_id = parse_task_id(&task_id);
            let title = title.join(" ");
            board.dispatch(
                BoardCommand::RenameTask {
                    task_id,
                    title: title.clone(),
                },
                Confirmation::Declined,
            )?;
            println!("Updated task {}", task_id);
            Ok(())
        }
        TaskCommands::Delete { task_id, yes } => {
            let task_id = parse_task_id(&task_id);
            let title = match board.model().task(task_id) {
                Some(task) => task.title.clone(),
                None => user_error(&format!("Task {} not found", task_id)),
            };
            if !confirm(&format!("Delete task '{}'?", title), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            board.dispatch(BoardCommand::DeleteTask { task_id }, Confirmation::Confirmed)?;
            println!("Deleted task {}", task_id);
            Ok(())
        }
        TaskCommands::Style {
            task_id,
            background,
            color,
            bold,
        } => {
            let task_id = parse_task_id(&task_id);
            let style = TaskStyle {
                background_color: background,
                text_color: color,
                is_bold: bold,
            };
            board.dispatch(
                BoardCommand::SetTaskStyle { task_id, style },
                Confirmation::Declined,
            )?;
            println!("Styled task {}", task_id);
            Ok(())
        }
        TaskCommands::DoneDate {
            task_id,
            date,
            clear,
        } => {
            let task_id = parse_task_id(&task_id);
            let completed_ts = if clear {
                None
            } else {
                let date = match date {
                    Some(date) => date,
                    None => user_error("A date is required unless --clear is given"),
                };
                match parse_done_date(&date) {
                    Ok(date) => Some(date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()),
                    Err(e) => user_error(&e),
                }
            };
            board.dispatch(
                BoardCommand::SetTaskCompletedDate {
                    task_id,
                    completed_ts,
                },
                Confirmation::Declined,
            )?;
            if completed_ts.is_some() {
                println!("Set completion date for task {}", task_id);
            } else {
                println!("Reopened task {}", task_id);
            }
            Ok(())
        }
        TaskCommands::Reorder { stage_id, from, to } => {
            board.dispatch(
                BoardCommand::ReorderTasks { stage_id, from, to },
                Confirmation::Declined,
            )?;
            println!("Reordered tasks");
            Ok(())
        }
    }
}

fn handle_timer(client: &str, cmd: TimerCommands) -> Result<()> {
    let mut board = open_board(client)?;

    let (command, label) = match cmd {
        TimerCommands::Start { days, stage, task } => match target(stage, task) {
            TimerTarget::Stage(stage_id) => (
                BoardCommand::StartStageTimer {
                    stage_id: stage_id.clone(),
                    target_working_days: days,
                },
                format!("Started {}-day timer on stage '{}'", days, stage_id),
            ),
            TimerTarget::Task(task_id) => (
                BoardCommand::StartTaskTimer {
                    task_id,
                    target_working_days: days,
                },
                format!("Started {}-day timer on task {}", days, task_id),
            ),
        },
        TimerCommands::Stop { stage, task } => match target(stage, task) {
            TimerTarget::Stage(stage_id) => (
                BoardCommand::StopStageTimer {
                    stage_id: stage_id.clone(),
                },
                format!("Stopped timer on stage '{}'", stage_id),
            ),
            TimerTarget::Task(task_id) => (
                BoardCommand::StopTaskTimer { task_id },
                format!("Stopped timer on task {}", task_id),
            ),
        },
        TimerCommands::Cycle { stage, task } => match target(stage, task) {
            TimerTarget::Stage(stage_id) => (
                BoardCommand::CycleStageTimerStyle {
                    stage_id: stage_id.clone(),
                },
                format!("Cycled timer style on stage '{}'", stage_id),
            ),
            TimerTarget::Task(task_id) => (
                BoardCommand::CycleTaskTimerStyle { task_id },
                format!("Cycled timer style on task {}", task_id),
            ),
        },
    };

    board.dispatch(command, Confirmation::Declined)?;
    println!("{}", label);
    Ok(())
}

enum TimerTarget {
    Stage(String),
    Task(i64),
}

fn target(stage: Option<String>, task: Option<String>) -> TimerTarget {
    match (stage, task) {
        (Some(stage_id), None) => TimerTarget::Stage(stage_id),
        (None, Some(task_id)) => TimerTarget::Task(parse_task_id(&task_id)),
        _ => user_error("Specify exactly one of --stage or --task"),
    }
}

fn parse_task_id(id_str: &str) -> i64 {
    match validate_task_id(id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    }
}

fn handle_template(client: &str, cmd: TemplateCommands) -> Result<()> {
    let mut store = SqliteStore::open().context("Failed to connect to database")?;

    match cmd {
        TemplateCommands::Save { name, stage } => {
            if let Err(e) = validate_template_name(&name) {
                user_error(&e);
            }
            let stages = store.fetch_stages(client)?;
            match stage {
                Some(stage_id) => {
                    let stage = match stages.iter().find(|s| s.stage_id == stage_id) {
                        Some(stage) => stage,
                        None => user_error(&format!("Stage '{}' not found", stage_id)),
                    };
                    templates::save_stage_template(&mut store, &name, stage)?;
                    println!("Saved stage '{}' as template '{}'", stage.stage_name, name);
                }
                None => {
                    templates::save_board_template(&mut store, &name, &stages)?;
                    println!("Saved board as template '{}' ({} stages)", name, stages.len());
                }
            }
            Ok(())
        }
        TemplateCommands::Apply { name } => {
            let template = match store.get_template(&name)? {
                Some(template) => template,
                None => user_error(&format!("Template '{}' not found", name)),
            };
            let created = templates::apply_template(&mut store, client, &template)?;
            println!("Applied template '{}' ({} stages)", name, created.len());
            Ok(())
        }
        TemplateCommands::List => {
            let names = store.list_templates()?;
            if names.is_empty() {
                println!("No templates found.");
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
            Ok(())
        }
        TemplateCommands::Delete { name, yes } => {
            if store.get_template(&name)?.is_none() {
                user_error(&format!("Template '{}' not found", name));
            }
            if !confirm(&format!("Delete template '{}'?", name), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            store.delete_template(&name)?;
            println!("Deleted template '{}'", name);
            Ok(())
        }
    }
}
