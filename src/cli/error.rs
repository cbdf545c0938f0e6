// Error handling utilities for consistent error messages and exit codes

use std::process;

use chrono::NaiveDate;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a task ID is valid (positive integer)
pub fn validate_task_id(id_str: &str) -> Result<i64, String> {
    id_str
        .parse::<i64>()
        .map_err(|_| format!("Invalid task ID: '{}'. Task ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid task ID: {}. Task ID must be positive.", id))
            }
        })
}

/// Validate template name format (alphanumeric, dots, underscores, hyphens)
pub fn validate_template_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Template name cannot be empty".to_string());
    }

    if name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(format!(
            "Invalid template name: '{}'. Template names can only contain letters, numbers, dots, underscores, and hyphens.",
            name
        ))
    }
}

/// Parse a completion date argument (YYYY-MM-DD)
pub fn parse_done_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: '{}'. Expected YYYY-MM-DD.", value))
}
