pub mod delete;
pub mod import;
pub mod start;
pub mod status;
pub mod stop;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().cyan().bold().apply_to(state).to_string(),
        "stopped" => Style::new().yellow().apply_to(state).to_string(),
        "not_created" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}
