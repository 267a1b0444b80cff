use super::{colorize_state, json_pretty, EXIT_SUCCESS};
use burrow_driver::InstanceDriver;

pub fn run(driver: &InstanceDriver, id: &str, json: bool) -> Result<u8, String> {
    let state = driver.state(id);

    if json {
        println!(
            "{}",
            json_pretty(&serde_json::json!({ "id": id, "state": state }))?
        );
    } else {
        println!("{id}: {}", colorize_state(&state.to_string()));
    }
    Ok(EXIT_SUCCESS)
}
