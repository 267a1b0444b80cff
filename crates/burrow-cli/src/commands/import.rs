use super::{json_pretty, EXIT_SUCCESS};
use burrow_config::parse_launch_file;
use burrow_driver::InstanceDriver;
use std::path::Path;

pub fn run(driver: &InstanceDriver, config: &Path, json: bool) -> Result<u8, String> {
    let config = parse_launch_file(config).map_err(|e| e.to_string())?;
    let id = driver.import(&config).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&serde_json::json!({ "id": id }))?);
    } else {
        println!("{id}");
    }
    Ok(EXIT_SUCCESS)
}
