use super::EXIT_SUCCESS;
use burrow_config::parse_launch_file;
use burrow_driver::InstanceDriver;
use std::path::Path;

pub fn run(driver: &InstanceDriver, id: &str, config: &Path) -> Result<u8, String> {
    let config = parse_launch_file(config).map_err(|e| e.to_string())?;
    driver.stop(id, &config).map_err(|e| e.to_string())?;
    println!("requested shutdown of instance {id}");
    Ok(EXIT_SUCCESS)
}
