use super::EXIT_SUCCESS;
use burrow_driver::InstanceDriver;

pub fn run(driver: &InstanceDriver, id: &str) -> Result<u8, String> {
    driver.delete(id).map_err(|e| e.to_string())?;
    println!("deleted instance {id}");
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_driver::{InstanceLayout, InterruptToken};

    #[test]
    fn removes_instance_directories() {
        let data = tempfile::tempdir().unwrap();
        let runtime = tempfile::tempdir().unwrap();
        let layout = InstanceLayout::new(data.path(), runtime.path());
        std::fs::create_dir_all(layout.instance_dir("abc")).unwrap();
        std::fs::create_dir_all(layout.runtime_dir("abc")).unwrap();
        let driver = InstanceDriver::new(layout, InterruptToken::default());

        assert_eq!(run(&driver, "abc").unwrap(), EXIT_SUCCESS);
        assert!(!driver.layout().instance_dir("abc").exists());
        assert!(!driver.layout().runtime_dir("abc").exists());
    }

    #[test]
    fn succeeds_for_unknown_instance() {
        let data = tempfile::tempdir().unwrap();
        let runtime = tempfile::tempdir().unwrap();
        let layout = InstanceLayout::new(data.path(), runtime.path());
        let driver = InstanceDriver::new(layout, InterruptToken::default());

        assert_eq!(run(&driver, "nope").unwrap(), EXIT_SUCCESS);
    }
}
