use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Created keyscout.toml with default settings");
    } else {
        println!("keyscout.toml already exists, leaving it unchanged");
    }
    Ok(())
}
