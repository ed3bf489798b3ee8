use std::path::Path;

use anyhow::Result;

use voodoo_player::config::config_path;
use voodoo_player::Configuration;

pub fn cmd_config(path_only: bool, explicit: Option<&Path>, config: &Configuration) -> Result<()> {
    if path_only {
        let path = explicit.map_or_else(config_path, Path::to_path_buf);
        println!("{}", path.display());
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
