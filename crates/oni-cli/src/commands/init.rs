//! Init command - writes a starter configuration file

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use oni_core::config::CONFIG_FILENAME;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# Oni configuration
#
# Substring filters applied to discovered dump paths.
# include = ["src"]
# exclude = ["vendor"]

[extract]
# Module binding whose calls are inspected.
module = "re"
# Call targets whose first argument is treated as a pattern.
functions = ["compile", "match", "search", "fullmatch"]

[fuzz]
# Per-trial wall-clock budget in milliseconds.
budget_ms = 250
# Shortest adversarial input; grown geometrically at each step.
base_len = 64
growth_factor = 2
steps = 4
inputs_per_length = 3
# A pair of trials confirms when duration grows faster than input length
# by this factor.
superlinear_threshold = 1.5
# Scan-wide fuzzing deadline in milliseconds. 0 disables it.
deadline_ms = 0
# Seed for adversarial input generation.
seed = 0

[rules]
# Rule IDs or names that never fire.
# disabled = ["R004"]
disabled = []

[report]
# Report benign and low-risk sites too.
verbose = false
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(&self) -> Result<()> {
        let config_path = Path::new(CONFIG_FILENAME);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Config file '{}' already exists. Use --force to overwrite.",
                CONFIG_FILENAME
            );
        }

        fs::write(config_path, DEFAULT_CONFIG)?;

        println!("{} Created {}", "✓".green().bold(), CONFIG_FILENAME);
        println!("Run `oni scan .` to try it out.");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oni_core::config::Config;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn init_creates_config_file() {
        let dir = tempdir().unwrap();
        let original = env::current_dir().unwrap();
        env::set_current_dir(dir.path()).unwrap();

        let args = InitArgs { force: false };
        let result = args.run();

        env::set_current_dir(original).unwrap();

        assert!(result.is_ok());
        assert!(dir.path().join(CONFIG_FILENAME).exists());
    }

    #[test]
    #[serial]
    fn init_fails_if_config_exists() {
        let dir = tempdir().unwrap();
        let original = env::current_dir().unwrap();
        env::set_current_dir(dir.path()).unwrap();

        std::fs::write(CONFIG_FILENAME, "# existing\n").unwrap();
        let args = InitArgs { force: false };
        let result = args.run();

        env::set_current_dir(original).unwrap();

        assert!(result.is_err());
        let content = std::fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(content, "# existing\n");
    }

    #[test]
    #[serial]
    fn init_force_overwrites() {
        let dir = tempdir().unwrap();
        let original = env::current_dir().unwrap();
        env::set_current_dir(dir.path()).unwrap();

        std::fs::write(CONFIG_FILENAME, "# existing\n").unwrap();
        let args = InitArgs { force: true };
        let result = args.run();

        env::set_current_dir(original).unwrap();

        assert!(result.is_ok());
        let content = std::fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert!(content.contains("[fuzz]"));
    }

    #[test]
    fn default_config_is_valid_toml() {
        let parsed: Result<Config, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(parsed.is_ok());
    }

    #[test]
    fn default_config_matches_builtin_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
