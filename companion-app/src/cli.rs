use crate::config::DEFAULT_CONFIG_PATH;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const USAGE: &str = "Usage: companion [--config <path>] [--user <id>]";

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub user: Option<String>,
    pub help: bool,
}

impl CliArgs {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            user: None,
            help: false,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => parsed.config_path = PathBuf::from(path),
                    None => bail!("--config requires a path\n{}", USAGE),
                },
                "--user" | "-u" => match args.next() {
                    Some(user) => parsed.user = Some(user),
                    None => bail!("--user requires an id\n{}", USAGE),
                },
                "--help" | "-h" => parsed.help = true,
                other => bail!("Unknown argument: {}\n{}", other, USAGE),
            }
        }

        Ok(parsed)
    }
}
