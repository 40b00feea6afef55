use crate::history::DEFAULT_CAPACITY;
use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug, Clone, PartialEq)]
/// Interactive shell with line editing, history recall and pipelines.
pub struct Config {
    #[argh(option, default = "DEFAULT_CAPACITY", from_str_fn(parse_history_size))]
    /// number of lines kept in history (default: 10).
    pub history_size: usize,

    #[argh(option)]
    /// write tracing output to this file; filter with RAWSH_LOG.
    pub log_file: Option<PathBuf>,

    #[argh(switch)]
    /// record blank lines into history as well.
    pub keep_blank: bool,

    #[argh(switch)]
    /// do not print the directory prompt.
    pub no_prompt: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_CAPACITY,
            log_file: None,
            keep_blank: false,
            no_prompt: false,
        }
    }
}

fn parse_history_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("history size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid history size {:?}: {}", value, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_args() {
        let config = Config::from_args(&["rawsh"], &[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.history_size, 10);
    }

    #[test]
    fn test_all_options() {
        let config = Config::from_args(
            &["rawsh"],
            &["--history-size", "3", "--log-file", "/tmp/rawsh.log", "--keep-blank", "--no-prompt"],
        )
        .unwrap();

        assert_eq!(config.history_size, 3);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/rawsh.log")));
        assert!(config.keep_blank);
        assert!(config.no_prompt);
    }

    #[test]
    fn test_zero_history_size_is_rejected() {
        assert!(Config::from_args(&["rawsh"], &["--history-size", "0"]).is_err());
        assert!(Config::from_args(&["rawsh"], &["--history-size", "lots"]).is_err());
    }
}
