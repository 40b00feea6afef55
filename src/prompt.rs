use std::path::Path;

/// Directories longer than this are shortened to their last component.
const MAX_FULL_LEN: usize = 16;

/// Prompt shown before each line: the directory followed by `"> "`.
///
/// Long directories are shown as `/.../<last component>`.
pub fn format_prompt(dir: &Path) -> String {
    let dir = dir.to_string_lossy();
    if dir.len() <= MAX_FULL_LEN {
        return format!("{}> ", dir);
    }
    let last = dir.rsplit('/').next().unwrap_or_default();
    format!("/.../{}> ", last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_dir_is_shown_whole() {
        assert_eq!(format_prompt(Path::new("/")), "/> ");
        assert_eq!(format_prompt(Path::new("/home/user")), "/home/user> ");
        assert_eq!(format_prompt(Path::new("/0123456789abcde")), "/0123456789abcde> ");
    }

    #[test]
    fn test_long_dir_keeps_last_component() {
        assert_eq!(
            format_prompt(Path::new("/home/user/projects/rawsh")),
            "/.../rawsh> "
        );
        assert_eq!(format_prompt(Path::new("/0123456789abcdef")), "/.../0123456789abcdef> ");
    }
}
