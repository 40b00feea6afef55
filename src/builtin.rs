use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::session::Session;
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in a shell process without replacing its image.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "ls" or "cd".
    fn name() -> &'static str;

    /// Executes the command, writing to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                tracing::debug!(command = T::name(), error = ?e, "builtin failed");
                writeln!(stdout, "{}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

/// Creates a builtin of type `T` when asked for its name.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// The set of commands that run inside a shell process.
pub struct Builtins {
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Builtins {
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { commands }
    }

    /// Look up a builtin by command word; `None` means "run an external program".
    pub fn find(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(name, &args))
    }
}

impl Default for Builtins {
    /// `cd`, `pwd`, `ls`, `history` and `exit`.
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Ls>::default()),
            Box::new(Factory::<HistoryList>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let dir = env::current_dir().context("pwd: can't read current directory")?;
        writeln!(stdout, "{}", dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) => PathBuf::from(t),
            None => match env::var_os("HOME") {
                Some(home) => PathBuf::from(home),
                None => bail!("Error changing directory."),
            },
        };
        env::set_current_dir(&target).context("Error changing directory.")?;
        tracing::info!(dir = %target.display(), "changed directory");
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List a directory, one entry per line with its permission bits.
pub struct Ls {
    #[argh(positional)]
    /// directory to list. Defaults to the current directory.
    pub dir: Option<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let dir = self.dir.unwrap_or_else(|| ".".to_string());
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to open directory \"{}/\"", dir))?;

        let mut names: Vec<OsString> = vec![".".into(), "..".into()];
        for entry in entries {
            names.push(entry?.file_name());
        }
        for name in names {
            let path = Path::new(&dir).join(&name);
            writeln!(stdout, "{} {}", permission_string(&path), name.to_string_lossy())?;
        }
        Ok(0)
    }
}

/// Render type and permission bits the way `ls -l` does, e.g. `drwxr-xr-x`.
///
/// Symlinks are followed; a dangling link is described by the link itself.
pub fn permission_string(path: &Path) -> String {
    let meta = match fs::metadata(path).or_else(|_| fs::symlink_metadata(path)) {
        Ok(meta) => meta,
        Err(_) => return "?".repeat(10),
    };
    let mode = meta.permissions().mode();

    let mut s = String::with_capacity(10);
    s.push(if meta.is_dir() { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[derive(FromArgs)]
/// Print recently entered lines, newest first.
pub struct HistoryList {}

impl BuiltinCommand for HistoryList {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        for line in session.history.list() {
            writeln!(stdout, "{}", line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.should_exit = true;
        Ok(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn run(name: &str, args: &[&str], session: &mut Session) -> (ExitCode, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let cmd = Builtins::default()
            .find(name, &args)
            .unwrap_or_else(|| panic!("{} is not a builtin", name));
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, session).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let cur = env::current_dir().unwrap();

        let (code, out) = run("pwd", &[], &mut Session::default());

        assert_eq!(code, 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let orig = env::current_dir().unwrap();

        let (code, _) = run(
            "cd",
            &[canonical_temp.to_str().unwrap()],
            &mut Session::default(),
        );

        assert_eq!(code, 0);
        assert_eq!(fs::canonicalize(env::current_dir().unwrap()).unwrap(), canonical_temp);

        env::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let orig = env::current_dir().unwrap();
        let orig_home = env::var_os("HOME");

        // SAFETY: the cwd lock serializes every test that touches HOME.
        unsafe { env::set_var("HOME", &canonical_temp) };
        let result = Cd { target: None }.execute(&mut Vec::<u8>::new(), &mut Session::default());
        match orig_home {
            Some(home) => unsafe { env::set_var("HOME", home) },
            None => unsafe { env::remove_var("HOME") },
        }

        assert_eq!(result.unwrap(), 0);
        assert_eq!(fs::canonicalize(env::current_dir().unwrap()).unwrap(), canonical_temp);

        env::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_nonexistent_path_reports_error() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();

        let name = format!("nonexistent_dir_for_rawsh_test_{}", std::process::id());
        let (code, out) = run("cd", &[&name], &mut Session::default());

        assert_eq!(code, 1);
        assert_eq!(out, "Error changing directory.\n");
        assert_eq!(env::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_ls_lists_entries_with_permissions() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::set_permissions(temp.path().join("sub"), fs::Permissions::from_mode(0o755)).unwrap();

        let (code, out) = run("ls", &[temp.path().to_str().unwrap()], &mut Session::default());

        assert_eq!(code, 0);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with('d') && lines[0].ends_with(" ."));
        assert!(lines[1].ends_with(" .."));
        assert!(lines.contains(&"-rw-r----- notes.txt"));
        assert!(lines.contains(&"drwxr-xr-x sub"));
    }

    #[test]
    fn test_ls_missing_directory() {
        let (code, out) = run("ls", &["/no/such/dir"], &mut Session::default());
        assert_eq!(code, 1);
        assert_eq!(out, "Failed to open directory \"/no/such/dir/\"\n");
    }

    #[test]
    fn test_ls_rejects_unknown_flags() {
        let (code, out) = run("ls", &["-l"], &mut Session::default());
        assert_eq!(code, 1);
        assert!(!out.is_empty());
    }

    #[test]
    fn test_history_lists_newest_first() {
        let mut session = Session::default();
        session.remember("ls");
        session.remember("pwd");
        session.remember("history");

        let (code, out) = run("history", &[], &mut session);

        assert_eq!(code, 0);
        assert_eq!(out, "0 history\n1 pwd\n2 ls\n");
    }

    #[test]
    fn test_exit_sets_flag() {
        let mut session = Session::default();
        let (code, out) = run("exit", &["3"], &mut session);
        assert_eq!(code, 0);
        assert!(out.is_empty());
        assert!(session.should_exit);
    }

    #[test]
    fn test_unknown_name_is_not_builtin() {
        assert!(Builtins::default().find("grep", &[]).is_none());
    }
}
