// Macrokb Launcher
// Runs bind commands as the interactively logged-in user

use std::ffi::{CStr, CString};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors raised while preparing or spawning a command
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("No interactive login user: {0}")]
    NoLoginUser(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identity of the user a command is launched as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl LoginUser {
    /// The user logged in on the controlling terminal
    pub fn current() -> Result<Self, LaunchError> {
        // SAFETY: getlogin takes no arguments and returns either null or a
        // NUL-terminated string in static storage.
        let ptr = unsafe { libc::getlogin() };
        if ptr.is_null() {
            return Err(LaunchError::NoLoginUser(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        // SAFETY: non-null and NUL-terminated; copied out before any other
        // call can reuse the static buffer.
        let name = unsafe { CStr::from_ptr(ptr) }
            .to_string_lossy()
            .into_owned();
        Self::lookup(&name)
    }

    /// Look a user up in the password database
    pub fn lookup(name: &str) -> Result<Self, LaunchError> {
        let c_name = CString::new(name).map_err(|_| LaunchError::UnknownUser(name.to_string()))?;
        // SAFETY: passwd is a plain C struct of integers and pointers, for
        // which all-zero is a valid value; getpwnam_r fills it in below.
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let mut buf = vec![0 as libc::c_char; 4096];

        // SAFETY: all pointers reference live, correctly sized buffers; the
        // strings in `pwd` point into `buf`, which outlives their use below.
        let rc = unsafe {
            libc::getpwnam_r(
                c_name.as_ptr(),
                &mut pwd,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        if rc != 0 || result.is_null() {
            return Err(LaunchError::UnknownUser(name.to_string()));
        }

        // SAFETY: getpwnam_r succeeded, so pw_name and pw_dir are valid C strings.
        let (pw_name, pw_dir) = unsafe {
            (
                CStr::from_ptr(pwd.pw_name).to_string_lossy().into_owned(),
                CStr::from_ptr(pwd.pw_dir).to_string_lossy().into_owned(),
            )
        };

        Ok(Self {
            name: pw_name,
            uid: pwd.pw_uid,
            gid: pwd.pw_gid,
            home: PathBuf::from(pw_dir),
        })
    }
}

/// Build the command for `argv` under `user`'s identity and environment.
///
/// The working directory is `cwd`, or `/home/<user>` when unset.
pub fn build_command(
    argv: &[String],
    cwd: Option<&Path>,
    user: &LoginUser,
) -> Result<Command, LaunchError> {
    let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;
    if program.trim().is_empty() {
        return Err(LaunchError::EmptyCommand);
    }

    let dir = cwd
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/home").join(&user.name));

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&dir)
        .env("HOME", &user.home)
        .env("LOGNAME", &user.name)
        .env("PWD", &dir)
        .env("USER", &user.name)
        .uid(user.uid)
        .gid(user.gid);
    Ok(command)
}

/// Launch `argv` as the logged-in user, detached from dispatch.
///
/// Returns the child pid. The child is reaped on a background thread.
pub fn run_as_user(argv: &[String], cwd: Option<&Path>) -> Result<u32, LaunchError> {
    let user = LoginUser::current()?;
    let mut child = build_command(argv, cwd, &user)?.spawn()?;
    let pid = child.id();
    log::debug!("launched {:?} as {} (pid {})", argv, user.name, pid);

    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(pid)
}
