use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use multibox_config::{
    GAME_PATH_ENV, LAUNCHER_DLL_NAME, LAUNCHER_HOST_PROGRAM, LAUNCH_PROBE_WINDOW,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(target_os = "windows")]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

const PROBE_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Launch configuration error: {0}")]
    Config(String),
    #[error("DLL not found at: {0}")]
    LauncherMissing(Utf8PathBuf),
    #[error("Game folder not found at: {0}")]
    GameFolderMissing(Utf8PathBuf),
    #[error("Process exited with code {code}. Error: {stderr}")]
    EarlyExit { code: i32, stderr: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credentials for one client session.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientLogin {
    pub account_name: String,
    pub password: String,
    pub character_id: String,
}

impl ClientLogin {
    pub fn is_complete(&self) -> bool {
        !self.account_name.is_empty() && !self.password.is_empty() && !self.character_id.is_empty()
    }
}

impl std::fmt::Debug for ClientLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLogin")
            .field("account_name", &self.account_name)
            .field("password", &"<redacted>")
            .field("character_id", &self.character_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedClient {
    pub pid: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSummary {
    pub launched: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedLaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Utf8PathBuf,
    pub env: Vec<(String, String)>,
}

/// Starts game clients through the quick-launcher assembly.
pub struct ClientLauncher {
    game_folder: Utf8PathBuf,
    dll_folder: Utf8PathBuf,
    host_program: String,
    probe_window: Duration,
}

impl ClientLauncher {
    pub fn new(game_folder: impl Into<Utf8PathBuf>, dll_folder: impl Into<Utf8PathBuf>) -> Self {
        Self {
            game_folder: game_folder.into(),
            dll_folder: dll_folder.into(),
            host_program: LAUNCHER_HOST_PROGRAM.to_string(),
            probe_window: LAUNCH_PROBE_WINDOW,
        }
    }

    /// Replace the program that hosts the launcher assembly.
    pub fn with_host_program(mut self, program: impl Into<String>) -> Self {
        self.host_program = program.into();
        self
    }

    pub fn with_probe_window(mut self, window: Duration) -> Self {
        self.probe_window = window;
        self
    }

    pub fn dll_path(&self) -> Utf8PathBuf {
        self.dll_folder.join(LAUNCHER_DLL_NAME)
    }

    pub fn game_folder(&self) -> &Utf8Path {
        &self.game_folder
    }

    /// Check the launcher assembly and the game folder before launching anything.
    pub fn verify(&self) -> Result<(), LaunchError> {
        if self.game_folder.as_str().is_empty() || self.dll_folder.as_str().is_empty() {
            return Err(LaunchError::Config("Missing required data.".into()));
        }
        let dll = self.dll_path();
        if !dll.exists() {
            return Err(LaunchError::LauncherMissing(dll));
        }
        if !self.game_folder.exists() {
            return Err(LaunchError::GameFolderMissing(self.game_folder.clone()));
        }
        Ok(())
    }

    pub(crate) fn resolve_command(&self, login: &ClientLogin) -> ResolvedLaunchCommand {
        ResolvedLaunchCommand {
            program: self.host_program.clone(),
            args: vec![
                self.dll_path().to_string(),
                login.account_name.clone(),
                login.password.clone(),
                login.character_id.clone(),
            ],
            working_dir: self.dll_folder.clone(),
            env: vec![(GAME_PATH_ENV.to_string(), self.game_folder.to_string())],
        }
    }

    /// Spawn one client and watch it briefly for an immediate failure.
    pub fn launch(&self, login: &ClientLogin) -> Result<LaunchedClient, LaunchError> {
        if !login.is_complete() {
            return Err(LaunchError::Config(format!(
                "Incomplete character data for launch: {login:?}"
            )));
        }
        let cmd = self.resolve_command(login);

        info!(
            "Launching {}/{} via {} {} (cwd: {})",
            login.account_name,
            login.character_id,
            cmd.program,
            cmd.args[0],
            cmd.working_dir
        );

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .current_dir(&cmd.working_dir)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NEW_CONSOLE);
        }

        let mut child = command.spawn()?;
        let pid = child.id();

        if let Some(code) = self.wait_for_early_exit(&mut child)? {
            if code != 0 {
                let mut stderr = String::new();
                if let Some(mut pipe) = child.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr);
                }
                let stderr = stderr.trim();
                return Err(LaunchError::EarlyExit {
                    code,
                    stderr: if stderr.is_empty() {
                        "Unknown error".to_string()
                    } else {
                        stderr.to_string()
                    },
                });
            }
        } else {
            drain_stderr(&mut child, pid);
        }

        Ok(LaunchedClient { pid })
    }

    /// Launch every login in order. One failure never stops the rest.
    pub fn launch_all(&self, logins: &[ClientLogin]) -> LaunchSummary {
        let mut summary = LaunchSummary::default();
        for login in logins {
            match self.launch(login) {
                Ok(client) => {
                    info!(
                        "Successfully launched {}/{} with PID: {}",
                        login.account_name, login.character_id, client.pid
                    );
                    summary.launched.push(format!(
                        "Launched {}/{} (PID: {})",
                        login.account_name, login.character_id, client.pid
                    ));
                }
                Err(LaunchError::Config(msg)) => {
                    warn!("{}", msg);
                    summary.errors.push(msg);
                }
                Err(e) => {
                    let msg = format!(
                        "Failed to launch {}/{}: {}",
                        login.account_name, login.character_id, e
                    );
                    warn!("{}", msg);
                    summary.errors.push(msg);
                }
            }
        }
        summary
    }

    /// Exit code if the child ended within the probe window, `None` if still running.
    fn wait_for_early_exit(&self, child: &mut Child) -> Result<Option<i32>, LaunchError> {
        let deadline = Instant::now() + self.probe_window;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status.code().unwrap_or(-1)));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(PROBE_POLL);
        }
    }
}

/// Keep reading a long-lived child's stderr so it never blocks on a full pipe.
fn drain_stderr(child: &mut Child, pid: u32) {
    let Some(pipe) = child.stderr.take() else {
        return;
    };
    let spawned = std::thread::Builder::new()
        .name(format!("client-{pid}-stderr"))
        .spawn(move || {
            for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                debug!("[pid {}] {}", pid, line);
            }
        });
    if let Err(e) = spawned {
        warn!("Could not watch stderr of PID {}: {}", pid, e);
    }
}
