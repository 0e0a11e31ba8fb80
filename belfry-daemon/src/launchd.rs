//! Run the daemon at login on macOS via a per-user launchd agent.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use belfry_core::paths::ROOT_ENV;
use belfry_core::Layout;

use crate::error::{io_err, DaemonError};

pub const DAEMON_LABEL: &str = "dev.belfry.daemon";

pub fn launch_agents_dir(home: &Path) -> PathBuf {
    home.join("Library").join("LaunchAgents")
}

pub fn plist_path(home: &Path) -> PathBuf {
    launch_agents_dir(home).join(format!("{DAEMON_LABEL}.plist"))
}

/// Render the agent plist.
///
/// `KeepAlive.SuccessfulExit = false` restarts the daemon after a crash but
/// leaves it stopped after a `shutdown` command (clean exit).
pub fn generate_plist(binary: &Path, layout: &Layout) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{binary}</string>
    <string>daemon</string>
    <string>start</string>
  </array>
  <key>EnvironmentVariables</key>
  <dict>
    <key>{root_env}</key>
    <string>{root}</string>
  </dict>
  <key>RunAtLoad</key>
  <true/>
  <key>KeepAlive</key>
  <dict>
    <key>SuccessfulExit</key>
    <false/>
  </dict>
  <key>StandardOutPath</key>
  <string>{stdout}</string>
  <key>StandardErrorPath</key>
  <string>{stderr}</string>
</dict>
</plist>
"#,
        label = DAEMON_LABEL,
        binary = binary.display(),
        root_env = ROOT_ENV,
        root = layout.root().display(),
        stdout = layout.stdout_log_path().display(),
        stderr = layout.stderr_log_path().display(),
    )
}

/// Write the plist and (re)bootstrap the agent. Returns the plist path.
pub fn install(home: &Path, layout: &Layout, binary: &Path) -> Result<PathBuf, DaemonError> {
    ensure_macos()?;

    for dir in [launch_agents_dir(home), layout.logs_dir()] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }

    let plist = plist_path(home);
    fs::write(&plist, generate_plist(binary, layout)).map_err(|e| io_err(&plist, e))?;

    let domain = launchctl_domain()?;
    let service = format!("{domain}/{DAEMON_LABEL}");
    let plist_arg = plist.display().to_string();
    let _ = run_launchctl(&["bootout", service.as_str()], true);
    run_launchctl(&["bootstrap", domain.as_str(), plist_arg.as_str()], false)?;
    run_launchctl(&["kickstart", "-k", service.as_str()], false)?;

    Ok(plist)
}

/// Boot out the agent and remove its plist.
pub fn uninstall(home: &Path) -> Result<(), DaemonError> {
    ensure_macos()?;

    let plist = plist_path(home);
    if plist.exists() {
        let service = format!("{}/{DAEMON_LABEL}", launchctl_domain()?);
        let _ = run_launchctl(&["bootout", service.as_str()], true);
        fs::remove_file(&plist).map_err(|e| io_err(&plist, e))?;
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn ensure_macos() -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn ensure_macos() -> Result<(), DaemonError> {
    Err(DaemonError::Launchd(
        "launchd management is only supported on macOS".to_string(),
    ))
}

fn run_launchctl(args: &[&str], ignore_failure: bool) -> Result<(), DaemonError> {
    let output = Command::new("launchctl")
        .args(args)
        .output()
        .map_err(|e| io_err("launchctl", e))?;

    if output.status.success() || ignore_failure {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(DaemonError::Launchd(format!(
        "launchctl {} failed (status {}): {}",
        args.first().copied().unwrap_or_default(),
        output.status,
        stderr
    )))
}

fn launchctl_domain() -> Result<String, DaemonError> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .map_err(|e| io_err("id -u", e))?;
    let uid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || uid.is_empty() {
        return Err(DaemonError::Launchd(format!(
            "failed to resolve current uid (status {})",
            output.status
        )));
    }
    Ok(format!("gui/{uid}"))
}
