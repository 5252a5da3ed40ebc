use crate::error::{Error, Result};

/// Verify the host can run a reconciliation pass.
///
/// Checks the `ip` binary, the agent CLI (when it is the inventory source),
/// and root privileges for `setns`. Collects all failures and returns them
/// in a single `ConfigInvalid` error.
pub fn check_prerequisites(ip_binary: &str, agent_binary: Option<&str>) -> Result<()> {
    let mut errors = Vec::new();

    check_command(ip_binary, &mut errors);
    if let Some(agent) = agent_binary {
        check_command(agent, &mut errors);
    }
    check_root(&mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::ConfigInvalid(errors.join("; ")))
    }
}

fn check_command(cmd: &str, errors: &mut Vec<String>) {
    if which::which(cmd).is_err() {
        errors.push(format!("required command not found: {cmd}"));
    }
}

fn check_root(errors: &mut Vec<String>) {
    if !nix::unistd::geteuid().is_root() {
        errors.push("root privileges required to switch network namespaces".to_string());
    }
}
