//! Remote Executor: drives worker-side VM provisioning over SSH.

use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;

use ssh2::Session;
use tracing::warn;

use slicectl_core::types::RemoteExecResult;

/// How the executor authenticates against `gateway_host:port`.
#[derive(Debug, Clone)]
pub enum SshCredential {
    Password(String),
    KeyFile(std::path::PathBuf),
}

/// Drives the fixed provisioning script on a worker over SSH.
#[derive(Clone)]
pub struct RemoteExecutor {
    gateway_host: std::net::Ipv4Addr,
    user: String,
    credential: SshCredential,
    connect_timeout: Duration,
}

impl RemoteExecutor {
    pub fn new(gateway_host: std::net::Ipv4Addr, user: String, credential: SshCredential) -> Self {
        Self {
            gateway_host,
            user,
            credential,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Provision a VM on the worker reachable at `gateway_host:ssh_port`.
    ///
    /// Never returns an `Err`: every failure mode (connect, auth, timeout,
    /// non-zero exit) is folded into `RemoteExecResult::success = false`.
    pub async fn create_vm_multi_vlan(
        &self,
        ssh_port: u16,
        name: String,
        bridge: String,
        vlans: Vec<u32>,
        vnc_port: u32,
        cpu: u32,
        ram_mb: u64,
        disk_gb: u64,
        num_ifaces: u32,
        image_path: String,
    ) -> RemoteExecResult {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            this.run_provisioning_script(
                ssh_port, &name, &bridge, &vlans, vnc_port, cpu, ram_mb, disk_gb, num_ifaces,
                &image_path,
            )
        })
        .await
        .unwrap_or_else(|e| failure(format!("executor task panicked: {e}")))
    }

    /// Best-effort teardown of a VM's hypervisor process and network
    /// attachments. Failures are returned, not propagated as an error, so
    /// the caller can log-and-continue per the delete contract.
    pub async fn teardown(&self, ssh_port: u16, vm_name: String) -> RemoteExecResult {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.run_teardown_script(ssh_port, &vm_name))
            .await
            .unwrap_or_else(|e| failure(format!("executor task panicked: {e}")))
    }

    fn connect(&self, ssh_port: u16) -> Result<Session, String> {
        let addr = (self.gateway_host, ssh_port);
        let tcp = TcpStream::connect_timeout(
            &std::net::SocketAddr::from(addr),
            self.connect_timeout,
        )
        .map_err(|e| format!("connect failed: {e}"))?;
        tcp.set_read_timeout(Some(self.connect_timeout)).ok();

        let mut session = Session::new().map_err(|e| format!("ssh init failed: {e}"))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| format!("ssh handshake failed: {e}"))?;

        match &self.credential {
            SshCredential::Password(password) => session
                .userauth_password(&self.user, password)
                .map_err(|e| format!("password auth failed: {e}"))?,
            SshCredential::KeyFile(path) => session
                .userauth_pubkey_file(&self.user, None, path, None)
                .map_err(|e| format!("key auth failed: {e}"))?,
        }

        if !session.authenticated() {
            return Err("authentication did not succeed".to_string());
        }
        Ok(session)
    }

    fn exec(&self, ssh_port: u16, command: &str) -> RemoteExecResult {
        let session = match self.connect(ssh_port) {
            Ok(s) => s,
            Err(e) => return failure(e),
        };

        let mut channel = match session.channel_session() {
            Ok(c) => c,
            Err(e) => return failure(format!("channel open failed: {e}")),
        };

        if let Err(e) = channel.exec(command) {
            let _ = channel.close();
            return failure(format!("exec failed: {e}"));
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let _ = channel.read_to_string(&mut stdout);
        let _ = channel.stderr().read_to_string(&mut stderr);
        let _ = channel.wait_close();
        let exit_status = channel.exit_status().unwrap_or(-1);

        // The SSH session is dropped (and with it the TCP stream) on every
        // exit path through this function, including the early returns above.

        if exit_status != 0 {
            return RemoteExecResult {
                success: false,
                stdout,
                stderr,
                pid: None,
                vlans: Vec::new(),
            };
        }

        let success = stderr.trim().is_empty() || stdout.contains("creada correctamente");
        let pid = parse_pid(&stdout);

        RemoteExecResult {
            success,
            stdout,
            stderr,
            pid,
            vlans: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_provisioning_script(
        &self,
        ssh_port: u16,
        name: &str,
        bridge: &str,
        vlans: &[u32],
        vnc_port: u32,
        cpu: u32,
        ram_mb: u64,
        disk_gb: u64,
        num_ifaces: u32,
        image_path: &str,
    ) -> RemoteExecResult {
        let vlan_arg = if vlans.is_empty() {
            "0".to_string()
        } else {
            vlans
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };

        let command = format!(
            "/opt/slicectl/provision-vm.sh {} {} {} {} {} {} {} {} {}",
            shell_escape(name),
            shell_escape(bridge),
            vlan_arg,
            vnc_port,
            cpu,
            ram_mb,
            disk_gb,
            num_ifaces,
            shell_escape(image_path),
        );

        let mut result = self.exec(ssh_port, &command);
        result.vlans = vlans.to_vec();
        result
    }

    fn run_teardown_script(&self, ssh_port: u16, vm_name: &str) -> RemoteExecResult {
        let command = format!("/opt/slicectl/teardown-vm.sh {}", shell_escape(vm_name));
        let result = self.exec(ssh_port, &command);
        if !result.success {
            warn!(vm_name, stderr = %result.stderr, "teardown reported failure");
        }
        result
    }
}

fn failure(message: String) -> RemoteExecResult {
    RemoteExecResult {
        success: false,
        stdout: String::new(),
        stderr: message,
        pid: None,
        vlans: Vec::new(),
    }
}

fn shell_escape(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Parse the process id from a line containing the token `PID`: the last
/// whitespace-separated numeric field, stripped of surrounding parentheses.
fn parse_pid(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .filter(|line| line.contains("PID"))
        .last()
        .and_then(|line| {
            line.split_whitespace()
                .rev()
                .map(|tok| tok.trim_matches(|c| c == '(' || c == ')'))
                .find_map(|tok| tok.parse::<u32>().ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pid_from_last_numeric_field() {
        let stdout = "Creating VM...\nStarted process PID (4821)\n";
        assert_eq!(parse_pid(stdout), Some(4821));
    }

    #[test]
    fn parses_pid_without_parentheses() {
        let stdout = "launch ok, PID 9001\n";
        assert_eq!(parse_pid(stdout), Some(9001));
    }

    #[test]
    fn no_pid_line_returns_none() {
        let stdout = "vm creada correctamente\n";
        assert_eq!(parse_pid(stdout), None);
    }

    #[test]
    fn skips_trailing_non_numeric_token() {
        let stdout = "PID 4821 started\n";
        assert_eq!(parse_pid(stdout), Some(4821));
    }

    #[test]
    fn escapes_single_quotes_in_arguments() {
        assert_eq!(shell_escape("it's-a-vm"), "'it'\\''s-a-vm'");
    }
}
