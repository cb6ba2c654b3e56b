//! NetworkManager adapter
//!
//! Drives the host's WiFi through the `nmcli` command line client using its
//! terse output mode, where `:` separates fields and literal colons are
//! escaped as `\:`.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use wifiqr_core::{AdapterError, Disposition};

use crate::{NetworkHandle, WifiInterface};

/// Error domain for nmcli failures
pub const NMCLI_DOMAIN: &str = "nmcli";

/// Error domain for failing to run nmcli at all
pub const SPAWN_DOMAIN: &str = "io";

/// nmcli exit codes
const EXIT_TIMEOUT: i32 = 3;
const EXIT_ACTIVATION_FAILED: i32 = 4;
const EXIT_NOT_FOUND: i32 = 10;

/// WiFi interface backed by NetworkManager
#[derive(Clone, Debug)]
pub struct NmcliWifi {
    program: String,
    ifname: Option<String>,
}

impl NmcliWifi {
    pub fn new() -> Self {
        NmcliWifi {
            program: "nmcli".to_string(),
            ifname: None,
        }
    }

    /// Restrict to one device, e.g. `wlan0`
    pub fn with_ifname(mut self, ifname: impl Into<String>) -> Self {
        self.ifname = Some(ifname.into());
        self
    }

    /// Use a different nmcli binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, AdapterError> {
        self.run_with_input(args, None).await
    }

    /// Run nmcli, feeding `input` to its stdin when given
    async fn run_with_input(
        &self,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<String, AdapterError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            if let Err(e) = stdin.write_all(format!("{input}\n").as_bytes()).await {
                tracing::debug!(error = %e, "nmcli closed stdin early");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(output.status.code().unwrap_or(-1), stderr.trim()))
    }

    fn spawn_error(&self, e: std::io::Error) -> AdapterError {
        AdapterError::new(
            i64::from(e.raw_os_error().unwrap_or(-1)),
            SPAWN_DOMAIN,
            format!("failed to run {}: {}", self.program, e),
        )
        .with_disposition(Disposition::Fatal)
    }
}

impl Default for NmcliWifi {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiInterface for NmcliWifi {
    async fn interface_available(&self) -> bool {
        let Ok(listing) = self.run(&["-t", "-f", "DEVICE,TYPE", "device"]).await else {
            return false;
        };

        listing.lines().map(split_terse).any(|fields| {
            fields.get(1).map(String::as_str) == Some("wifi")
                && self
                    .ifname
                    .as_deref()
                    .map_or(true, |name| fields.first().map(String::as_str) == Some(name))
        })
    }

    async fn scan(&self, ssid: &str) -> Result<Vec<NetworkHandle>, AdapterError> {
        let mut args = vec![
            "-t",
            "-f",
            "SSID,BSSID,SIGNAL,CHAN",
            "device",
            "wifi",
            "list",
            "--rescan",
            "yes",
        ];
        if let Some(ifname) = &self.ifname {
            args.extend(["ifname", ifname.as_str()]);
        }

        let listing = self.run(&args).await?;
        Ok(parse_scan_listing(&listing, ssid))
    }

    async fn associate(
        &self,
        network: &NetworkHandle,
        secret: Option<&str>,
    ) -> Result<(), AdapterError> {
        // With --ask nmcli reads the password from stdin, keeping it off argv
        let mut args = Vec::new();
        if secret.is_some() {
            args.push("--ask");
        }
        args.extend(["device", "wifi", "connect", network.ssid.as_str()]);
        if let Some(bssid) = &network.bssid {
            args.extend(["bssid", bssid.as_str()]);
        }
        if let Some(ifname) = &self.ifname {
            args.extend(["ifname", ifname.as_str()]);
        }

        self.run_with_input(&args, secret).await.map(|_| ())
    }
}

/// Split one terse output line on unescaped colons
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Networks in a `SSID,BSSID,SIGNAL,CHAN` listing that advertise `ssid`
fn parse_scan_listing(listing: &str, ssid: &str) -> Vec<NetworkHandle> {
    listing
        .lines()
        .filter(|line| !line.is_empty())
        .map(split_terse)
        .filter(|fields| fields.len() >= 3 && fields[0] == ssid)
        .map(|fields| {
            let signal = fields[2].trim().parse().unwrap_or(0);
            let mut network = NetworkHandle::new(fields[0].clone(), signal);
            if !fields[1].is_empty() {
                network = network.with_bssid(fields[1].clone());
            }
            if let Some(channel) = fields.get(3).and_then(|c| c.trim().parse().ok()) {
                network = network.with_channel(channel);
            }
            network
        })
        .collect()
}

/// Map an nmcli exit status and message to an adapter error
fn classify_failure(code: i32, stderr: &str) -> AdapterError {
    let disposition = if stderr.contains("Scanning not allowed") {
        Disposition::Busy
    } else if stderr.contains("Secrets were required") {
        // Wrong or missing password; retrying will not help
        Disposition::Fatal
    } else {
        match code {
            EXIT_TIMEOUT | EXIT_ACTIVATION_FAILED | EXIT_NOT_FOUND => Disposition::Transient,
            _ => Disposition::Fatal,
        }
    };

    AdapterError::new(i64::from(code), NMCLI_DOMAIN, stderr).with_disposition(disposition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_terse_escapes() {
        let fields = split_terse(r"Home:AA\:BB\:CC\:DD\:EE\:FF:72:6");
        assert_eq!(fields, vec!["Home", "AA:BB:CC:DD:EE:FF", "72", "6"]);

        let fields = split_terse(r"Back\\slash\:Net::0:");
        assert_eq!(fields, vec![r"Back\slash:Net", "", "0", ""]);
    }

    #[test]
    fn test_parse_scan_listing_filters_ssid() {
        let listing = "\
Home:AA\\:BB\\:CC\\:DD\\:EE\\:01:40:1
Neighbour:AA\\:BB\\:CC\\:DD\\:EE\\:02:90:6
Home:AA\\:BB\\:CC\\:DD\\:EE\\:03:81:36

";
        let networks = parse_scan_listing(listing, "Home");
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].signal, 40);
        assert_eq!(networks[1].bssid.as_deref(), Some("AA:BB:CC:DD:EE:03"));
        assert_eq!(networks[1].channel, Some(36));

        assert!(parse_scan_listing(listing, "Missing").is_empty());
    }

    #[test]
    fn test_classify_failure() {
        let busy = classify_failure(1, "Error: Scanning not allowed while already scanning.");
        assert_eq!(busy.disposition, Some(Disposition::Busy));

        let secrets = classify_failure(
            EXIT_ACTIVATION_FAILED,
            "Error: Connection activation failed: Secrets were required, but not provided.",
        );
        assert_eq!(secrets.disposition, Some(Disposition::Fatal));

        let missing = classify_failure(EXIT_NOT_FOUND, "Error: No network with SSID 'Home' found.");
        assert_eq!(missing.disposition, Some(Disposition::Transient));
        assert_eq!(missing.domain, NMCLI_DOMAIN);
        assert_eq!(missing.code, 10);

        let invalid = classify_failure(2, "Error: invalid argument");
        assert_eq!(invalid.disposition, Some(Disposition::Fatal));
    }

    #[tokio::test]
    async fn test_missing_program_is_fatal() {
        let wifi = NmcliWifi::new().with_program("/nonexistent/nmcli-for-tests");
        let err = wifi.scan("Home").await.unwrap_err();
        assert_eq!(err.domain, SPAWN_DOMAIN);
        assert_eq!(err.disposition, Some(Disposition::Fatal));
        assert!(!wifi.interface_available().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_password_goes_to_stdin_not_argv() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("nmcli");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > {dir}/argv\ncat > {dir}/stdin\nexit 0\n",
            dir = dir.path().display()
        );
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let wifi = NmcliWifi::new().with_program(program.to_string_lossy());
        let network = NetworkHandle::new("Home", -50);
        wifi.associate(&network, Some("hunter2secret")).await.unwrap();

        let argv = std::fs::read_to_string(dir.path().join("argv")).unwrap();
        assert!(!argv.contains("hunter2secret"));
        assert!(argv.starts_with("--ask device wifi connect Home"));

        let stdin = std::fs::read_to_string(dir.path().join("stdin")).unwrap();
        assert_eq!(stdin, "hunter2secret\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_network_skips_ask() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("nmcli");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > {dir}/argv\nexit 0\n",
            dir = dir.path().display()
        );
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let wifi = NmcliWifi::new().with_program(program.to_string_lossy());
        wifi.associate(&NetworkHandle::new("Cafe", -60), None)
            .await
            .unwrap();

        let argv = std::fs::read_to_string(dir.path().join("argv")).unwrap();
        assert_eq!(argv.trim(), "device wifi connect Cafe");
    }
}
