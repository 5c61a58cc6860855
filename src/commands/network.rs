//! Network diagnostics.
//!
//! Everything here shells out to the platform's own tools so the operator
//! can pass their usual flags (`ping -t`, `tracert -d`). Only `myip` talks
//! to the network itself.

use std::fs;
use std::net::{IpAddr, UdpSocket};
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;

use crate::commands::internet::public_ip;
use crate::commands::system::hostname;
use crate::commands::{ask_or_default, stop_on_interrupt};
use crate::process::{find_in_path, platform};
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::{Error, Result};

/// Per-command limit when collecting `saveinfo` output.
const SAVEINFO_TIMEOUT: Duration = Duration::from_secs(20);

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("ping", Category::Network, ping)
            .summary("Test reachability of a host")
            .explain("ping — test reachability. Use Ctrl+C to stop continuous ping."),
        CommandEntry::new("pinginline", Category::Network, ping_inline)
            .summary("Ping with flags inline")
            .explain("pinginline — ping with flags inline."),
        CommandEntry::new("pingpayload", Category::Network, ping_payload)
            .summary("Ping with count and payload size")
            .explain("pingpayload — interactive: set count and payload size."),
        CommandEntry::new("fastping", Category::Network, fastping)
            .summary("Repeated single pings at an interval")
            .explain("fastping — repeated single pings with interval (sub-second possible)."),
        CommandEntry::new("tracert", Category::Network, tracert)
            .summary("Trace the route to a host")
            .explain("tracert — trace route to host."),
        CommandEntry::new("ns", Category::Network, ns)
            .summary("DNS lookup")
            .explain("ns — run nslookup for host."),
        CommandEntry::new("netinfo", Category::Network, netinfo)
            .summary("Interfaces, ARP, routes and Wi-Fi")
            .explain("netinfo — show network interfaces, ARP, routes, Wi-Fi info, user."),
        CommandEntry::new("saveinfo", Category::Network, saveinfo)
            .summary("Save netinfo output to a file")
            .explain("saveinfo — saves netinfo output to temp file."),
        CommandEntry::new("myip", Category::Network, myip)
            .aliases(&["netip"])
            .summary("Hostname, local and public IP")
            .explain("myip — show local outbound and public IP."),
        CommandEntry::new("wifi", Category::Network, wifi)
            .summary("Connected Wi-Fi details")
            .explain("wifi — show connected Wi-Fi info via netsh."),
        CommandEntry::new("speedtest", Category::Network, speedtest)
            .summary("Run an installed speed test")
            .explain("speedtest — runs speedtest-cli or speedtest if installed."),
        CommandEntry::new("dnsflush", Category::Network, dnsflush)
            .summary("Flush the DNS cache")
            .explain("dnsflush — flush DNS cache (ipconfig /flushdns)."),
        CommandEntry::new("hostname", Category::Network, show_hostname)
            .summary("Print the hostname")
            .explain("hostname — print hostname."),
        CommandEntry::new("netstat", Category::Network, netstat)
            .aliases(&["ports"])
            .summary("Active connections and listening ports")
            .explain("netstat — lists active network connections.")
            .explain_alias("ports", "ports — alias to netstat listing."),
        CommandEntry::new("arp", Category::Network, arp)
            .summary("ARP table")
            .explain("arp — show ARP table."),
        CommandEntry::new("users", Category::Network, users)
            .summary("User accounts")
            .explain("users — list user accounts or logged-in users."),
    ]
}

/// Command lines collected by `netinfo` and `saveinfo`.
pub fn netinfo_commands() -> &'static [&'static str] {
    if cfg!(windows) {
        &[
            "ipconfig /all",
            "netsh wlan show interfaces",
            "netsh wlan show profiles",
            "arp -a",
            "route print",
            "ipconfig /displaydns",
            "whoami",
        ]
    } else {
        &["ip addr", "ip route", "ip neigh", "cat /etc/resolv.conf", "whoami"]
    }
}

/// Ping `count` times with `size` byte payloads.
pub fn payload_ping_command(target: &str, count: u32, size: u32) -> String {
    if cfg!(windows) {
        format!("ping -n {} -l {} {}", count, size, target)
    } else {
        format!("ping -c {} -s {} {}", count, size, target)
    }
}

/// One echo request to `target`.
pub fn single_ping_command(target: &str) -> String {
    format!("{} {}", platform("ping -n 1", "ping -c 1"), target)
}

/// Location of a `saveinfo` report for the given timestamp.
pub fn saveinfo_path(stamp: &str) -> PathBuf {
    std::env::temp_dir().join(format!("venom_netinfo_{}.txt", stamp))
}

/// Local address the OS would use to reach the internet.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn local_outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

fn ping(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let args = session.arg_or_ask(rest, "Host/IP to ping (flags allowed): ")?;
    if args.is_empty() {
        return Ok(());
    }
    session.run(&format!("ping {}", args))?;
    Ok(())
}

fn ping_inline(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let args = session.arg_or_ask(rest, "Enter host + flags: ")?;
    if args.is_empty() {
        return Ok(());
    }
    session.run(&format!("ping {}", args))?;
    Ok(())
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::InvalidInput(format!("{} must be a number, got '{}'", what, text)))
}

fn ping_payload(session: &mut Session<'_>, _: &str) -> Result<()> {
    let target = ask_or_default(session, "Target (default 127.0.0.1): ", "127.0.0.1")?;
    let count = ask_or_default(session, "Count (default 4): ", "4")?;
    let size = ask_or_default(session, "Payload size in bytes (default 32): ", "32")?;
    let count: u32 = parse_number(&count, "count")?;
    let size: u32 = parse_number(&size, "payload size")?;
    session.run(&payload_ping_command(&target, count, size))?;
    Ok(())
}

fn fastping(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "Target for fastping: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let count: u64 = ask_or_default(session, "Number of pings (0=infinite, default 0): ", "0")?
        .parse()
        .unwrap_or(0);
    let interval: f64 = ask_or_default(session, "Interval seconds (default 0.2): ", "0.2")?
        .parse()
        .unwrap_or(0.2);
    let interval = Duration::try_from_secs_f64(interval).unwrap_or(Duration::from_millis(200));

    session.println(format!(
        "Pinging {} every {}s. Press Ctrl+C to stop.",
        target,
        interval.as_secs_f64()
    ));
    let result = repeat_ping(session, &target, count, interval);
    stop_on_interrupt(session, result, "Fastping stopped.")
}

fn repeat_ping(session: &mut Session<'_>, target: &str, count: u64, interval: Duration) -> Result<()> {
    let command = single_ping_command(target);
    let mut sent = 0;
    while count == 0 || sent < count {
        session.run(&command)?;
        sent += 1;
        session.sleep(interval)?;
    }
    Ok(())
}

fn tracert(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let host = session.arg_or_ask(rest, "Host for tracert: ")?;
    if host.is_empty() {
        return Ok(());
    }
    session.run(&format!("{} {}", platform("tracert", "traceroute"), host))?;
    Ok(())
}

fn ns(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let host = session.arg_or_ask(rest, "Host for nslookup: ")?;
    if host.is_empty() {
        return Ok(());
    }
    session.run(&format!("nslookup {}", host))?;
    Ok(())
}

fn netinfo(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println("Showing network info (no passwords).");
    for command in netinfo_commands() {
        session.println("");
        session.println(format!("=== {} ===", command));
        session.run(command)?;
    }
    Ok(())
}

fn saveinfo(session: &mut Session<'_>, _: &str) -> Result<()> {
    let path = saveinfo_path(&Local::now().format("%Y%m%d_%H%M%S").to_string());
    let mut report = String::new();
    for command in netinfo_commands() {
        session.interrupt().check()?;
        let out = session.run_quiet(command, Some(SAVEINFO_TIMEOUT));
        report.push_str(&format!("=== {} ===\n{}\n\n", command, out.text()));
    }
    fs::write(&path, report)?;
    session.println(format!("Saved to {}", path.display()));
    Ok(())
}

fn myip(session: &mut Session<'_>, _: &str) -> Result<()> {
    let local = local_outbound_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "Unavailable".to_string());
    session.println(format!("Hostname: {}", hostname()));
    session.println(format!("Local IP: {}", local));
    session.interrupt().check()?;
    let public = public_ip().unwrap_or_else(|| "Unavailable".to_string());
    session.println(format!("Public IP: {}", public));
    Ok(())
}

fn wifi(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform("netsh wlan show interfaces", "nmcli -f IN-USE,SSID,SIGNAL,SECURITY dev wifi"))?;
    Ok(())
}

fn speedtest(session: &mut Session<'_>, _: &str) -> Result<()> {
    match ["speedtest-cli", "speedtest"]
        .into_iter()
        .find(|tool| find_in_path(tool).is_some())
    {
        Some(tool) => {
            session.run(tool)?;
        }
        None => session.println("No speedtest CLI installed. Install 'speedtest-cli' or 'speedtest'."),
    }
    Ok(())
}

fn dnsflush(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform("ipconfig /flushdns", "resolvectl flush-caches"))?;
    Ok(())
}

fn show_hostname(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(hostname());
    Ok(())
}

fn netstat(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform("netstat -ano", "ss -tunap"))?;
    Ok(())
}

fn arp(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform("arp -a", "ip neigh"))?;
    Ok(())
}

fn users(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform("net user", "who"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Outcome, dispatch_line};
    use crate::test_utils::Harness;

    #[test]
    fn test_payload_ping_command() {
        let cmd = payload_ping_command("10.0.0.1", 4, 64);
        if cfg!(windows) {
            assert_eq!(cmd, "ping -n 4 -l 64 10.0.0.1");
        } else {
            assert_eq!(cmd, "ping -c 4 -s 64 10.0.0.1");
        }
    }

    #[test]
    fn test_single_ping_command() {
        assert!(single_ping_command("example.com").ends_with(" 1 example.com"));
    }

    #[test]
    fn test_saveinfo_path() {
        let path = saveinfo_path("20261016_094107");
        assert_eq!(
            path.file_name().unwrap(),
            "venom_netinfo_20261016_094107.txt"
        );
        assert!(path.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn test_netinfo_commands_not_empty() {
        assert!(netinfo_commands().contains(&"whoami"));
    }

    #[test]
    fn test_pingpayload_rejects_bad_count() {
        let mut harness = Harness::with_default_commands("\nmany\n\n");
        let outcome = dispatch_line(&mut harness.session(), "pingpayload");
        assert!(matches!(outcome, Outcome::HandlerFailed(_)));
        assert!(harness.output().contains("count must be a number"));
    }

    #[test]
    fn test_ping_without_target_returns_quietly() {
        let mut harness = Harness::with_default_commands("\n");
        let outcome = dispatch_line(&mut harness.session(), "ping");
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(harness.output(), "Host/IP to ping (flags allowed): ");
    }

    #[test]
    fn test_fastping_interrupted_while_prompting() {
        let mut harness = Harness::with_default_commands("1\n0\n");
        harness.interrupt.trigger();
        let outcome = dispatch_line(&mut harness.session(), "fastping 127.0.0.1");
        assert_eq!(outcome, Outcome::Interrupted);
        assert!(!harness.output().contains("Pinging"));
    }

    #[test]
    fn test_hostname_command() {
        let mut harness = Harness::with_default_commands("");
        dispatch_line(&mut harness.session(), "hostname");
        assert_eq!(harness.output().trim(), hostname());
    }
}
