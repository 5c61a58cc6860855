//! Host and process inspection.

use std::env;

use crate::process::platform;
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::Result;

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("sysinfo", Category::System, sysinfo)
            .summary("OS, CPU and memory overview")
            .explain("sysinfo — print OS/CPU/memory info."),
        CommandEntry::new("uptime", Category::System, uptime)
            .summary("Time since boot")
            .explain("uptime — how long the machine has been running."),
        CommandEntry::new("whoami", Category::System, whoami)
            .summary("Current user and host")
            .explain("whoami — current username and hostname."),
        CommandEntry::new("whereami", Category::System, whereami)
            .summary("Current working directory")
            .explain("whereami — prints current working directory."),
        CommandEntry::new("env", Category::System, env_vars)
            .summary("Environment variables")
            .explain("env — print environment variables."),
        CommandEntry::new("path", Category::System, path)
            .summary("PATH entries")
            .explain("path — print PATH entries."),
        CommandEntry::new("processes", Category::System, processes)
            .summary("Running processes")
            .explain("processes — list running processes."),
        CommandEntry::new("kill", Category::System, kill)
            .summary("Terminate a process")
            .explain("kill — terminate a process by PID or name."),
        CommandEntry::new("storage", Category::System, storage)
            .summary("Drives and free space")
            .explain("storage — show mounted drives and free space."),
        CommandEntry::new("battery", Category::System, battery)
            .summary("Battery status")
            .explain("battery — show battery status (WMIC)."),
    ]
}

/// Name of this machine.
pub fn hostname() -> String {
    #[cfg(unix)]
    {
        nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
    #[cfg(not(unix))]
    {
        env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Login name of the current user.
pub fn username() -> String {
    env::var("USERNAME")
        .or_else(|_| env::var("USER"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Render seconds as `Nd Nh Nm Ns`.
pub fn format_uptime(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
}

/// Kill command line for a PID or an image name.
pub fn kill_command(target: &str) -> String {
    let is_pid = target.chars().all(|c| c.is_ascii_digit());
    match (cfg!(windows), is_pid) {
        (true, true) => format!("taskkill /PID {} /F", target),
        (true, false) => format!("taskkill /IM \"{}\" /F", target),
        (false, true) => format!("kill -9 {}", target),
        (false, false) => format!("pkill -x '{}'", target.replace('\'', "")),
    }
}

fn sysinfo(session: &mut Session<'_>, _: &str) -> Result<()> {
    let os = session.run_quiet(platform("ver", "uname -srm"), None);
    session.println(format!("OS: {} ({})", os.text(), env::consts::ARCH));
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    session.println(format!("Logical CPUs: {}", cpus));

    let memory = session.run_quiet(
        platform(
            "wmic OS get TotalVisibleMemorySize,FreePhysicalMemory /format:list",
            "free -m",
        ),
        Some(std::time::Duration::from_secs(5)),
    );
    if !memory.text().is_empty() {
        session.println("Memory:");
        for line in memory.text().lines().filter(|l| !l.trim().is_empty()) {
            session.println(format!("  {}", line.trim()));
        }
    }
    Ok(())
}

fn uptime(session: &mut Session<'_>, _: &str) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(text) = std::fs::read_to_string("/proc/uptime") {
            if let Some(secs) = text
                .split_whitespace()
                .next()
                .and_then(|s| s.parse::<f64>().ok())
            {
                let secs = secs as u64;
                let boot = chrono::Local::now() - chrono::Duration::seconds(secs as i64);
                session.println(format!("Boot time: {}", boot.format("%Y-%m-%d %H:%M:%S")));
                session.println(format!("Uptime: {}", format_uptime(secs)));
                return Ok(());
            }
        }
    }

    let out = session.run_quiet(
        platform("net stats workstation", "uptime"),
        Some(std::time::Duration::from_secs(3)),
    );
    let line = if cfg!(windows) {
        out.stdout
            .lines()
            .find(|l| l.to_lowercase().contains("statistics since"))
            .map(|l| l.trim().to_string())
    } else {
        Some(out.stdout.clone()).filter(|s| !s.is_empty())
    };
    match line {
        Some(line) => session.println(line),
        None => session.println("Uptime not available."),
    }
    Ok(())
}

fn whoami(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(format!("User: {}", username()));
    session.println(format!("Host: {}", hostname()));
    Ok(())
}

fn whereami(session: &mut Session<'_>, _: &str) -> Result<()> {
    let cwd = env::current_dir()?;
    session.println(format!("CWD: {}", cwd.display()));
    Ok(())
}

fn env_vars(session: &mut Session<'_>, _: &str) -> Result<()> {
    let mut vars: Vec<(String, String)> = env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect();
    vars.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
    for (key, value) in vars {
        session.println(format!("{}={}", key, value));
    }
    Ok(())
}

fn path(session: &mut Session<'_>, _: &str) -> Result<()> {
    if let Some(path) = env::var_os("PATH") {
        for dir in env::split_paths(&path) {
            session.println(dir.display().to_string());
        }
    }
    Ok(())
}

fn processes(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform("tasklist", "ps aux"))?;
    Ok(())
}

fn kill(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "PID or process name to kill: ")?;
    if target.is_empty() {
        return Ok(());
    }
    if !session.confirm(&format!("Type YES to kill {}: ", target))? {
        session.println("Aborted.");
        return Ok(());
    }
    tracing::info!(process = %target, "killing process");
    session.run(&kill_command(&target))?;
    session.println("Kill attempted.");
    Ok(())
}

fn storage(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform(
        "wmic logicaldisk get name,size,freespace,description /format:list",
        "df -h",
    ))?;
    Ok(())
}

fn battery(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.run(platform(
        "wmic path Win32_Battery get EstimatedChargeRemaining,BatteryStatus /format:list",
        "cat /sys/class/power_supply/BAT*/capacity 2>/dev/null || echo 'No battery found.'",
    ))?;
    Ok(())
}
