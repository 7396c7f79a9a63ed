//! Handlers for `service install` and `service uninstall`.

use crate::cli::InstallArgs;
use std::fs;
use std::process::Command;

const SERVICE_PATH: &str = "/etc/systemd/system/quotekeeper.service";

/// Generate the systemd service file content.
fn generate_service_file(args: &InstallArgs, binary_path: &str) -> String {
    format!(
        r#"[Unit]
Description=Quotekeeper Market-Making Engine
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
User={user}
Group={user}
WorkingDirectory={working_dir}
ExecStart={binary} run --no-banner --json-logs --config {config}
Restart=on-failure
RestartSec=5
EnvironmentFile=-{working_dir}/.env

[Install]
WantedBy=multi-user.target
"#,
        user = args.user,
        working_dir = args.working_dir.display(),
        binary = binary_path,
        config = args.config.display(),
    )
}

/// Execute the install command.
pub fn execute_install(args: &InstallArgs) {
    let binary_path = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/usr/local/bin/quotekeeper".to_string());

    let service_content = generate_service_file(args, &binary_path);

    if !is_root() {
        eprintln!("Error: This command must be run as root (use sudo)");
        std::process::exit(1);
    }

    match fs::write(SERVICE_PATH, &service_content) {
        Ok(()) => println!("✓ Created {SERVICE_PATH}"),
        Err(e) => {
            eprintln!("Failed to create service file: {e}");
            std::process::exit(1);
        }
    }

    if run_systemctl(&["daemon-reload"]) {
        println!("✓ Reloaded systemd daemon");
    } else {
        eprintln!("Failed to reload systemd daemon");
        std::process::exit(1);
    }

    if run_systemctl(&["enable", "quotekeeper"]) {
        println!("✓ Enabled quotekeeper service (starts on boot)");
    } else {
        eprintln!("Failed to enable service");
        std::process::exit(1);
    }

    let status_dir = "/var/run/quotekeeper";
    if !std::path::Path::new(status_dir).exists() {
        if let Err(e) = fs::create_dir_all(status_dir) {
            eprintln!("Warning: Failed to create {status_dir}: {e}");
        } else {
            let user = &args.user;
            let _ = std::process::Command::new("chown").args(["-R", user, status_dir]).status();
            println!("✓ Created {status_dir}");
        }
    }

    println!();
    println!("Start with: sudo systemctl start quotekeeper");
    println!("View logs:  quotekeeper logs -f");
    println!();
}

/// Execute the uninstall command.
pub fn execute_uninstall() {
    if !is_root() {
        eprintln!("Error: This command must be run as root (use sudo)");
        std::process::exit(1);
    }

    if run_systemctl(&["stop", "quotekeeper"]) {
        println!("✓ Stopped quotekeeper service");
    }
    if run_systemctl(&["disable", "quotekeeper"]) {
        println!("✓ Disabled quotekeeper service");
    }

    if std::path::Path::new(SERVICE_PATH).exists() {
        match fs::remove_file(SERVICE_PATH) {
            Ok(()) => println!("✓ Removed {SERVICE_PATH}"),
            Err(e) => {
                eprintln!("Failed to remove service file: {e}");
                std::process::exit(1);
            }
        }
    }

    if run_systemctl(&["daemon-reload"]) {
        println!("✓ Reloaded systemd daemon");
    }

    println!();
    println!("Quotekeeper service has been uninstalled.");
    println!();
}

fn run_systemctl(args: &[&str]) -> bool {
    Command::new("systemctl").args(args).status().map(|s| s.success()).unwrap_or(false)
}

fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
