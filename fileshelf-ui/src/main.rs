mod auth;
mod config;
mod registry;
mod session;
mod shell;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use fileshelf_core::FileServerClient;

use auth::{AuthPhase, Credentials};
use config::{Settings, read_settings};
use registry::{ConfirmDelete, FileRegistry};
use session::{FileSessionStore, SessionStore};
use shell::{Route, Shell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Interactive,
    Status,
    ShowSettings,
    Logout,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Interactive;
    for arg in args.into_iter().skip(1) {
        mode = match arg.as_str() {
            "--status" => CliMode::Status,
            "--show-settings" => CliMode::ShowSettings,
            "--logout" => CliMode::Logout,
            "--help" | "-h" => CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        };
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_cli_mode(std::env::args())?;
    if mode == CliMode::Help {
        print_help();
        return Ok(());
    }

    let settings = read_settings();
    let client = FileServerClient::with_base_url(&settings.api_base_url)
        .context("FILESHELF_API_URL is not a valid base URL")?;
    let mut store = FileSessionStore::new(&settings.data_dir);

    match mode {
        CliMode::Status => match store.load()? {
            Some(user_id) => println!("Logged in as user {user_id} ({})", settings.api_base_url),
            None => println!("Not logged in ({})", settings.api_base_url),
        },
        CliMode::ShowSettings => {
            println!("{}", serde_json::to_string_pretty(&settings.snapshot())?);
        }
        CliMode::Logout => {
            store.clear()?;
            println!("Logged out.");
        }
        CliMode::Interactive => run_interactive(client, store, &settings).await?,
        CliMode::Help => unreachable!("help mode returns early"),
    }
    Ok(())
}

async fn run_interactive(
    client: FileServerClient,
    store: FileSessionStore,
    settings: &Settings,
) -> anyhow::Result<()> {
    let mut shell = Shell::new(client, store);
    let mut refreshed = false;

    loop {
        match shell.route() {
            Route::Login => {
                refreshed = false;
                if !run_login_round(&mut shell).await? {
                    return Ok(());
                }
            }
            Route::Files => {
                let Some(registry) = shell.registry_mut() else {
                    continue;
                };
                if !refreshed {
                    registry.refresh().await;
                    refreshed = true;
                }
                render_files(registry);
                if !run_files_command(&mut shell, settings).await? {
                    return Ok(());
                }
            }
        }
    }
}

/// One login prompt round. Returns false when the user asked to quit.
async fn run_login_round(shell: &mut Shell<FileSessionStore>) -> anyhow::Result<bool> {
    println!("Log in with email and password; also fill the name to create a new account.");
    let email = prompt("Email (or 'quit'): ")?;
    if email.eq_ignore_ascii_case("quit") {
        return Ok(false);
    }
    let password = prompt("Password: ")?;
    let name = prompt("Name (leave blank to log in): ")?;

    let phase = shell
        .submit_login(&Credentials {
            email,
            password,
            name,
        })
        .await;
    match phase {
        AuthPhase::LoggedIn(user_id) => println!("Logged in as user {user_id}."),
        AuthPhase::Failed(message) => eprintln!("[fileshelf] {message}"),
        AuthPhase::Idle | AuthPhase::Submitting => {}
    }
    Ok(true)
}

/// One command round on the files route. Returns false on quit.
async fn run_files_command(
    shell: &mut Shell<FileSessionStore>,
    settings: &Settings,
) -> anyhow::Result<bool> {
    let line = prompt("fileshelf> ")?;
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("");
    let argument = words.next();

    match command {
        "" | "list" => {
            if let Some(registry) = shell.registry_mut() {
                registry.refresh().await;
            }
        }
        "upload" => {
            let Some(path) = argument else {
                eprintln!("[fileshelf] usage: upload <path>");
                return Ok(true);
            };
            stage_and_upload(shell, Path::new(path)).await;
        }
        "view" => {
            if let Some((id, _)) = resolve_file(shell, argument) {
                if let Some(registry) = shell.registry() {
                    match registry.view_url(&id) {
                        Ok(url) => println!("Open this URL in your browser:\n{url}"),
                        Err(err) => eprintln!("[fileshelf] {err}"),
                    }
                }
            }
        }
        "download" => {
            if let Some((id, name)) = resolve_file(shell, argument) {
                let download_dir = settings.download_dir.clone();
                if let Some(registry) = shell.registry_mut() {
                    if let Some(path) = registry
                        .download(&id, Some(name.as_str()), &download_dir)
                        .await
                    {
                        println!("Saved to {}", path.display());
                    }
                }
            }
        }
        "delete" => {
            if let Some((id, name)) = resolve_file(shell, argument) {
                if let Some(registry) = shell.registry_mut() {
                    registry.delete(&id, &name, &TerminalConfirm).await;
                }
            }
        }
        "logout" => {
            shell.logout()?;
            println!("Logged out.");
        }
        "quit" | "exit" => return Ok(false),
        "help" => print_commands(),
        other => eprintln!("[fileshelf] unknown command: {other} (try 'help')"),
    }
    Ok(true)
}

async fn stage_and_upload(shell: &mut Shell<FileSessionStore>, path: &Path) {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!("[fileshelf] cannot read {}: {err}", path.display());
            return;
        }
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    if let Some(registry) = shell.registry_mut() {
        registry.select(file_name, contents);
        registry.upload().await;
    }
}

/// Resolves a 1-based list index into the cached record's id and display
/// name.
fn resolve_file(shell: &Shell<FileSessionStore>, argument: Option<&str>) -> Option<(String, String)> {
    let registry = shell.registry()?;
    let Some(argument) = argument else {
        eprintln!("[fileshelf] usage: view|download|delete <number>");
        return None;
    };
    let index = match argument.parse::<usize>() {
        Ok(index) if index >= 1 && index <= registry.files().len() => index - 1,
        _ => {
            eprintln!(
                "[fileshelf] pick a file number between 1 and {}",
                registry.files().len()
            );
            return None;
        }
    };
    let record = &registry.files()[index];
    Some((record.id.clone(), record.display_name().to_string()))
}

fn render_files(registry: &FileRegistry) {
    if let Some(error) = registry.last_error() {
        eprintln!("[fileshelf] error: {error}");
    }
    if registry.files().is_empty() {
        println!("No files uploaded yet.");
        return;
    }
    println!("Files ({}):", registry.files().len());
    for (index, record) in registry.files().iter().enumerate() {
        println!("{:>3}. {}", index + 1, record.display_name());
    }
}

struct TerminalConfirm;

impl ConfirmDelete for TerminalConfirm {
    fn confirm(&self, file_name: &str) -> bool {
        print!("Delete \"{file_name}\"? [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_help() {
    println!(
        "Usage: fileshelf [--status | --show-settings | --logout | --help]\n(no flags starts the interactive shell)"
    );
}

fn print_commands() {
    println!(
        "Commands: list, upload <path>, view <number>, download <number>, delete <number>, logout, quit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_mode() {
        let mode = parse_cli_mode(vec!["fileshelf".to_string()]).unwrap();
        assert_eq!(mode, CliMode::Interactive);
    }

    #[test]
    fn parses_status_mode() {
        let mode = parse_cli_mode(vec!["fileshelf".to_string(), "--status".to_string()]).unwrap();
        assert_eq!(mode, CliMode::Status);
    }

    #[test]
    fn parses_show_settings_mode() {
        let mode = parse_cli_mode(vec![
            "fileshelf".to_string(),
            "--show-settings".to_string(),
        ])
        .unwrap();
        assert_eq!(mode, CliMode::ShowSettings);
    }

    #[test]
    fn parses_logout_mode() {
        let mode = parse_cli_mode(vec!["fileshelf".to_string(), "--logout".to_string()]).unwrap();
        assert_eq!(mode, CliMode::Logout);
    }

    #[test]
    fn parses_help_mode() {
        let mode = parse_cli_mode(vec!["fileshelf".to_string(), "--help".to_string()]).unwrap();
        assert_eq!(mode, CliMode::Help);
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(parse_cli_mode(vec!["fileshelf".to_string(), "--nope".to_string()]).is_err());
    }
}
