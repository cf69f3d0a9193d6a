use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use multibox_core::{find_conflicts, Account, CharacterIdentity, ConflictReport};
use multibox_infra::desktop::{platform_window_manager, running_characters};
use multibox_infra::{ClientLauncher, ClientLogin, LaunchSummary, WindowManager};
use multibox_prefs::{CopyOrchestrator, CopyReport, CopyRequest, CopyStatus};
use multibox_server::{load_catalog, AppState, SettingsStore};
use tracing::info;

use crate::ServeOverrides;

pub async fn cmd_serve(overrides: ServeOverrides) -> Result<()> {
    let store = SettingsStore::new()?;
    let mut settings = store.load()?;

    if let Some(bind) = overrides.bind {
        settings.bind = bind;
    }
    if let Some(port) = overrides.port {
        settings.port = port;
    }
    settings.preferences_root = overrides.preferences_root.or(settings.preferences_root);
    settings.catalog_path = overrides.catalog.or(settings.catalog_path);
    settings.static_dir = overrides.static_dir.or(settings.static_dir);
    settings.game_folder = overrides.game_folder.or(settings.game_folder);
    settings.dll_folder = overrides.dll_folder.or(settings.dll_folder);

    if overrides.save {
        store.save(&settings)?;
        println!(":: Saved settings to {}", store.path());
    }

    let catalog = load_catalog(settings.catalog_path.as_deref())?;
    let state = AppState::new(settings, Arc::new(catalog), platform_window_manager());
    println!(":: Serving on http://{}", state.settings().socket_addr());
    multibox_server::serve(state).await
}

pub fn cmd_items(catalog: Option<Utf8PathBuf>) -> Result<()> {
    let catalog = load_catalog(catalog.as_deref())?;
    println!(":: {} preference item(s)", catalog.len());
    for item in catalog.items() {
        let mark = if item.recommended { "*" } else { " " };
        println!(
            " {} {:<14} {:<10} {:<30} {}",
            mark,
            item.id,
            format!("{:?}", item.kind),
            item.path_pattern,
            item.description.as_deref().unwrap_or(&item.label)
        );
    }
    println!("   (* recommended)");
    Ok(())
}

pub async fn cmd_copy_prefs(
    root: Utf8PathBuf,
    source: CharacterIdentity,
    targets: Vec<CharacterIdentity>,
    items: Vec<String>,
    make_backup: bool,
    catalog: Option<Utf8PathBuf>,
) -> Result<CopyReport> {
    println!(":: Copying preferences");
    println!("   Root:    {}", root);
    println!("   Source:  {}", source);
    println!("   Targets: {}", targets.len());

    let catalog = load_catalog(catalog.as_deref())?;
    let orchestrator = CopyOrchestrator::new(Arc::new(catalog));
    let request = CopyRequest {
        preferences_root: root,
        source,
        targets,
        selected_item_ids: items,
        make_backup,
    };

    let report = tokio::task::spawn_blocking(move || orchestrator.execute(&request))
        .await
        .context("Preference copy task failed")??;
    Ok(report)
}

pub fn print_copy_report(report: &CopyReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(":: {:?}: {}", report.status, report.message);
    if let Some(name) = &report.backup_folder_name {
        println!("   Backup folder: {}", name);
    }
    for target in &report.targets {
        if target.skipped {
            println!(
                "   {} skipped ({})",
                target.target,
                target.note.as_deref().unwrap_or("")
            );
            continue;
        }
        println!(
            "   {} copied {}, missing {}, backed up {}",
            target.target,
            target.copied_paths.len(),
            target.missing_paths.len(),
            target.backed_up_paths.len()
        );
        for error in &target.errors {
            println!("     ! {}", error);
        }
    }
    Ok(())
}

/// Fails when the report says nothing was copied at all.
pub fn ensure_copied(report: &CopyReport) -> Result<()> {
    if report.status == CopyStatus::Error {
        anyhow::bail!("Preference copy failed: {}", report.message);
    }
    Ok(())
}

pub async fn cmd_launch(
    game_folder: Utf8PathBuf,
    dll_folder: Utf8PathBuf,
    logins: Vec<ClientLogin>,
) -> Result<LaunchSummary> {
    let launcher = ClientLauncher::new(game_folder, dll_folder);
    launcher.verify()?;

    info!("Launching {} client(s)", logins.len());
    let summary = tokio::task::spawn_blocking(move || launcher.launch_all(&logins))
        .await
        .context("Launch task failed")?;

    for line in &summary.launched {
        println!("   {}", line);
    }
    for error in &summary.errors {
        println!("   ! {}", error);
    }
    Ok(summary)
}

pub fn read_accounts(path: &Utf8Path) -> Result<Vec<Account>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let accounts: Vec<Account> =
        serde_json::from_str(&content).with_context(|| format!("Invalid account list in {path}"))?;
    Ok(accounts)
}

pub fn cmd_check(accounts: &[Account], selected: &[String]) -> Result<ConflictReport> {
    cmd_check_with(platform_window_manager().as_ref(), accounts, selected)
}

pub fn cmd_check_with(
    windows: &dyn WindowManager,
    accounts: &[Account],
    selected: &[String],
) -> Result<ConflictReport> {
    let running = running_characters(windows)?;
    let report = find_conflicts(accounts, selected, &running);

    println!(":: {} running client(s)", report.running_characters.len());
    if report.has_conflicts() {
        for conflict in &report.conflicts {
            println!("   ! {}", conflict.message);
        }
    } else {
        println!("   No conflicts detected - safe to launch");
    }
    Ok(report)
}
