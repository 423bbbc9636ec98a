//! Subcommand handlers.
//!
//! Handlers write user-facing text to `out`; diagnostics go to the log.

use crate::cli::{Command, SettingsCommand};
use crate::context::AppContext;
use crate::error::{CliError, CliResult};
use chrono::Utc;
use feature_tracker_core::db::open_db;
use feature_tracker_core::{
    write_backup_file, BackupError, NewFeature, NewPage, PageRepository, ReconcileReport,
    SettingValue, SqlitePageRepository, TrackerService,
};
use log::info;
use std::io::Write;
use std::path::Path;

/// Routes a parsed command to its handler.
pub fn dispatch(command: &Command, context: &mut AppContext, out: &mut dyn Write) -> CliResult<()> {
    if let Command::Settings(settings_command) = command {
        return run_settings(settings_command, context, out);
    }

    let conn = open_db(context.database_path()?)?;
    let service = TrackerService::new(SqlitePageRepository::try_new(&conn)?);
    run_tracker(command, &service, context, out)
}

fn run_tracker<R: PageRepository>(
    command: &Command,
    service: &TrackerService<R>,
    context: &AppContext,
    out: &mut dyn Write,
) -> CliResult<()> {
    match command {
        Command::Pages => {
            let pages = service.list_pages()?;
            if pages.is_empty() {
                writeln!(out, "No pages.")?;
            }
            for page in pages {
                let challenge = if page.is_challenge { " challenge" } else { "" };
                writeln!(
                    out,
                    "{}  {}  hub={} count={} features={}{challenge}",
                    page.id,
                    page.name,
                    page.hub,
                    page.count,
                    page.features.len()
                )?;
            }
        }
        Command::AddPage {
            name,
            hub,
            notes,
            count,
            challenge,
        } => {
            let id = service.add_page(&NewPage {
                name: name.clone(),
                hub: hub.clone(),
                notes: notes.clone(),
                count: *count,
                is_challenge: *challenge,
            })?;
            writeln!(out, "{id}")?;
        }
        Command::AddFeature {
            page,
            date,
            raw,
            notes,
        } => {
            let id = service.add_feature(
                *page,
                &NewFeature {
                    date: date.unwrap_or_else(Utc::now),
                    raw: *raw,
                    notes: notes.clone(),
                },
            )?;
            writeln!(out, "{id}")?;
        }
        Command::DeletePage { page } => {
            service.delete_page(*page)?;
            writeln!(out, "Deleted {page}")?;
        }
        Command::Reconcile { merge_semantic } => {
            let report = service.reconcile_store(context.reconcile_options(*merge_semantic))?;
            write_report(out, &report)?;
        }
        Command::Import {
            file,
            merge_semantic,
        } => {
            let document = read_document(file)?;
            let report =
                service.restore_backup(&document, context.reconcile_options(*merge_semantic))?;
            info!(
                "event=cli_import module=cli status=ok merged_pages={}",
                report.merged_pages
            );
            writeln!(out, "Imported {}", file.display())?;
            write_report(out, &report)?;
        }
        Command::Export { file: Some(file) } => {
            let pages = service.list_pages()?;
            write_backup_file(file, &pages)?;
            writeln!(out, "Exported {} pages to {}", pages.len(), file.display())?;
        }
        Command::Export { file: None } => {
            writeln!(out, "{}", service.export_backup()?)?;
        }
        Command::Stats { json } => {
            let stats = service.statistics()?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                writeln!(out, "pages: {}", stats.page_count)?;
                writeln!(out, "featured pages: {}", stats.featured_page_count)?;
                writeln!(out, "snap features: {}", stats.snap_feature_count)?;
                writeln!(out, "raw features: {}", stats.raw_feature_count)?;
                writeln!(out, "challenge pages: {}", stats.challenge_page_count)?;
                writeln!(out, "challenge features: {}", stats.challenge_feature_count)?;
                writeln!(out, "membership: {}", stats.membership)?;
                writeln!(out, "raw membership: {}", stats.raw_membership)?;
            }
        }
        // Handled before the database is opened.
        Command::Settings(_) => {}
    }
    Ok(())
}

fn run_settings(
    command: &SettingsCommand,
    context: &mut AppContext,
    out: &mut dyn Write,
) -> CliResult<()> {
    match command {
        SettingsCommand::Get { key: Some(key) } => {
            let value = context
                .settings
                .get(key)
                .ok_or_else(|| CliError::UnknownSetting(key.clone()))?;
            writeln!(out, "{value}")?;
        }
        SettingsCommand::Get { key: None } => {
            for (key, value) in context.settings.iter() {
                writeln!(out, "{key} = {value}")?;
            }
        }
        SettingsCommand::Set { key, value } => {
            context.settings.set(key, SettingValue::parse_loose(value))?;
        }
        SettingsCommand::Unset { key } => {
            if !context.settings.remove(key)? {
                return Err(CliError::UnknownSetting(key.clone()));
            }
        }
    }
    Ok(())
}

fn read_document(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| {
        CliError::Backup(BackupError::Io {
            path: path.to_path_buf(),
            source,
        })
    })
}

fn write_report(out: &mut dyn Write, report: &ReconcileReport) -> CliResult<()> {
    if report.is_noop() {
        writeln!(out, "Nothing to reconcile.")?;
        return Ok(());
    }
    writeln!(out, "merged pages: {}", report.merged_pages)?;
    writeln!(out, "collapsed features: {}", report.collapsed_features)?;
    writeln!(out, "reassigned page ids: {}", report.reassigned_page_ids)?;
    writeln!(out, "reassigned feature ids: {}", report.reassigned_feature_ids)?;
    Ok(())
}
