//! State command - report the consistency of the asset cache

use crate::cache::{reconcile, short_hash, CacheLayout, CacheState, FileKind};
use crate::cli::args::{OutputFormat, StateArgs};
use crate::config::Config;
use crate::error::CachetResult;
use crate::ui::{self, TaskSpinner, UiContext};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Execute the state command
pub async fn execute(args: StateArgs, config: &Config) -> CachetResult<()> {
    let ctx = UiContext::detect();

    let state = match args.format {
        OutputFormat::Table => {
            let mut spinner = TaskSpinner::new(&ctx);
            spinner.start("Reconciling asset cache...");
            let state = load_state(config).await;
            spinner.clear();
            state?
        }
        OutputFormat::Json | OutputFormat::Plain => load_state(config).await?,
    };

    let report = StateReport::from_state(&state);
    match args.format {
        OutputFormat::Table => print_table(&ctx, &report, &state),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_plain(&report),
    }

    Ok(())
}

/// Reconcile the configured cache against the configured manifests
pub(crate) async fn load_state(config: &Config) -> CachetResult<CacheState> {
    let cache = CacheLayout::new(config.asset_cache_dir());
    reconcile(
        &cache,
        &config.manifest_dir(),
        config.hashing.manifest_algorithm,
    )
    .await
}

/// One listed cache file
#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct Entry {
    /// File name inside the cache directory
    pub file: String,
    /// Human-readable label
    pub label: String,
    /// Source URL, for assets with a trusted record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A titled list of files
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Group {
    pub title: &'static str,
    pub files: Vec<Entry>,
}

/// Groups under one heading
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Section {
    pub title: &'static str,
    pub groups: Vec<Group>,
}

impl Section {
    fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.files.is_empty())
    }
}

/// Cache state arranged for display
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StateReport {
    pub resolved: bool,
    pub good: Section,
    pub to_process: Section,
    pub to_delete: Section,
}

impl StateReport {
    pub fn from_state(state: &CacheState) -> Self {
        Self {
            resolved: state.is_resolved(),
            good: Section {
                title: "Good",
                groups: vec![
                    group(state, "Assets", &state.good_asset_files, true),
                    group(state, "Projects", &state.good_metadata_files, true),
                ],
            },
            to_process: to_process_section(state),
            to_delete: to_delete_section(state),
        }
    }

    fn sections(&self) -> [&Section; 3] {
        [&self.good, &self.to_process, &self.to_delete]
    }
}

/// Files blocking a prune: missing assets, new and outdated projects
pub(crate) fn to_process_section(state: &CacheState) -> Section {
    Section {
        title: "To process",
        groups: vec![
            group(state, "Missing assets", &state.missing_asset_files, true),
            group(state, "New projects", &state.missing_metadata_files, true),
            group(state, "Outdated projects", &state.outdated_metadata_files, true),
        ],
    }
}

/// Files a prune would delete
pub(crate) fn to_delete_section(state: &CacheState) -> Section {
    Section {
        title: "To delete",
        groups: vec![
            group(state, "Assets", &state.extra_asset_files, true),
            group(state, "Metadata files", &state.extra_metadata_files, false),
            group(state, "Other files", &state.other_files, true),
        ],
    }
}

fn group(state: &CacheState, title: &'static str, files: &[PathBuf], project_names: bool) -> Group {
    Group {
        title,
        files: files
            .iter()
            .map(|p| describe(state, p, project_names))
            .collect(),
    }
}

/// Label a cache file: assets by short hash and URL, metadata by project
pub(crate) fn describe(state: &CacheState, path: &Path, project_names: bool) -> Entry {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match FileKind::of_name(&file) {
        FileKind::Asset => {
            let url = state.asset_url(&file).map(str::to_string);
            let label = match url {
                Some(ref url) => format!("{} ({})", short_hash(&file), url),
                None => short_hash(&file),
            };
            Entry { file, label, url }
        }
        FileKind::Metadata { project } if project_names => Entry {
            file,
            label: project,
            url: None,
        },
        _ => Entry {
            label: file.clone(),
            file,
            url: None,
        },
    }
}

/// Print one section in the grouped report layout
pub(crate) fn print_section(ctx: &UiContext, section: &Section) {
    if section.is_empty() {
        return;
    }
    ui::section(ctx, section.title);
    for group in section.groups.iter().filter(|g| !g.files.is_empty()) {
        println!("{} ({}):", group.title, group.files.len());
        for entry in &group.files {
            ui::item(ctx, &entry.label);
        }
    }
}

fn print_table(ctx: &UiContext, report: &StateReport, state: &CacheState) {
    if report.sections().iter().all(|s| s.is_empty()) {
        ui::remark(ctx, "Asset cache and manifest directory are empty");
        return;
    }

    for section in report.sections() {
        print_section(ctx, section);
    }
    println!();

    let to_process = state.files_to_process().len();
    let to_delete = state.files_to_delete().len();
    if to_process > 0 {
        ui::step_warn_hint(
            ctx,
            &format!("{} file(s) to process", to_process),
            "Run: cachet download",
        );
    }
    if to_delete > 0 {
        ui::step_warn_hint(
            ctx,
            &format!("{} file(s) to delete", to_delete),
            "Run: cachet cleanup",
        );
    }
    if to_process == 0 && to_delete == 0 {
        ui::step_ok(ctx, "Asset cache is consistent");
    }
}

/// `section<TAB>group<TAB>file`, one line per file
fn print_plain(report: &StateReport) {
    for section in report.sections() {
        for group in &section.groups {
            for entry in &group.files {
                println!("{}\t{}\t{}", section.title, group.title, entry.file);
            }
        }
    }
}
