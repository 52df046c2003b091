//! Scan command - finds and confirms catastrophic-backtracking regexes

use crate::output::json::JsonFormatter;
use crate::output::sarif::SarifFormatter;
use crate::output::text::TextFormatter;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use oni_core::analysis::ScanEngine;
use oni_core::ast::SourceTree;
use oni_core::config::{Config, load_config_or_default};
use oni_core::report::{FileError, Finding, ScanReport, ScanStatus};
use oni_core::sandbox::{ProcessSandbox, WorkerCommand};
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use walkdir::WalkDir;

const DUMP_SUFFIX: &str = ".ast.json";

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Path to a dump file or a directory of dumps
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format for findings (text, json, ndjson, sarif)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Per-trial wall-clock budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub budget_ms: Option<u64>,

    /// Scan-wide fuzzing deadline in milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Seed for adversarial input generation
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Classify only; skip dynamic confirmation
    #[arg(long)]
    pub no_fuzz: bool,

    /// Report benign sites too
    #[arg(long)]
    pub all: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl ScanArgs {
    pub fn run(&self) -> Result<()> {
        self.configure_colors();

        let config_result = load_config_or_default(&self.path)?;
        for warning in &config_result.warnings {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }
        let mut config = config_result.config;
        self.apply_overrides(&mut config);

        let files = discover_files(&self.path, &config.include, &config.exclude)?;
        if files.is_empty() {
            println!("No AST dumps found.");
            return Ok(());
        }

        // A dump that fails to load costs only itself; the scan goes on.
        let loaded: Vec<Result<SourceTree, FileError>> = files
            .par_iter()
            .map(|file| SourceTree::load(file).map_err(FileError::from))
            .collect();
        let mut trees = Vec::new();
        let mut file_errors = Vec::new();
        for result in loaded {
            match result {
                Ok(tree) => trees.push(tree),
                Err(err) => file_errors.push(err),
            }
        }

        let engine = ScanEngine::with_config(&config);
        let report = if self.no_fuzz {
            engine.scan_static(&trees, file_errors)
        } else {
            let sandbox = ProcessSandbox::new(WorkerCommand::current_exe()?);
            let deadline = config.fuzz.deadline().map(|d| Instant::now() + d);
            engine.scan(&trees, file_errors, &sandbox, deadline)
        };

        let findings: Vec<Finding> = report
            .findings
            .iter()
            .filter(|f| config.report.verbose || f.is_reportable())
            .cloned()
            .collect();
        let scanned_path = self.path.to_string_lossy().to_string();

        match self.format.as_str() {
            "json" => self.output_json(&findings, &report, &engine, &scanned_path),
            "ndjson" => self.output_ndjson(&findings, &report, &engine, &scanned_path)?,
            "sarif" => self.output_sarif(&findings, &engine),
            _ => self.output_text(&findings, &report),
        }

        match report.status() {
            ScanStatus::Clean => Ok(()),
            status => process::exit(status.exit_code()),
        }
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ms) = self.budget_ms {
            config.fuzz.budget_ms = ms;
        }
        if let Some(ms) = self.deadline_ms {
            config.fuzz.deadline_ms = ms;
        }
        if let Some(seed) = self.seed {
            config.fuzz.seed = seed;
        }
        if self.all {
            config.report.verbose = true;
        }
    }

    fn configure_colors(&self) {
        let no_color_env = std::env::var("NO_COLOR").is_ok();
        if self.no_color || no_color_env {
            colored::control::set_override(false);
        }
    }

    fn output_text(&self, findings: &[Finding], report: &ScanReport) {
        let formatter = TextFormatter::new();
        print!("{}", formatter.format(findings, report));
    }

    fn output_json(
        &self,
        findings: &[Finding],
        report: &ScanReport,
        engine: &ScanEngine,
        scanned_path: &str,
    ) {
        let formatter = JsonFormatter::with_registry(engine.registry());
        println!("{}", formatter.format(findings, report, scanned_path));
    }

    fn output_ndjson(
        &self,
        findings: &[Finding],
        report: &ScanReport,
        engine: &ScanEngine,
        scanned_path: &str,
    ) -> Result<()> {
        let formatter = JsonFormatter::with_registry(engine.registry());
        let mut stdout = io::stdout().lock();
        formatter.format_ndjson(findings, report, scanned_path, &mut stdout)?;
        Ok(())
    }

    fn output_sarif(&self, findings: &[Finding], engine: &ScanEngine) {
        let formatter = SarifFormatter::with_registry(engine.registry());
        println!("{}", formatter.format(findings));
    }
}

fn discover_files(path: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        if is_dump_file(path) {
            return Ok(vec![path.to_path_buf()]);
        }
        return Ok(vec![]);
    }

    let files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_dump_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .filter(|p| matches_filters(p, include, exclude))
        .collect();

    Ok(files)
}

fn is_dump_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(DUMP_SUFFIX))
        .unwrap_or(false)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name == "__pycache__")
        .unwrap_or(false)
}

/// Substring filters from the config. An empty include list admits
/// everything; exclude always wins.
fn matches_filters(path: &Path, include: &[String], exclude: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    if !include.is_empty() && !include.iter().any(|p| path_str.contains(p.as_str())) {
        return false;
    }
    !exclude.iter().any(|p| path_str.contains(p.as_str()))
}
