use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::compat::{CompatibilityReport, ModuleCompatibility};
use crate::license::{LicensePriority, SupportedLicense};
use crate::models::{CompatibilityIssueData, ProjectSnapshot};

/// Render a colored terminal report.
pub fn render(
    snapshot: &ProjectSnapshot,
    report: &CompatibilityReport,
    path: &Path,
    verbose: bool,
    quiet: bool,
) {
    let issues = &report.issues;
    let dependency_issues: usize = issues
        .package_dependency_issues
        .iter()
        .map(|g| g.issues.len())
        .sum();
    let submodule_issues: usize = issues.submodule_issues.iter().map(|g| g.issues.len()).sum();
    let stuck = report.modules_without_compatible_license().count();

    if quiet {
        println!(
            "Modules: {}  Dependencies: {}  Dependency issues: {}  Submodule issues: {}  \
             Unresolvable: {}",
            report.modules.len(),
            snapshot.dependencies.len(),
            colored_count(dependency_issues),
            colored_count(submodule_issues),
            colored_count(stuck),
        );
        return;
    }

    println!("\n {} v{}", "license-compat".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Project: {}\n", path.display());

    let licensed = report
        .modules
        .iter()
        .filter(|m| m.own_license != SupportedLicense::NoLicense)
        .count();

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    let modules = report.modules.len();
    summary_row(format!("Modules            : {modules:>4}  ({licensed} licensed)"));
    summary_row(format!("Dependencies       : {:>4}", snapshot.dependencies.len()));
    summary_row(format!(
        "{}  Dependency issues : {dependency_issues:>4}",
        mark(dependency_issues)
    ));
    summary_row(format!(
        "{}  Submodule issues  : {submodule_issues:>4}",
        mark(submodule_issues)
    ));
    summary_row(format!("{}  No compatible lic.: {stuck:>4}", mark(stuck)));
    println!(" └────────────────────────────────────────────────────┘\n");

    let shown: Vec<&ModuleCompatibility> = report
        .modules
        .iter()
        .filter(|m| {
            verbose || m.compatible.is_empty() || m.own_license != SupportedLicense::NoLicense
        })
        .collect();
    if !shown.is_empty() {
        println!(" {} Modules:\n", "[INFO]".cyan().bold());
        render_modules(&shown, path);
        println!();
    }

    render_issues(issues);
}

fn summary_row(text: String) {
    println!(" │  {:<48} │", text);
}

fn colored_count(n: usize) -> ColoredString {
    if n == 0 {
        n.to_string().green()
    } else {
        n.to_string().red()
    }
}

fn mark(n: usize) -> ColoredString {
    if n == 0 {
        "✓".green()
    } else {
        "✗".red()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(titles));
    table
}

fn priority_color(license: SupportedLicense) -> Color {
    match license.priority() {
        LicensePriority::Recommended | LicensePriority::Permissive => Color::Green,
        LicensePriority::WeakCopyleft => Color::Yellow,
        LicensePriority::StrongCopyleft | LicensePriority::NetworkCopyleft => Color::Red,
        LicensePriority::NoLicense => Color::DarkGrey,
    }
}

fn render_modules(modules: &[&ModuleCompatibility], root: &Path) {
    let mut table = new_table(&["Module", "Path", "License", "Compatible licenses"]);

    for m in modules {
        let relative = m
            .module
            .path
            .strip_prefix(root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| m.module.path.display().to_string());

        let license_cell = if m.own_license != SupportedLicense::NoLicense {
            Cell::new(m.own_license.spdx_id()).fg(priority_color(m.own_license))
        } else if m.inherited_license != SupportedLicense::NoLicense {
            Cell::new(format!("{} (inherited)", m.inherited_license.spdx_id())).fg(Color::DarkGrey)
        } else {
            Cell::new("none").fg(Color::DarkGrey)
        };

        let compatible = if m.compatible.is_empty() {
            Cell::new("none").fg(Color::Red)
        } else {
            let ids: Vec<&str> = m.compatible.iter().map(|l| l.spdx_id()).collect();
            Cell::new(ids.join(", "))
        };

        table.add_row(vec![
            Cell::new(&m.module.name),
            Cell::new(if relative.is_empty() { ".".to_string() } else { relative }),
            license_cell,
            compatible,
        ]);
    }

    println!("{}", table);
}

fn render_issues(issues: &CompatibilityIssueData) {
    if !issues.package_dependency_issues.is_empty() {
        println!(
            " {} Dependencies incompatible with their module license:\n",
            "[ERROR]".red().bold()
        );
        let mut table =
            new_table(&["Module", "Module license", "Dependency", "Dependency license"]);
        for group in &issues.package_dependency_issues {
            for issue in &group.issues {
                table.add_row(vec![
                    Cell::new(&group.module_name),
                    Cell::new(&group.module_license_name),
                    Cell::new(&issue.dependency_identifier),
                    Cell::new(&issue.license_name).fg(Color::Red),
                ]);
            }
        }
        println!("{}\n", table);
    }

    if !issues.submodule_issues.is_empty() {
        println!(
            " {} Submodules incompatible with their parent license:\n",
            "[ERROR]".red().bold()
        );
        let mut table = new_table(&["Module", "Module license", "Submodule", "Submodule license"]);
        for group in &issues.submodule_issues {
            for issue in &group.issues {
                table.add_row(vec![
                    Cell::new(&group.module_name),
                    Cell::new(&group.module_license_name),
                    Cell::new(&issue.submodule_name),
                    Cell::new(&issue.license_name).fg(Color::Red),
                ]);
            }
        }
        println!("{}\n", table);
    }
}
