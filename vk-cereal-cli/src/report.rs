//! Console rendering of run reports.

use colored::Colorize;

use vk_cereal::{FragmentOutcome, GenerationReport, ModuleOutcome, WriteResult};

use crate::runner::ValidationReport;

fn write_line(result: &WriteResult) -> String {
    match result {
        WriteResult::Written { kind, path, bytes } => format!(
            "{} Written {} ({} bytes) to {}",
            "✓".green(),
            kind.as_str(),
            bytes,
            path.display()
        ),
        WriteResult::DryRun {
            kind,
            path,
            content,
        } => format!(
            "{} Would write {} ({} bytes) to {}",
            "[dry-run]".yellow(),
            kind.as_str(),
            content.len(),
            path.display()
        ),
    }
}

/// Render a generation report, one line per artifact, then a summary.
pub fn render_generation(report: &GenerationReport) -> String {
    let mut lines = Vec::new();

    for outcome in &report.outcomes {
        match outcome {
            ModuleOutcome::Written { results, .. } => {
                lines.extend(results.iter().map(|r| format!("  {}", write_line(r))));
            }
            ModuleOutcome::Suppressed { module } => {
                lines.push(format!("  {}", format!("- Suppressed {module}").dimmed()));
            }
            ModuleOutcome::Failed {
                module,
                error,
                landed,
            } => {
                lines.push(format!("  {} {}: {}", "✗".red(), module.bold(), error));
                for path in landed {
                    lines.push(format!("    already written: {}", path.display()));
                }
                lines.push(format!("    {}", GenerationReport::suppression_hint(module)));
            }
            ModuleOutcome::AlreadyFinalized { .. } => {}
        }
    }

    for outcome in &report.fragment_outcomes {
        match outcome {
            FragmentOutcome::Written(result) => lines.push(format!("  {}", write_line(result))),
            FragmentOutcome::Failed(error) => {
                lines.push(format!("  {} build fragment: {}", "✗".red(), error));
            }
        }
    }

    let failed = report.failed().len() + report.fragment_failures().len();
    let summary = format!(
        "{} module(s) generated, {} suppressed, {} failed",
        report.written().len(),
        report.suppressed().len(),
        failed
    );
    lines.push(if failed == 0 {
        summary.green().to_string()
    } else {
        summary.red().to_string()
    });

    lines.join("\n")
}

/// Render a validation report.
pub fn render_validation(report: &ValidationReport) -> String {
    if report.is_up_to_date() {
        return format!(
            "{} {} artifact(s) are up-to-date",
            "✓".green(),
            report.checked
        );
    }

    let mut lines = Vec::new();
    for path in &report.stale {
        lines.push(format!("  {} out of date: {}", "✗".red(), path.display()));
    }
    for path in &report.missing {
        lines.push(format!("  {} missing: {}", "✗".red(), path.display()));
    }
    lines.push(format!(
        "{} {} of {} artifact(s) are out of date",
        "✗".red(),
        report.stale.len() + report.missing.len(),
        report.checked
    ));
    lines.push("  Run 'vk-cereal generate' to update".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use vk_cereal::{ArtifactKind, BuildFragments};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_render_generation_lists_outcomes() {
        plain();
        let report = GenerationReport {
            outcomes: vec![
                ModuleOutcome::Written {
                    module: "VkEncoder".to_string(),
                    results: vec![WriteResult::Written {
                        kind: ArtifactKind::Header,
                        path: PathBuf::from("guest/VkEncoder.h"),
                        bytes: 12,
                    }],
                },
                ModuleOutcome::Suppressed {
                    module: "VkDecoder".to_string(),
                },
            ],
            fragments: BuildFragments::default(),
            fragment_outcomes: vec![],
            suppress_except: Some("VkEncoder".to_string()),
        };

        let text = render_generation(&report);
        assert!(text.contains("✓ Written header (12 bytes) to guest/VkEncoder.h"));
        assert!(text.contains("- Suppressed VkDecoder"));
        assert!(text.ends_with("1 module(s) generated, 1 suppressed, 0 failed"));
    }

    #[test]
    fn test_render_failure_carries_hint() {
        plain();
        let report = GenerationReport {
            outcomes: vec![ModuleOutcome::Failed {
                module: "goldfish_vk_dispatch".to_string(),
                error: vk_cereal::error::WriteError::WriteFile {
                    path: PathBuf::from("common/goldfish_vk_dispatch.cpp"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                },
                landed: vec![PathBuf::from("common/goldfish_vk_dispatch.h")],
            }],
            fragments: BuildFragments::default(),
            fragment_outcomes: vec![],
            suppress_except: None,
        };

        let text = render_generation(&report);
        assert!(text.contains("✗ goldfish_vk_dispatch: Failed to write file common/goldfish_vk_dispatch.cpp: denied"));
        assert!(text.contains("already written: common/goldfish_vk_dispatch.h"));
        assert!(text.contains("ANDROID_EMU_VK_CEREAL_SUPPRESS=goldfish_vk_dispatch"));
        assert!(text.ends_with("0 module(s) generated, 0 suppressed, 1 failed"));
    }

    #[test]
    fn test_render_validation() {
        plain();
        let ok = ValidationReport {
            checked: 3,
            ..Default::default()
        };
        assert_eq!(render_validation(&ok), "✓ 3 artifact(s) are up-to-date");

        let stale = ValidationReport {
            checked: 3,
            stale: vec![PathBuf::from("VkDecoder.cpp")],
            missing: vec![],
        };
        let text = render_validation(&stale);
        assert!(text.contains("out of date: VkDecoder.cpp"));
        assert!(text.contains("1 of 3 artifact(s) are out of date"));
    }
}
