use std::fs;
use std::path::Path;

use console::style;

use crate::types::{Result, RulesResult, Severity};

pub struct Reporter;

impl Reporter {
    pub fn to_json(result: &RulesResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    pub fn generate_json<P: AsRef<Path>>(result: &RulesResult, output_path: P) -> Result<()> {
        fs::write(output_path, Self::to_json(result)?)?;
        Ok(())
    }

    pub fn print_summary(result: &RulesResult) {
        println!("{}", style("Documentation Rules").bold());
        println!("══════════════════════════════════════");
        println!();
        println!("Score: {}/100", result.score);
        println!("  Errors: {}", result.summary.errors);
        println!("  Warnings: {}", result.summary.warnings);
        println!("  Info: {}", result.summary.info);
        println!();

        if result.violations.is_empty() {
            println!("No violations found.");
        } else {
            println!("Violations ({}):", result.violations.len());
            println!();

            for violation in &result.violations {
                let icon = match violation.severity {
                    Severity::Error => style("✗").red(),
                    Severity::Warning => style("⚠").yellow(),
                    Severity::Info => style("ℹ").blue(),
                };

                println!(
                    "{} [{}] {} {}",
                    icon,
                    violation.severity.as_str().to_uppercase(),
                    violation.message,
                    style(format!("({})", violation.rule_name)).dim()
                );

                if let Some(ref suggestion) = violation.suggestion {
                    println!("  → {}", suggestion);
                }

                println!();
            }
        }

        if !result.skipped_rules.is_empty() {
            println!(
                "{} Skipped rules: {}",
                style("⚠").yellow(),
                result.skipped_rules.join(", ")
            );
        }

        println!("══════════════════════════════════════");

        if result.has_errors() {
            println!("Result: FAILED ({} errors)", result.summary.errors);
        } else if result.summary.warnings > 0 {
            println!("Result: PASSED with warnings ({})", result.summary.warnings);
        } else {
            println!("Result: PASSED ✓");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        let result = RulesResult {
            score: 100,
            ..Default::default()
        };
        Reporter::generate_json(&result, &path).unwrap();

        let written: RulesResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, result);
    }
}
