//! Explain command - shows detailed rule documentation

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use oni_core::config::load_config_or_default;
use oni_core::rules::RuleRegistry;
use std::path::Path;
use std::process;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Rule ID (e.g. R001) or rule name (e.g. nested-repetition)
    pub rule: String,
}

impl ExplainArgs {
    pub fn run(&self) -> Result<()> {
        let config = load_config_or_default(Path::new("."))?.config;
        let mut registry = RuleRegistry::new();
        registry.configure(&config.rules);

        let rule = registry
            .get_rule(&self.rule)
            .or_else(|| registry.get_rule_by_name(&self.rule));

        match rule {
            Some(rule) => {
                let meta = rule.metadata();
                println!("{} {}", "Rule:".cyan().bold(), meta.id);
                println!("{} {}", "Name:".cyan(), meta.name);
                println!("{} {}", "Description:".cyan(), meta.description);
                println!("{} {}", "Weight:".cyan(), meta.weight);
                let status = if registry.is_rule_enabled(meta.id) {
                    "enabled".green()
                } else {
                    "disabled".red()
                };
                println!("{} {}", "Status:".cyan(), status);
                if let Some(url) = meta.docs_url {
                    println!("{} {}", "Documentation:".cyan(), url);
                }
                if let Some(examples) = meta.examples {
                    println!();
                    println!("{}", "Examples:".cyan());
                    println!("{examples}");
                }
                Ok(())
            }
            None => {
                eprintln!("{} Unknown rule: {}", "error:".red().bold(), self.rule);
                eprintln!();
                eprintln!("Available rules:");
                for rule in registry.rules() {
                    let meta = rule.metadata();
                    eprintln!("  {} - {}", meta.id, meta.name);
                }
                process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use oni_core::config::RulesConfig;
    use oni_core::rules::RuleRegistry;

    #[test]
    fn rules_resolve_by_id_and_by_name() {
        let registry = RuleRegistry::new();
        let by_id = registry.get_rule("R001").map(|r| r.metadata().name);
        let by_name = registry
            .get_rule_by_name("nested-repetition")
            .map(|r| r.metadata().id);
        assert_eq!(by_id, Some("nested-repetition"));
        assert_eq!(by_name, Some("R001"));
    }

    #[test]
    fn unknown_rule_resolves_to_none() {
        let registry = RuleRegistry::new();
        assert!(registry.get_rule("R999").is_none());
        assert!(registry.get_rule_by_name("not-a-rule").is_none());
    }

    #[test]
    fn every_rule_has_documentation_examples() {
        // Explain output leans on these; a rule without examples renders
        // nothing useful.
        let registry = RuleRegistry::new();
        for rule in registry.rules() {
            assert!(rule.metadata().examples.is_some());
        }
    }

    #[test]
    fn disabled_rules_still_resolve_for_explain() {
        let mut registry = RuleRegistry::new();
        registry.configure(&RulesConfig {
            disabled: vec!["R002".to_string()],
        });
        assert!(registry.get_rule("R002").is_some());
        assert!(!registry.is_rule_enabled("R002"));
    }
}
