//! `mastermind check` — Validate configuration and credentials.

use std::path::Path;

use mastermind_config::AppConfig;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("Master Mind Check");
    println!("=================\n");

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Config invalid: {e:#}");
            anyhow::bail!("configuration check failed");
        }
    };

    if path.exists() {
        println!("  ✅ Config file valid ({})", path.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults", path.display());
        println!("\n{}", starter_config());
    }

    let issues = report(&config);

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(())
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        anyhow::bail!("{issues} issue(s) found")
    }
}

/// The default config, ready to be saved as `config.toml`.
fn starter_config() -> String {
    format!(
        "# Save as config.toml and fill in the credentials\n{}",
        AppConfig::default_toml()
    )
}

/// Print credential status and return the number of missing ones.
fn report(config: &AppConfig) -> usize {
    let checks = [
        ("Memory store key", config.require_memory_key().err()),
        ("Completion key", config.require_completion_key().err()),
    ];

    let mut issues = 0;
    for (label, missing) in checks {
        match missing {
            None => println!("  ✅ {label} configured"),
            Some(e) => {
                println!("  ❌ {label}: {e}");
                issues += 1;
            }
        }
    }

    println!("  ℹ️  Memory API:  {}", config.memory.api_url);
    println!("  ℹ️  Model:       {}", config.completion.model);
    println!(
        "  ℹ️  Limits:      default {}, max {}",
        config.enhancement.default_limit, config.enhancement.max_limit
    );
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_missing_credentials() {
        let mut config = AppConfig::default();
        assert_eq!(report(&config), 2);

        config.memory.api_key = Some("m0-key".into());
        assert_eq!(report(&config), 1);

        config.completion.api_key = Some("sk-key".into());
        assert_eq!(report(&config), 0);
    }

    #[test]
    fn starter_config_parses_back_to_defaults() {
        let text = starter_config();
        assert!(text.starts_with("# Save as config.toml"));

        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.gateway.port, AppConfig::default().gateway.port);
        assert_eq!(parsed.completion.model, AppConfig::default().completion.model);
    }
}
