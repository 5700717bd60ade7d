//! `adplan profiles` command: list the strategy profiles a request may name.

use std::path::Path;

use anyhow::{Context, Result};

use adplan_core::profile::{ProfileRegistry, StrategyProfile, load_profile_file};

/// Built-in profiles plus any loaded from `profile_file`. File profiles
/// replace built-ins with the same id.
pub fn load_registry(profile_file: Option<&Path>) -> Result<ProfileRegistry> {
    let mut registry = ProfileRegistry::with_builtins();
    if let Some(path) = profile_file {
        let profiles = load_profile_file(path)?;
        for profile in profiles {
            let id = profile.id.clone();
            registry
                .register(profile)
                .with_context(|| format!("profile {id:?} in {} is invalid", path.display()))?;
        }
    }
    Ok(registry)
}

pub fn run_profiles(profile_file: Option<&Path>, verbose: bool) -> Result<()> {
    let registry = load_registry(profile_file)?;
    print!("{}", render(&registry, verbose));
    Ok(())
}

fn render(registry: &ProfileRegistry, verbose: bool) -> String {
    let mut out = String::new();
    if !verbose {
        out.push_str(&format!("{:<20} {:<24} {:<8}\n", "ID", "NAME", "VERSION"));
        out.push_str(&format!("{}\n", "-".repeat(54)));
        for p in registry.iter() {
            out.push_str(&format!("{:<20} {:<24} {:<8}\n", p.id, p.name, p.version));
        }
        return out;
    }

    for p in registry.iter() {
        out.push_str(&describe(p));
        out.push('\n');
    }
    out
}

fn describe(p: &StrategyProfile) -> String {
    let c = &p.constraints;
    let w = &p.weights;
    let budget_range = match (c.min_budget, c.max_budget) {
        (None, None) => "any".to_string(),
        (min, max) => format!(
            "{} - {}",
            min.map(|v| format!("${v:.0}")).unwrap_or_else(|| "-".to_string()),
            max.map(|v| format!("${v:.0}")).unwrap_or_else(|| "-".to_string()),
        ),
    };

    let mut out = format!("{} ({}) v{}\n", p.name, p.id, p.version);
    if !p.description.is_empty() {
        out.push_str(&format!("  {}\n", p.description));
    }
    out.push_str(&format!(
        "  publications:        {} - {}\n",
        c.min_publications, c.max_publications
    ));
    out.push_str(&format!("  budget range:        {budget_range}\n"));
    out.push_str(&format!(
        "  strict budget:       {} (overage {:.0}%)\n",
        c.strict_budget,
        c.max_overage_percent * 100.0
    ));
    out.push_str(&format!(
        "  per-publication cap: {:.0}% of budget\n",
        c.max_publication_percent * 100.0
    ));
    out.push_str(&format!("  minimum spend:       ${:.2}\n", c.min_publication_spend));
    out.push_str(&format!("  correction passes:   {}\n", c.max_correction_passes));
    out.push_str(&format!(
        "  weights:             reach={} diversity={} cost={} community={}\n",
        w.reach, w.diversity, w.cost, w.community
    ));
    out
}
