/// Template Linter — checks an arc template catalog for coverage and quality.
///
/// Usage: template_linter <templates.ron> [--strict]
///
/// Parse and validation failures are errors. With --strict, missing
/// archetypes are errors too; otherwise they are warnings, since the
/// builtin catalog fills the gaps at load time.

use arc_engine::core::template::{ArcTemplate, ArcTemplateSet, ContextField};
use arc_engine::schema::arc::ArcArchetype;
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: template_linter <templates.ron> [--strict]");
        process::exit(0);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let path = &args[1];
    let strict = args[2..].iter().any(|a| a == "--strict");

    let templates = match ArcTemplateSet::load_from_ron(Path::new(path)) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("ERROR: Failed to load templates: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} arc templates", templates.len());

    let (errors, warnings) = lint_templates(&templates, strict);

    println!("\n=== Template Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_templates(templates: &ArcTemplateSet, strict: bool) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for archetype in ArcArchetype::ALL {
        if templates.get(archetype).is_none() {
            let message = format!("no template for {}", archetype);
            if strict {
                errors.push(message);
            } else {
                warnings.push(format!("{} (builtin will be used)", message));
            }
        }
    }

    for template in templates.iter() {
        lint_template(template, &mut errors, &mut warnings);
    }

    // Tags shared by several archetypes blur next-arc suggestions.
    let mut owners: Vec<(&str, Vec<ArcArchetype>)> = Vec::new();
    for template in templates.iter() {
        for tag in &template.thematic_tags {
            match owners.iter_mut().find(|(t, _)| *t == tag.as_str()) {
                Some((_, archetypes)) => archetypes.push(template.archetype),
                None => owners.push((tag.as_str(), vec![template.archetype])),
            }
        }
    }
    for (tag, archetypes) in owners {
        if archetypes.len() > 2 {
            let names: Vec<&str> = archetypes.iter().map(|a| a.as_str()).collect();
            warnings.push(format!(
                "tag '{}' is shared by {} templates: {}",
                tag,
                archetypes.len(),
                names.join(", ")
            ));
        }
    }

    (errors, warnings)
}

fn lint_template(template: &ArcTemplate, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let name = template.archetype.as_str();

    if template.consequence_weight <= 0.0 {
        errors.push(format!(
            "{}: consequence_weight must be positive, got {}",
            name, template.consequence_weight
        ));
    }
    if template.thematic_tags.is_empty() {
        warnings.push(format!("{}: no thematic tags", name));
    }

    let names_character = template
        .descriptions
        .iter()
        .any(|d| d.template.fields().any(|f| f == ContextField::CharacterName));
    if !names_character {
        warnings.push(format!(
            "{}: no description mentions {{character.name}}",
            name
        ));
    }
    if template.titles.len() < 2 {
        warnings.push(format!("{}: only one title alternative", name));
    }

    let mut branch_ids = FxHashSet::default();
    for branch in &template.branches {
        if !branch_ids.insert(branch.id.as_str()) {
            errors.push(format!("{}: duplicate branch id '{}'", name, branch.id));
        }
        if !(0.0..=100.0).contains(&branch.unlock_progress) {
            errors.push(format!(
                "{}: branch '{}' unlocks at {}%, outside [0, 100]",
                name, branch.id, branch.unlock_progress
            ));
        }
    }

    if template.endings.is_empty() {
        warnings.push(format!("{}: no alternative endings", name));
    }

    let mut decision_ids = FxHashSet::default();
    for decision in &template.decisions {
        if !decision_ids.insert(decision.id.as_str()) {
            errors.push(format!("{}: duplicate decision id '{}'", name, decision.id));
        }
        if decision.options.len() < 2 {
            warnings.push(format!(
                "{}: decision '{}' offers fewer than two options",
                name, decision.id
            ));
        }
    }
}
