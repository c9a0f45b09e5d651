use std::path::PathBuf;

use serde::Serialize;

use crate::config::{CONFIG_FILE, Config};
use crate::grammar::SUPPORTED_EXTENSIONS;
use crate::rule::RuleDescriptor;

/// Output the idiom reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

struct CurrentState {
    config_found: bool,
    /// `None` when the config file exists but does not load.
    config: Option<Config>,
    rule: RuleDescriptor,
}

fn gather_state(root: &std::path::Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();
    let config = Config::load(root).ok();
    return CurrentState {
        config_found,
        config,
        rule: RuleDescriptor::default(),
    };
}

impl CurrentState {
    fn rule_enabled(&self) -> bool {
        return self.config.as_ref().map_or(self.rule.enabled_by_default, |c| {
            return c.rule_enabled(self.rule.id, self.rule.enabled_by_default);
        });
    }

    fn extern_types(&self) -> &[String] {
        return self.config.as_ref().map(|c| return c.extern_types.as_slice()).unwrap_or_default();
    }
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_rule(&state.rule);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_header(version: &str) {
    print!(
        "\
# idiom {version}

Reports type names in C# sources written with a namespace prefix
that the surrounding code does not need.

## Workflow

    idiom check [PATHS]               Report redundant qualifications (exit 0/1/2)
    idiom check --format json         Same, as a JSON array
    idiom fix [PATHS]                 Remove qualifications where the short name is unambiguous
    idiom info [--json]               This document

## Configuration ({CONFIG_FILE})

    include = [\"src/\"]                        # only scan these paths
    exclude = [\"src/Generated/\"]              # skip these paths
    extern_types = [\"System.Console\"]        # library types idiom cannot see

    [rules.WI01001]
    enabled = true

"
    );
}

fn print_markdown_rule(rule: &RuleDescriptor) {
    println!("## Rules\n");
    println!("| Id | Title | Category | Severity | Default |");
    println!("|----|-------|----------|----------|---------|");
    println!(
        "| {} | {} | {} | {} | {} |\n",
        rule.id,
        rule.title,
        rule.category,
        rule.severity.label(),
        if rule.enabled_by_default { "on" } else { "off" },
    );
    println!("{}\n", rule.description);
}

fn print_markdown_state(state: &CurrentState) {
    println!("## Current State\n");
    match (state.config_found, state.config.is_some()) {
        (false, _) => println!("Config:       {CONFIG_FILE} (not found)"),
        (true, true) => println!("Config:       {CONFIG_FILE} (found)"),
        (true, false) => println!("Config:       {CONFIG_FILE} (invalid, run `idiom check` for details)"),
    }

    let enabled = if state.rule_enabled() { "enabled" } else { "disabled" };
    println!("Rule:         {} {enabled}", state.rule.id);

    let extern_types = state.extern_types();
    if extern_types.is_empty() {
        println!("Extern types: (none)");
    } else {
        println!("Extern types: {}", extern_types.join(", "));
    }
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | No findings |
| 1    | Redundant qualifications found |
| 2    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson<'a> {
    current_state: StateJson<'a>,
    exit_codes: Vec<ExitCodeInfo>,
    extensions: Vec<String>,
    rules: Vec<&'a RuleDescriptor>,
    version: String,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

#[derive(Serialize)]
struct StateJson<'a> {
    config_found: bool,
    config_valid: bool,
    extern_types: &'a [String],
    rule_enabled: bool,
}

fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_found: state.config_found,
            config_valid: state.config.is_some(),
            extern_types: state.extern_types(),
            rule_enabled: state.rule_enabled(),
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "No findings".to_string() },
            ExitCodeInfo { code: 1, meaning: "Redundant qualifications found".to_string() },
            ExitCodeInfo { code: 2, meaning: "Runtime error".to_string() },
        ],
        extensions: SUPPORTED_EXTENSIONS.iter().map(|e| return format!(".{e}")).collect(),
        rules: vec![&state.rule],
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
