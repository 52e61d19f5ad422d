//! CLI output formatting utilities.
//!
//! Tables of displays and bar filters, colored show/hide masks, and
//! highlighted JSON for `--json` output.

use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::display::RegistrySnapshot;
use crate::insets::{BarVisibility, InsetTypes};
use crate::policy::{BarFilter, FilterPolicyStore};

/// Prints `value` as indented, colored JSON.
pub fn print_highlighted_json(value: &serde_json::Value) { println!("{}", highlight_json(value)); }

/// Renders `value` as indented JSON: keys cyan, strings green, numbers
/// yellow, booleans and null magenta.
#[must_use]
pub fn highlight_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_json(&mut out, value, 0);
    out
}

fn write_json(out: &mut String, value: &serde_json::Value, depth: usize) {
    use serde_json::Value;

    let pad = |depth: usize| "  ".repeat(depth);
    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().magenta().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().yellow().to_string()),
        Value::String(s) => out.push_str(&Value::String(s.clone()).to_string().green().to_string()),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                out.push_str(&pad(depth + 1));
                write_json(out, item, depth + 1);
                out.push_str(if i + 1 < items.len() { ",\n" } else { "\n" });
            }
            out.push_str(&pad(depth));
            out.push(']');
        }
        Value::Object(map) => {
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                out.push_str(&pad(depth + 1));
                out.push_str(&Value::String(key.clone()).to_string().cyan().to_string());
                out.push_str(": ");
                write_json(out, item, depth + 1);
                out.push_str(if i + 1 < map.len() { ",\n" } else { "\n" });
            }
            out.push_str(&pad(depth));
            out.push('}');
        }
    }
}

/// Shortens a package name to `max_chars`, keeping its last segments,
/// which tell packages of one vendor apart.
#[must_use]
pub fn short_package(package: &str, max_chars: usize) -> String {
    let count = package.chars().count();
    if count <= max_chars {
        return package.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let tail: String = package.chars().skip(count - keep).collect();
    format!("…{tail}")
}

/// Formats a show/hide pair as colored `show: .. hide: ..` text.
#[must_use]
pub fn format_visibility(visibility: BarVisibility) -> String {
    format!(
        "{} {}  {} {}",
        "show:".dimmed(),
        visibility.show.to_string().green(),
        "hide:".dimmed(),
        visibility.hide.to_string().red()
    )
}

fn join(entries: &std::collections::BTreeSet<String>) -> String {
    if entries.is_empty() {
        "-".to_string()
    } else {
        entries.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Renders the filters of `store` as a table, one row per bar.
#[must_use]
pub fn policy_table(store: &FilterPolicyStore) -> String {
    #[derive(Tabled)]
    struct FilterRow {
        #[tabled(rename = "Bar")]
        bar: &'static str,
        #[tabled(rename = "Include")]
        include: String,
        #[tabled(rename = "Exclude")]
        exclude: String,
        #[tabled(rename = "Allow control")]
        allow_control: String,
    }

    let row = |bar: &'static str, filter: Option<&BarFilter>| match filter {
        Some(filter) => FilterRow {
            bar,
            include: join(filter.included()),
            exclude: join(filter.excluded()),
            allow_control: join(filter.control_allowed()),
        },
        None => FilterRow {
            bar,
            include: "(always shown)".dimmed().to_string(),
            exclude: "-".to_string(),
            allow_control: "-".to_string(),
        },
    };

    let rows = [
        row("status", store.status_filter()),
        row("navigation", store.navigation_filter()),
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Renders every display of a snapshot as a table.
#[must_use]
pub fn displays_table(snapshot: &RegistrySnapshot) -> String {
    #[derive(Tabled)]
    struct DisplayRow {
        #[tabled(rename = "Display")]
        id: u32,
        #[tabled(rename = "Focused")]
        package: String,
        #[tabled(rename = "Requested")]
        requested: String,
        #[tabled(rename = "Persistency")]
        persistency: String,
        #[tabled(rename = "Immersive")]
        immersive: String,
        #[tabled(rename = "Visible")]
        visible: String,
    }

    let rows: Vec<DisplayRow> = snapshot
        .displays
        .iter()
        .map(|display| DisplayRow {
            id: display.display_id,
            package: display
                .state
                .focused_package
                .as_deref()
                .map_or_else(|| "-".to_string(), |p| short_package(p, 32)),
            requested: display.state.requested_visible_types.to_string(),
            persistency: format!("{:?}", display.state.persistency),
            immersive: format!("{:?}", display.state.immersive),
            visible: format_types(display.requested_visibilities),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

fn format_types(types: InsetTypes) -> String {
    if types.contains(InsetTypes::SYSTEM_BARS) {
        types.to_string().green().to_string()
    } else if types.intersects(InsetTypes::SYSTEM_BARS) {
        types.to_string().yellow().to_string()
    } else {
        types.to_string().red().to_string()
    }
}
