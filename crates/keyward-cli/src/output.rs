//! How commands print: a table for people, JSON for scripts.

use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn json<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| fallback.to_string())
}

pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json(items, "[]")),
        OutputFormat::Table if items.is_empty() => println!("Nothing to show."),
        OutputFormat::Table => println!("{}", Table::new(items)),
    }
}

/// Objects print one field per line in table mode; anything else as JSON.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) {
    let value = serde_json::to_value(item).unwrap_or(Value::Null);
    let Value::Object(fields) = &value else {
        println!("{}", json(&value, "null"));
        return;
    };
    if format == OutputFormat::Json {
        println!("{}", json(&value, "{}"));
        return;
    }
    for (key, field) in fields {
        match field {
            Value::String(s) => print_kv(key, s),
            Value::Null => print_kv(key, "-"),
            other => print_kv(key, &other.to_string()),
        }
    }
}

pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {value}", format!("{key}:"));
}

/// Leading eight hex digits, enough to tell rows apart.
pub fn short_id(id: &uuid::Uuid) -> String {
    let mut hex = id.simple().to_string();
    hex.truncate(8);
    hex
}
