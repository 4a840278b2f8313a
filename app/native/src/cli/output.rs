//! JSON syntax highlighting for CLI output.

use std::fmt::Write;

use colored::Colorize;

/// Prints JSON with syntax highlighting.
///
/// Keys are cyan, strings green, numbers yellow, booleans and null magenta.
pub fn print_highlighted_json(value: &serde_json::Value) {
    println!("{}", highlight_json(value));
}

/// Renders `value` as pretty-printed, highlighted JSON.
#[must_use]
pub fn highlight_json(value: &serde_json::Value) -> String {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    let mut out = String::with_capacity(json.len() * 2);

    let mut in_string = false;
    let mut is_key = false;
    let mut escape_next = false;
    let mut after_colon = false;
    let mut token = String::new();

    for ch in json.chars() {
        if escape_next {
            token.push(ch);
            escape_next = false;
            continue;
        }
        if ch == '\\' && in_string {
            token.push(ch);
            escape_next = true;
            continue;
        }

        match ch {
            '"' if in_string => {
                token.push(ch);
                let painted = if is_key { token.cyan() } else { token.green() };
                let _ = write!(out, "{painted}");
                token.clear();
                in_string = false;
                is_key = false;
            }
            '"' => {
                flush_token(&mut out, &mut token, after_colon);
                token.push(ch);
                in_string = true;
                is_key = !after_colon;
                after_colon = false;
            }
            ':' if !in_string => {
                flush_token(&mut out, &mut token, false);
                let _ = write!(out, "{}", ":".white());
                after_colon = true;
            }
            ',' if !in_string => {
                flush_token(&mut out, &mut token, after_colon);
                let _ = write!(out, "{}", ",".white());
                after_colon = false;
            }
            '{' | '}' | '[' | ']' if !in_string => {
                flush_token(&mut out, &mut token, after_colon);
                let _ = write!(out, "{}", ch.to_string().white().bold());
                after_colon = false;
            }
            _ => token.push(ch),
        }
    }

    flush_token(&mut out, &mut token, after_colon);
    out
}

/// Writes a pending bare token, colouring scalars that follow a colon.
fn flush_token(out: &mut String, token: &mut String, is_value: bool) {
    if token.is_empty() {
        return;
    }

    let start = token.find(|c: char| !c.is_whitespace());
    match start {
        Some(start) if is_value => {
            let end = token.rfind(|c: char| !c.is_whitespace()).map_or(token.len(), |i| i + 1);
            let (prefix, value, suffix) = (&token[..start], &token[start..end], &token[end..]);

            if matches!(value, "true" | "false" | "null") {
                let _ = write!(out, "{prefix}{}{suffix}", value.magenta());
            } else if value.parse::<f64>().is_ok() {
                let _ = write!(out, "{prefix}{}{suffix}", value.yellow());
            } else {
                out.push_str(token);
            }
        }
        _ => out.push_str(token),
    }

    token.clear();
}
