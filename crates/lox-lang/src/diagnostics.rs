use lox_core::span::Span;

/// Renders an error as a caret-underlined excerpt of `source`, with a hint when one applies.
pub fn render(source: &str, kind: &str, span: Span, message: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line_idx = span.line.saturating_sub(1);
    let source_line = lines.get(line_idx).unwrap_or(&"");

    let gutter_width = span.line.to_string().len();

    let pointer_col = span.col.saturating_sub(1);
    let pointer_len = span.length.max(1);

    let mut out = String::new();

    // error[kind]: message
    out.push_str(&format!("error[{}]: {}\n", kind, message));

    // --> line:col
    out.push_str(&format!(
        "{:>width$}--> line {}:{}\n",
        " ",
        span.line,
        span.col,
        width = gutter_width
    ));

    out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));
    out.push_str(&format!(
        "{:>width$} | {}\n",
        span.line,
        source_line,
        width = gutter_width
    ));

    // keep tabs so the carets line up with the source line
    let padding: String = source_line
        .chars()
        .take(pointer_col)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    out.push_str(&format!(
        "{:>width$} | {}{}\n",
        " ",
        padding,
        "^".repeat(pointer_len),
        width = gutter_width
    ));

    if let Some(hint) = suggest_hint(message) {
        out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));
        out.push_str(&format!(
            "{:>width$} = hint: {}\n",
            " ",
            hint,
            width = gutter_width
        ));
    }

    out
}

pub fn suggest_hint(message: &str) -> Option<&'static str> {
    let msg = message.to_lowercase();

    if msg.contains("two numbers or two strings") {
        return Some("'+' does not convert between numbers and strings");
    }

    if msg.starts_with("undefined variable") {
        return Some("declare it with 'var' before using or assigning it");
    }

    if msg.contains("inside a loop") || msg.contains("outside of a loop") {
        return Some("'break' only works inside 'while' or 'for', or a function declared in one");
    }

    if msg.contains("can only call") {
        return Some("only functions declared with 'fun' and built-ins like clock() can be called");
    }

    if msg.contains("unclosed block comment") {
        return Some("every '/*' needs a matching '*/', including nested ones");
    }

    None
}
