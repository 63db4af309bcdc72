//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}

/// Finds the first balanced `{ ... }` object in free-form model output.
///
/// Braces inside JSON string literals (including escaped quotes) are ignored.
/// Returns `None` if no object opens, or if the first one never closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (offset, ch) in text[start..].char_indices() {
    if in_string {
      match ch {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match ch {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&text[start..start + offset + 1]);
        }
      }
      _ => {}
    }
  }
  None
}

/// Renders a number the way a student typed it: `28` rather than `28.0`.
pub fn format_number(n: f64) -> String {
  if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    format!("{}", n)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_object_wrapped_in_prose_and_fences() {
    let text = "Sure! Here you go:\n```json\n{\"a\": 1, \"b\": {\"c\": 2}}\n```\nEnjoy {not this}";
    assert_eq!(extract_json_object(text), Some("{\"a\": 1, \"b\": {\"c\": 2}}"));
  }

  #[test]
  fn ignores_braces_inside_strings() {
    let text = r#"{"problem_text": "Use {x} and \"}\" here", "final_answer": 3} trailing"#;
    assert_eq!(
      extract_json_object(text),
      Some(r#"{"problem_text": "Use {x} and \"}\" here", "final_answer": 3}"#)
    );
  }

  #[test]
  fn truncated_or_missing_object_yields_none() {
    assert_eq!(extract_json_object("no json here"), None);
    assert_eq!(extract_json_object("{\"problem_text\": \"Sarah has 24"), None);
  }

  #[test]
  fn fills_placeholders() {
    let out = fill_template("{a} + {b} = {a}{b}", &[("a", "1"), ("b", "2")]);
    assert_eq!(out, "1 + 2 = 12");
  }

  #[test]
  fn formats_whole_numbers_without_fraction() {
    assert_eq!(format_number(28.0), "28");
    assert_eq!(format_number(2.5), "2.5");
    assert_eq!(format_number(-4.0), "-4");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("abc", 5), "abc");
    assert!(trunc_for_log("ééééé", 2).starts_with("éé…"));
  }
}
