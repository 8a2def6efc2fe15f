//! Message templates with named placeholders.
//!
//! A template is literal text interspersed with `{name}` placeholders, where
//! `name` is an identifier (`[A-Za-z_][A-Za-z0-9_]*`). A doubled brace
//! (`{{` or `}}`) stands for a literal brace. Anything else involving braces
//! is rejected when the template is parsed, so a stored template is always
//! well-formed.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  Placeholder(String),
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
  text:     String,
  segments: Vec<Segment>,
}

impl Template {
  pub fn parse(text: &str) -> Result<Self> {
    if text.trim().is_empty() {
      return Err(Error::validation("template text must not be empty"));
    }

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
      match c {
        '{' if matches!(chars.peek(), Some((_, '{'))) => {
          chars.next();
          literal.push('{');
        }
        '}' if matches!(chars.peek(), Some((_, '}'))) => {
          chars.next();
          literal.push('}');
        }
        '{' => {
          let mut name = String::new();
          let mut closed = false;
          for (_, c) in chars.by_ref() {
            if c == '}' {
              closed = true;
              break;
            }
            name.push(c);
          }
          if !closed {
            return Err(Error::validation(format!(
              "unclosed placeholder at byte {pos} in template {text:?}"
            )));
          }
          if !is_identifier(&name) {
            return Err(Error::validation(format!(
              "invalid placeholder name {name:?} in template {text:?}"
            )));
          }
          if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
          }
          segments.push(Segment::Placeholder(name));
        }
        '}' => {
          return Err(Error::validation(format!(
            "unmatched '}}' at byte {pos} in template {text:?}"
          )));
        }
        c => literal.push(c),
      }
    }
    if !literal.is_empty() {
      segments.push(Segment::Literal(literal));
    }

    Ok(Self { text: text.to_owned(), segments })
  }

  /// The original, unparsed text.
  pub fn text(&self) -> &str { &self.text }

  /// Distinct placeholder names, sorted.
  pub fn placeholders(&self) -> BTreeSet<&str> {
    self
      .segments
      .iter()
      .filter_map(|s| match s {
        Segment::Placeholder(name) => Some(name.as_str()),
        Segment::Literal(_) => None,
      })
      .collect()
  }

  /// Substitute every placeholder from `fields`.
  ///
  /// Returns the name of the first placeholder with no value if any is
  /// missing; nothing partial is produced.
  pub fn render(&self, fields: &BTreeMap<&str, &str>) -> Result<String, String> {
    let mut out = String::with_capacity(self.text.len());
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => out.push_str(text),
        Segment::Placeholder(name) => match fields.get(name.as_str()) {
          Some(value) => out.push_str(value),
          None => return Err(name.clone()),
        },
      }
    }
    Ok(out)
  }
}

fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fields<'a>(pairs: &[(&'a str, &'a str)]) -> BTreeMap<&'a str, &'a str> {
    pairs.iter().copied().collect()
  }

  #[test]
  fn renders_single_placeholder() {
    let t = Template::parse("You start {action}.").unwrap();
    assert_eq!(t.placeholders().into_iter().collect::<Vec<_>>(), ["action"]);
    assert_eq!(
      t.render(&fields(&[("action", "to dig")])).unwrap(),
      "You start to dig."
    );
  }

  #[test]
  fn placeholder_may_repeat_and_sit_at_the_edges() {
    let t = Template::parse("{action}, then {action}").unwrap();
    assert_eq!(t.placeholders().len(), 1);
    assert_eq!(
      t.render(&fields(&[("action", "dig")])).unwrap(),
      "dig, then dig"
    );
  }

  #[test]
  fn doubled_braces_are_literal() {
    let t = Template::parse("{{raw}} {action}").unwrap();
    assert_eq!(t.placeholders().into_iter().collect::<Vec<_>>(), ["action"]);
    assert_eq!(
      t.render(&fields(&[("action", "x")])).unwrap(),
      "{raw} x"
    );
  }

  #[test]
  fn plain_text_has_no_placeholders() {
    let t = Template::parse("You start digging.").unwrap();
    assert!(t.placeholders().is_empty());
    assert_eq!(t.render(&BTreeMap::new()).unwrap(), "You start digging.");
  }

  #[test]
  fn render_reports_missing_field() {
    let t = Template::parse("{who} starts {action}").unwrap();
    assert_eq!(
      t.render(&fields(&[("action", "x")])).unwrap_err(),
      "who"
    );
  }

  #[test]
  fn rejects_malformed_templates() {
    for bad in [
      "",
      "   ",
      "You start {action.",
      "You start action}.",
      "You start {}.",
      "You start {1st}.",
      "You start {an action}.",
      "You start {a{b}}.",
    ] {
      assert!(
        matches!(Template::parse(bad), Err(Error::Validation(_))),
        "accepted {bad:?}"
      );
    }
  }
}
