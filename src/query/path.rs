//! Path-query expression language.
//!
//! A small XPath-1.0 subset, just what reference scanning needs:
//!
//! ```text
//! expr     := path ( "|" path )*
//! path     := ( "//" | "/" )? step ( ( "//" | "/" ) step )*
//! step     := "." | "@" test | test
//! test     := name | "*" | "text()" | "node()"
//! step may carry one positional predicate "[n]" (1-based)
//! ```
//!
//! Paths evaluate relative to a context node and never escape its subtree;
//! a leading `//` selects from the whole subtree, a leading `/` from the
//! context's children.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathExpr {
    pub paths: Vec<LocationPath>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub axis: Axis,
    /// Attribute step (`@name`, `@*`).
    pub attribute: bool,
    pub test: StepTest,
    /// 1-based positional predicate, `[n]`.
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    /// `/step`
    Child,
    /// `//step`
    DescendantOrSelf,
    /// `.`
    SelfAxis,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StepTest {
    Name(String),
    Wildcard,
    Text,
    AnyNode,
}

pub(crate) fn parse(expr: &str) -> Result<PathExpr> {
    let mut paths = Vec::new();
    for part in expr.split('|') {
        paths.push(parse_path(part.trim(), expr)?);
    }
    Ok(PathExpr { paths })
}

fn parse_path(path: &str, expr: &str) -> Result<LocationPath> {
    if path.is_empty() {
        return Err(invalid(expr, "empty path"));
    }

    let bytes = path.as_bytes();
    let mut pos = 0;
    let mut steps = Vec::new();
    let mut axis = Axis::Child;

    if bytes.starts_with(b"//") {
        axis = Axis::DescendantOrSelf;
        pos = 2;
    } else if bytes.starts_with(b"/") {
        pos = 1;
    }

    loop {
        let step = parse_step(bytes, &mut pos, axis, expr)?;
        let was_attribute = step.attribute;
        steps.push(step);

        if pos >= bytes.len() {
            break;
        }
        if was_attribute {
            return Err(invalid(expr, "attribute step must be last"));
        }
        if bytes[pos..].starts_with(b"//") {
            axis = Axis::DescendantOrSelf;
            pos += 2;
        } else if bytes[pos] == b'/' {
            axis = Axis::Child;
            pos += 1;
        } else {
            return Err(invalid(expr, "expected '/' between steps"));
        }
    }

    Ok(LocationPath { steps })
}

fn parse_step(bytes: &[u8], pos: &mut usize, axis: Axis, expr: &str) -> Result<Step> {
    if *pos >= bytes.len() {
        return Err(invalid(expr, "trailing '/'"));
    }

    if bytes[*pos] == b'.' {
        *pos += 1;
        // `//.` keeps its axis and selects the whole subtree; a bare or
        // `/`-prefixed `.` is the context node itself.
        let axis = match axis {
            Axis::DescendantOrSelf => Axis::DescendantOrSelf,
            _ => Axis::SelfAxis,
        };
        return Ok(Step {
            axis,
            attribute: false,
            test: StepTest::AnyNode,
            position: parse_predicate(bytes, pos, expr)?,
        });
    }

    let attribute = bytes[*pos] == b'@';
    if attribute {
        *pos += 1;
    }

    let test = if *pos < bytes.len() && bytes[*pos] == b'*' {
        *pos += 1;
        StepTest::Wildcard
    } else {
        let start = *pos;
        while *pos < bytes.len() && is_name_byte(bytes[*pos]) {
            *pos += 1;
        }
        if *pos == start {
            return Err(invalid(expr, "expected node test"));
        }
        let name = std::str::from_utf8(&bytes[start..*pos])
            .map_err(|_| invalid(expr, "non-ascii node test"))?;

        if !attribute && bytes[*pos..].starts_with(b"()") {
            *pos += 2;
            match name {
                "text" => StepTest::Text,
                "node" => StepTest::AnyNode,
                other => return Err(invalid(expr, &format!("unknown node type '{other}'"))),
            }
        } else {
            StepTest::Name(name.to_string())
        }
    };

    Ok(Step {
        axis,
        attribute,
        test,
        position: parse_predicate(bytes, pos, expr)?,
    })
}

fn parse_predicate(bytes: &[u8], pos: &mut usize, expr: &str) -> Result<Option<usize>> {
    if *pos >= bytes.len() || bytes[*pos] != b'[' {
        return Ok(None);
    }
    let close = bytes[*pos..]
        .iter()
        .position(|&b| b == b']')
        .ok_or_else(|| invalid(expr, "unclosed '['"))?;
    let digits = &bytes[*pos + 1..*pos + close];
    let n: usize = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| invalid(expr, "predicate must be a positive integer"))?;
    *pos += close + 1;
    Ok(Some(n))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

fn invalid(expr: &str, reason: &str) -> Error {
    Error::Query(format!("'{expr}': {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_paths() {
        let expr = parse("//a").unwrap();
        assert_eq!(expr.paths.len(), 1);
        let step = &expr.paths[0].steps[0];
        assert_eq!(step.axis, Axis::DescendantOrSelf);
        assert_eq!(step.test, StepTest::Name("a".into()));
        assert!(!step.attribute);

        let expr = parse("p/b").unwrap();
        assert_eq!(expr.paths[0].steps.len(), 2);
        assert_eq!(expr.paths[0].steps[0].axis, Axis::Child);
    }

    #[test]
    fn test_parse_attribute_steps() {
        let expr = parse("//@href | //img/@src").unwrap();
        assert_eq!(expr.paths.len(), 2);
        assert!(expr.paths[0].steps[0].attribute);
        assert_eq!(expr.paths[1].steps[1].test, StepTest::Name("src".into()));
    }

    #[test]
    fn test_parse_wildcard_and_node_types() {
        assert!(parse("//*").is_ok());
        assert!(parse("//@*").is_ok());
        assert_eq!(parse("//text()").unwrap().paths[0].steps[0].test, StepTest::Text);
        assert_eq!(
            parse("//node()").unwrap().paths[0].steps[0].test,
            StepTest::AnyNode
        );
    }

    #[test]
    fn test_parse_self_step_axes() {
        let step = &parse(".").unwrap().paths[0].steps[0];
        assert_eq!(step.axis, Axis::SelfAxis);
        assert_eq!(step.test, StepTest::AnyNode);

        let step = &parse("//.").unwrap().paths[0].steps[0];
        assert_eq!(step.axis, Axis::DescendantOrSelf);
        assert_eq!(step.test, StepTest::AnyNode);
    }

    #[test]
    fn test_parse_positional_predicate() {
        let expr = parse("//p[2]").unwrap();
        assert_eq!(expr.paths[0].steps[0].position, Some(2));
    }

    #[test]
    fn test_parse_rejects_invalid_syntax() {
        assert!(parse("").is_err());
        assert!(parse("//").is_err());
        assert!(parse("//p[").is_err());
        assert!(parse("//p[0]").is_err());
        assert!(parse("//p[x]").is_err());
        assert!(parse("//@href/b").is_err());
        assert!(parse("//foo()").is_err());
        assert!(parse("a b").is_err());
    }
}
