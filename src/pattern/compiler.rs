//! Grammar parsing and breadth-first pattern expansion

use crate::error::PatternError;

use super::{Component, Pattern};

/// One parsed grammar token, before length choices are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Fixed(String),
    Digits(Vec<usize>),
    Letters(Vec<usize>),
}

impl Token {
    /// Enumerate the concrete components this token can contribute,
    /// shortest length first.
    fn choices(&self) -> Vec<Component> {
        match self {
            Token::Fixed(text) => vec![Component::Fixed(text.clone())],
            Token::Digits(lens) => lens.iter().map(|&n| Component::Digits(n)).collect(),
            Token::Letters(lens) => lens.iter().map(|&n| Component::Letters(n)).collect(),
        }
    }
}

/// Compile a format grammar string into all concrete fixed-length patterns.
///
/// Grammar: `[charset]` matches the charset verbatim (`A-Z`, `0-9`, `-`),
/// `d(n)` / `d(a,b)` a digit run, `L(n)` / `L(a,b)` a letter run. A two-bound
/// range is inclusive and expands one pattern per candidate length; the
/// compiler enumerates the full cross-product across tokens.
pub fn compile(spec: &str) -> Result<Vec<Pattern>, PatternError> {
    let tokens = parse(spec)?;
    Ok(expand(&tokens))
}

fn parse(spec: &str) -> Result<Vec<Token>, PatternError> {
    let bytes = spec.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => {
                let end = find(bytes, pos + 1, b']').ok_or_else(|| syntax(spec, pos))?;
                let charset = &spec[pos + 1..end];
                if !charset
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-')
                {
                    return Err(syntax(spec, pos));
                }
                tokens.push(Token::Fixed(charset.to_string()));
                pos = end + 1;
            }
            kind @ (b'd' | b'L') => {
                if bytes.get(pos + 1) != Some(&b'(') {
                    return Err(syntax(spec, pos));
                }
                let end = find(bytes, pos + 2, b')').ok_or_else(|| syntax(spec, pos))?;
                let lengths = parse_range(&spec[pos + 2..end])?;
                tokens.push(if kind == b'd' {
                    Token::Digits(lengths)
                } else {
                    Token::Letters(lengths)
                });
                pos = end + 1;
            }
            _ => return Err(syntax(spec, pos)),
        }
    }

    Ok(tokens)
}

/// Parse `INT` or `INT,INT` into the ascending list of candidate lengths.
fn parse_range(range: &str) -> Result<Vec<usize>, PatternError> {
    let bad = || PatternError::BadRange {
        range: range.to_string(),
    };
    let bounds: Vec<usize> = range
        .split(',')
        .map(|part| part.parse::<usize>().map_err(|_| bad()))
        .collect::<Result<_, _>>()?;

    match bounds.as_slice() {
        [n] => Ok(vec![*n]),
        [start, end] => {
            if start > end {
                Err(PatternError::InvertedRange {
                    start: *start,
                    end: *end,
                })
            } else {
                Ok((*start..=*end).collect())
            }
        }
        _ => Err(bad()),
    }
}

/// Breadth-first cross-product over per-token length choices.
///
/// Each branch clones its prefix instead of sharing a mutable accumulator,
/// so partially built patterns are never aliased across branches.
fn expand(tokens: &[Token]) -> Vec<Pattern> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut frontier: Vec<Vec<Component>> = vec![Vec::new()];
    for token in tokens {
        let mut next = Vec::with_capacity(frontier.len() * token.choices().len());
        for prefix in &frontier {
            for choice in token.choices() {
                let mut branch = prefix.clone();
                branch.push(choice);
                next.push(branch);
            }
        }
        frontier = next;
    }

    frontier.into_iter().map(Pattern::new).collect()
}

fn syntax(spec: &str, offset: usize) -> PatternError {
    PatternError::Syntax {
        spec: spec.to_string(),
        offset,
    }
}

fn find(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_fixed_token() {
        let patterns = compile("[ZS-1]").unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].total_len(), 4);
        assert_eq!(
            patterns[0].components(),
            &[Component::Fixed("ZS-1".to_string())]
        );
    }

    #[test]
    fn test_range_expands_ascending() {
        let patterns = compile("[AB]d(2,3)").unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].total_len(), 4);
        assert_eq!(patterns[1].total_len(), 5);
    }

    #[test]
    fn test_cross_product() {
        // 4 digit lengths x 1 letter length = 4 patterns
        let patterns = compile("[ZS]d(2,5)L(3)").unwrap();
        assert_eq!(patterns.len(), 4);
        let lens: Vec<usize> = patterns.iter().map(|p| p.total_len()).collect();
        assert_eq!(lens, vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_multi_range_cross_product_order() {
        let patterns = compile("d(1,2)L(1,2)").unwrap();
        let shapes: Vec<_> = patterns
            .iter()
            .map(|p| p.components().to_vec())
            .collect();
        assert_eq!(
            shapes,
            vec![
                vec![Component::Digits(1), Component::Letters(1)],
                vec![Component::Digits(1), Component::Letters(2)],
                vec![Component::Digits(2), Component::Letters(1)],
                vec![Component::Digits(2), Component::Letters(2)],
            ]
        );
    }

    #[test]
    fn test_unrecognized_token() {
        let err = compile("d(3)x").unwrap_err();
        assert_eq!(
            err,
            PatternError::Syntax {
                spec: "d(3)x".to_string(),
                offset: 4
            }
        );
    }

    #[test]
    fn test_lowercase_charset_rejected() {
        assert!(compile("[ab]").is_err());
    }

    #[test]
    fn test_inverted_range() {
        let err = compile("d(5,2)").unwrap_err();
        assert_eq!(err, PatternError::InvertedRange { start: 5, end: 2 });
    }

    #[test]
    fn test_malformed_range() {
        assert!(compile("d(1,2,3)").is_err());
        assert!(compile("d()").is_err());
        assert!(compile("L(x)").is_err());
    }

    #[test]
    fn test_empty_spec() {
        assert!(compile("").unwrap().is_empty());
    }
}
