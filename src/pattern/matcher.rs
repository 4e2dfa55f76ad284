//! Confusion-table correction of raw OCR text against compiled patterns

use super::{Component, Pattern};

/// One correction candidate: the coerced identifier and how many character
/// positions changed to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub change_bits: u32,
    pub converted: String,
}

/// Coerce `text` onto every length-compatible pattern, ranked ascending by
/// `change_bits`; ties preserve pattern generation order.
///
/// Returns an empty list when no pattern matches the text length; the caller
/// falls back to the uncorrected OCR text.
pub fn correct(text: &str, patterns: &[Pattern]) -> Vec<Correction> {
    let chars: Vec<char> = text.chars().collect();

    let mut results: Vec<Correction> = patterns
        .iter()
        .filter(|p| p.total_len() == chars.len())
        .map(|p| convert(&chars, p))
        .collect();

    // sort_by_key is stable, so equal-cost candidates keep generation order
    results.sort_by_key(|r| r.change_bits);
    results
}

fn convert(chars: &[char], pattern: &Pattern) -> Correction {
    let mut change_bits = 0;
    let mut converted = String::with_capacity(chars.len());
    let mut pos = 0;

    for component in pattern.components() {
        match component {
            Component::Fixed(literal) => {
                for expected in literal.chars() {
                    if chars[pos] != expected {
                        change_bits += 1;
                    }
                    converted.push(expected);
                    pos += 1;
                }
            }
            Component::Digits(n) => {
                for _ in 0..*n {
                    let mapped = to_digit(chars[pos]);
                    if mapped != chars[pos] {
                        change_bits += 1;
                    }
                    converted.push(mapped);
                    pos += 1;
                }
            }
            Component::Letters(n) => {
                for _ in 0..*n {
                    let mapped = to_letter(chars[pos]);
                    if mapped != chars[pos] {
                        change_bits += 1;
                    }
                    converted.push(mapped);
                    pos += 1;
                }
            }
        }
    }

    Correction {
        change_bits,
        converted,
    }
}

/// Glyphs commonly misread for digits, mapped to the digit they resemble.
fn to_digit(c: char) -> char {
    match c {
        'B' => '8',
        'D' => '0',
        'G' => '6',
        'I' => '1',
        'J' => '1',
        'O' => '0',
        'S' => '5',
        'T' => '7',
        'Z' => '2',
        _ => c,
    }
}

/// Inverse direction: digits misread inside letter runs.
fn to_letter(c: char) -> char {
    match c {
        '0' => 'D',
        '1' => 'I',
        '2' => 'Z',
        '5' => 'S',
        '6' => 'G',
        '7' => 'T',
        '8' => 'B',
        _ => c,
    }
}
