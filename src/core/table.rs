//! Extraction table recovery from obfuscated player scripts

use crate::error::ResolveError;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Keyword opening the block that holds the case assignments
pub const SWITCH_ANCHOR: &str = "switch";

/// Token that terminates the case block
pub const MARKER_TOKEN: &str = "partKeyStartPosition";

/// `:x=a,y=b;` inside a switch case body
static CASE_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":[A-Za-z0-9_$]+=([A-Za-z0-9_$]+),[A-Za-z0-9_$]+=([A-Za-z0-9_$]+);").unwrap()
});

/// `=0x1f` right-hand side of a hex assignment
static HEX_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=0x([A-Za-z0-9]+)").unwrap());

/// Hex assignments of a whole script, in source order
///
/// A symbol resolves to the last assignment whose left-hand side ends with it,
/// so `xb=0x9` also assigns `b`.
struct SymbolTable<'s> {
    script: &'s str,
    assignments: Vec<(usize, &'s str)>,
}

impl<'s> SymbolTable<'s> {
    fn scan(script: &'s str) -> Self {
        let assignments = HEX_ASSIGNMENT
            .captures_iter(script)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let digits = captures.get(1)?;
                Some((whole.start(), digits.as_str()))
            })
            .collect();
        Self {
            script,
            assignments,
        }
    }

    fn len(&self) -> usize {
        self.assignments.len()
    }

    fn resolve(&self, symbol: &str) -> Result<usize, ResolveError> {
        let digits = self
            .assignments
            .iter()
            .rev()
            .find(|(position, _)| self.script[..*position].ends_with(symbol))
            .map(|(_, digits)| *digits)
            .ok_or_else(|| ResolveError::SymbolUnresolved(symbol.to_string()))?;
        Ok(usize::from_str_radix(digits, 16)?)
    }
}

/// Locate the text between the last `switch` and the first marker token after it
pub fn switch_window(script: &str) -> Result<&str, ResolveError> {
    let start = script.rfind(SWITCH_ANCHOR).ok_or_else(|| {
        ResolveError::StructureNotFound(format!("no `{}` keyword", SWITCH_ANCHOR))
    })?;
    let end = script[start..]
        .find(MARKER_TOKEN)
        .map(|offset| start + offset)
        .ok_or_else(|| {
            ResolveError::StructureNotFound(format!(
                "no `{}` marker after the last `{}` at {}",
                MARKER_TOKEN, SWITCH_ANCHOR, start
            ))
        })?;

    Ok(&script[start..end])
}

/// Recover the raw index pairs from a player script
pub fn parse_extraction_key(script: &str) -> Result<Vec<RawIndexPair>, ResolveError> {
    let window = switch_window(script)?;
    let symbols = SymbolTable::scan(script);
    debug!(
        "Switch window is {} bytes, {} hex symbols in script",
        window.len(),
        symbols.len()
    );

    let mut indexes = Vec::new();
    for captures in CASE_ASSIGNMENT.captures_iter(window) {
        let first = symbols.resolve(&captures[1])?;
        let second = symbols.resolve(&captures[2])?;
        indexes.push(RawIndexPair::new(first, second));
    }

    if indexes.is_empty() {
        return Err(ResolveError::StructureNotFound(
            "no case assignments inside switch window".to_string(),
        ));
    }

    debug!("Parsed {} index pairs", indexes.len());
    Ok(indexes)
}

/// Turn raw pairs into absolute offsets with a running sum
///
/// For each `(a, b)`: `start = a + sum`, `sum += b`, `end = b + start`.
pub fn normalize(pairs: &[RawIndexPair]) -> Result<ExtractionTable, ResolveError> {
    let mut current_sum: usize = 0;
    let mut offsets = Vec::with_capacity(pairs.len());

    for (i, pair) in pairs.iter().enumerate() {
        let overflow = || ResolveError::OffsetOutOfRange(format!("pair {} overflows", i));

        let start = pair.first.checked_add(current_sum).ok_or_else(overflow)?;
        current_sum = current_sum.checked_add(pair.second).ok_or_else(overflow)?;
        let end = pair.second.checked_add(start).ok_or_else(overflow)?;

        offsets.push(Offset { start, end });
    }

    Ok(ExtractionTable::new(offsets))
}
