use crate::types::{Sample, TopoError, TopoResult};
use ndarray::ArrayView2;
use regex::Regex;

/// Signed sum of recorded channels, e.g. `-LZ+AZ`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelExpression {
    terms: Vec<(f64, String)>,
}

impl ChannelExpression {
    pub fn parse(symbol: &str) -> TopoResult<Self> {
        let compact: String = symbol.chars().filter(|c| !c.is_whitespace()).collect();
        let re = Regex::new(r"([+-]?)([A-Za-z][A-Za-z0-9_]*)")
            .map_err(|e| TopoError::Configuration(format!("Channel pattern: {}", e)))?;

        let mut terms = Vec::new();
        let mut consumed = 0;
        for cap in re.captures_iter(&compact) {
            let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            if whole.0 != consumed {
                break;
            }
            consumed = whole.1;
            let sign = if &cap[1] == "-" { -1.0 } else { 1.0 };
            terms.push((sign, cap[2].to_string()));
        }

        if terms.is_empty() || consumed != compact.len() {
            return Err(TopoError::Configuration(format!(
                "Invalid channel expression: '{}'",
                symbol
            )));
        }

        Ok(Self { terms })
    }

    /// Channel names referenced by the expression
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(_, s)| s.as_str())
    }

    /// True when every referenced channel is among `columns`
    pub fn is_satisfied_by(&self, columns: &[String]) -> bool {
        self.symbols().all(|s| columns.iter().any(|c| c == s))
    }

    /// Evaluate the expression for every row of a `samples x channels` table
    pub fn evaluate(&self, columns: &[String], table: ArrayView2<Sample>) -> TopoResult<Vec<Sample>> {
        let mut indices = Vec::with_capacity(self.terms.len());
        for (sign, symbol) in &self.terms {
            let index = columns
                .iter()
                .position(|c| c == symbol)
                .ok_or_else(|| TopoError::ChannelNotFound(symbol.clone()))?;
            indices.push((*sign, index));
        }

        Ok(table
            .rows()
            .into_iter()
            .map(|row| indices.iter().map(|(sign, i)| sign * row[*i]).sum::<Sample>())
            .collect())
    }
}
