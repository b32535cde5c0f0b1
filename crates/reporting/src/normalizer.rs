//! Field normalization: coerces validated rows into typed, non-negative
//! clean records. Bad values fall back to zero instead of failing the run.

use campaign_core::config::NormalizerConfig;
use campaign_core::types::{CleanRecord, Field};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

use crate::schema::ValidatedRow;

/// Outcome of coercing a single value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    Parsed(f64),
    /// Negative input, replaced by zero.
    Clamped,
    /// Null, non-numeric or non-finite input, replaced by zero.
    Fallback,
}

impl Coercion {
    pub fn value(&self) -> f64 {
        match self {
            Coercion::Parsed(v) => *v,
            Coercion::Clamped | Coercion::Fallback => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    pub dropped_rows: usize,
    pub coercion_fallbacks: BTreeMap<Field, u64>,
    pub clamped_negatives: BTreeMap<Field, u64>,
}

#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub records: Vec<CleanRecord>,
    pub stats: NormalizationStats,
}

pub struct FieldNormalizer {
    currency_symbols: Vec<char>,
    thousands_separator: char,
}

impl FieldNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            currency_symbols: config.currency_symbols.chars().collect(),
            thousands_separator: config.thousands_separator,
        }
    }

    pub fn normalize(&self, rows: &[ValidatedRow]) -> NormalizedDataset {
        let mut stats = NormalizationStats::default();
        let mut records = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let Some(campaign_id) = Self::campaign_id(&row.campaign_id) else {
                trace!(row = index, "Dropping row with empty campaign id");
                stats.dropped_rows += 1;
                continue;
            };

            let mut numeric = |field: Field| {
                let coerced = self.coerce(row.get(field));
                match coerced {
                    Coercion::Clamped => *stats.clamped_negatives.entry(field).or_insert(0) += 1,
                    Coercion::Fallback => *stats.coercion_fallbacks.entry(field).or_insert(0) += 1,
                    Coercion::Parsed(_) => {}
                }
                coerced.value()
            };

            records.push(CleanRecord {
                campaign_id,
                impressions: to_count(numeric(Field::Impressions)),
                clicks: to_count(numeric(Field::Clicks)),
                spend: numeric(Field::Spend),
                revenue: numeric(Field::Revenue),
                conversions: to_count(numeric(Field::Conversions)),
            });
        }

        NormalizedDataset { records, stats }
    }

    /// Coerce one raw value to a finite, non-negative number.
    pub fn coerce(&self, value: &Value) -> Coercion {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => self.parse_text(s),
            _ => None,
        };
        match parsed {
            Some(v) if !v.is_finite() => Coercion::Fallback,
            Some(v) if v < 0.0 => Coercion::Clamped,
            // folds -0.0 into 0.0
            Some(v) if v == 0.0 => Coercion::Parsed(0.0),
            Some(v) => Coercion::Parsed(v),
            None => Coercion::Fallback,
        }
    }

    /// Accepts an optional sign, one currency symbol at either end and
    /// thousands separators between digits. Anything else is not a number.
    fn parse_text(&self, text: &str) -> Option<f64> {
        let mut body = text.trim();
        let mut negative = false;
        if let Some(rest) = body.strip_prefix('-') {
            negative = true;
            body = rest.trim_start();
        }
        if let Some(rest) = body.strip_prefix(|c: char| self.currency_symbols.contains(&c)) {
            body = rest.trim_start();
        } else if let Some(rest) = body.strip_suffix(|c: char| self.currency_symbols.contains(&c)) {
            body = rest.trim_end();
        }
        // "$-3.00"
        if !negative {
            if let Some(rest) = body.strip_prefix('-') {
                negative = true;
                body = rest;
            }
        }

        let chars: Vec<char> = body.chars().collect();
        let mut digits = String::with_capacity(chars.len() + 1);
        if negative {
            digits.push('-');
        }
        for (i, &c) in chars.iter().enumerate() {
            if c == self.thousands_separator {
                let between_digits = i > 0
                    && chars[i - 1].is_ascii_digit()
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                if !between_digits {
                    return None;
                }
                continue;
            }
            let misplaced_sign = matches!(c, '+' | '-') && i > 0 && !matches!(chars[i - 1], 'e' | 'E');
            if c.is_whitespace() || misplaced_sign {
                return None;
            }
            digits.push(c);
        }
        if digits.is_empty() || digits == "-" {
            return None;
        }
        digits.parse::<f64>().ok()
    }

    fn campaign_id(value: &Value) -> Option<String> {
        let id = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

fn to_count(value: f64) -> u64 {
    // saturating float-to-int cast
    value.round() as u64
}
