//! Payment calculator — project rate tables and payout math.
//!
//! Pure arithmetic over a constructor-injected rate table; nothing here
//! touches the database. Each project pays audio minutes plus exactly one
//! of segments or syllables, never both. An unconfigured project yields a
//! zero amount with the `configured` flag down — payroll treats that as
//! "nothing owed", not as an error.

use std::collections::BTreeMap;

use serde::Serialize;

use super::round2;

/// Rates for one project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateCard {
    /// Rupees per audio minute.
    pub audio_minute_rate: f64,
    /// Rupees per approved segment, if this project pays per segment.
    pub segment_rate: Option<f64>,
    /// Rupees per reviewed syllable, if this project pays per syllable.
    pub syllable_rate: Option<f64>,
}

impl RateCard {
    /// Audio plus per-segment pay.
    #[must_use]
    pub const fn per_segment(audio_minute_rate: f64, segment_rate: f64) -> Self {
        Self {
            audio_minute_rate,
            segment_rate: Some(segment_rate),
            syllable_rate: None,
        }
    }

    /// Audio plus per-syllable pay.
    #[must_use]
    pub const fn per_syllable(audio_minute_rate: f64, syllable_rate: f64) -> Self {
        Self {
            audio_minute_rate,
            segment_rate: None,
            syllable_rate: Some(syllable_rate),
        }
    }
}

/// Rate table keyed by project identifier.
///
/// Lookup prefers an exact match, then falls back to the first configured
/// key that appears as a substring of the project name (project names in
/// the wild carry suffixes like `KH_MV_A_batch2`).
#[derive(Debug, Clone)]
pub struct RateTable {
    entries: BTreeMap<String, RateCard>,
}

impl RateTable {
    /// Build a table from explicit entries.
    #[must_use]
    pub fn new(entries: BTreeMap<String, RateCard>) -> Self {
        Self { entries }
    }

    /// Find the rate card for a project name.
    #[must_use]
    pub fn lookup(&self, project_name: &str) -> Option<&RateCard> {
        if let Some(card) = self.entries.get(project_name) {
            return Some(card);
        }
        self.entries
            .iter()
            .find(|(key, _)| project_name.contains(key.as_str()))
            .map(|(_, card)| card)
    }
}

impl Default for RateTable {
    /// The production rate table.
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        // AB projects: Rs. 5 per audio minute + Rs. 2 per audio segment.
        entries.insert("AM_AB_A".to_string(), RateCard::per_segment(5.0, 2.0));
        entries.insert("KH_AB_A".to_string(), RateCard::per_segment(5.0, 2.0));
        // MV projects: Rs. 5 per audio minute + Rs. 0.35 per reviewed syllable.
        entries.insert("AM_MV_A".to_string(), RateCard::per_syllable(5.0, 0.35));
        entries.insert("AM_MV_B".to_string(), RateCard::per_syllable(5.0, 0.35));
        entries.insert("KH_MV_A".to_string(), RateCard::per_syllable(5.0, 0.35));
        entries.insert("KH_MV_B".to_string(), RateCard::per_syllable(5.0, 0.35));
        // STT teaching: Rs. 5 per audio minute + Rs. 0.3 per reviewed syllable.
        entries.insert(
            "STT_TEACHING_A".to_string(),
            RateCard::per_syllable(5.0, 0.3),
        );
        Self { entries }
    }
}

/// Result of a payment calculation.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentBreakdown {
    pub project: String,
    /// Whether the project has a configured rate card.
    pub configured: bool,
    pub audio_payment: f64,
    pub segment_payment: f64,
    pub syllable_payment: f64,
    pub total: f64,
    /// Human-readable breakdown for payroll review.
    pub breakdown: String,
}

/// Calculator bound to a rate table.
pub struct PaymentCalculator<'a> {
    table: &'a RateTable,
}

impl<'a> PaymentCalculator<'a> {
    pub(crate) const fn new(table: &'a RateTable) -> Self {
        Self { table }
    }

    /// Calculate the payout for a project's windowed totals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate(
        &self,
        project_name: &str,
        total_audio_minutes: f64,
        approved_segments: i64,
        reviewed_syllables: i64,
    ) -> PaymentBreakdown {
        let Some(card) = self.table.lookup(project_name) else {
            return PaymentBreakdown {
                project: project_name.to_string(),
                configured: false,
                audio_payment: 0.0,
                segment_payment: 0.0,
                syllable_payment: 0.0,
                total: 0.0,
                breakdown: "Project not configured for payment calculation".to_string(),
            };
        };

        let audio_payment = total_audio_minutes * card.audio_minute_rate;
        let segment_payment = match card.segment_rate {
            Some(rate) if approved_segments > 0 => approved_segments as f64 * rate,
            _ => 0.0,
        };
        let syllable_payment = match card.syllable_rate {
            Some(rate) if reviewed_syllables > 0 => reviewed_syllables as f64 * rate,
            _ => 0.0,
        };
        let total = audio_payment + segment_payment + syllable_payment;

        let mut parts = Vec::new();
        if audio_payment > 0.0 {
            parts.push(format!(
                "Audio: {total_audio_minutes:.2} min × Rs. {} = Rs. {audio_payment:.2}",
                card.audio_minute_rate
            ));
        }
        if segment_payment > 0.0 {
            if let Some(rate) = card.segment_rate {
                parts.push(format!(
                    "Segments: {approved_segments} × Rs. {rate} = Rs. {segment_payment:.2}"
                ));
            }
        }
        if syllable_payment > 0.0 {
            if let Some(rate) = card.syllable_rate {
                parts.push(format!(
                    "Syllables: {reviewed_syllables} × Rs. {rate} = Rs. {syllable_payment:.2}"
                ));
            }
        }
        let breakdown = if parts.is_empty() {
            "No payment applicable".to_string()
        } else {
            parts.join(" + ")
        };

        PaymentBreakdown {
            project: project_name.to_string(),
            configured: true,
            audio_payment: round2(audio_payment),
            segment_payment: round2(segment_payment),
            syllable_payment: round2(syllable_payment),
            total: round2(total),
            breakdown,
        }
    }
}
