//! Pattern classification of one sample's grouped events.
//!
//! The verdict is produced by an ordered rule table evaluated against a
//! [`Criteria`] snapshot. The first rule that holds wins; when neither the
//! `Single` nor the `Multiple` rule holds outright, the weighted count of
//! satisfied sub-criteria decides, and a tie is reported as an ambiguous
//! `Background`.

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierConfig, MIN_GROUP_SIZE};
use crate::error::Result;
use crate::grouping::SpatialGrouping;
use crate::rusalt_structs::TypedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    Single,
    Multiple,
    Background,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Single => write!(f, "Single"),
            Pattern::Multiple => write!(f, "Multiple"),
            Pattern::Background => write!(f, "Background"),
        }
    }
}

/// Numbers the rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Events left after the noise filter.
    pub n: usize,
    /// Highest heteroplasmy (%) among those events.
    pub h_max: f64,
    /// Share of `n` held by the dominant group, 0 when there is none.
    pub f_dom: f64,
    pub dominant_group: Option<String>,
}

/// One sub-criterion of a rule with the values it was judged on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub rule: Pattern,
    pub name: String,
    pub value: f64,
    pub threshold: f64,
    pub satisfied: bool,
    pub weight: u32,
}

impl fmt::Display for CriterionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.satisfied { 'x' } else { ' ' };
        write!(
            f,
            "[{mark}] {}: {} (value {}, threshold {}, weight {})",
            self.rule,
            self.name,
            round4(self.value),
            round4(self.threshold),
            self.weight
        )
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub sample: String,
    pub pattern: Pattern,
    /// Set when the sub-criterion scores tied and `Background` was reported
    /// because the case is undecidable.
    pub ambiguous: bool,
    pub criteria: Criteria,
    pub trace: Vec<CriterionOutcome>,
    pub single_score: u32,
    pub multiple_score: u32,
    /// Indices of the events that survived the noise filter.
    pub retained: Vec<usize>,
    pub notes: Vec<String>,
}

impl ClassificationVerdict {
    pub fn dominant_group(&self) -> Option<&str> {
        self.criteria.dominant_group.as_deref()
    }
}

impl fmt::Display for ClassificationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sample: {}", self.sample)?;
        writeln!(f, "Pattern: {}", self.pattern)?;
        if self.ambiguous {
            writeln!(f, "Ambiguous: yes")?;
        }
        writeln!(f, "Events after noise filter: {}", self.criteria.n)?;
        writeln!(f, "Max heteroplasmy: {:.2}%", self.criteria.h_max)?;
        match self.dominant_group() {
            Some(id) => writeln!(
                f,
                "Dominant group: {id} ({:.1}% of events)",
                self.criteria.f_dom * 100.0
            )?,
            None => writeln!(f, "Dominant group: none")?,
        }
        writeln!(f, "Criteria:")?;
        for outcome in &self.trace {
            writeln!(f, "  {outcome}")?;
        }
        writeln!(
            f,
            "Scores: single {}, multiple {}",
            self.single_score, self.multiple_score
        )?;
        for note in &self.notes {
            writeln!(f, "Note: {note}")?;
        }
        Ok(())
    }
}

struct Rule {
    pattern: Pattern,
    applies: fn(&Criteria, &[CriterionOutcome]) -> bool,
}

fn all_of(rule: Pattern, trace: &[CriterionOutcome]) -> bool {
    trace.iter().filter(|c| c.rule == rule).all(|c| c.satisfied)
}

/// Evaluated top-down; first match wins.
const RULES: [Rule; 3] = [
    Rule {
        pattern: Pattern::Background,
        applies: |criteria, _| criteria.n == 0,
    },
    Rule {
        pattern: Pattern::Single,
        applies: |_, trace| all_of(Pattern::Single, trace),
    },
    Rule {
        pattern: Pattern::Multiple,
        applies: |_, trace| all_of(Pattern::Multiple, trace),
    },
];

pub struct PatternClassifier {
    config: ClassifierConfig,
}

impl PatternClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(PatternClassifier { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(
        &self,
        sample: &str,
        events: &[TypedEvent],
        grouping: &SpatialGrouping,
    ) -> Result<ClassificationVerdict> {
        grouping.check_covers(events.len())?;
        let retained: Vec<usize> = (0..events.len())
            .filter(|&i| events[i].heteroplasmy >= self.config.noise)
            .collect();

        let criteria = self.criteria(events, grouping, &retained);
        let trace = self.sub_criteria(&criteria);
        let single_score = score(Pattern::Single, &trace);
        let multiple_score = score(Pattern::Multiple, &trace);

        let mut notes = Vec::new();
        let dropped = events.len() - retained.len();
        if dropped > 0 {
            notes.push(format!(
                "{dropped} of {} events below noise level {}%",
                events.len(),
                self.config.noise
            ));
        }

        let mut ambiguous = false;
        let pattern = match RULES.iter().find(|r| (r.applies)(&criteria, &trace)) {
            Some(rule) => rule.pattern,
            None if single_score > multiple_score => {
                notes.push(format!(
                    "no rule matched exactly; Single wins on sub-criteria ({single_score} vs {multiple_score})"
                ));
                Pattern::Single
            }
            None if multiple_score > single_score => {
                notes.push(format!(
                    "no rule matched exactly; Multiple wins on sub-criteria ({multiple_score} vs {single_score})"
                ));
                Pattern::Multiple
            }
            None => {
                ambiguous = true;
                let note = format!(
                    "ambiguous: Single and Multiple sub-criteria tie at {single_score}; reported as Background"
                );
                warn!("{sample}: {note}");
                notes.push(note);
                Pattern::Background
            }
        };

        info!(
            "{sample}: {pattern} (n={}, h_max={:.2}%, f_dom={:.3})",
            criteria.n, criteria.h_max, criteria.f_dom
        );

        Ok(ClassificationVerdict {
            sample: sample.to_string(),
            pattern,
            ambiguous,
            criteria,
            trace,
            single_score,
            multiple_score,
            retained,
            notes,
        })
    }

    fn criteria(
        &self,
        events: &[TypedEvent],
        grouping: &SpatialGrouping,
        retained: &[usize],
    ) -> Criteria {
        let n = retained.len();
        let h_max = retained
            .iter()
            .map(|&i| events[i].heteroplasmy)
            .fold(0.0, f64::max);

        let mut counts = vec![0usize; grouping.groups.len()];
        for &i in retained {
            counts[grouping.assignment[i]] += 1;
        }

        // a lone retained event is its own dominant group
        let min_size = MIN_GROUP_SIZE.min(n).max(1);

        // earliest group wins a tie
        let mut dominant: Option<(usize, usize)> = None;
        for (group_idx, &count) in counts.iter().enumerate() {
            if count < min_size {
                continue;
            }
            if dominant.map_or(true, |(_, best)| count > best) {
                dominant = Some((group_idx, count));
            }
        }

        let (f_dom, dominant_group) = match dominant {
            Some((group_idx, count)) if n > 0 => (
                count as f64 / n as f64,
                Some(grouping.groups[group_idx].id.clone()),
            ),
            _ => (0.0, None),
        };

        Criteria {
            n,
            h_max,
            f_dom,
            dominant_group,
        }
    }

    fn sub_criteria(&self, criteria: &Criteria) -> Vec<CriterionOutcome> {
        let cfg = &self.config;
        let w = &cfg.weights;
        let n = criteria.n as f64;
        let threshold = cfg.multiple_threshold as f64;
        let outcome = |rule, name: &str, value, threshold, satisfied, weight| CriterionOutcome {
            rule,
            name: name.to_string(),
            value,
            threshold,
            satisfied,
            weight,
        };

        vec![
            outcome(
                Pattern::Single,
                "event count <= multiple_threshold",
                n,
                threshold,
                criteria.n <= cfg.multiple_threshold,
                w.event_count,
            ),
            outcome(
                Pattern::Single,
                "dominant group fraction >= dominant_fraction",
                criteria.f_dom,
                cfg.dominant_fraction,
                criteria.f_dom >= cfg.dominant_fraction,
                w.dominance,
            ),
            outcome(
                Pattern::Single,
                "max heteroplasmy >= high_het",
                criteria.h_max,
                cfg.high_het,
                criteria.h_max >= cfg.high_het,
                w.high_het,
            ),
            outcome(
                Pattern::Multiple,
                "event count > multiple_threshold",
                n,
                threshold,
                criteria.n > cfg.multiple_threshold,
                w.event_count,
            ),
            outcome(
                Pattern::Multiple,
                "no group reaches dominant_fraction",
                criteria.f_dom,
                cfg.dominant_fraction,
                criteria.f_dom < cfg.dominant_fraction,
                w.dominance,
            ),
            outcome(
                Pattern::Multiple,
                "no event reaches high_het",
                criteria.h_max,
                cfg.high_het,
                criteria.h_max < cfg.high_het,
                w.high_het,
            ),
        ]
    }
}

fn score(rule: Pattern, trace: &[CriterionOutcome]) -> u32 {
    trace
        .iter()
        .filter(|c| c.rule == rule && c.satisfied)
        .map(|c| c.weight)
        .sum()
}
