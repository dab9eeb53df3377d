// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Score, safety and risk derivation from a set of findings.

use crate::report::{RiskLevel, SecurityIssue, Severity};

/// Base score before any deductions.
pub const MAX_SCORE: i64 = 100;

/// Points deducted per warning.
pub const WARNING_PENALTY: i64 = 2;

/// High or critical issues at which the score is forced to zero.
pub const SEVERE_ISSUE_LIMIT: usize = 2;

/// Galaxy-safe threshold on the final score.
pub const GALAXY_SAFE_SCORE: u8 = 80;

/// Scores below this are never safe.
pub const UNSAFE_BELOW: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub score: u8,
    pub safe: bool,
    pub risk: RiskLevel,
    pub galaxy_safe: bool,
}

/// Score a finished scan.
pub fn evaluate(severities: impl IntoIterator<Item = Severity>, warning_count: usize) -> Verdict {
    let mut score = MAX_SCORE;
    let mut severe = 0usize;
    let mut critical = false;

    for severity in severities {
        score -= severity.penalty();
        severe += usize::from(severity.is_severe());
        critical |= severity == Severity::Critical;
    }
    score -= WARNING_PENALTY * warning_count as i64;

    let forced = severe >= SEVERE_ISSUE_LIMIT;
    let score = if forced { 0 } else { score.clamp(0, MAX_SCORE) as u8 };
    let safe = !forced && !critical && score >= UNSAFE_BELOW;

    Verdict {
        score,
        safe,
        risk: RiskLevel::from_score(score),
        galaxy_safe: safe && score >= GALAXY_SAFE_SCORE,
    }
}

/// [`evaluate`] over collected issues.
pub fn evaluate_issues(issues: &[SecurityIssue], warning_count: usize) -> Verdict {
    evaluate(issues.iter().map(|i| i.severity), warning_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clean_scan_is_galaxy_safe() {
        let v = evaluate([], 0);
        assert_eq!(v.score, 100);
        assert!(v.safe);
        assert!(v.galaxy_safe);
        assert_eq!(v.risk, RiskLevel::Low);
    }

    #[test]
    fn single_critical_is_unsafe_but_scores_seventy() {
        let v = evaluate([Severity::Critical], 0);
        assert_eq!(v.score, 70);
        assert!(!v.safe);
        assert!(!v.galaxy_safe);
        assert_eq!(v.risk, RiskLevel::Medium);
    }

    #[test]
    fn single_high_stays_safe() {
        let v = evaluate([Severity::High], 0);
        assert_eq!(v.score, 80);
        assert!(v.safe);
        assert!(v.galaxy_safe);
    }

    #[test]
    fn two_severe_issues_force_zero() {
        let v = evaluate([Severity::High, Severity::Critical], 0);
        assert_eq!(v.score, 0);
        assert!(!v.safe);
        assert_eq!(v.risk, RiskLevel::Critical);
    }

    #[test]
    fn many_mediums_drive_score_below_fifty() {
        let v = evaluate([Severity::Medium; 6], 0);
        assert_eq!(v.score, 40);
        assert!(!v.safe);
        assert_eq!(v.risk, RiskLevel::High);
    }

    #[test]
    fn warnings_cost_two_points_each() {
        let v = evaluate([], 3);
        assert_eq!(v.score, 94);
        assert!(v.galaxy_safe);
    }

    #[test]
    fn score_clamps_at_zero() {
        let v = evaluate([Severity::Medium; 20], 10);
        assert_eq!(v.score, 0);
    }

    fn severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Low),
            Just(Severity::Medium),
            Just(Severity::High),
            Just(Severity::Critical),
        ]
    }

    proptest! {
        #[test]
        fn score_stays_in_range(issues in proptest::collection::vec(severity(), 0..40), warnings in 0usize..100) {
            let v = evaluate(issues, warnings);
            prop_assert!(v.score <= 100);
        }

        #[test]
        fn adding_findings_never_raises_score(
            issues in proptest::collection::vec(severity(), 0..20),
            extra in severity(),
            warnings in 0usize..30,
        ) {
            let before = evaluate(issues.clone(), warnings);
            let mut more = issues.clone();
            more.push(extra);
            prop_assert!(evaluate(more, warnings).score <= before.score);
            prop_assert!(evaluate(issues, warnings + 1).score <= before.score);
        }

        #[test]
        fn two_severe_always_unsafe(
            issues in proptest::collection::vec(severity(), 0..20),
            a in prop_oneof![Just(Severity::High), Just(Severity::Critical)],
            b in prop_oneof![Just(Severity::High), Just(Severity::Critical)],
        ) {
            let mut all = issues;
            all.push(a);
            all.push(b);
            let v = evaluate(all, 0);
            prop_assert_eq!(v.score, 0);
            prop_assert!(!v.safe);
            prop_assert!(!v.galaxy_safe);
        }
    }
}
