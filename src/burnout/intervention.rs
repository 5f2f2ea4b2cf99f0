//! Intervention plans
//!
//! A plan is a pure function of an assessment: actions are chosen by risk
//! level first, then by specific factor flags, and sorted by priority.

use serde::{Deserialize, Serialize};

use super::{BurnoutRiskAssessment, InterventionUrgency, RiskLevel, Trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    SelfCare,
    ProfessionalSupport,
    Workload,
    Social,
    Training,
}

/// One recommended action; priority 1 is the most pressing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionAction {
    pub category: ActionCategory,
    pub priority: u8,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub title: String,
    pub url: String,
}

/// Prioritized response to a burnout risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionPlan {
    pub risk_level: RiskLevel,
    pub urgency: InterventionUrgency,
    pub actions: Vec<InterventionAction>,
    pub conversation_prompts: Vec<String>,
    pub resources: Vec<ResourceLink>,
    /// Suggested days until the next check-in
    pub follow_up_days: u32,
}

impl InterventionPlan {
    /// Build a plan from an assessment
    pub fn build(assessment: &BurnoutRiskAssessment) -> Self {
        let level = assessment.risk_level;
        let factors = &assessment.factors;

        let mut actions = level_actions(level);

        if factors.chronic_stress_detected {
            actions.push(action(
                ActionCategory::Workload,
                1,
                "Reduce high-intensity assignments",
                "Stress has been high for most recent weeks. Rebalance the schedule toward lower-stakes work for the next two weeks.",
            ));
        }
        if factors.recovery_needed || factors.declining_energy {
            actions.push(action(
                ActionCategory::SelfCare,
                2,
                "Schedule recovery time",
                "Energy is low or falling. Block rest periods between sessions and protect at least one full day off.",
            ));
        }
        if factors.low_engagement {
            actions.push(action(
                ActionCategory::Social,
                3,
                "Reconnect with a peer",
                "Check-ins have been infrequent. A short debrief with a colleague helps surface strain early.",
            ));
        }
        if assessment.trend == Trend::Worsening && level >= RiskLevel::Moderate {
            actions.push(action(
                ActionCategory::Training,
                3,
                "Refresh vicarious trauma strategies",
                "Load is rising week over week. Revisit grounding and boundary-setting techniques for difficult sessions.",
            ));
        }

        actions.sort_by_key(|a| a.priority);

        Self {
            risk_level: level,
            urgency: assessment.intervention_urgency,
            actions,
            conversation_prompts: prompts(assessment),
            resources: resources(level),
            follow_up_days: follow_up_days(level),
        }
    }
}

fn action(category: ActionCategory, priority: u8, title: &str, description: &str) -> InterventionAction {
    InterventionAction {
        category,
        priority,
        title: title.to_string(),
        description: description.to_string(),
    }
}

fn level_actions(level: RiskLevel) -> Vec<InterventionAction> {
    match level {
        RiskLevel::Critical => vec![
            action(
                ActionCategory::ProfessionalSupport,
                1,
                "Contact a mental health professional",
                "Risk is critical. Reach out to a counselor or an employee assistance program this week.",
            ),
            action(
                ActionCategory::Workload,
                1,
                "Pause trauma-heavy assignments",
                "Step back from medical, legal and mental health assignments until risk eases.",
            ),
        ],
        RiskLevel::High => vec![
            action(
                ActionCategory::ProfessionalSupport,
                1,
                "Book a supervision or peer-support session",
                "Talk through recent assignments with a supervisor or peer-support group.",
            ),
            action(
                ActionCategory::Workload,
                2,
                "Limit back-to-back sessions",
                "Leave recovery time between demanding assignments.",
            ),
        ],
        RiskLevel::Moderate => vec![action(
            ActionCategory::SelfCare,
            2,
            "Add a daily decompression routine",
            "Ten minutes of deliberate decompression after each session.",
        )],
        RiskLevel::Low | RiskLevel::Minimal => vec![action(
            ActionCategory::SelfCare,
            4,
            "Keep current habits",
            "Current patterns look sustainable. Keep checking in weekly.",
        )],
    }
}

fn prompts(assessment: &BurnoutRiskAssessment) -> Vec<String> {
    let mut prompts = vec!["What part of this week's work stayed with you the longest?".to_string()];

    if assessment.factors.chronic_stress_detected {
        prompts.push("Which assignments have felt hardest to leave behind lately?".to_string());
    }
    if assessment.factors.recovery_needed {
        prompts.push("When did you last feel fully rested?".to_string());
    }
    if assessment.trend == Trend::Worsening {
        prompts.push("What has changed in your workload over the past few weeks?".to_string());
    }
    if assessment.risk_level >= RiskLevel::High {
        prompts.push("Who could you talk to about how you are feeling this week?".to_string());
    }
    prompts
}

fn resources(level: RiskLevel) -> Vec<ResourceLink> {
    let link = |title: &str, url: &str| ResourceLink {
        title: title.to_string(),
        url: url.to_string(),
    };

    let mut links = vec![link(
        "Registry of Interpreters for the Deaf: self-care resources",
        "https://rid.org",
    )];
    if level >= RiskLevel::Moderate {
        links.push(link(
            "International Medical Interpreters Association",
            "https://www.imiaweb.org",
        ));
    }
    if level >= RiskLevel::High {
        links.push(link("988 Suicide & Crisis Lifeline", "https://988lifeline.org"));
    }
    links
}

fn follow_up_days(level: RiskLevel) -> u32 {
    match level {
        RiskLevel::Critical => 2,
        RiskLevel::High => 7,
        RiskLevel::Moderate => 14,
        RiskLevel::Low | RiskLevel::Minimal => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burnout::tests::make_test_bucket;
    use crate::burnout::BurnoutRiskPredictor;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    fn flag_titles(plan: &InterventionPlan) -> Vec<(ActionCategory, u8, &str)> {
        let baseline = level_actions(plan.risk_level);
        plan.actions
            .iter()
            .filter(|a| !baseline.contains(a))
            .map(|a| (a.category, a.priority, a.title.as_str()))
            .collect()
    }

    #[test]
    fn test_critical_plan_leads_with_professional_support() {
        let buckets = vec![
            make_test_bucket(0, Some(6.0), Some(4.0), Some(6.0)),
            make_test_bucket(1, Some(9.0), Some(2.0), Some(9.0)),
            make_test_bucket(2, Some(10.0), Some(1.0), Some(10.0)),
        ];
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let assessment = BurnoutRiskPredictor::assess(&buckets, 0.0, now).unwrap();
        let plan = InterventionPlan::build(&assessment);

        assert_eq!(plan.risk_level, RiskLevel::Critical);
        assert_eq!(plan.urgency, InterventionUrgency::Immediate);
        assert_eq!(plan.actions[0].priority, 1);
        assert!(plan
            .actions
            .iter()
            .any(|a| a.category == ActionCategory::ProfessionalSupport));
        assert!(plan.actions.iter().any(|a| a.category == ActionCategory::Social));
        assert!(plan.resources.iter().any(|r| r.url.contains("988")));
        assert_eq!(plan.follow_up_days, 2);
        assert!(plan.actions.windows(2).all(|w| w[0].priority <= w[1].priority));
    }

    #[test]
    fn test_provisional_plan_is_gentle() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let plan = InterventionPlan::build(&BurnoutRiskPredictor::provisional_default(now));

        assert_eq!(plan.risk_level, RiskLevel::Moderate);
        assert!(plan
            .actions
            .iter()
            .all(|a| a.category != ActionCategory::ProfessionalSupport));
        assert_eq!(plan.conversation_prompts.len(), 1);
    }

    #[test]
    fn test_level_only_plan_has_no_flag_actions() {
        let plan = InterventionPlan::build(&BurnoutRiskPredictor::provisional_default(now()));
        assert!(flag_titles(&plan).is_empty());
        assert_eq!(plan.actions, level_actions(RiskLevel::Moderate));
    }

    #[test]
    fn test_chronic_stress_adds_workload_action() {
        let mut assessment = BurnoutRiskPredictor::provisional_default(now());
        assessment.factors.chronic_stress_detected = true;
        let plan = InterventionPlan::build(&assessment);

        assert_eq!(
            flag_titles(&plan),
            vec![(ActionCategory::Workload, 1u8, "Reduce high-intensity assignments")]
        );
        assert_eq!(plan.actions[0].title, "Reduce high-intensity assignments");
        assert_eq!(plan.conversation_prompts.len(), 2);
    }

    #[test]
    fn test_recovery_needed_adds_self_care_action() {
        let mut assessment = BurnoutRiskPredictor::provisional_default(now());
        assessment.factors.recovery_needed = true;
        let plan = InterventionPlan::build(&assessment);

        assert_eq!(
            flag_titles(&plan),
            vec![(ActionCategory::SelfCare, 2u8, "Schedule recovery time")]
        );
    }

    #[test]
    fn test_declining_energy_adds_self_care_action() {
        let mut assessment = BurnoutRiskPredictor::provisional_default(now());
        assessment.factors.declining_energy = true;
        let plan = InterventionPlan::build(&assessment);

        assert_eq!(
            flag_titles(&plan),
            vec![(ActionCategory::SelfCare, 2u8, "Schedule recovery time")]
        );
        // the recovery prompt follows recovery_needed only
        assert_eq!(plan.conversation_prompts.len(), 1);
    }

    #[test]
    fn test_recovery_action_added_once_for_both_flags() {
        let mut assessment = BurnoutRiskPredictor::provisional_default(now());
        assessment.factors.recovery_needed = true;
        assessment.factors.declining_energy = true;
        let plan = InterventionPlan::build(&assessment);

        let recovery = plan
            .actions
            .iter()
            .filter(|a| a.title == "Schedule recovery time")
            .count();
        assert_eq!(recovery, 1);
    }

    #[test]
    fn test_low_engagement_adds_social_action() {
        let mut assessment = BurnoutRiskPredictor::provisional_default(now());
        assessment.factors.low_engagement = true;
        let plan = InterventionPlan::build(&assessment);

        assert_eq!(
            flag_titles(&plan),
            vec![(ActionCategory::Social, 3u8, "Reconnect with a peer")]
        );
    }

    #[test]
    fn test_worsening_trend_adds_training_from_moderate() {
        let mut assessment = BurnoutRiskPredictor::provisional_default(now());
        assessment.trend = Trend::Worsening;
        let plan = InterventionPlan::build(&assessment);

        assert_eq!(
            flag_titles(&plan),
            vec![(ActionCategory::Training, 3u8, "Refresh vicarious trauma strategies")]
        );

        assessment.risk_level = RiskLevel::Low;
        let plan = InterventionPlan::build(&assessment);
        assert!(flag_titles(&plan).is_empty());
    }
}
