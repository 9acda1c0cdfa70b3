use crate::models::{RiskLevel, SegmentId};

pub const DEFAULT_MULTIPLIER: f64 = 1.0;

pub const INDUSTRY_MULTIPLIERS: &[(&str, f64)] = &[
    ("technology", 1.3),
    ("financial_services", 1.2),
    ("healthcare", 1.1),
    ("manufacturing", 1.0),
    ("retail", 0.95),
    ("education", 0.9),
    ("default", 1.0),
];

pub const SIZE_MULTIPLIERS: &[(&str, f64)] = &[
    ("small", 0.9),
    ("medium", 1.0),
    ("large", 1.1),
    ("enterprise", 1.2),
];

pub fn industry_multiplier(industry: &str) -> f64 {
    lookup(INDUSTRY_MULTIPLIERS, industry)
}

pub fn size_multiplier(company_size: &str) -> f64 {
    lookup(SIZE_MULTIPLIERS, company_size)
}

fn lookup(table: &[(&str, f64)], key: &str) -> f64 {
    let key = key.to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(DEFAULT_MULTIPLIER)
}

#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub id: SegmentId,
    pub name: &'static str,
    pub proportion: f64,
    pub engagement_score: u8,
    pub proficiency_level: &'static str,
    pub adoption_stage: &'static str,
    pub recommendations: &'static [&'static str],
}

pub static PERSONAS: [Persona; 4] = [
    Persona {
        id: SegmentId::Champions,
        name: "Champions & Power Users",
        proportion: 0.15,
        engagement_score: 85,
        proficiency_level: "expert",
        adoption_stage: "mastery",
        recommendations: &[
            "Engage as peer mentors and trainers",
            "Invite to contribute to best practices library",
            "Recognize achievements publicly",
        ],
    },
    Persona {
        id: SegmentId::Engaged,
        name: "Engaged Users",
        proportion: 0.35,
        engagement_score: 65,
        proficiency_level: "advanced",
        adoption_stage: "proficiency",
        recommendations: &[
            "Provide advanced training opportunities",
            "Share advanced use cases and tips",
            "Encourage peer-to-peer learning",
        ],
    },
    Persona {
        id: SegmentId::Casual,
        name: "Casual Users",
        proportion: 0.35,
        engagement_score: 45,
        proficiency_level: "intermediate",
        adoption_stage: "adoption",
        recommendations: &[
            "Send personalized feature recommendations",
            "Provide quick-win tutorials",
            "Increase engagement touchpoints",
        ],
    },
    Persona {
        id: SegmentId::AtRisk,
        name: "At-Risk Users",
        proportion: 0.15,
        engagement_score: 25,
        proficiency_level: "beginner",
        adoption_stage: "exploration",
        recommendations: &[
            "Conduct 1-on-1 coaching sessions",
            "Identify and address barriers",
            "Provide simplified onboarding resources",
        ],
    },
];

pub fn persona(id: SegmentId) -> &'static Persona {
    match id {
        SegmentId::Champions => &PERSONAS[0],
        SegmentId::Engaged => &PERSONAS[1],
        SegmentId::Casual => &PERSONAS[2],
        SegmentId::AtRisk => &PERSONAS[3],
    }
}

pub fn interventions(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::High => &[
            "Immediate 1-on-1 coaching session",
            "Identify and address specific barriers",
            "Provide dedicated support resources",
            "Consider license reassignment if no improvement",
        ],
        RiskLevel::Medium => &[
            "Send personalized engagement campaign",
            "Share relevant use cases and tips",
            "Invite to next training session",
            "Monitor for 2 weeks",
        ],
        RiskLevel::Low => &[
            "Continue regular engagement",
            "Share advanced features periodically",
            "Maintain current support level",
        ],
    }
}

pub const ADOPTION_KEY_DRIVERS: &[&str] = &[
    "Training completion rate",
    "Champion engagement",
    "Feature availability",
    "Leadership support",
];

pub const ADOPTION_RECOMMENDATIONS: &[&str] = &[
    "Increase training accessibility",
    "Activate champion program",
    "Communicate quick wins",
    "Measure and share success stories",
];
