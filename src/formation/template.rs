//! Static descriptive table per formation type
//!
//! Only `default_spacing` feeds the simulation; the rest serves info queries.

use crate::formation::pattern::FormationType;

#[derive(Debug, Clone, Copy)]
pub struct FormationTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub default_spacing: f32,
    pub advantages: &'static [&'static str],
    pub disadvantages: &'static [&'static str],
}

static LINE: FormationTemplate = FormationTemplate {
    name: "Line",
    description: "Units abreast in a single row",
    default_spacing: 3.0,
    advantages: &["Maximum frontal firepower", "Wide field of view"],
    disadvantages: &["Weak flanks", "Hard to keep aligned on the move"],
};

static COLUMN: FormationTemplate = FormationTemplate {
    name: "Column",
    description: "Single file behind the leader",
    default_spacing: 2.5,
    advantages: &["Fast movement through narrow terrain", "Easy to control"],
    disadvantages: &["Minimal frontal firepower", "Vulnerable to flank attacks"],
};

static WEDGE: FormationTemplate = FormationTemplate {
    name: "Wedge",
    description: "Arrowhead with the leader at the point",
    default_spacing: 3.5,
    advantages: &["Good all-round firepower", "Strong penetration"],
    disadvantages: &["Exposed leader", "Rear rows spread wide"],
};

static SCATTERED: FormationTemplate = FormationTemplate {
    name: "Scattered",
    description: "Irregular spread around the leader",
    default_spacing: 5.0,
    advantages: &["Resistant to area damage", "Hard to target"],
    disadvantages: &["Poor coordination", "Weak concentrated firepower"],
};

static CIRCLE: FormationTemplate = FormationTemplate {
    name: "Circle",
    description: "Ring facing outward",
    default_spacing: 3.0,
    advantages: &["360-degree coverage", "No exposed flank"],
    disadvantages: &["Slow to move", "Thin at any single point"],
};

static DIAMOND: FormationTemplate = FormationTemplate {
    name: "Diamond",
    description: "Cardinal points with an inner ring",
    default_spacing: 4.0,
    advantages: &["Balanced coverage", "Protected core"],
    disadvantages: &["Complex to hold", "Reduced frontal width"],
};

static CUSTOM: FormationTemplate = FormationTemplate {
    name: "Custom",
    description: "User-defined arrangement, laid out as a line",
    default_spacing: 3.0,
    advantages: &["Flexible"],
    disadvantages: &["No tuned geometry"],
};

/// Descriptive defaults for a formation type
pub fn formation_template(formation_type: FormationType) -> &'static FormationTemplate {
    formation_type.template()
}

impl FormationType {
    pub fn template(&self) -> &'static FormationTemplate {
        match self {
            FormationType::Line => &LINE,
            FormationType::Column => &COLUMN,
            FormationType::Wedge => &WEDGE,
            FormationType::Scattered => &SCATTERED,
            FormationType::Circle => &CIRCLE,
            FormationType::Diamond => &DIAMOND,
            FormationType::Custom => &CUSTOM,
        }
    }

    #[inline]
    pub fn default_spacing(&self) -> f32 {
        self.template().default_spacing
    }
}
