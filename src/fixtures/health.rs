//! Pollution-related diseases and per-status health advisories.

use serde::Serialize;

use crate::aqi::{classify, AqiStatus};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskFactor {
    Low,
    Moderate,
    High,
    VeryHigh,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    pub name: &'static str,
    pub description: &'static str,
    pub risk_factor: RiskFactor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAdvisory {
    pub level: AqiStatus,
    pub title: &'static str,
    pub description: &'static str,
    pub diseases: Vec<Disease>,
    pub symptoms: &'static [&'static str],
    pub at_risk_groups: &'static [&'static str],
    pub recommendations: &'static [&'static str],
    pub outdoor_activity_advice: &'static str,
}

#[rustfmt::skip]
pub const DISEASES: &[Disease] = &[
    Disease { name: "Asthma", description: "Chronic respiratory condition causing airway inflammation and breathing difficulties", risk_factor: RiskFactor::High },
    Disease { name: "COPD", description: "Chronic Obstructive Pulmonary Disease - progressive lung disease affecting breathing", risk_factor: RiskFactor::VeryHigh },
    Disease { name: "Bronchitis", description: "Inflammation of the bronchial tubes causing coughing and mucus production", risk_factor: RiskFactor::Moderate },
    Disease { name: "Lung Cancer", description: "Malignant tumor in lung tissue, strongly linked to prolonged pollution exposure", risk_factor: RiskFactor::Severe },
    Disease { name: "Heart Disease", description: "Cardiovascular conditions including heart attacks and arrhythmias", risk_factor: RiskFactor::High },
    Disease { name: "Stroke", description: "Disruption of blood supply to the brain, risk increases with pollution exposure", risk_factor: RiskFactor::High },
    Disease { name: "Allergic Rhinitis", description: "Inflammation of nasal passages causing sneezing, runny nose, and congestion", risk_factor: RiskFactor::Moderate },
    Disease { name: "Eye Irritation", description: "Burning, redness, and watering of eyes due to airborne pollutants", risk_factor: RiskFactor::Low },
    Disease { name: "Pneumonia", description: "Lung infection that can be exacerbated by poor air quality", risk_factor: RiskFactor::High },
    Disease { name: "Respiratory Infections", description: "Increased susceptibility to viral and bacterial infections", risk_factor: RiskFactor::Moderate },
];

fn diseases(names: &[&str]) -> Vec<Disease> {
    names
        .iter()
        .filter_map(|name| DISEASES.iter().find(|d| d.name == *name).cloned())
        .collect()
}

/// Advisory for a status band.
pub fn advisory_for(status: AqiStatus) -> HealthAdvisory {
    // ---
    match status {
        AqiStatus::Good => HealthAdvisory {
            level: status,
            title: "Good Air Quality",
            description: "Air quality is satisfactory, and air pollution poses little or no risk.",
            diseases: diseases(&["Eye Irritation"]),
            symptoms: &["None expected for general population"],
            at_risk_groups: &["Extremely sensitive individuals may experience minor symptoms"],
            recommendations: &[
                "Great day for outdoor activities",
                "Windows can be opened for ventilation",
                "No precautions needed",
            ],
            outdoor_activity_advice: "Ideal for all outdoor activities",
        },
        AqiStatus::Moderate => HealthAdvisory {
            level: status,
            title: "Moderate Air Quality",
            description: "Air quality is acceptable. Some pollutants may be a concern for a very small number of people.",
            diseases: diseases(&["Allergic Rhinitis", "Eye Irritation"]),
            symptoms: &[
                "Mild discomfort for sensitive individuals",
                "Slight eye or throat irritation possible",
            ],
            at_risk_groups: &["People with respiratory conditions", "Those with severe allergies"],
            recommendations: &[
                "Sensitive individuals should consider limiting prolonged outdoor exertion",
                "Keep windows partially closed if symptoms occur",
            ],
            outdoor_activity_advice: "Suitable for most outdoor activities",
        },
        AqiStatus::Poor => HealthAdvisory {
            level: status,
            title: "Poor Air Quality",
            description: "Members of sensitive groups may experience health effects. General public less likely to be affected.",
            diseases: diseases(&["Asthma", "Bronchitis", "Allergic Rhinitis"]),
            symptoms: &[
                "Coughing and throat irritation",
                "Difficulty breathing for sensitive groups",
                "Eye irritation and watering",
                "Headaches",
            ],
            at_risk_groups: &[
                "Children and elderly",
                "People with asthma or respiratory diseases",
                "Heart disease patients",
                "Outdoor workers",
            ],
            recommendations: &[
                "Sensitive groups should reduce prolonged outdoor exertion",
                "Use air purifiers indoors",
                "Close windows during peak pollution hours",
                "Carry rescue inhalers if needed",
            ],
            outdoor_activity_advice: "Sensitive groups should limit outdoor activities",
        },
        AqiStatus::Unhealthy => HealthAdvisory {
            level: status,
            title: "Unhealthy Air Quality",
            description: "Everyone may begin to experience health effects. Sensitive groups may experience more serious effects.",
            diseases: diseases(&["Asthma", "COPD", "Bronchitis", "Heart Disease", "Respiratory Infections"]),
            symptoms: &[
                "Persistent coughing",
                "Shortness of breath",
                "Chest tightness",
                "Eye, nose, and throat irritation",
                "Fatigue and dizziness",
                "Worsening of existing conditions",
            ],
            at_risk_groups: &[
                "Children under 14",
                "Adults over 60",
                "Pregnant women",
                "People with lung or heart disease",
                "Outdoor workers and athletes",
            ],
            recommendations: &[
                "Avoid prolonged outdoor activities",
                "Wear N95/KN95 masks outdoors",
                "Run air purifiers indoors",
                "Keep all windows and doors closed",
                "Stay hydrated",
                "Avoid strenuous exercise",
            ],
            outdoor_activity_advice: "Everyone should reduce prolonged outdoor exertion",
        },
        AqiStatus::Severe => HealthAdvisory {
            level: status,
            title: "Severe Air Quality",
            description: "Health warnings of emergency conditions. The entire population is more likely to be affected.",
            diseases: diseases(&["Asthma", "COPD", "Heart Disease", "Stroke", "Pneumonia", "Lung Cancer"]),
            symptoms: &[
                "Severe respiratory distress",
                "Aggravated asthma attacks",
                "Chest pain and palpitations",
                "Severe headaches",
                "Nausea and dizziness",
                "Difficulty concentrating",
                "Skin irritation",
            ],
            at_risk_groups: &[
                "Everyone is at risk",
                "Particular danger for children, elderly, and pregnant women",
                "Heart and lung disease patients",
                "Immunocompromised individuals",
            ],
            recommendations: &[
                "Avoid ALL outdoor activities if possible",
                "Wear N95 masks even for short outdoor exposure",
                "Seal windows and doors",
                "Use air purifiers on high setting",
                "Consider relocating to less polluted areas temporarily",
                "Seek medical help if symptoms worsen",
                "Keep emergency medications accessible",
            ],
            outdoor_activity_advice: "Avoid ALL outdoor exertion",
        },
        AqiStatus::Hazardous => HealthAdvisory {
            level: status,
            title: "Hazardous Air Quality",
            description: "Health alert: everyone may experience serious health effects. This is a public health emergency.",
            diseases: diseases(&["Lung Cancer", "COPD", "Heart Disease", "Stroke", "Pneumonia", "Asthma"]),
            symptoms: &[
                "Life-threatening respiratory conditions",
                "Heart attacks and cardiac events",
                "Stroke symptoms",
                "Severe breathing difficulty even at rest",
                "Loss of consciousness possible",
                "Emergency hospital visits may be required",
            ],
            at_risk_groups: &[
                "ENTIRE POPULATION AT SERIOUS RISK",
                "Immediate danger for sensitive groups",
                "Medical emergencies likely to increase",
            ],
            recommendations: &[
                "STAY INDOORS - Public health emergency",
                "Do not go outside under any circumstances",
                "Seal all windows, doors, and ventilation",
                "Run all available air purifiers",
                "If you must go out, use N95/N99 masks",
                "Seek immediate medical attention for symptoms",
                "Consider emergency evacuation if prolonged",
                "Schools and workplaces should close",
            ],
            outdoor_activity_advice: "EMERGENCY: Stay indoors. Do NOT go outside.",
        },
    }
}

pub fn health_advisory(aqi: i32) -> HealthAdvisory {
    advisory_for(classify(aqi))
}

/// The first `limit` diseases listed for the AQI's band.
pub fn top_diseases(aqi: i32, limit: usize) -> Vec<Disease> {
    let mut diseases = health_advisory(aqi).diseases;
    diseases.truncate(limit);
    diseases
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_every_advisory_resolves_its_diseases() {
        // ---
        for status in AqiStatus::ALL {
            let advisory = advisory_for(status);
            assert_eq!(advisory.level, status);
            assert!(!advisory.diseases.is_empty(), "{status:?} has no diseases");
            assert!(!advisory.recommendations.is_empty());
        }
        assert_eq!(advisory_for(AqiStatus::Unhealthy).diseases.len(), 5);
    }

    #[test]
    fn test_advisory_uses_shared_breakpoints() {
        // ---
        assert_eq!(health_advisory(150).level, AqiStatus::Poor);
        assert_eq!(health_advisory(151).level, AqiStatus::Unhealthy);

        let top = top_diseases(350, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Lung Cancer");
    }
}
