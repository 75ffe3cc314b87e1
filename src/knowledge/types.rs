// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// One disease entry in the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Disease {
    /// Stable identifier, e.g. "DIS_01"
    pub code: String,
    /// Common name, e.g. "Coccidiosis"
    pub name: String,
    /// Scientific / latin name of the agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_latin: Option<String>,
    pub symptoms: String,
    pub cause: String,
    pub prevention: String,
    #[serde(default)]
    pub treatment_steps: Vec<TreatmentStep>,
}

/// Ordered step of a treatment plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentStep {
    pub step_order: u32,
    pub description: String,
    /// Concrete action when no medicine is involved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
}

/// Suggested medicine for a treatment step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ingredient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_source: Option<String>,
}

impl Disease {
    /// First treatment step by order, if any
    pub fn first_step(&self) -> Option<&TreatmentStep> {
        self.treatment_steps.iter().min_by_key(|s| s.step_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disease_roundtrip() {
        let disease = Disease {
            code: "DIS_01".to_string(),
            name: "Coccidiosis".to_string(),
            name_latin: Some("Eimeria spp.".to_string()),
            symptoms: "Bloody droppings".to_string(),
            cause: "Protozoan parasite".to_string(),
            prevention: "Dry litter".to_string(),
            treatment_steps: vec![TreatmentStep {
                step_order: 1,
                description: "Medicate drinking water".to_string(),
                action: None,
                medicines: vec![Medicine {
                    name: "Toltrazuril 2.5%".to_string(),
                    active_ingredient: Some("toltrazuril".to_string()),
                    manufacturer: None,
                    dosage: "7 mg/kg for 2 days".to_string(),
                    reference_source: None,
                }],
            }],
        };

        let json = serde_json::to_string(&disease).unwrap();
        let back: Disease = serde_json::from_str(&json).unwrap();
        assert_eq!(disease, back);
    }

    #[test]
    fn test_first_step_ordering() {
        let disease = Disease {
            code: "D".to_string(),
            name: "X".to_string(),
            name_latin: None,
            symptoms: String::new(),
            cause: String::new(),
            prevention: String::new(),
            treatment_steps: vec![
                TreatmentStep {
                    step_order: 2,
                    description: "later".to_string(),
                    action: None,
                    medicines: vec![],
                },
                TreatmentStep {
                    step_order: 1,
                    description: "first".to_string(),
                    action: None,
                    medicines: vec![],
                },
            ],
        };
        assert_eq!(disease.first_step().unwrap().description, "first");
    }
}
