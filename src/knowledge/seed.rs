// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Built-in seed entries used when no knowledge base file is present

use super::types::{Disease, Medicine, TreatmentStep};

fn med(name: &str, ingredient: Option<&str>, dosage: &str) -> Medicine {
    Medicine {
        name: name.to_string(),
        active_ingredient: ingredient.map(|s| s.to_string()),
        manufacturer: None,
        dosage: dosage.to_string(),
        reference_source: None,
    }
}

fn step(order: u32, description: &str, action: Option<&str>, medicines: Vec<Medicine>) -> TreatmentStep {
    TreatmentStep {
        step_order: order,
        description: description.to_string(),
        action: action.map(|s| s.to_string()),
        medicines,
    }
}

/// Default disease set covering the classes the classification model emits
pub fn builtin_diseases() -> Vec<Disease> {
    vec![
        Disease {
            code: "DIS_01".to_string(),
            name: "Coccidiosis".to_string(),
            name_latin: Some("Eimeria spp.".to_string()),
            symptoms: "Bloody or watery droppings, ruffled feathers, pale combs, \
                       drooping wings, reduced feed intake and slow growth."
                .to_string(),
            cause: "Intestinal protozoan parasites (Eimeria species) spread through \
                    oocysts in contaminated litter, feed and water."
                .to_string(),
            prevention: "Keep litter dry, avoid overcrowding, rotate anticoccidials \
                         in feed, and vaccinate day-old chicks where available."
                .to_string(),
            treatment_steps: vec![
                step(
                    1,
                    "Medicate the whole flock's drinking water with an anticoccidial.",
                    None,
                    vec![
                        med("Toltrazuril 2.5%", Some("toltrazuril"), "7 mg/kg body weight in drinking water for 2 consecutive days"),
                        med("Amprol", Some("amprolium"), "1 g per 1.5 L of drinking water for 5 days"),
                    ],
                ),
                step(
                    2,
                    "Support recovery with vitamins and electrolytes.",
                    None,
                    vec![med("Vitamin K + electrolyte mix", None, "1 g per litre of drinking water for 3-5 days")],
                ),
                step(
                    3,
                    "Decontaminate the house to break the oocyst cycle.",
                    Some("Replace wet litter, disinfect feeders and drinkers, keep bedding dry"),
                    vec![],
                ),
            ],
        },
        Disease {
            code: "DIS_02".to_string(),
            name: "New Castle Disease".to_string(),
            name_latin: Some("Avian paramyxovirus 1".to_string()),
            symptoms: "Gasping, coughing, greenish watery diarrhea, twisted neck \
                       (torticollis), paralysis, sharp drop in egg production and \
                       sudden deaths across the flock."
                .to_string(),
            cause: "Highly contagious paramyxovirus spread by aerosols, droppings \
                    and contaminated equipment or clothing."
                .to_string(),
            prevention: "Strict vaccination schedule (e.g. Lasota at day 7 and \
                         day 21), biosecurity at the farm gate, quarantine of new \
                         birds."
                .to_string(),
            treatment_steps: vec![
                step(
                    1,
                    "There is no specific cure; isolate sick birds immediately.",
                    Some("Separate symptomatic birds, restrict movement between houses"),
                    vec![],
                ),
                step(
                    2,
                    "Re-vaccinate healthy contacts and reinforce immunity.",
                    None,
                    vec![med("Lasota vaccine", None, "1 dose per bird via eye drop or drinking water")],
                ),
                step(
                    3,
                    "Control secondary bacterial infections and support the flock.",
                    None,
                    vec![
                        med("Broad-spectrum antibiotic (e.g. Doxycycline)", Some("doxycycline"), "10 mg/kg body weight for 3-5 days"),
                        med("Vitamin C + electrolytes", None, "1 g per litre of drinking water during the outbreak"),
                    ],
                ),
            ],
        },
        Disease {
            code: "DIS_03".to_string(),
            name: "Salmonella".to_string(),
            name_latin: Some("Salmonella gallinarum / pullorum".to_string()),
            symptoms: "White chalky diarrhea pasted around the vent, weakness, \
                       huddling near heat sources, swollen joints in older birds, \
                       high mortality in chicks."
                .to_string(),
            cause: "Bacterial infection transmitted vertically through hatching \
                    eggs and horizontally via contaminated feed, water and rodents."
                .to_string(),
            prevention: "Source chicks from certified hatcheries, control rodents, \
                         chlorinate drinking water, clean brooders between batches."
                .to_string(),
            treatment_steps: vec![
                step(
                    1,
                    "Treat the flock with a targeted antibiotic in drinking water.",
                    None,
                    vec![
                        med("Enroflox 10%", Some("enrofloxacin"), "10 mg/kg body weight daily for 5 days"),
                        med("Neo-Terramycin", Some("neomycin + oxytetracycline"), "1 g per 2 L of drinking water for 5-7 days"),
                    ],
                ),
                step(
                    2,
                    "Restore gut flora after the antibiotic course.",
                    None,
                    vec![med("Probiotic lactobacillus mix", None, "1 g per litre of drinking water for 5 days")],
                ),
                step(
                    3,
                    "Remove carrier birds and sanitize the environment.",
                    Some("Cull confirmed carriers, disinfect housing, bait rodent runs"),
                    vec![],
                ),
            ],
        },
        Disease {
            code: "DIS_04".to_string(),
            name: "Gumboro".to_string(),
            name_latin: Some("Infectious bursal disease virus".to_string()),
            symptoms: "Watery whitish diarrhea, trembling, vent pecking, ruffled \
                       feathers and prostration in 3-6 week old birds; the bursa \
                       is swollen on necropsy."
                .to_string(),
            cause: "Birnavirus attacking the bursa of Fabricius, highly resistant \
                    in the environment and spread via contaminated litter."
                .to_string(),
            prevention: "Vaccinate at day 14 and day 24, disinfect houses between \
                         flocks with formol- or iodine-based products."
                .to_string(),
            treatment_steps: vec![
                step(
                    1,
                    "No direct antiviral exists; reduce stress and keep birds warm.",
                    Some("Lower stocking density, keep the house warm and quiet"),
                    vec![],
                ),
                step(
                    2,
                    "Rehydrate aggressively and support the immune system.",
                    None,
                    vec![med("Electrolyte + glucose solution", None, "2 g per litre of drinking water until droppings normalize")],
                ),
                step(
                    3,
                    "Prevent secondary infections while immunity is suppressed.",
                    None,
                    vec![med("Amoxicillin 50%", Some("amoxicillin"), "15 mg/kg body weight for 3 days")],
                ),
            ],
        },
    ]
}
