use super::{CreatureDraft, MissionDraft, Rarity};

// Per-tier totals: common 60%, rare 30%, epic 9%, legendary 1%.
const STOCK_CREATURES: &[(&str, Rarity, f64, &str)] = &[
    ("Pebbleback Shrimp", Rarity::Common, 0.075, "A timid shrimp hidden by a pebble-lumped shell."),
    ("Lantern Dartfish", Rarity::Common, 0.075, "A quick schooling fish with a luminous tail."),
    ("Shellscale Urchin", Rarity::Common, 0.075, "A rotund urchin armored in seashell mosaics."),
    ("Duskreef Snapper", Rarity::Common, 0.075, "A grey algae grazer of the deep reef cliffs."),
    ("Driftcurrent Jelly", Rarity::Common, 0.075, "A small jelly glowing softly in deep currents."),
    (
        "Crumbleclaw Hermit",
        Rarity::Common,
        0.075,
        "A hermit crab living in cracked shells and debris.",
    ),
    ("Spotted Gloom Guppy", Rarity::Common, 0.075, "A cave guppy moving in tight, murky schools."),
    ("Murkfin Skate", Rarity::Common, 0.075, "A wide skate gliding over the sediment."),
    ("Ironclaw Crustadon", Rarity::Rare, 0.05, "A crab-beast with mineral-forged claws."),
    ("Glowfin Archerfish", Rarity::Rare, 0.05, "Fires luminous water jets with sniper accuracy."),
    ("Obsidian Fang Moray", Rarity::Rare, 0.05, "A pitch-black eel striking from tight caves."),
    ("Deepwater Jelly Harrow", Rarity::Rare, 0.05, "Its stingers throw ghostly blue sparks."),
    ("Stormback Anemone Worm", Rarity::Rare, 0.05, "A worm crackling with bioelectric anemones."),
    ("Echo Shriek Ray", Rarity::Rare, 0.05, "A ray that stuns prey with sonic bursts."),
    ("Titan Lanternjaw", Rarity::Epic, 0.0225, "A monstrous anglerfish with a molten lantern."),
    (
        "Abyssal Goreback Turtle",
        Rarity::Epic,
        0.0225,
        "A turtle plated in glowing volcanic obsidian.",
    ),
    ("Subzero Siren Eel", Rarity::Epic, 0.0225, "A frost-coated eel humming freezing melodies."),
    ("Riftshadow Krakenling", Rarity::Epic, 0.0225, "A young kraken born in oceanic rifts."),
    (
        "Abyssal Varonis Coraliath",
        Rarity::Legendary,
        0.005,
        "A titanic serpent draped in neon coral.",
    ),
    (
        "Caelorynth Voidshroud",
        Rarity::Legendary,
        0.005,
        "A half-ethereal manta slipping between dimensions.",
    ),
];

pub(super) fn creatures() -> Vec<CreatureDraft> {
    STOCK_CREATURES
        .iter()
        .map(|(name, rarity, weight, description)| CreatureDraft {
            name: (*name).to_string(),
            rarity: *rarity,
            weight: *weight,
            active: true,
            description: Some((*description).to_string()),
            image: Some(format!("images/{}.png", name.replace(' ', "_"))),
        })
        .collect()
}

pub(super) fn missions() -> Vec<MissionDraft> {
    vec![
        MissionDraft {
            name: "First Steps".to_string(),
            description: "Click 10 times".to_string(),
            target: 10,
            reward: 10,
            order: 1,
            active: true,
        },
        MissionDraft {
            name: "Getting Started".to_string(),
            description: "Click 50 times".to_string(),
            target: 50,
            reward: 25,
            order: 2,
            active: true,
        },
    ]
}
