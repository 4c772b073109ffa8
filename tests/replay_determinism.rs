// Seeded servers draw identically, and the journal is enough to audit every pull
use std::env;
use std::fs;

use sea_life_gacha::catalog::{CreatureDraft, Rarity};
use sea_life_gacha::config::GameConfig;
use sea_life_gacha::gacha::PullType;
use sea_life_gacha::game_state::GameState;
use sea_life_gacha::journal::audit::audit_pulls;
use sea_life_gacha::journal::ActionLog;

fn run(seed: u64) -> Vec<u32> {
    let state = GameState::new(GameConfig {
        seed: Some(seed),
        ..GameConfig::default()
    });
    state.register_player(1, Some(500)).unwrap();
    let mut drawn = Vec::new();
    for pull_type in [PullType::Multi, PullType::Single, PullType::Multi] {
        let report = state.perform_draw(1, pull_type).unwrap();
        drawn.extend(report.outcomes.iter().map(|o| o.creature_id));
    }
    drawn
}

#[test]
fn same_seed_same_creatures() {
    assert_eq!(run(2024), run(2024));
    assert_eq!(run(2024).len(), 21);
}

#[test]
fn reseeding_restarts_the_sequence() {
    let state = GameState::new(GameConfig::default());
    state.register_player(1, Some(1_000)).unwrap();
    state.set_seed(5);
    let first = state.perform_draw(1, PullType::Multi).unwrap();
    state.set_seed(5);
    let second = state.perform_draw(1, PullType::Multi).unwrap();
    let ids = |outcomes: &[sea_life_gacha::gacha::DrawOutcome]| -> Vec<u32> {
        outcomes.iter().map(|o| o.creature_id).collect()
    };
    // pity carries over between the two batches, so only compare the natural prefix
    let natural = first.outcomes.iter().take_while(|o| !o.pity).count().min(
        second.outcomes.iter().take_while(|o| !o.pity).count(),
    );
    assert_eq!(ids(&first.outcomes)[..natural], ids(&second.outcomes)[..natural]);
}

#[test]
fn journal_file_audits_clean_after_reload() {
    let mut path = env::temp_dir();
    path.push(format!("sea_life_gacha_audit_{}.jsonl", std::process::id()));
    let path_str = path.to_string_lossy().to_string();
    let _ = fs::remove_file(&path);

    let config = GameConfig {
        seed: Some(77),
        journal_path: Some(path_str.clone()),
        ..GameConfig::default()
    };
    let state = GameState::new(config.clone());
    state.register_player(1, Some(300)).unwrap();
    for _ in 0..4 {
        state.perform_draw(1, PullType::Multi).unwrap();
    }
    state.shutdown();

    let loaded = ActionLog::load_from_file(&path_str).expect("load journal");
    assert_eq!(loaded.entries(), state.action_log().entries());
    let report = audit_pulls(&loaded.entries(), &state.catalog(), &config.pity);
    assert_eq!(report.pulls_checked, 4);
    assert!(report.is_clean(), "{:?}", report.mismatches);

    let _ = fs::remove_file(&path);
}

#[test]
fn audit_flags_pulls_the_catalog_can_no_longer_reproduce() {
    let state = GameState::new(GameConfig {
        seed: Some(8),
        ..GameConfig::default()
    });
    state.register_player(1, Some(500)).unwrap();
    for _ in 0..3 {
        state.perform_draw(1, PullType::Multi).unwrap();
    }
    // a huge common in front of the walk changes almost every weighted draw
    for id in 1..=20 {
        state.remove_creature(id).unwrap();
    }
    state
        .add_creature(CreatureDraft {
            name: "Plankton".to_string(),
            rarity: Rarity::Common,
            weight: 1.0,
            active: true,
            description: None,
            image: None,
        })
        .unwrap();
    let report = state.audit();
    assert_eq!(report.pulls_checked, 3);
    assert_eq!(report.mismatches.len(), 3);
}
