//! End-to-end runs of the patch pipeline against synthetic game images.

mod common;

use autofish::{
    assembly::opcodes,
    autofish::{Catalog, Patcher},
    backup::{BackupAction, BackupState},
    metadata::tables::TableId,
    module::MethodHandle,
    Error, Module,
};
use common::{Game, ImageBuilder};

fn instructions(module: &mut Module, method: MethodHandle) -> Vec<String> {
    module
        .body(method)
        .unwrap()
        .instructions
        .iter()
        .map(|(_, instruction)| instruction.to_string())
        .collect()
}

#[test]
fn patched_image_reloads_with_both_fragments() {
    let image = ImageBuilder::terraria().build();
    let game = Game::with_image(&image);

    let report = Patcher::new(game.config.clone()).run().unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].patch, "auto-catch");
    assert_eq!(report.outcomes[1].patch, "auto-recast");

    let mut original = Module::from_mem(image).unwrap();
    let mut patched = Module::from_mem(game.exe()).unwrap();
    let catalog = Catalog::resolve(&patched).unwrap();
    assert_eq!(catalog, Catalog::resolve(&original).unwrap());

    let ai_before = original.instruction_count(catalog.bobber_ai).unwrap();
    let ai_after = patched.instruction_count(catalog.bobber_ai).unwrap();
    assert_eq!(ai_after, ai_before + 23);

    let check_before = original.instruction_count(catalog.item_check).unwrap();
    let check_after = patched.instruction_count(catalog.item_check).unwrap();
    assert_eq!(check_after, check_before + 40);

    let ai = patched.body(catalog.bobber_ai).unwrap();
    assert_eq!(ai.local_count(), 4);
    let entry = ai
        .instructions
        .instruction_at(ImageBuilder::NIBBLE_CHECK_AT + 6)
        .unwrap();
    assert_eq!(entry.opcode, opcodes::LDSFLD);
    assert_eq!(entry.token(), Some(catalog.main_player.token()));

    let check = patched.body(catalog.item_check).unwrap();
    let entry = check.instructions.instruction_at(ImageBuilder::GATE_AT).unwrap();
    assert_eq!(entry.local_index(), Some(1));
    let gate = check
        .instructions
        .instruction_at(ImageBuilder::GATE_AT + 40)
        .unwrap();
    assert_eq!(gate.opcode, opcodes::LDARG_0);
}

#[test]
fn untouched_methods_and_tables_survive() {
    let image = ImageBuilder::terraria().build();
    let game = Game::with_image(&image);
    Patcher::new(game.config.clone()).run().unwrap();

    let mut original = Module::from_mem(image).unwrap();
    let mut patched = Module::from_mem(game.exe()).unwrap();
    let catalog = Catalog::resolve(&original).unwrap();

    for method in [catalog.pull_bobber, catalog.consume_bait, catalog.kill] {
        assert_eq!(
            instructions(&mut original, method),
            instructions(&mut patched, method)
        );
    }

    for table in [
        TableId::Module,
        TableId::TypeDef,
        TableId::Field,
        TableId::MethodDef,
        TableId::NestedClass,
    ] {
        assert_eq!(
            original.tables().row_count(table),
            patched.tables().row_count(table),
            "{table:?}"
        );
    }
    // one new local signature per patched method
    assert_eq!(
        patched.tables().row_count(TableId::StandAloneSig),
        original.tables().row_count(TableId::StandAloneSig) + 2
    );
    assert_eq!(patched.mvid().unwrap(), ImageBuilder::MVID);
    assert_eq!(patched.name().unwrap(), "Terraria.exe");
}

#[test]
fn repeated_runs_patch_the_original() {
    let image = ImageBuilder::terraria().build();
    let game = Game::with_image(&image);
    let patcher = Patcher::new(game.config.clone());

    let first = patcher.run().unwrap();
    let patched = game.exe();
    assert_eq!(patcher.inspect().unwrap().backup, BackupState::Patched);

    let second = patcher.run().unwrap();
    assert_eq!(second.backup, Some(BackupAction::RestoredOriginal));
    assert_eq!(game.exe(), patched);
    assert_eq!(game.backup(), image);
    assert_eq!(first.hash, second.hash);
}

#[test]
fn game_update_replaces_the_backup() {
    let game = Game::with_image(&ImageBuilder::terraria().build());
    let patcher = Patcher::new(game.config.clone());
    patcher.run().unwrap();

    let update = ImageBuilder::terraria().double_gate().build();
    game.replace_exe(&update);
    assert_eq!(patcher.inspect().unwrap().backup, BackupState::Updated);

    let report = patcher.run().unwrap();
    assert_eq!(report.backup, Some(BackupAction::ReplacedAfterUpdate));
    assert_eq!(report.outcomes[1].pattern, "controlUseItem and releaseUseItem gate");
    assert_eq!(game.backup(), update);
}

#[test]
fn renamed_gate_fails_without_writing() {
    let image = ImageBuilder::terraria().without_gate().build();
    let game = Game::with_image(&image);
    let patcher = Patcher::new(game.config.clone());

    let inspection = patcher.inspect().unwrap();
    assert!(matches!(
        inspection.locations,
        Err(Error::PatternNotFound { .. })
    ));

    assert!(matches!(
        patcher.run(),
        Err(Error::PatternNotFound { .. })
    ));
    assert_eq!(game.exe(), image);
    assert!(!game.config.hash_path().exists());
    assert!(game.path().join("Terraria.exe.bak").exists());
}

#[test]
fn restore_puts_the_original_back() {
    let image = ImageBuilder::terraria().build();
    let game = Game::with_image(&image);
    let patcher = Patcher::new(game.config.clone());

    patcher.run().unwrap();
    assert_ne!(game.exe(), image);

    patcher.restore().unwrap();
    assert_eq!(game.exe(), image);
    assert_eq!(patcher.inspect().unwrap().backup, BackupState::Unverified);
}
