//! The autofish patches for Terraria.
//!
//! Two patches are applied to the game:
//!
//! - [`AutoCatch`] hooks the bite check of `Projectile.AI_061_FishingBobber`: when a fish
//!   nibbles at the bobber of the local player, the catch is pulled in immediately and the
//!   bobber is removed.
//! - [`AutoRecast`] hooks the `controlUseItem` gate of `Player.ItemCheck`: while a fishing
//!   pole is held, not mid-swing and no bobber of the player is out, a click is simulated
//!   so the pole is cast again.
//!
//! Everything the fragments refer to is resolved up front into a [`Catalog`], so a game
//! build that renamed any of it fails before a single instruction is touched.
//! [`Patcher`] runs the whole pipeline against the executable on disk.
//!
//! # Examples
//!
//! ```rust,no_run
//! use autofish::{autofish::Patcher, config::PatchConfig};
//!
//! let report = Patcher::new(PatchConfig::from_env()).run()?;
//! for outcome in &report.outcomes {
//!     println!("{}: {} instructions", outcome.patch, outcome.splice.inserted);
//! }
//! # Ok::<(), autofish::Error>(())
//! ```

use std::fs;

use crate::{
    assembly::opcodes,
    backup::{Backup, BackupAction, BackupState},
    config::PatchConfig,
    metadata::signatures::TypeSignature,
    module::{FieldHandle, FieldQuery, MethodHandle, MethodQuery, TypeHandle, TypeQuery},
    patch::{apply, FragmentBuilder, Match, Patch, PatchOutcome, Pattern, PatternSet, Predicate},
    Error::InvalidConfig,
    Module, Result,
};

/// Namespace of every type the patches use
pub const GAME_NAMESPACE: &str = "Terraria";

/// `Player.ItemCheck` is the overload with more instructions than this
pub const ITEM_CHECK_MIN_INSTRUCTIONS: usize = 2000;

/// Every type, field and method the patches use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    /// `Terraria.Projectile`
    pub projectile: TypeHandle,
    /// `Terraria.Player`
    pub player: TypeHandle,
    /// `Terraria.Main`
    pub main: TypeHandle,
    /// `Terraria.Item`
    pub item: TypeHandle,
    /// `Terraria.Entity`
    pub entity: TypeHandle,

    /// `Projectile.ai`, the `Single[]` AI state
    pub projectile_ai: FieldHandle,
    /// `Projectile.owner`
    pub projectile_owner: FieldHandle,
    /// `Projectile.active`
    pub projectile_active: FieldHandle,
    /// `Projectile.bobber`
    pub projectile_bobber: FieldHandle,
    /// static `Main.player`
    pub main_player: FieldHandle,
    /// static `Main.myPlayer`
    pub main_my_player: FieldHandle,
    /// static `Main.projectile`
    pub main_projectile: FieldHandle,
    /// `Player.controlUseItem`
    pub control_use_item: FieldHandle,
    /// `Player.releaseUseItem`
    pub release_use_item: FieldHandle,
    /// `Player.itemAnimation`
    pub item_animation: FieldHandle,
    /// `Entity.whoAmI`
    pub who_am_i: FieldHandle,
    /// `Item.fishingPole`
    pub fishing_pole: FieldHandle,

    /// `Player.ItemCheck_CheckFishingBobber_ConsumeBait`
    pub consume_bait: MethodHandle,
    /// `Player.ItemCheck_CheckFishingBobber_PullBobber`
    pub pull_bobber: MethodHandle,
    /// The parameterless `Projectile.Kill`
    pub kill: MethodHandle,
    /// `Projectile.AI_061_FishingBobber`
    pub bobber_ai: MethodHandle,
    /// The large `Player.ItemCheck` overload
    pub item_check: MethodHandle,
}

impl Catalog {
    /// Resolve every symbol of the catalog.
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] or [`crate::Error::AmbiguousSymbol`] for the
    /// first symbol that cannot be resolved.
    pub fn resolve(module: &Module) -> Result<Catalog> {
        let game_type =
            |name: &str| module.find_type(&TypeQuery::named(name).in_namespace(GAME_NAMESPACE));
        let projectile = game_type("Projectile")?;
        let player = game_type("Player")?;
        let main = game_type("Main")?;
        let item = game_type("Item")?;
        let entity = game_type("Entity")?;

        let field = |owner, name| module.find_field(owner, &FieldQuery::named(name));
        let static_field =
            |owner, name| module.find_field(owner, &FieldQuery::named(name).static_only());

        let catalog = Catalog {
            projectile,
            player,
            main,
            item,
            entity,
            projectile_ai: module
                .find_field(projectile, &FieldQuery::named("ai").of_type("Single[]"))?,
            projectile_owner: field(projectile, "owner")?,
            projectile_active: field(projectile, "active")?,
            projectile_bobber: field(projectile, "bobber")?,
            main_player: static_field(main, "player")?,
            main_my_player: static_field(main, "myPlayer")?,
            main_projectile: static_field(main, "projectile")?,
            control_use_item: field(player, "controlUseItem")?,
            release_use_item: field(player, "releaseUseItem")?,
            item_animation: field(player, "itemAnimation")?,
            who_am_i: field(entity, "whoAmI")?,
            fishing_pole: field(item, "fishingPole")?,
            consume_bait: module.find_method(
                player,
                &MethodQuery::named("ItemCheck_CheckFishingBobber_ConsumeBait"),
            )?,
            pull_bobber: module.find_method(
                player,
                &MethodQuery::named("ItemCheck_CheckFishingBobber_PullBobber"),
            )?,
            kill: module.find_method(
                projectile,
                &MethodQuery::named("Kill").instance_only().with_params(0),
            )?,
            bobber_ai: module
                .find_method(projectile, &MethodQuery::named("AI_061_FishingBobber"))?,
            item_check: module.find_method(
                player,
                &MethodQuery::named("ItemCheck").with_min_instructions(ITEM_CHECK_MIN_INSTRUCTIONS),
            )?,
        };

        log::debug!("resolved all symbols");
        Ok(catalog)
    }
}

/// Catch a fish as soon as it bites.
///
/// Inserted right after the bite check `this.ai[1] >= 0f` of the bobber AI, so it runs
/// exactly when a fish nibbles:
///
/// ```text
/// player = Main.player[this.owner]
/// if (Main.myPlayer != this.owner) goto original
/// bait = 0
/// if (!player.ItemCheck_CheckFishingBobber_ConsumeBait(this, out bait)) goto original
/// player.ItemCheck_CheckFishingBobber_PullBobber(this, bait)
/// this.Kill()
/// return
/// ```
pub struct AutoCatch<'a> {
    catalog: &'a Catalog,
}

impl<'a> AutoCatch<'a> {
    /// The patch for the symbols in `catalog`
    #[must_use]
    pub fn new(catalog: &'a Catalog) -> Self {
        AutoCatch { catalog }
    }
}

impl Patch for AutoCatch<'_> {
    fn name(&self) -> &str {
        "auto-catch"
    }

    fn method(&self) -> MethodHandle {
        self.catalog.bobber_ai
    }

    fn patterns(&self) -> PatternSet {
        PatternSet::new(vec![Pattern::new(
            "nibble check",
            vec![
                Predicate::op(opcodes::LDARG_0),
                Predicate::op(opcodes::LDFLD).with_token(self.catalog.projectile_ai.token()),
                Predicate::op(opcodes::LDC_I4_1),
                Predicate::op(opcodes::LDELEM_R4),
                Predicate::op(opcodes::LDC_R4).with_f32(0.0),
                Predicate::branch(opcodes::BGE_UN),
            ],
        )
        .target(6)])
    }

    fn build(&self, b: &mut FragmentBuilder<'_>) -> Result<()> {
        let c = self.catalog;
        let bait = b.local(TypeSignature::I4, "autofishBait")?;
        let player = b.local(TypeSignature::Class(c.player.token()), "autofishPlayer")?;
        let original = b.continuation();

        b.field(opcodes::LDSFLD, c.main_player)?;
        b.op(opcodes::LDARG_0)?;
        b.field(opcodes::LDFLD, c.projectile_owner)?;
        b.op(opcodes::LDELEM_REF)?;
        b.stloc(player)?;

        // only the local player catches
        b.field(opcodes::LDSFLD, c.main_my_player)?;
        b.op(opcodes::LDARG_0)?;
        b.field(opcodes::LDFLD, c.projectile_owner)?;
        b.branch(opcodes::BNE_UN, original)?;

        b.ldc_i4(0)?;
        b.stloc(bait)?;
        b.ldloc(player)?;
        b.op(opcodes::LDARG_0)?;
        b.ldloca(bait)?;
        b.call(c.consume_bait)?;
        b.branch(opcodes::BRFALSE, original)?;

        b.ldloc(player)?;
        b.op(opcodes::LDARG_0)?;
        b.ldloc(bait)?;
        b.call(c.pull_bobber)?;

        b.op(opcodes::LDARG_0)?;
        b.call(c.kill)?;
        b.ret()?;
        Ok(())
    }
}

/// Cast again once no bobber is out.
///
/// Inserted in front of the `controlUseItem` gate of `Player.ItemCheck`:
///
/// ```text
/// if (heldItem.fishingPole <= 0) goto gate
/// if (this.itemAnimation != 0) goto gate
/// for (i = 0; i < slots; i++) {
///     p = Main.projectile[i]
///     if (p.active && p.owner == this.whoAmI && p.bobber) goto gate
/// }
/// this.controlUseItem = true
/// this.releaseUseItem = true
/// ```
pub struct AutoRecast<'a> {
    catalog: &'a Catalog,
    max_projectiles: i32,
    held_item_local: u16,
}

impl<'a> AutoRecast<'a> {
    /// The patch for the symbols in `catalog`, sized by `config`
    #[must_use]
    pub fn new(catalog: &'a Catalog, config: &PatchConfig) -> Self {
        AutoRecast {
            catalog,
            max_projectiles: config.max_projectiles,
            held_item_local: config.held_item_local,
        }
    }
}

impl Patch for AutoRecast<'_> {
    fn name(&self) -> &str {
        "auto-recast"
    }

    fn method(&self) -> MethodHandle {
        self.catalog.item_check
    }

    fn patterns(&self) -> PatternSet {
        let control = self.catalog.control_use_item.token();
        let release = self.catalog.release_use_item.token();

        PatternSet::new(vec![
            Pattern::new(
                "gate after releaseUseItem store",
                vec![
                    Predicate::op(opcodes::STFLD).with_token(release),
                    Predicate::op(opcodes::LDARG_0),
                    Predicate::op(opcodes::LDFLD).with_token(control),
                    Predicate::branch(opcodes::BRFALSE),
                ],
            )
            .target(1),
            Pattern::new(
                "controlUseItem and releaseUseItem gate",
                vec![
                    Predicate::op(opcodes::LDARG_0),
                    Predicate::op(opcodes::LDFLD).with_token(control),
                    Predicate::branch(opcodes::BRFALSE),
                    Predicate::op(opcodes::LDARG_0),
                    Predicate::op(opcodes::LDFLD).with_token(release),
                    Predicate::branch(opcodes::BRFALSE),
                ],
            ),
        ])
    }

    fn build(&self, b: &mut FragmentBuilder<'_>) -> Result<()> {
        if self.max_projectiles <= 0 {
            return Err(InvalidConfig(format!(
                "the recast scan needs at least one projectile slot, got {}",
                self.max_projectiles
            )));
        }

        let c = self.catalog;
        let index = b.local(TypeSignature::I4, "afLoopIdx")?;
        let slot = b.local(TypeSignature::Class(c.projectile.token()), "afProj")?;
        let gate = b.continuation();
        let body = b.reserve();
        let next = b.reserve();
        let check = b.reserve();

        b.ldloc_index(self.held_item_local)?;
        b.field(opcodes::LDFLD, c.fishing_pole)?;
        b.ldc_i4(0)?;
        b.branch(opcodes::BLE, gate)?;

        // mid-swing
        b.op(opcodes::LDARG_0)?;
        b.field(opcodes::LDFLD, c.item_animation)?;
        b.ldc_i4(0)?;
        b.branch(opcodes::BNE_UN, gate)?;

        b.ldc_i4(0)?;
        b.stloc(index)?;
        b.branch(opcodes::BR, check)?;

        b.bind(body)?;
        b.field(opcodes::LDSFLD, c.main_projectile)?;
        b.ldloc(index)?;
        b.op(opcodes::LDELEM_REF)?;
        b.stloc(slot)?;

        b.ldloc(slot)?;
        b.field(opcodes::LDFLD, c.projectile_active)?;
        b.branch(opcodes::BRFALSE, next)?;

        b.ldloc(slot)?;
        b.field(opcodes::LDFLD, c.projectile_owner)?;
        b.op(opcodes::LDARG_0)?;
        b.field(opcodes::LDFLD, c.who_am_i)?;
        b.branch(opcodes::BNE_UN, next)?;

        b.ldloc(slot)?;
        b.field(opcodes::LDFLD, c.projectile_bobber)?;
        b.branch(opcodes::BRFALSE, next)?;

        // a bobber is still out
        b.branch(opcodes::BR, gate)?;

        b.bind(next)?;
        b.ldloc(index)?;
        b.ldc_i4(1)?;
        b.op(opcodes::ADD)?;
        b.stloc(index)?;

        b.bind(check)?;
        b.ldloc(index)?;
        b.ldc_i4(self.max_projectiles)?;
        b.branch(opcodes::BLT, body)?;

        b.op(opcodes::LDARG_0)?;
        b.ldc_i4(1)?;
        b.field(opcodes::STFLD, c.control_use_item)?;
        b.op(opcodes::LDARG_0)?;
        b.ldc_i4(1)?;
        b.field(opcodes::STFLD, c.release_use_item)?;
        Ok(())
    }
}

/// Apply both patches to `module`.
///
/// Either both patches are applied or the error of the first failing one is returned; in
/// both cases nothing is written.
///
/// # Errors
/// Returns the first resolution, matching, building or splicing error.
pub fn patch_module(module: &mut Module, config: &PatchConfig) -> Result<Vec<PatchOutcome>> {
    config.validate()?;
    let catalog = Catalog::resolve(module)?;
    let auto_catch = AutoCatch::new(&catalog);
    let auto_recast = AutoRecast::new(&catalog, config);
    let patches: [&dyn Patch; 2] = [&auto_catch, &auto_recast];

    let mut outcomes = Vec::with_capacity(patches.len());
    for patch in patches {
        outcomes.push(apply(module, patch)?);
    }
    Ok(outcomes)
}

/// Where the patches would be applied, without applying them.
///
/// # Errors
/// Returns the first resolution or matching error.
pub fn locate(module: &mut Module, config: &PatchConfig) -> Result<Vec<(String, Match)>> {
    let catalog = Catalog::resolve(module)?;
    let auto_catch = AutoCatch::new(&catalog);
    let auto_recast = AutoRecast::new(&catalog, config);
    let patches: [&dyn Patch; 2] = [&auto_catch, &auto_recast];

    let mut found = Vec::with_capacity(patches.len());
    for patch in patches {
        let method = module.method_name(patch.method());
        let body = module.body(patch.method())?;
        found.push((method.clone(), patch.patterns().find(&body.instructions, &method)?));
    }
    Ok(found)
}

/// The result of a [`Patcher::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// What the backup bookkeeping did, `None` if it was disabled
    pub backup: Option<BackupAction>,
    /// One outcome per applied patch
    pub outcomes: Vec<PatchOutcome>,
    /// Size of the unpatched executable
    pub original_size: u64,
    /// Size of the written executable
    pub patched_size: u64,
    /// Recorded hash of the written executable, `None` if backups are disabled
    pub hash: Option<String>,
}

/// What [`Patcher::inspect`] found
#[derive(Debug)]
pub struct Inspection {
    /// Name of the module
    pub module: String,
    /// Module version id
    pub mvid: String,
    /// State of the backup files
    pub backup: BackupState,
    /// `(method, match)` of every patch, or the reason it would fail
    pub locations: Result<Vec<(String, Match)>>,
}

/// Patches the executable named by a [`PatchConfig`].
#[derive(Debug, Clone)]
pub struct Patcher {
    config: PatchConfig,
}

impl Patcher {
    /// A patcher for `config`
    #[must_use]
    pub fn new(config: PatchConfig) -> Self {
        Patcher { config }
    }

    /// The configuration
    #[must_use]
    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Back up, load, patch and write the executable, then record its hash.
    ///
    /// # Errors
    /// Returns an error if any step fails. Nothing is written unless both patches applied.
    pub fn run(&self) -> Result<PatchReport> {
        self.config.validate()?;
        let exe = self.config.exe_path();
        let backup = Backup::new(&self.config);

        let action = if self.config.backup {
            Some(backup.prepare()?)
        } else {
            None
        };

        log::info!("Loading {}", exe.display());
        let original_size = fs::metadata(&exe)?.len();
        let mut module = Module::from_file(&exe)?;

        let outcomes = patch_module(&mut module, &self.config)?;

        log::info!("Saving patched {}", exe.display());
        let patched_size = module.write(&exe)? as u64;

        let hash = if self.config.backup {
            Some(backup.record()?)
        } else {
            None
        };

        log::info!("Original: {original_size} bytes");
        log::info!("Patched:  {patched_size} bytes");

        Ok(PatchReport {
            backup: action,
            outcomes,
            original_size,
            patched_size,
            hash,
        })
    }

    /// Put the unpatched executable back from the backup.
    ///
    /// # Errors
    /// Returns an error if there is no backup or copying fails.
    pub fn restore(&self) -> Result<()> {
        Backup::new(&self.config).restore()
    }

    /// Report the executable and where the patches would go, without writing anything.
    ///
    /// # Errors
    /// Returns an error if the executable cannot be loaded or the backup files read.
    pub fn inspect(&self) -> Result<Inspection> {
        let backup = Backup::new(&self.config).state()?;
        let mut module = Module::from_file(&self.config.exe_path())?;
        let name = module.name()?.to_string();
        let mvid = module.mvid()?.to_string();

        Ok(Inspection {
            module: name,
            mvid,
            backup,
            locations: locate(&mut module, &self.config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::InstrRef,
        test::{
            interp::{EmValue, Exit, Machine},
            ImageBuilder,
        },
        Error,
    };

    fn module() -> Module {
        Module::from_mem(ImageBuilder::terraria().build()).unwrap()
    }

    #[test]
    fn catalog_resolves() {
        let module = module();
        let catalog = Catalog::resolve(&module).unwrap();

        assert!(catalog.main_player.is_static());
        assert!(!catalog.projectile_owner.is_static());
        assert_eq!(module.method_def(catalog.kill).unwrap().param_count(), 0);
        assert!(
            module.instruction_count(catalog.item_check).unwrap() > ITEM_CHECK_MIN_INSTRUCTIONS
        );
    }

    #[test]
    fn catalog_prefers_top_level_namesake() {
        let image = ImageBuilder::terraria().nested_type_named("Item").build();
        let drifted = Module::from_mem(image).unwrap();

        assert!(matches!(
            drifted.find_type(&TypeQuery::named("Item")),
            Err(Error::AmbiguousSymbol { count: 2, .. })
        ));

        let catalog = Catalog::resolve(&drifted).unwrap();
        assert!(drifted.type_def(catalog.item).unwrap().enclosing.is_none());
        assert_eq!(catalog, Catalog::resolve(&module()).unwrap());
    }

    #[test]
    fn missing_member_stops_resolution() {
        let image = ImageBuilder::terraria().without_field("Item", "fishingPole").build();
        let module = Module::from_mem(image).unwrap();

        assert!(matches!(
            Catalog::resolve(&module),
            Err(Error::SymbolNotFound { ref name, .. }) if name == "fishingPole"
        ));
    }

    #[test]
    fn auto_catch_fragment() {
        let mut module = module();
        let catalog = Catalog::resolve(&module).unwrap();
        let before = module.instruction_count(catalog.bobber_ai).unwrap();

        let outcome = apply(&mut module, &AutoCatch::new(&catalog)).unwrap();
        assert_eq!(outcome.splice.inserted, 23);
        assert_eq!(outcome.splice.locals, 2);
        assert_eq!(outcome.splice.index, ImageBuilder::NIBBLE_CHECK_AT + 6);
        assert_eq!(outcome.pattern, "nibble check");
        assert_eq!(outcome.method, "Terraria.Projectile::AI_061_FishingBobber");

        let body = module.body(catalog.bobber_ai).unwrap();
        assert_eq!(body.instructions.len(), before + 23);
        let last = body
            .instructions
            .instruction_at(outcome.splice.index + 22)
            .unwrap();
        assert_eq!(last.opcode, opcodes::RET);
    }

    #[test]
    fn auto_recast_fragment() {
        let mut module = module();
        let catalog = Catalog::resolve(&module).unwrap();
        let config = PatchConfig::new();

        let outcome = apply(&mut module, &AutoRecast::new(&catalog, &config)).unwrap();
        assert_eq!(outcome.splice.inserted, 40);
        assert_eq!(outcome.pattern, "gate after releaseUseItem store");
        assert_eq!(outcome.splice.index, ImageBuilder::GATE_AT);
        assert_eq!(
            outcome.splice.retargeted.len(),
            ImageBuilder::BRANCHES_TO_GATE
        );

        let body = module.body(catalog.item_check).unwrap();
        let entry = body.instructions.at(outcome.splice.index).unwrap();
        for position in &outcome.splice.retargeted {
            let branch = body.instructions.instruction_at(*position).unwrap();
            assert!(branch.targets().contains(&entry));
        }
    }

    #[test]
    fn recast_rejects_empty_slot_bound() {
        let mut module = module();
        let catalog = Catalog::resolve(&module).unwrap();
        let before = module.instruction_count(catalog.item_check).unwrap();

        for slots in [0, -5] {
            let config = PatchConfig::new().with_max_projectiles(slots);
            assert!(matches!(
                apply(&mut module, &AutoRecast::new(&catalog, &config)),
                Err(Error::InvalidConfig(_))
            ));
        }
        assert_eq!(module.instruction_count(catalog.item_check).unwrap(), before);
        assert_eq!(module.body(catalog.item_check).unwrap().local_count(), 2);
    }

    #[test]
    fn patch_module_checks_config_first() {
        let mut module = module();
        let config = PatchConfig::new().with_max_projectiles(0);

        assert!(matches!(
            patch_module(&mut module, &config),
            Err(Error::InvalidConfig(_))
        ));
        assert!(!module.is_modified());
    }

    #[test]
    fn fallback_gate_pattern() {
        let image = ImageBuilder::terraria().double_gate().build();
        let mut module = Module::from_mem(image).unwrap();
        let catalog = Catalog::resolve(&module).unwrap();

        let outcome =
            apply(&mut module, &AutoRecast::new(&catalog, &PatchConfig::new())).unwrap();
        assert_eq!(outcome.pattern, "controlUseItem and releaseUseItem gate");
    }

    #[test]
    fn missing_pattern_names_every_candidate() {
        let image = ImageBuilder::terraria().without_gate().build();
        let mut module = Module::from_mem(image).unwrap();

        match patch_module(&mut module, &PatchConfig::new()) {
            Err(Error::PatternNotFound { method, tried }) => {
                assert_eq!(method, "Terraria.Player::ItemCheck");
                assert_eq!(tried.len(), 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn locate_does_not_modify() {
        let mut module = module();
        let found = locate(&mut module, &PatchConfig::new()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].1.index, ImageBuilder::NIBBLE_CHECK_AT + 6);
        assert_eq!(found[1].1.index, ImageBuilder::GATE_AT);
        assert!(!module.is_modified());
    }

    /// Run the recast fragment for a player whose projectile table holds `slots`
    /// `(active, owner, bobber)`, stopping at the gate
    fn run_recast(slots: &[(bool, i32, bool)]) -> (Exit, Machine, EmValue, Catalog) {
        let mut module = module();
        let catalog = Catalog::resolve(&module).unwrap();
        let config = PatchConfig::new().with_max_projectiles(5);
        let outcome = apply(&mut module, &AutoRecast::new(&catalog, &config)).unwrap();

        let body = module.body(catalog.item_check).unwrap();
        let entry = body.instructions.at(outcome.splice.index).unwrap();
        let gate = body
            .instructions
            .at(outcome.splice.index + outcome.splice.inserted)
            .unwrap();

        let mut machine = Machine::new();
        let this = machine.alloc();
        machine.set_field(this, catalog.who_am_i.token(), EmValue::I32(0));
        machine.set_field(this, catalog.item_animation.token(), EmValue::I32(0));

        let pole = machine.alloc();
        machine.set_field(pole, catalog.fishing_pole.token(), EmValue::I32(10));

        let mut projectiles = Vec::new();
        for (active, owner, bobber) in slots {
            let projectile = machine.alloc();
            machine.set_field(projectile, catalog.projectile_active.token(), EmValue::from(*active));
            machine.set_field(projectile, catalog.projectile_owner.token(), EmValue::I32(*owner));
            machine.set_field(projectile, catalog.projectile_bobber.token(), EmValue::from(*bobber));
            projectiles.push(projectile);
        }
        let table = machine.alloc_array(projectiles);
        machine.set_static(catalog.main_projectile.token(), table);

        let mut locals = vec![EmValue::Null; body.local_count() as usize];
        locals[usize::from(config.held_item_local)] = pole;
        let exit = machine
            .run(&body.instructions, entry, &[gate], this, locals)
            .unwrap();
        (exit, machine, this, catalog)
    }

    #[test]
    fn recast_stops_at_the_first_bobber() {
        let slots = [
            (false, 0, true),
            (true, 1, true),
            (true, 0, false),
            (true, 0, true),
            (true, 2, true),
        ];
        let (exit, machine, this, catalog) = run_recast(&slots);

        assert!(matches!(exit, Exit::Reached(_)));
        assert_eq!(machine.element_loads(), 4);
        assert_eq!(
            machine.field(&this, catalog.control_use_item.token()),
            EmValue::I32(0)
        );
    }

    #[test]
    fn recast_clicks_without_bobber() {
        let slots = [
            (false, 0, true),
            (true, 1, true),
            (true, 0, false),
            (false, 0, false),
            (false, 0, false),
        ];
        let (exit, machine, this, catalog) = run_recast(&slots);

        assert!(matches!(exit, Exit::Reached(_)));
        assert_eq!(machine.element_loads(), 5);
        assert_eq!(
            machine.field(&this, catalog.control_use_item.token()),
            EmValue::I32(1)
        );
        assert_eq!(
            machine.field(&this, catalog.release_use_item.token()),
            EmValue::I32(1)
        );
    }

    fn run_catch(my_player: i32, bait_available: bool) -> (Exit, Machine, Catalog, InstrRef) {
        let mut module = module();
        let catalog = Catalog::resolve(&module).unwrap();
        let outcome = apply(&mut module, &AutoCatch::new(&catalog)).unwrap();

        let body = module.body(catalog.bobber_ai).unwrap();
        let entry = body.instructions.at(outcome.splice.index).unwrap();
        let original = body
            .instructions
            .at(outcome.splice.index + outcome.splice.inserted)
            .unwrap();

        let mut machine = Machine::new();
        let this = machine.alloc();
        machine.set_field(this, catalog.projectile_owner.token(), EmValue::I32(0));
        let player = machine.alloc();
        let players = machine.alloc_array(vec![player]);
        machine.set_static(catalog.main_player.token(), players);
        machine.set_static(catalog.main_my_player.token(), EmValue::I32(my_player));

        machine.on_call(catalog.consume_bait, move |args, locals| {
            if let EmValue::LocalAddr(index) = args[2] {
                locals[usize::from(index)] = EmValue::I32(2002);
            }
            Some(EmValue::from(bait_available))
        });
        machine.on_call(catalog.pull_bobber, |_, _| None);
        machine.on_call(catalog.kill, |_, _| None);

        let locals = vec![EmValue::Null; body.local_count() as usize];
        let exit = machine
            .run(&body.instructions, entry, &[original], this, locals)
            .unwrap();
        (exit, machine, catalog, original)
    }

    #[test]
    fn catch_pulls_and_kills() {
        let (exit, machine, catalog, _) = run_catch(0, true);

        assert_eq!(exit, Exit::Returned);
        let calls: Vec<_> = machine.calls().iter().map(|(token, _)| *token).collect();
        assert_eq!(
            calls,
            vec![
                catalog.consume_bait.token(),
                catalog.pull_bobber.token(),
                catalog.kill.token()
            ]
        );
        assert_eq!(machine.calls()[1].1[2], EmValue::I32(2002));
    }

    #[test]
    fn catch_leaves_other_players_alone() {
        let (exit, machine, _, original) = run_catch(1, true);
        assert_eq!(exit, Exit::Reached(original));
        assert!(machine.calls().is_empty());
    }

    #[test]
    fn catch_without_bait_resumes() {
        let (exit, machine, catalog, original) = run_catch(0, false);
        assert_eq!(exit, Exit::Reached(original));
        assert_eq!(machine.calls().len(), 1);
        assert_eq!(machine.calls()[0].0, catalog.consume_bait.token());
    }

    #[test]
    fn patcher_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = PatchConfig::new().with_game_dir(dir.path());
        let image = ImageBuilder::terraria().build();
        fs::write(config.exe_path(), &image).unwrap();

        let patcher = Patcher::new(config.clone());
        let first = patcher.run().unwrap();
        assert_eq!(first.backup, Some(BackupAction::Created));
        assert_eq!(first.outcomes.len(), 2);
        assert_eq!(first.original_size, image.len() as u64);
        assert!(first.patched_size > first.original_size);
        assert_eq!(fs::read(config.backup_path()).unwrap(), image);
        let patched = fs::read(config.exe_path()).unwrap();

        let second = patcher.run().unwrap();
        assert_eq!(second.backup, Some(BackupAction::RestoredOriginal));
        assert_eq!(second.hash, first.hash);
        assert_eq!(fs::read(config.exe_path()).unwrap(), patched);

        patcher.restore().unwrap();
        assert_eq!(fs::read(config.exe_path()).unwrap(), image);
        assert!(!config.hash_path().exists());
    }

    #[test]
    fn failed_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PatchConfig::new()
            .with_game_dir(dir.path())
            .with_backup(false);
        let image = ImageBuilder::terraria().without_gate().build();
        fs::write(config.exe_path(), &image).unwrap();

        assert!(Patcher::new(config.clone()).run().is_err());
        assert_eq!(fs::read(config.exe_path()).unwrap(), image);
        assert!(!config.backup_path().exists());
    }

    #[test]
    fn bad_slot_bound_touches_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PatchConfig::new()
            .with_game_dir(dir.path())
            .with_max_projectiles(0);
        let image = ImageBuilder::terraria().build();
        fs::write(config.exe_path(), &image).unwrap();

        assert!(matches!(
            Patcher::new(config.clone()).run(),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(fs::read(config.exe_path()).unwrap(), image);
        assert!(!config.backup_path().exists());
        assert!(!config.hash_path().exists());
    }

    #[test]
    fn inspect_reports_locations() {
        let dir = tempfile::tempdir().unwrap();
        let config = PatchConfig::new().with_game_dir(dir.path());
        fs::write(config.exe_path(), ImageBuilder::terraria().build()).unwrap();

        let inspection = Patcher::new(config).inspect().unwrap();
        assert_eq!(inspection.module, "Terraria.exe");
        assert_eq!(inspection.backup, BackupState::Missing);
        assert_eq!(inspection.locations.unwrap().len(), 2);
    }
}
