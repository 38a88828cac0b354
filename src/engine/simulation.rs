use bevy::math::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info, warn};

use crate::combat::effects::{apply_hit_effects, HitReport};
use crate::combat::health::{DamageOutcome, Death, DeathListener, HealthState};
use crate::constants::{
    DEFAULT_START_WAVE, KEY_ACTIVE_MODEL, KEY_CURRENT_WAVE, KEY_PLAYER_MONEY,
};
use crate::engine::config::{ConfigError, SimConfig};
use crate::engine::events::{DeathCause, SimEvent};
use crate::enemy::{EnemyHandle, EnemyInstance};
use crate::persistence::{global_stat_key, model_stat_key, SaveStore};
use crate::pool::{EntityPool, Factory};
use crate::projectile::{
    find_collision, ActiveProjectile, FlightStatus, ProjectileHandle, ProjectileTemplate,
};
use crate::resources::{ManaPool, PlayerResources, ResourceProvider, Wallet};
use crate::shooter::{fire, FireRequest};
use crate::skills::{
    Activation, ActivationRefusal, CasterProvider, CasterRef, SkillEffect, SkillEffectExecutor,
    SkillManager,
};
use crate::spawner::Spawner;
use crate::targeting::{Candidate, LayerMask};
use crate::tower::{stats, Tower, TowerRuntimeStats, UpgradeLevels, UpgradeStat};
use crate::waves::{WaveScheduler, WaveSignal};

/// The single active tower's caster id.
const TOWER_CASTER: CasterRef = CasterRef(0);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpgradeRefusal {
    #[error("{stat:?} is already at max level {level}")]
    MaxLevel { stat: UpgradeStat, level: u32 },
    #[error("upgrade costs {cost}, balance is {balance}")]
    InsufficientFunds { cost: i32, balance: i32 },
    #[error("no tower model at index {0}")]
    InvalidModel(usize),
}

/// Simulation root. Owns every service and advances them in a fixed order.
pub struct Simulation {
    config: SimConfig,
    clock: f64,
    rng: Xoshiro256PlusPlus,
    store: Box<dyn SaveStore>,

    enemies: EntityPool<EnemyInstance>,
    projectiles: EntityPool<ActiveProjectile>,
    spawner: Spawner,
    waves: WaveScheduler,

    tower: Tower,
    base: HealthState,
    resources: PlayerResources,
    skills: SkillManager,
    global_levels: UpgradeLevels,
    model_levels: Vec<UpgradeLevels>,

    events: Vec<SimEvent>,
    game_over: bool,
}

impl Simulation {
    pub fn new(config: SimConfig, store: Box<dyn SaveStore>) -> Result<Self, ConfigError> {
        config.validate()?;

        let global_levels =
            UpgradeLevels::load(store.as_ref(), |stat| global_stat_key(stat.key_name()));
        let model_levels: Vec<UpgradeLevels> = config
            .tower_models
            .iter()
            .map(|model| {
                UpgradeLevels::load(store.as_ref(), |stat| {
                    model_stat_key(&model.id, stat.key_name())
                })
            })
            .collect();

        let stored_model = store.load_int(KEY_ACTIVE_MODEL, 0);
        let model_index = usize::try_from(stored_model)
            .ok()
            .filter(|&i| i < config.tower_models.len())
            .unwrap_or(0);
        let model = &config.tower_models[model_index];
        let runtime = stats::compute(
            model,
            &global_levels,
            &model_levels[model_index],
            &config.global_increments,
        );

        let money = store.load_int(KEY_PLAYER_MONEY, config.starting_money);
        let resources = PlayerResources::new(
            ManaPool::new(runtime.max_mana, runtime.mana_regen),
            Wallet::new(money),
        );

        let mut enemies = EntityPool::new();
        Spawner::register_pools(&mut enemies, &config.enemy_types);
        let mut projectiles = EntityPool::new();
        register_projectile_pools(&mut projectiles, &config.projectiles);

        let mut base = HealthState::new(config.base_health);
        base.subscribe_death(DeathListener::GameOver);

        let spawner = Spawner::new(
            config.spawn_points.iter().map(|&p| p.into()).collect(),
            config.base_position.into(),
            config.base_reach_distance,
        );
        let waves = WaveScheduler::new(config.wave_curve.clone(), &config.enemy_types);
        let tower = Tower::new(config.tower_position.into(), model_index, model, runtime);

        let mut sim = Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            clock: 0.0,
            enemies,
            projectiles,
            spawner,
            waves,
            tower,
            base,
            resources,
            skills: SkillManager::new(config.skills.clone()),
            global_levels,
            model_levels,
            events: Vec::new(),
            game_over: false,
            store,
            config,
        };

        info!(
            model = %sim.config.tower_models[model_index].id,
            money,
            "simulation ready"
        );
        if sim.config.auto_start {
            sim.start_waves();
        }
        Ok(sim)
    }

    // =====================================================
    // Tick
    // =====================================================

    pub fn tick(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        self.clock += dt as f64;
        self.resources.mana.regenerate(dt);
        self.tower.tick_buffs(dt);

        self.tick_waves(dt);
        self.tick_status(dt);
        self.tick_enemy_movement(dt);
        self.tick_projectiles(dt);
        self.tick_tower();
        self.flush();
    }

    fn tick_waves(&mut self, dt: f32) {
        let signals = self.waves.tick(dt, self.store.as_mut(), &mut self.rng);
        for signal in signals {
            match signal {
                WaveSignal::Started { wave, enemy_count } => {
                    self.events.push(SimEvent::WaveStarted { wave, enemy_count });
                }
                WaveSignal::Spawn { enemy_type } => {
                    match self.spawner.spawn(
                        &mut self.enemies,
                        &self.config.enemy_types,
                        enemy_type,
                        &mut self.rng,
                    ) {
                        Ok(enemy) => {
                            self.waves.confirm_spawn();
                            self.events.push(SimEvent::EnemySpawned { enemy, enemy_type });
                            self.events.push(SimEvent::EnemyCountChanged {
                                alive: self.waves.enemies_alive(),
                            });
                        }
                        Err(err) => warn!(enemy_type, %err, "spawn skipped"),
                    }
                }
                WaveSignal::Completed { wave } => {
                    self.events.push(SimEvent::WaveCompleted { wave });
                }
            }
        }
    }

    fn tick_status(&mut self, dt: f32) {
        for handle in self.enemies.active_handles() {
            let death = {
                let Some(enemy) = self.enemies.get_mut(handle) else {
                    continue;
                };
                let status = enemy.status.tick(dt);
                if status.burn_damage > 0 {
                    enemy.health.take_damage(status.burn_damage).into_death()
                } else {
                    None
                }
            };
            if let Some(death) = death {
                self.resolve_enemy_death(handle, death, DeathCause::Killed);
            }
        }
    }

    fn tick_enemy_movement(&mut self, dt: f32) {
        let base_position: Vec2 = self.config.base_position.into();
        for handle in self.enemies.active_handles() {
            let arrived = {
                let Some(enemy) = self.enemies.get_mut(handle) else {
                    continue;
                };
                let contact_damage = enemy.contact_damage;
                let EnemyInstance {
                    mover,
                    position,
                    status,
                    ..
                } = enemy;
                let step = mover.tick(dt, position, Some(base_position), status);
                step.reached.then_some(contact_damage)
            };

            if let Some(contact_damage) = arrived {
                self.damage_base(contact_damage);
                let death = self
                    .enemies
                    .get_mut(handle)
                    .and_then(|enemy| enemy.health.kill());
                match death {
                    Some(death) => self.resolve_enemy_death(handle, death, DeathCause::ReachedBase),
                    None => self.release_enemy(handle),
                }
            }
        }
    }

    fn tick_projectiles(&mut self, dt: f32) {
        // every projectile moves before any hit is resolved
        let mut swept = Vec::new();
        for handle in self.projectiles.active_handles() {
            let Some(target) = self.projectiles.get(handle).map(|p| p.target) else {
                continue;
            };
            let target_position = target
                .and_then(|t| self.enemies.get(t))
                .filter(|enemy| enemy.is_alive())
                .map(|enemy| enemy.position);

            let Some(projectile) = self.projectiles.get_mut(handle) else {
                continue;
            };
            let from = projectile.position;
            let flight = projectile.advance(dt, target_position);
            swept.push((handle, from, projectile.position, flight));
        }

        for (handle, from, to, flight) in swept {
            let Some((radius, layers)) = self
                .projectiles
                .get(handle)
                .map(|p| (p.radius, p.target_layers))
            else {
                continue;
            };

            let struck = find_collision(from, to, radius, layers, self.enemies.iter_active());
            if let Some(enemy_handle) = struck {
                self.resolve_projectile_hit(handle, enemy_handle);
                continue;
            }

            match flight {
                FlightStatus::Flying => {}
                FlightStatus::Expired => {
                    self.release_projectile(handle);
                    self.events
                        .push(SimEvent::ProjectileExpired { projectile: handle });
                }
                FlightStatus::Arrived => {
                    self.release_projectile(handle);
                    self.events
                        .push(SimEvent::ProjectileMissed { projectile: handle });
                }
            }
        }
    }

    fn resolve_projectile_hit(&mut self, handle: ProjectileHandle, enemy_handle: EnemyHandle) {
        let Some(projectile) = self.projectiles.get_mut(handle) else {
            return;
        };
        if !projectile.register_hit() {
            return;
        }
        let multiplier = projectile.damage_multiplier;
        let template = projectile
            .template_index()
            .and_then(|i| self.config.projectiles.get(i));

        let report = match (template, self.enemies.get_mut(enemy_handle)) {
            (Some(template), Some(enemy)) => {
                apply_hit_effects(&template.effects, enemy, multiplier, &mut self.rng)
            }
            _ => HitReport::default(),
        };

        self.events.push(SimEvent::ProjectileHit {
            projectile: handle,
            enemy: enemy_handle,
            damage: report.damage_dealt,
        });
        if let Some(death) = report.death {
            self.resolve_enemy_death(enemy_handle, death, DeathCause::Killed);
        }
        self.release_projectile(handle);
    }

    fn tick_tower(&mut self) {
        let candidates = self
            .enemies
            .iter_active()
            .map(|(handle, enemy)| Candidate::from_enemy(handle, enemy));
        self.tower.target = self.tower.finder.find_best(
            self.tower.position,
            self.tower.stats.range,
            LayerMask::ENEMY,
            candidates,
        );

        let Some(target) = self.tower.target else {
            return;
        };
        if !self.tower.can_attack(self.clock) {
            return;
        }
        let Some(target_position) = self.enemies.get(target).map(|e| e.position) else {
            return;
        };

        let model = &self.config.tower_models[self.tower.model_index];
        if let Some(cost) = &model.attack_cost {
            if !self.resources.spend_resource(&cost.resource, cost.amount) {
                return;
            }
        }

        let projectile_index = self
            .tower
            .projectile_override()
            .and_then(|id| self.config.projectile_index(id))
            .or_else(|| self.config.projectile_index(&model.projectile_id));
        let Some(projectile_index) = projectile_index else {
            warn!(model = %model.id, "tower has no usable projectile");
            return;
        };
        let template: &ProjectileTemplate = &self.config.projectiles[projectile_index];

        let request = FireRequest {
            template_index: projectile_index,
            template,
            fire_point: self.tower.position,
            target: Some(target),
            target_position,
            damage_multiplier: self.tower.stats.projectile_multiplier(),
        };
        match fire(&mut self.projectiles, self.tower.shot_pattern(), &request) {
            Ok(fired) => {
                self.tower.mark_attack(self.clock);
                self.events.push(SimEvent::ProjectileFired {
                    projectile_id: template.id.clone(),
                    count: fired.len(),
                });
            }
            Err(err) => warn!(projectile = %template.id, %err, "attack skipped"),
        }
    }

    fn flush(&mut self) {
        if self.resources.wallet.take_dirty() {
            let balance = self.resources.wallet.balance();
            self.store.save_int(KEY_PLAYER_MONEY, balance);
            self.events.push(SimEvent::MoneyChanged { balance });
        }
    }

    // =====================================================
    // Deaths and releases
    // =====================================================

    fn damage_base(&mut self, amount: i32) {
        let outcome = self.base.take_damage(amount);
        if matches!(outcome, DamageOutcome::Rejected | DamageOutcome::AlreadyDead) {
            return;
        }
        self.events.push(SimEvent::BaseDamaged {
            amount,
            remaining: self.base.current(),
        });
        if let Some(death) = outcome.into_death() {
            if death.listeners.contains(&DeathListener::GameOver) {
                self.trigger_game_over();
            }
        }
    }

    fn trigger_game_over(&mut self) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        self.waves.stop();
        let wave = self.waves.current_wave();
        warn!(wave, "base destroyed, game over");
        self.events.push(SimEvent::GameOver { wave });
    }

    /// Run the death's listeners, credit the reward, then release. The
    /// enemy is still active while its death is processed.
    fn resolve_enemy_death(&mut self, handle: EnemyHandle, death: Death, cause: DeathCause) {
        let reward = match cause {
            DeathCause::Killed => self.enemies.get(handle).map_or(0, |e| e.reward),
            DeathCause::ReachedBase => 0,
        };
        self.resources.wallet.add(reward);

        for listener in &death.listeners {
            match listener {
                DeathListener::WaveReport => self.waves.report_enemy_death(),
                DeathListener::GameOver => self.trigger_game_over(),
            }
        }

        debug!(?handle, ?cause, reward, "enemy died");
        self.events.push(SimEvent::EnemyDied {
            enemy: handle,
            cause,
            reward,
        });
        self.events.push(SimEvent::EnemyCountChanged {
            alive: self.waves.enemies_alive(),
        });
        self.release_enemy(handle);
    }

    fn release_enemy(&mut self, handle: EnemyHandle) {
        if self.tower.target == Some(handle) {
            self.tower.target = None;
        }
        if let Err(err) = self.enemies.release_handle(handle) {
            warn!(?handle, %err, "enemy release ignored");
        }
    }

    fn release_projectile(&mut self, handle: ProjectileHandle) {
        if let Err(err) = self.projectiles.release_handle(handle) {
            warn!(?handle, %err, "projectile release ignored");
        }
    }

    // =====================================================
    // Player actions
    // =====================================================

    pub fn start_waves(&mut self) -> bool {
        let wave = self.store.load_int(KEY_CURRENT_WAVE, DEFAULT_START_WAVE).max(1) as u32;
        self.waves.start(wave)
    }

    pub fn stop_waves(&mut self) {
        self.waves.stop();
    }

    pub fn activate_skill(&mut self, skill_id: &str) -> Result<Activation, ActivationRefusal> {
        let mut context = SkillContext {
            tower: &mut self.tower,
            enemies: &mut self.enemies,
            config: &self.config,
            rng: &mut self.rng,
            deaths: Vec::new(),
        };
        let result =
            self.skills
                .attempt_activate(skill_id, self.clock, &mut self.resources, &mut context);
        let deaths = context.deaths;

        for (handle, death) in deaths {
            self.resolve_enemy_death(handle, death, DeathCause::Killed);
        }

        match &result {
            Ok(_) => self.events.push(SimEvent::SkillActivated {
                skill_id: skill_id.to_string(),
            }),
            Err(reason) => {
                info!(skill = skill_id, %reason, "skill refused");
                self.events.push(SimEvent::SkillRefused {
                    skill_id: skill_id.to_string(),
                    reason: reason.clone(),
                });
            }
        }
        result
    }

    pub fn upgrade_global(&mut self, stat: UpgradeStat) -> Result<u32, UpgradeRefusal> {
        let level = self.global_levels.get(stat);
        let costs = self.config.global_upgrades;
        if level >= costs.max_level {
            return Err(UpgradeRefusal::MaxLevel { stat, level });
        }
        self.charge(costs.cost(level))?;

        let next = level + 1;
        self.global_levels.set(stat, next);
        self.store
            .save_int(&global_stat_key(stat.key_name()), next as i32);
        info!(stat = stat.key_name(), level = next, "global upgrade");
        self.recompute_stats(false);
        self.flush();
        Ok(next)
    }

    pub fn upgrade_model(&mut self, stat: UpgradeStat) -> Result<u32, UpgradeRefusal> {
        let index = self.tower.model_index;
        let model = self
            .config
            .tower_models
            .get(index)
            .ok_or(UpgradeRefusal::InvalidModel(index))?;
        let level = self.model_levels[index].get(stat);
        if model.is_max_level(level) {
            return Err(UpgradeRefusal::MaxLevel { stat, level });
        }
        let cost = model.upgrade_cost(level);
        let key = model_stat_key(&model.id, stat.key_name());
        self.charge(cost)?;

        let next = level + 1;
        self.model_levels[index].set(stat, next);
        self.store.save_int(&key, next as i32);
        info!(stat = stat.key_name(), level = next, "model upgrade");
        self.recompute_stats(false);
        self.flush();
        Ok(next)
    }

    pub fn switch_model(&mut self, index: usize) -> Result<(), UpgradeRefusal> {
        let model = self
            .config
            .tower_models
            .get(index)
            .ok_or(UpgradeRefusal::InvalidModel(index))?;
        let runtime = self.compute_stats(index);
        self.tower.set_model(index, model, runtime);
        self.store.save_int(KEY_ACTIVE_MODEL, index as i32);
        info!(model = %model.id, "tower model switched");
        self.recompute_stats(true);
        Ok(())
    }

    /// Clear the board and replay the persisted wave with a full base.
    pub fn retry_wave(&mut self) {
        self.waves.stop();
        let enemies = self.enemies.reset_all();
        let projectiles = self.projectiles.reset_all();
        self.waves.sync_alive(0);
        self.base.reset();
        self.base.subscribe_death(DeathListener::GameOver);
        self.tower.reset_combat_state();
        self.game_over = false;
        info!(enemies, projectiles, "board cleared for retry");
        self.start_waves();
    }

    fn charge(&mut self, cost: i32) -> Result<(), UpgradeRefusal> {
        if self.resources.wallet.spend(cost) {
            Ok(())
        } else {
            Err(UpgradeRefusal::InsufficientFunds {
                cost,
                balance: self.resources.wallet.balance(),
            })
        }
    }

    fn compute_stats(&self, model_index: usize) -> TowerRuntimeStats {
        stats::compute(
            &self.config.tower_models[model_index],
            &self.global_levels,
            &self.model_levels[model_index],
            &self.config.global_increments,
        )
    }

    /// Overwrite the tower's stats wholesale and resize the mana pool.
    fn recompute_stats(&mut self, refill: bool) {
        let runtime = self.compute_stats(self.tower.model_index);
        let previous_max = self.resources.mana.max();
        self.tower.stats = runtime;
        self.resources
            .mana
            .set_limits(runtime.max_mana, runtime.mana_regen);
        if refill || runtime.max_mana > previous_max {
            self.resources.mana.refill();
        }
        self.events.push(SimEvent::StatsChanged { stats: runtime });
    }

    // =====================================================
    // Queries
    // =====================================================

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn current_wave(&self) -> u32 {
        self.waves.current_wave()
    }

    pub fn waves(&self) -> &WaveScheduler {
        &self.waves
    }

    pub fn enemies(&self) -> &EntityPool<EnemyInstance> {
        &self.enemies
    }

    pub fn enemies_mut(&mut self) -> &mut EntityPool<EnemyInstance> {
        &mut self.enemies
    }

    pub fn projectiles(&self) -> &EntityPool<ActiveProjectile> {
        &self.projectiles
    }

    pub fn tower(&self) -> &Tower {
        &self.tower
    }

    pub fn base(&self) -> &HealthState {
        &self.base
    }

    pub fn resources(&self) -> &PlayerResources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut PlayerResources {
        &mut self.resources
    }

    pub fn skills(&self) -> &SkillManager {
        &self.skills
    }

    pub fn global_levels(&self) -> &UpgradeLevels {
        &self.global_levels
    }

    pub fn model_levels(&self) -> &UpgradeLevels {
        &self.model_levels[self.tower.model_index]
    }

    pub fn store(&self) -> &dyn SaveStore {
        self.store.as_ref()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }
}

fn register_projectile_pools(pool: &mut EntityPool<ActiveProjectile>, templates: &[ProjectileTemplate]) {
    for template in templates {
        if pool.contains_tag(&template.pool_tag) {
            continue;
        }
        let tag = template.pool_tag.clone();
        let factory: Factory<ActiveProjectile> = Box::new(move || ActiveProjectile::new(&tag));
        if let Err(err) = pool.register(&template.pool_tag, factory, template.pool_size) {
            warn!(tag = %template.pool_tag, %err, "projectile pool registration skipped");
        }
    }
}

/// Skill-side view of the tower and the board for one activation.
struct SkillContext<'a> {
    tower: &'a mut Tower,
    enemies: &'a mut EntityPool<EnemyInstance>,
    config: &'a SimConfig,
    rng: &'a mut Xoshiro256PlusPlus,
    deaths: Vec<(EnemyHandle, Death)>,
}

impl CasterProvider for SkillContext<'_> {
    fn caster(&self) -> CasterRef {
        TOWER_CASTER
    }

    fn current_target(&self) -> Option<EnemyHandle> {
        self.tower
            .target
            .filter(|&t| self.enemies.get(t).is_some_and(|e| e.is_alive()))
    }
}

impl SkillEffectExecutor for SkillContext<'_> {
    fn execute(&mut self, effect: &SkillEffect, _caster: CasterRef, target: Option<EnemyHandle>) {
        match effect {
            SkillEffect::MultiShot { count, duration } => {
                self.tower.enable_multi_shot(*count, *duration);
            }
            SkillEffect::SpreadShot {
                count,
                angle_deg,
                duration,
            } => {
                self.tower.enable_spread_shot(*count, *angle_deg, *duration);
            }
            SkillEffect::ChangeProjectile { projectile_id } => {
                if self.config.projectile_index(projectile_id).is_some() {
                    self.tower
                        .set_projectile_override(Some(projectile_id.clone()));
                } else {
                    warn!(projectile = %projectile_id, "unknown projectile, override skipped");
                }
            }
            SkillEffect::StrikeTarget { effects } => {
                let Some(handle) = target else {
                    debug!("strike without a target");
                    return;
                };
                let multiplier = self.tower.stats.projectile_multiplier();
                let Some(enemy) = self.enemies.get_mut(handle) else {
                    return;
                };
                let report = apply_hit_effects(effects, enemy, multiplier, &mut *self.rng);
                if let Some(death) = report.death {
                    self.deaths.push((handle, death));
                }
            }
        }
    }
}
