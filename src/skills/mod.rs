//! Resource-gated, cooldown-gated abilities.
//!
//! Activation order: resource check, cooldown check, spend, resolve caster
//! and target, run every effect in declared order, arm the cooldown. A refused
//! activation changes nothing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::combat::effects::HitEffect;
use crate::enemy::EnemyHandle;
use crate::resources::ResourceProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkillEffect {
    /// Parallel volley buff on the caster
    MultiShot { count: u32, duration: f32 },
    /// Fan volley buff on the caster
    SpreadShot {
        count: u32,
        angle_deg: f32,
        duration: f32,
    },
    /// Swap the caster's projectile template
    ChangeProjectile { projectile_id: String },
    /// Apply on-hit effects straight to the caster's current target
    StrikeTarget { effects: Vec<HitEffect> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub name: String,
    pub resource_type: String,
    pub cost: i32,
    /// Seconds
    pub cooldown: f32,
    pub effects: Vec<SkillEffect>,
}

/// Opaque reference to whoever casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CasterRef(pub u32);

pub trait CasterProvider {
    fn caster(&self) -> CasterRef;
    fn current_target(&self) -> Option<EnemyHandle>;
}

pub trait SkillEffectExecutor {
    fn execute(&mut self, effect: &SkillEffect, caster: CasterRef, target: Option<EnemyHandle>);
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActivationRefusal {
    #[error("no skill with id '{0}'")]
    UnknownSkill(String),
    #[error("not enough {resource} (needs {cost})")]
    InsufficientResource { resource: String, cost: i32 },
    #[error("on cooldown for {remaining:.2}s")]
    OnCooldown { remaining: f64 },
}

/// A successful activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub skill_id: String,
    pub caster: CasterRef,
    pub target: Option<EnemyHandle>,
    pub effects_run: usize,
    pub next_eligible: f64,
}

/// Next-eligible time per skill. Never moves backwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownLedger {
    next_eligible: HashMap<String, f64>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_eligible(&self, skill_id: &str) -> Option<f64> {
        self.next_eligible.get(skill_id).copied()
    }

    pub fn is_ready(&self, skill_id: &str, now: f64) -> bool {
        self.next_eligible(skill_id).map_or(true, |t| now >= t)
    }

    pub fn remaining(&self, skill_id: &str, now: f64) -> f64 {
        self.next_eligible(skill_id)
            .map_or(0.0, |t| (t - now).max(0.0))
    }

    pub fn arm(&mut self, skill_id: &str, until: f64) {
        let entry = self
            .next_eligible
            .entry(skill_id.to_string())
            .or_insert(until);
        *entry = entry.max(until);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkillManager {
    skills: Vec<SkillDefinition>,
    ledger: CooldownLedger,
}

impl SkillManager {
    pub fn new(skills: Vec<SkillDefinition>) -> Self {
        Self {
            skills,
            ledger: CooldownLedger::new(),
        }
    }

    pub fn skills(&self) -> &[SkillDefinition] {
        &self.skills
    }

    pub fn skill(&self, skill_id: &str) -> Option<&SkillDefinition> {
        self.skills.iter().find(|s| s.id == skill_id)
    }

    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    pub fn attempt_activate<C>(
        &mut self,
        skill_id: &str,
        now: f64,
        resources: &mut dyn ResourceProvider,
        context: &mut C,
    ) -> Result<Activation, ActivationRefusal>
    where
        C: CasterProvider + SkillEffectExecutor,
    {
        let Some(skill) = self.skills.iter().find(|s| s.id == skill_id) else {
            debug!(skill = skill_id, "activation of unknown skill");
            return Err(ActivationRefusal::UnknownSkill(skill_id.to_string()));
        };

        if !resources.has_resource(&skill.resource_type, skill.cost) {
            debug!(skill = skill_id, resource = %skill.resource_type, cost = skill.cost, "not enough resource");
            return Err(ActivationRefusal::InsufficientResource {
                resource: skill.resource_type.clone(),
                cost: skill.cost,
            });
        }

        if !self.ledger.is_ready(skill_id, now) {
            let remaining = self.ledger.remaining(skill_id, now);
            debug!(skill = skill_id, remaining, "skill on cooldown");
            return Err(ActivationRefusal::OnCooldown { remaining });
        }

        if !resources.spend_resource(&skill.resource_type, skill.cost) {
            return Err(ActivationRefusal::InsufficientResource {
                resource: skill.resource_type.clone(),
                cost: skill.cost,
            });
        }

        let caster = context.caster();
        let target = context.current_target();
        for effect in &skill.effects {
            context.execute(effect, caster, target);
        }

        let next_eligible = now + skill.cooldown.max(0.0) as f64;
        self.ledger.arm(skill_id, next_eligible);

        info!(skill = skill_id, effects = skill.effects.len(), "skill activated");
        Ok(Activation {
            skill_id: skill_id.to_string(),
            caster,
            target,
            effects_run: skill.effects.len(),
            next_eligible,
        })
    }

    /// Fraction of the cooldown still to go, 0 when ready.
    pub fn cooldown_progress(&self, skill_id: &str, now: f64) -> f32 {
        let Some(skill) = self.skill(skill_id) else {
            return 0.0;
        };
        if skill.cooldown <= 0.0 {
            return 0.0;
        }
        let remaining = self.ledger.remaining(skill_id, now);
        (remaining / skill.cooldown as f64).clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RESOURCE_MANA;
    use crate::resources::{ManaPool, PlayerResources, Wallet};

    #[derive(Default)]
    struct Recorder {
        executed: Vec<SkillEffect>,
    }

    impl CasterProvider for Recorder {
        fn caster(&self) -> CasterRef {
            CasterRef(7)
        }

        fn current_target(&self) -> Option<EnemyHandle> {
            None
        }
    }

    impl SkillEffectExecutor for Recorder {
        fn execute(&mut self, effect: &SkillEffect, caster: CasterRef, _target: Option<EnemyHandle>) {
            assert_eq!(caster, CasterRef(7));
            self.executed.push(effect.clone());
        }
    }

    fn volley() -> SkillDefinition {
        SkillDefinition {
            id: "volley".into(),
            name: "Volley".into(),
            resource_type: RESOURCE_MANA.into(),
            cost: 30,
            cooldown: 4.0,
            effects: vec![
                SkillEffect::MultiShot {
                    count: 3,
                    duration: 5.0,
                },
                SkillEffect::ChangeProjectile {
                    projectile_id: "fire".into(),
                },
            ],
        }
    }

    fn resources(mana: f32) -> PlayerResources {
        let mut pool = ManaPool::new(100.0, 0.0);
        pool.spend(100.0 - mana);
        PlayerResources::new(pool, Wallet::new(0))
    }

    #[test]
    fn test_activation_runs_effects_in_order() {
        let mut skills = SkillManager::new(vec![volley()]);
        let mut res = resources(100.0);
        let mut ctx = Recorder::default();

        let activation = skills
            .attempt_activate("volley", 1.0, &mut res, &mut ctx)
            .unwrap();
        assert_eq!(activation.effects_run, 2);
        assert_eq!(activation.next_eligible, 5.0);
        assert_eq!(ctx.executed, volley().effects);
        assert!((res.mana.current() - 70.0).abs() < 0.001);
    }

    #[test]
    fn test_cooldown_refusal_and_expiry() {
        let mut skills = SkillManager::new(vec![volley()]);
        let mut res = resources(100.0);
        let mut ctx = Recorder::default();

        skills.attempt_activate("volley", 0.0, &mut res, &mut ctx).unwrap();
        let refusal = skills
            .attempt_activate("volley", 3.5, &mut res, &mut ctx)
            .unwrap_err();
        assert!(matches!(refusal, ActivationRefusal::OnCooldown { remaining } if (remaining - 0.5).abs() < 1e-9));
        // nothing spent on refusal
        assert!((res.mana.current() - 70.0).abs() < 0.001);

        let activation = skills
            .attempt_activate("volley", 4.0, &mut res, &mut ctx)
            .unwrap();
        assert_eq!(activation.next_eligible, 8.0);
        assert_eq!(ctx.executed.len(), 4);
    }

    #[test]
    fn test_insufficient_resource_checked_first() {
        let mut skills = SkillManager::new(vec![volley()]);
        let mut res = resources(10.0);
        let mut ctx = Recorder::default();

        let refusal = skills
            .attempt_activate("volley", 0.0, &mut res, &mut ctx)
            .unwrap_err();
        assert_eq!(
            refusal,
            ActivationRefusal::InsufficientResource {
                resource: RESOURCE_MANA.into(),
                cost: 30
            }
        );
        assert!(ctx.executed.is_empty());
        assert!(skills.ledger().next_eligible("volley").is_none());
    }

    #[test]
    fn test_unknown_skill() {
        let mut skills = SkillManager::new(vec![volley()]);
        let mut res = resources(100.0);
        let mut ctx = Recorder::default();
        assert_eq!(
            skills.attempt_activate("meteor", 0.0, &mut res, &mut ctx),
            Err(ActivationRefusal::UnknownSkill("meteor".into()))
        );
    }

    #[test]
    fn test_cooldown_progress() {
        let mut skills = SkillManager::new(vec![volley()]);
        let mut res = resources(100.0);
        let mut ctx = Recorder::default();

        assert_eq!(skills.cooldown_progress("volley", 0.0), 0.0);
        skills.attempt_activate("volley", 0.0, &mut res, &mut ctx).unwrap();
        assert!((skills.cooldown_progress("volley", 0.0) - 1.0).abs() < 0.001);
        assert!((skills.cooldown_progress("volley", 1.0) - 0.75).abs() < 0.001);
        assert_eq!(skills.cooldown_progress("volley", 10.0), 0.0);
        assert_eq!(skills.cooldown_progress("meteor", 0.0), 0.0);
    }

    #[test]
    fn test_ledger_never_moves_backwards() {
        let mut ledger = CooldownLedger::new();
        ledger.arm("volley", 10.0);
        ledger.arm("volley", 4.0);
        assert_eq!(ledger.next_eligible("volley"), Some(10.0));
        assert!(!ledger.is_ready("volley", 9.0));
        assert!(ledger.is_ready("volley", 10.0));
    }
}
