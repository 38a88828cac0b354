//! Projectile emission patterns.
//!
//! Stateless: a pattern plus a fire point and an aim point expands into a list
//! of (origin, heading) pairs, and [`fire`] turns each pair into a pooled
//! projectile.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::enemy::EnemyHandle;
use crate::pool::{EntityPool, Factory, PoolError};
use crate::projectile::{ActiveProjectile, ProjectileHandle, ProjectileTemplate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ShotPattern {
    #[default]
    Single,
    /// `count` shots side by side, `spacing` apart, all along the aim line
    Parallel { count: u32, spacing: f32 },
    /// `count` shots fanned evenly across `angle_deg`, centered on the aim line
    Spread { count: u32, angle_deg: f32 },
}

/// Placement of one emitted projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotSpec {
    pub origin: Vec2,
    /// Unit direction of travel
    pub heading: Vec2,
}

impl ShotSpec {
    pub fn rotation(&self) -> f32 {
        self.heading.y.atan2(self.heading.x)
    }
}

pub fn plan_shots(pattern: ShotPattern, fire_point: Vec2, target_position: Vec2) -> Vec<ShotSpec> {
    let aim = (target_position - fire_point)
        .try_normalize()
        .unwrap_or(Vec2::X);

    match pattern {
        ShotPattern::Parallel { count, spacing } if count > 1 => {
            let side = aim.perp();
            let half_width = (count - 1) as f32 / 2.0 * spacing;
            (0..count)
                .map(|i| ShotSpec {
                    origin: fire_point + side * (i as f32 * spacing - half_width),
                    heading: aim,
                })
                .collect()
        }
        ShotPattern::Spread { count, angle_deg } if count > 1 => {
            let start = -angle_deg / 2.0;
            let step = angle_deg / (count - 1) as f32;
            (0..count)
                .map(|i| {
                    let offset = (start + step * i as f32).to_radians();
                    ShotSpec {
                        origin: fire_point,
                        heading: Vec2::from_angle(offset).rotate(aim),
                    }
                })
                .collect()
        }
        _ => vec![ShotSpec {
            origin: fire_point,
            heading: aim,
        }],
    }
}

/// Everything one attack needs besides the pattern.
#[derive(Debug, Clone, Copy)]
pub struct FireRequest<'a> {
    pub template_index: usize,
    pub template: &'a ProjectileTemplate,
    pub fire_point: Vec2,
    pub target: Option<EnemyHandle>,
    pub target_position: Vec2,
    pub damage_multiplier: f32,
}

/// Emit one projectile per planned shot.
///
/// Ballistic projectiles keep the planned heading, so fans spread and
/// parallel volleys stay parallel. Homing projectiles all chase the target.
pub fn fire(
    pool: &mut EntityPool<ActiveProjectile>,
    pattern: ShotPattern,
    request: &FireRequest<'_>,
) -> Result<Vec<ProjectileHandle>, PoolError> {
    let shots = plan_shots(pattern, request.fire_point, request.target_position);
    let mut fired = Vec::with_capacity(shots.len());

    for shot in shots {
        let tag = request.template.pool_tag.clone();
        let fallback: Factory<ActiveProjectile> = Box::new(move || ActiveProjectile::new(&tag));
        let handle = pool.acquire(
            &request.template.pool_tag,
            shot.origin,
            shot.rotation(),
            Some(fallback),
        )?;

        if let Some(projectile) = pool.get_mut(handle) {
            let aim = shot.origin + shot.heading * shot.origin.distance(request.target_position);
            projectile.launch(
                request.template_index,
                request.template,
                request.damage_multiplier,
                request.target,
                Some(aim),
                Some(shot.heading),
            );
        }
        fired.push(handle);
    }

    debug!(
        projectile = %request.template.id,
        count = fired.len(),
        "projectiles fired"
    );
    Ok(fired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MoveMode;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 0.001
    }

    #[test]
    fn test_single_shot() {
        let shots = plan_shots(ShotPattern::Single, Vec2::ZERO, Vec2::new(0.0, 5.0));
        assert_eq!(shots.len(), 1);
        assert!(close(shots[0].heading, Vec2::Y));
        assert!((shots[0].rotation() - std::f32::consts::FRAC_PI_2).abs() < 0.001);
    }

    #[test]
    fn test_parallel_offsets_are_centered() {
        let pattern = ShotPattern::Parallel {
            count: 3,
            spacing: 0.3,
        };
        let shots = plan_shots(pattern, Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(shots.len(), 3);
        assert!(close(shots[0].origin, Vec2::new(0.0, -0.3)));
        assert!(close(shots[1].origin, Vec2::ZERO));
        assert!(close(shots[2].origin, Vec2::new(0.0, 0.3)));
        assert!(shots.iter().all(|s| close(s.heading, Vec2::X)));
    }

    #[test]
    fn test_spread_fans_across_angle() {
        let pattern = ShotPattern::Spread {
            count: 3,
            angle_deg: 90.0,
        };
        let shots = plan_shots(pattern, Vec2::ZERO, Vec2::new(10.0, 0.0));
        let diagonal = std::f32::consts::FRAC_1_SQRT_2;
        assert!(close(shots[0].heading, Vec2::new(diagonal, -diagonal)));
        assert!(close(shots[1].heading, Vec2::X));
        assert!(close(shots[2].heading, Vec2::new(diagonal, diagonal)));
    }

    #[test]
    fn test_spread_of_one_is_single() {
        let pattern = ShotPattern::Spread {
            count: 1,
            angle_deg: 60.0,
        };
        let shots = plan_shots(pattern, Vec2::ZERO, Vec2::new(3.0, 0.0));
        assert_eq!(shots.len(), 1);
        assert!(close(shots[0].heading, Vec2::X));
    }

    #[test]
    fn test_degenerate_aim_defaults_to_x() {
        let shots = plan_shots(ShotPattern::Single, Vec2::ONE, Vec2::ONE);
        assert!(close(shots[0].heading, Vec2::X));
    }

    #[test]
    fn test_fire_acquires_one_projectile_per_shot() {
        let template = ProjectileTemplate {
            homing: false,
            pool_tag: "arrow".into(),
            ..Default::default()
        };
        let mut pool = EntityPool::new();
        let request = FireRequest {
            template_index: 0,
            template: &template,
            fire_point: Vec2::ZERO,
            target: None,
            target_position: Vec2::new(5.0, 0.0),
            damage_multiplier: 12.0,
        };
        let pattern = ShotPattern::Spread {
            count: 5,
            angle_deg: 40.0,
        };
        let fired = fire(&mut pool, pattern, &request).unwrap();
        assert_eq!(fired.len(), 5);
        assert_eq!(pool.active_count(), 5);

        let outer = pool.get(fired[0]).unwrap();
        assert_eq!(outer.mover.mode(), MoveMode::Ballistic);
        assert_eq!(outer.damage_multiplier, 12.0);
        let heading = outer.mover.frozen_direction().unwrap();
        assert!(heading.y < 0.0);
    }
}
