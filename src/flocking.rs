//! Separation / alignment / cohesion steering.
//!
//! Every flocking agent scans every other agent once per tick, so a tick
//! costs O(N²) for N flocking agents. That is fine for small flocks; large
//! crowds need a spatial index in front of `compute_steering`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::actor::AgentId;

/// Tunable flocking constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlockParams {
    #[serde(default = "default_separation_gain")]
    pub separation_gain: f32,
    #[serde(default = "default_alignment_gain")]
    pub alignment_gain: f32,
    #[serde(default = "default_cohesion_gain")]
    pub cohesion_gain: f32,
    #[serde(default = "default_weight")]
    pub separation_weight: f32,
    #[serde(default = "default_weight")]
    pub alignment_weight: f32,
    #[serde(default = "default_weight")]
    pub cohesion_weight: f32,
    /// Non-flocking agents closer than this to a moving flocking agent join the flock
    #[serde(default = "default_assimilation_radius")]
    pub assimilation_radius: f32,
}

fn default_separation_gain() -> f32 { 0.5 }
fn default_alignment_gain() -> f32 { 0.5 }
fn default_cohesion_gain() -> f32 { 0.01 }
fn default_weight() -> f32 { 1.0 }
fn default_assimilation_radius() -> f32 { 50.0 }

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            separation_gain: default_separation_gain(),
            alignment_gain: default_alignment_gain(),
            cohesion_gain: default_cohesion_gain(),
            separation_weight: default_weight(),
            alignment_weight: default_weight(),
            cohesion_weight: default_weight(),
            assimilation_radius: default_assimilation_radius(),
        }
    }
}

/// Read-only view of one agent for the current tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockMember {
    pub id: AgentId,
    pub position: Vec3,
    /// Current travel direction; zero when standing still
    pub heading: Vec3,
    pub flocking: bool,
    pub walking: bool,
}

/// The three group terms, already multiplied by their gains
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringTerms {
    pub separation: Vec3,
    pub alignment: Vec3,
    pub cohesion: Vec3,
    pub neighbors: usize,
}

/// Separation, alignment and cohesion for `me` against the flocking agents in `others`.
///
/// `me` is skipped by id, so agents sharing a position still see each other.
pub fn steering_terms(params: &FlockParams, me: &FlockMember, others: &[FlockMember]) -> SteeringTerms {
    let mut separation = Vec3::ZERO;
    let mut heading_sum = Vec3::ZERO;
    let mut center_of_mass = Vec3::ZERO;
    let mut count = 0usize;

    for other in others.iter().filter(|o| o.id != me.id && o.flocking) {
        count += 1;

        let away = me.position - other.position;
        let length_sq = away.length_squared();
        // Coincident agents have no defined push direction
        if length_sq > f32::EPSILON {
            separation += away / length_sq;
        }

        heading_sum += other.heading.normalize_or_zero();
        center_of_mass += other.position;
    }

    if count == 0 {
        return SteeringTerms::default();
    }

    let n = count as f32;
    SteeringTerms {
        separation: separation * params.separation_gain,
        alignment: (heading_sum / n - me.heading) * params.alignment_gain,
        cohesion: (center_of_mass / n - me.position) * params.cohesion_gain,
        neighbors: count,
    }
}

/// Combined steering vector: own normalized heading plus the weighted group terms
pub fn compute_steering(params: &FlockParams, me: &FlockMember, others: &[FlockMember]) -> Vec3 {
    let terms = steering_terms(params, me, others);
    me.heading.normalize_or_zero()
        + params.separation_weight * terms.separation
        + params.alignment_weight * terms.alignment
        + params.cohesion_weight * terms.cohesion
}

/// Ids of non-flocking agents within the assimilation radius of `recruiter`.
///
/// Pure: the caller flips the `flocking` flag, once per tick.
pub fn assimilate(params: &FlockParams, recruiter: &FlockMember, others: &[FlockMember]) -> Vec<AgentId> {
    let radius_sq = params.assimilation_radius * params.assimilation_radius;
    others
        .iter()
        .filter(|o| o.id != recruiter.id && !o.flocking)
        .filter(|o| o.position.distance_squared(recruiter.position) < radius_sq)
        .map(|o| o.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: u32, position: Vec3, heading: Vec3) -> FlockMember {
        FlockMember {
            id: AgentId(id),
            position,
            heading,
            flocking: true,
            walking: true,
        }
    }

    #[test]
    fn test_separation_is_inverse_square() {
        let params = FlockParams::default();
        let me = member(0, Vec3::ZERO, Vec3::X);
        let near = [member(1, Vec3::new(2.0, 0.0, 0.0), Vec3::X)];
        let far = [member(1, Vec3::new(4.0, 0.0, 0.0), Vec3::X)];

        let near_push = steering_terms(&params, &me, &near).separation;
        let far_push = steering_terms(&params, &me, &far).separation;
        // (-2,0,0)/4 * 0.5 and (-4,0,0)/16 * 0.5
        assert!((near_push.x + 0.25).abs() < 1e-6);
        assert!((far_push.x + 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_neighbor_adds_no_separation() {
        let params = FlockParams::default();
        let me = member(0, Vec3::ONE, Vec3::Z);
        let twin = [member(1, Vec3::ONE, Vec3::Z)];

        let terms = steering_terms(&params, &me, &twin);
        assert_eq!(terms.neighbors, 1);
        assert_eq!(terms.separation, Vec3::ZERO);
        assert!(compute_steering(&params, &me, &twin).is_finite());
    }

    #[test]
    fn test_default_params_match_tuning() {
        let params = FlockParams::default();
        assert_eq!(params.separation_gain, 0.5);
        assert_eq!(params.alignment_gain, 0.5);
        assert_eq!(params.cohesion_gain, 0.01);
        assert_eq!(params.assimilation_radius, 50.0);
    }
}
