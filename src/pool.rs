// Pooled scene-object slots, K per environment, recycled across resets.

use crate::core::{check_env, RansError, Result};
use crate::math::Pose;
use crate::utils::rng::Draw;
use rand::Rng;

/// Handle to one placeable object slot.
///
/// `generation` changes every time the slot is released, so a handle kept
/// from a previous occupancy is recognized as stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectSlot {
    pub env: usize,
    pub id: usize,
    generation: u32,
}

impl ObjectSlot {
    pub fn generation(&self) -> u32 { self.generation }
}

/// Axis-aligned region (environment-local) and yaw range for random placement.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementBounds {
    pub low: [f64; 3],
    pub high: [f64; 3],
    pub yaw: (f64, f64),
}

impl PlacementBounds {
    /// Square of half-width `half_extent` on the ground plane, any heading.
    pub fn square(half_extent: f64) -> Self {
        Self {
            low: [-half_extent, -half_extent, 0.0],
            high: [half_extent, half_extent, 0.0],
            yaw: (-std::f64::consts::PI, std::f64::consts::PI),
        }
    }

    /// Every range must be finite, ordered and of finite width.
    pub fn validate(&self) -> Result<()> {
        let ranges = [(self.low[0], self.high[0]), (self.low[1], self.high[1]), (self.low[2], self.high[2]), self.yaw];
        for (low, high) in ranges {
            if !(low.is_finite() && high.is_finite() && low <= high && (high - low).is_finite()) {
                return Err(RansError::InvalidDistribution(format!("placement range [{low}, {high}]")));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
struct SlotState {
    occupied: bool,
    generation: u32,
    pose: Option<Pose>,
}

/// The K slots of one environment.
#[derive(Clone, Debug)]
pub struct EnvSlots {
    env: usize,
    slots: Vec<SlotState>,
    occupied: usize,
}

impl EnvSlots {
    fn new(env: usize, capacity: usize) -> Self {
        Self { env, slots: vec![SlotState::default(); capacity], occupied: 0 }
    }

    pub fn env(&self) -> usize { self.env }
    pub fn capacity(&self) -> usize { self.slots.len() }
    pub fn occupied_count(&self) -> usize { self.occupied }
    pub fn free_count(&self) -> usize { self.slots.len() - self.occupied }

    /// Lowest free slot id, marked occupied.
    pub fn acquire(&mut self) -> Result<ObjectSlot> {
        let id = self
            .slots
            .iter()
            .position(|s| !s.occupied)
            .ok_or_else(|| {
                log::debug!("object pool exhausted for env {}", self.env);
                RansError::PoolExhausted { env: self.env, capacity: self.slots.len() }
            })?;
        let s = &mut self.slots[id];
        s.occupied = true;
        s.pose = None;
        self.occupied += 1;
        Ok(ObjectSlot { env: self.env, id, generation: s.generation })
    }

    /// Free the slot. No-op when it is already free or the handle is stale.
    pub fn release(&mut self, slot: ObjectSlot) {
        if slot.env != self.env {
            log::warn!("release of slot from env {} routed to env {}", slot.env, self.env);
            return;
        }
        let Some(s) = self.slots.get_mut(slot.id) else { return };
        if s.generation != slot.generation {
            log::warn!("ignoring release of stale slot {} in env {}", slot.id, self.env);
        } else if s.occupied {
            s.occupied = false;
            s.generation = s.generation.wrapping_add(1);
            self.occupied -= 1;
        }
    }

    /// Free every slot.
    pub fn reset(&mut self) {
        for s in self.slots.iter_mut().filter(|s| s.occupied) {
            s.occupied = false;
            s.generation = s.generation.wrapping_add(1);
        }
        self.occupied = 0;
    }

    pub fn is_occupied(&self, slot: ObjectSlot) -> bool {
        self.live(slot).is_some()
    }

    /// Last pose assigned to a live slot.
    pub fn pose(&self, slot: ObjectSlot) -> Option<Pose> {
        self.live(slot).and_then(|s| s.pose)
    }

    /// Draw a pose inside `bounds` (x, y, z, yaw: four uniform draws) and
    /// assign it to the slot.
    pub fn place_random<R: Rng + ?Sized>(
        &mut self,
        slot: ObjectSlot,
        rng: &mut R,
        bounds: &PlacementBounds,
    ) -> Result<Pose> {
        if self.live(slot).is_none() {
            return Err(RansError::StaleSlot { env: slot.env, id: slot.id });
        }
        bounds.validate()?;
        let x = rng.draw_uniform(bounds.low[0], bounds.high[0])?;
        let y = rng.draw_uniform(bounds.low[1], bounds.high[1])?;
        let z = rng.draw_uniform(bounds.low[2], bounds.high[2])?;
        let yaw = rng.draw_uniform(bounds.yaw.0, bounds.yaw.1)?;
        let pose = Pose::from_xyz_yaw(x, y, z, yaw);
        self.slots[slot.id].pose = Some(pose);
        Ok(pose)
    }

    /// Occupied slots in id order with their last pose.
    pub fn occupied(&self) -> impl Iterator<Item = (ObjectSlot, Option<Pose>)> + '_ {
        self.slots.iter().enumerate().filter(|(_, s)| s.occupied).map(move |(id, s)| {
            (ObjectSlot { env: self.env, id, generation: s.generation }, s.pose)
        })
    }

    fn live(&self, slot: ObjectSlot) -> Option<&SlotState> {
        if slot.env != self.env {
            return None;
        }
        self.slots.get(slot.id).filter(|s| s.occupied && s.generation == slot.generation)
    }
}

/// Fixed-capacity object storage for every environment.
#[derive(Clone, Debug)]
pub struct ObjectStoragePool {
    capacity: usize,
    envs: Vec<EnvSlots>,
}

impl ObjectStoragePool {
    pub fn new(num_envs: usize, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RansError::InvalidConfig("object pool capacity must be > 0".into()));
        }
        Ok(Self { capacity, envs: (0..num_envs).map(|e| EnvSlots::new(e, capacity)).collect() })
    }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn num_envs(&self) -> usize { self.envs.len() }

    pub fn acquire(&mut self, env: usize) -> Result<ObjectSlot> {
        self.env_mut(env)?.acquire()
    }

    /// Idempotent; unknown environments are ignored.
    pub fn release(&mut self, slot: ObjectSlot) {
        if let Some(e) = self.envs.get_mut(slot.env) {
            e.release(slot);
        }
    }

    pub fn reset_environment(&mut self, env: usize) -> Result<()> {
        self.env_mut(env)?.reset();
        Ok(())
    }

    pub fn place_random<R: Rng + ?Sized>(
        &mut self,
        slot: ObjectSlot,
        rng: &mut R,
        bounds: &PlacementBounds,
    ) -> Result<Pose> {
        self.env_mut(slot.env)?.place_random(slot, rng, bounds)
    }

    pub fn occupied_count(&self, env: usize) -> Result<usize> {
        Ok(self.env(env)?.occupied_count())
    }

    pub fn free_count(&self, env: usize) -> Result<usize> {
        Ok(self.env(env)?.free_count())
    }

    pub fn is_occupied(&self, slot: ObjectSlot) -> bool {
        self.envs.get(slot.env).is_some_and(|e| e.is_occupied(slot))
    }

    pub fn pose(&self, slot: ObjectSlot) -> Option<Pose> {
        self.envs.get(slot.env).and_then(|e| e.pose(slot))
    }

    /// Occupied slots of `env` in id order with their last pose.
    pub fn occupied(&self, env: usize) -> Result<impl Iterator<Item = (ObjectSlot, Option<Pose>)> + '_> {
        Ok(self.env(env)?.occupied())
    }

    pub fn env(&self, env: usize) -> Result<&EnvSlots> {
        check_env(env, self.envs.len())?;
        Ok(&self.envs[env])
    }

    pub fn env_mut(&mut self, env: usize) -> Result<&mut EnvSlots> {
        check_env(env, self.envs.len())?;
        Ok(&mut self.envs[env])
    }

    /// Disjoint per-environment slot sets, for splitting across workers.
    pub fn envs_mut(&mut self) -> &mut [EnvSlots] { &mut self.envs }
}
