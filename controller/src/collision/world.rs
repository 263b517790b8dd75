use nalgebra as na;
use rapier3d::parry::{
    bounding_volume::{Aabb, BoundingVolume},
    query::{self, Ray, ShapeCastOptions, ShapeCastStatus},
    shape::{Shape, SharedShape, SupportMap},
};

use super::shapes::{
    BodyKind, ColliderShapeDef, QueryShape, SurfaceProperties, WorldBodyDef, shape_from_def,
};
use crate::constants::{SMALL_NUMBER, SWEEP_PULLBACK_DISTANCE};
use crate::math::{Iso, Quat, Vec3};

/// Stable identifier of a world body.
pub type BodyId = u32;

/// Bodies a query should skip.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueryFilter {
    pub exclude_body: Option<BodyId>,
}

impl QueryFilter {
    #[inline]
    pub fn excluding(body: BodyId) -> Self {
        Self {
            exclude_body: Some(body),
        }
    }

    #[inline]
    fn accepts(&self, body: BodyId) -> bool {
        self.exclude_body != Some(body)
    }
}

/// Result of a sweep or line trace.
///
/// Notes
/// - `time` is the fraction of the requested move in `[0, 1]`; `location` is where the query
///   shape ends up (pulled back slightly from the contact for sweeps).
/// - `normal` is the surface normal as seen from the swept shape; `impact_normal` is the normal
///   of the surface that was hit. They differ on edges and rounded shapes.
/// - A start-penetrating hit has `time == 0` and a positive `penetration_depth`; `normal` then
///   points out of the penetrated body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    pub blocking: bool,
    pub start_penetrating: bool,
    pub time: f32,
    pub distance: f32,
    pub trace_start: Vec3,
    pub trace_end: Vec3,
    pub location: Vec3,
    pub impact_point: Vec3,
    pub normal: Vec3,
    pub impact_normal: Vec3,
    pub penetration_depth: f32,
    pub body: Option<BodyId>,
}

impl SweepHit {
    /// A query that travelled the full distance without hitting anything.
    pub fn no_hit(start: Vec3, end: Vec3) -> Self {
        Self {
            blocking: false,
            start_penetrating: false,
            time: 1.0,
            distance: (end - start).norm(),
            trace_start: start,
            trace_end: end,
            location: end,
            impact_point: Vec3::zeros(),
            normal: Vec3::zeros(),
            impact_normal: Vec3::zeros(),
            penetration_depth: 0.0,
            body: None,
        }
    }

    /// Blocking and not starting in penetration.
    #[inline]
    pub fn is_valid_blocking_hit(&self) -> bool {
        self.blocking && !self.start_penetrating
    }

    #[inline]
    pub fn reset(&mut self, time: f32) {
        let (start, end) = (self.trace_start, self.trace_end);
        *self = Self::no_hit(start, end);
        self.time = time;
    }
}

impl Default for SweepHit {
    fn default() -> Self {
        Self::no_hit(Vec3::zeros(), Vec3::zeros())
    }
}

/// Overlap between a query shape and a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Penetration {
    pub body: BodyId,
    /// Direction that pushes the query shape out of the body.
    pub normal: Vec3,
    /// Overlap depth (meters, positive).
    pub depth: f32,
}

/// Snapshot of a body the solver may stand on or collide with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub id: BodyId,
    pub kind: BodyKind,
    pub pose: Iso,
    pub linear_velocity: Vec3,
    /// Angular velocity (radians per second, world axes).
    pub angular_velocity: Vec3,
    pub surface: SurfaceProperties,
    /// Half extents of the body's world AABB (infinite bodies report zero).
    pub half_extents: Vec3,
    pub collision_enabled: bool,
}

impl BodyState {
    /// Velocity of the body's material at `point`.
    #[inline]
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        let arm = point - self.pose.translation.vector;
        self.linear_velocity + self.angular_velocity.cross(&arm)
    }
}

/// Collision queries the movement solver reads through.
///
/// Conventions
/// - Query shapes are centered on `start`/`location` and rotated by `rotation`.
/// - Results are deterministic for identical world state.
pub trait CollisionWorld {
    /// Sweep `shape` from `start` to `end` and report the earliest blocking hit.
    fn sweep(
        &self,
        shape: &QueryShape,
        rotation: Quat,
        start: Vec3,
        end: Vec3,
        filter: &QueryFilter,
    ) -> SweepHit;

    /// Cast a ray from `start` to `end`.
    fn line_trace(&self, start: Vec3, end: Vec3, filter: &QueryFilter) -> SweepHit;

    /// Deepest overlap of `shape` placed at `location`, if any.
    fn penetration(
        &self,
        shape: &QueryShape,
        rotation: Quat,
        location: Vec3,
        filter: &QueryFilter,
    ) -> Option<Penetration>;

    fn body_state(&self, body: BodyId) -> Option<BodyState>;
}

/// Signed separation between a query shape and a body; negative when overlapping.
struct BodyContact {
    dist: f32,
    /// Points out of the body.
    normal: Vec3,
    point: Vec3,
}

struct WorldBody {
    id: BodyId,
    kind: BodyKind,
    def_shape: ColliderShapeDef,
    surface: SurfaceProperties,
    shape: SharedShape,
    /// Pose of the body itself (what hosts move).
    pose: Iso,
    /// Shape pose relative to `pose`.
    local: Iso,
    /// None for infinite shapes.
    aabb: Option<Aabb>,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    pending_force: Vec3,
    collision_enabled: bool,
}

impl WorldBody {
    #[inline]
    fn shape_pose(&self) -> Iso {
        self.pose * self.local
    }

    /// Contact of a query shape posed at `iso` with this body, or None when they are apart.
    ///
    /// Half-spaces are measured against the query shape's support point furthest along the
    /// inward normal, so the depth is how far the shape sinks below the plane.
    fn contact(&self, query_shape: &dyn Shape, iso: &Iso) -> Option<BodyContact> {
        let body_iso = self.shape_pose();
        if let (Some(halfspace), Some(support)) =
            (self.shape.as_halfspace(), query_shape.as_support_map())
        {
            let normal = body_iso.rotation * halfspace.normal.into_inner();
            let deepest = support.support_point(iso, &-normal).coords;
            let dist = normal.dot(&(deepest - body_iso.translation.vector));
            if dist > 0.0 {
                return None;
            }
            return Some(BodyContact {
                dist,
                normal,
                point: deepest - normal * dist,
            });
        }

        let contact = query::contact(iso, query_shape, &body_iso, self.shape.as_ref(), 0.0)
            .ok()
            .flatten()?;
        Some(BodyContact {
            dist: contact.dist,
            normal: contact.normal2.into_inner(),
            point: contact.point2.coords,
        })
    }

    fn refresh_aabb(&mut self) {
        if self.aabb.is_some() {
            self.aabb = Some(self.shape.compute_aabb(&self.shape_pose()));
        }
    }

    fn state(&self) -> BodyState {
        let half_extents = self.aabb.map_or(Vec3::zeros(), |a| a.half_extents());
        BodyState {
            id: self.id,
            kind: self.kind,
            pose: self.pose,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            surface: self.surface,
            half_extents,
            collision_enabled: self.collision_enabled,
        }
    }
}

/// In-memory collision world over a fixed set of bodies.
///
/// Notes
/// - Bodies are sorted by id at build time, so query tie-breaks are deterministic.
/// - Finite bodies keep a world AABB used as a broad-phase prefilter; planes are always tested.
/// - Kinematic bodies are moved by the host (`set_body_pose`) or integrated from their velocity
///   by `step`. Dynamic bodies integrate impulses and forces applied through
///   `apply_impulse`/`apply_force` without gravity or contacts of their own.
pub struct KinematicWorld {
    bodies: Vec<WorldBody>,
}

impl KinematicWorld {
    pub fn build(mut defs: Vec<WorldBodyDef>) -> Self {
        defs.sort_by_key(|d| d.id);
        defs.dedup_by_key(|d| d.id);

        let bodies = defs
            .iter()
            .map(|def| {
                let (shape, shape_pose) = shape_from_def(def);
                let pose = def.transform().iso();
                let aabb = match def.shape {
                    ColliderShapeDef::Plane { .. } => None,
                    _ => Some(shape.compute_aabb(&shape_pose)),
                };
                WorldBody {
                    id: def.id,
                    kind: def.kind,
                    def_shape: def.shape.clone(),
                    surface: def.surface,
                    shape,
                    pose,
                    local: pose.inverse() * shape_pose,
                    aabb,
                    linear_velocity: Vec3::zeros(),
                    angular_velocity: Vec3::zeros(),
                    pending_force: Vec3::zeros(),
                    collision_enabled: true,
                }
            })
            .collect();

        Self { bodies }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut WorldBody> {
        self.bodies
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(|i| &mut self.bodies[i])
    }

    fn body(&self, id: BodyId) -> Option<&WorldBody> {
        self.bodies
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(|i| &self.bodies[i])
    }

    /// Teleport a body. Returns false for unknown ids.
    pub fn set_body_pose(&mut self, id: BodyId, translation: Vec3, rotation: Quat) -> bool {
        let Some(body) = self.body_mut(id) else {
            log::warn!("set_body_pose: unknown body {id}");
            return false;
        };
        body.pose = Iso::from_parts(na::Translation3::from(translation), rotation);
        body.refresh_aabb();
        true
    }

    pub fn set_body_velocity(&mut self, id: BodyId, linear: Vec3, angular: Vec3) -> bool {
        let Some(body) = self.body_mut(id) else {
            log::warn!("set_body_velocity: unknown body {id}");
            return false;
        };
        body.linear_velocity = linear;
        body.angular_velocity = angular;
        true
    }

    pub fn set_collision_enabled(&mut self, id: BodyId, enabled: bool) -> bool {
        let Some(body) = self.body_mut(id) else {
            return false;
        };
        body.collision_enabled = enabled;
        true
    }

    /// Apply an instantaneous impulse at the body's center. Only dynamic bodies respond.
    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec3) {
        if let Some(body) = self.body_mut(id)
            && let BodyKind::Dynamic { mass } = body.kind
            && mass > SMALL_NUMBER
        {
            body.linear_velocity += impulse / mass;
        }
    }

    /// Accumulate a force for the next `step`. Only dynamic bodies respond.
    pub fn apply_force(&mut self, id: BodyId, force: Vec3) {
        if let Some(body) = self.body_mut(id)
            && matches!(body.kind, BodyKind::Dynamic { .. })
        {
            body.pending_force += force;
        }
    }

    /// Integrate movable bodies by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for body in &mut self.bodies {
            if let BodyKind::Dynamic { mass } = body.kind
                && mass > SMALL_NUMBER
            {
                body.linear_velocity += body.pending_force / mass * dt;
            }
            body.pending_force = Vec3::zeros();

            if !body.kind.is_movable() {
                continue;
            }
            if body.linear_velocity.norm_squared() <= SMALL_NUMBER
                && body.angular_velocity.norm_squared() <= SMALL_NUMBER
            {
                continue;
            }
            let translation = body.pose.translation.vector + body.linear_velocity * dt;
            let rotation = Quat::from_scaled_axis(body.angular_velocity * dt) * body.pose.rotation;
            body.pose = Iso::from_parts(na::Translation3::from(translation), rotation);
            body.refresh_aabb();
        }
    }

    fn candidates<'a>(
        &'a self,
        filter: &'a QueryFilter,
        bounds: &'a Aabb,
    ) -> impl Iterator<Item = &'a WorldBody> + 'a {
        self.bodies.iter().filter(move |b| {
            b.collision_enabled
                && filter.accepts(b.id)
                && b.aabb.as_ref().is_none_or(|a| a.intersects(bounds))
        })
    }

    fn cast_against(
        body: &WorldBody,
        query_shape: &dyn Shape,
        start_iso: &Iso,
        delta: Vec3,
    ) -> Option<SweepHit> {
        let body_iso = body.shape_pose();
        let start = start_iso.translation.vector;
        let end = start + delta;

        let mut opts = ShapeCastOptions::with_max_time_of_impact(1.0);
        opts.stop_at_penetration = true;
        let Ok(Some(hit)) = query::cast_shapes(
            start_iso,
            &delta,
            query_shape,
            &body_iso,
            &Vec3::zeros(),
            body.shape.as_ref(),
            opts,
        ) else {
            return None;
        };

        if hit.status == ShapeCastStatus::PenetratingOrWithinTargetDist {
            let contact = body.contact(query_shape, start_iso)?;
            let normal = contact.normal;
            // Moving out of the overlap is not blocked.
            if delta.norm_squared() > SMALL_NUMBER && normal.dot(&delta) > 0.0 {
                return None;
            }
            return Some(SweepHit {
                blocking: true,
                start_penetrating: true,
                time: 0.0,
                distance: 0.0,
                trace_start: start,
                trace_end: end,
                location: start,
                impact_point: contact.point,
                normal,
                impact_normal: normal,
                penetration_depth: (-contact.dist).max(0.0),
                body: Some(body.id),
            });
        }

        let len = delta.norm();
        let local_dir = body_iso.rotation.inverse() * delta;
        let impact_normal = opposing_face_normal(&body.def_shape, hit.witness2.coords, local_dir)
            .unwrap_or_else(|| hit.normal2.into_inner());
        let time = if len > SMALL_NUMBER {
            (hit.time_of_impact - SWEEP_PULLBACK_DISTANCE / len).max(0.0)
        } else {
            0.0
        };
        Some(SweepHit {
            blocking: true,
            start_penetrating: false,
            time,
            distance: len * time,
            trace_start: start,
            trace_end: end,
            location: start + delta * time,
            impact_point: (body_iso * hit.witness2).coords,
            normal: -(start_iso.rotation * hit.normal1.into_inner()),
            impact_normal: body_iso.rotation * impact_normal,
            penetration_depth: 0.0,
            body: Some(body.id),
        })
    }
}

/// Face normal next to `local_point` that most opposes the sweep direction `local_dir`.
///
/// Edge and corner contacts on flat-faced bodies report the face the query runs into head-on,
/// so a capsule stepping down onto a box edge sees the top face rather than a blended normal.
/// Returns None for curved shapes, where the contact normal is already the surface normal.
fn opposing_face_normal(shape: &ColliderShapeDef, local_point: Vec3, local_dir: Vec3) -> Option<Vec3> {
    const FACE_TOLERANCE: f32 = 1.0e-3;

    let mut candidates: Vec<Vec3> = Vec::with_capacity(3);
    match *shape {
        ColliderShapeDef::Cuboid { half_extents } => {
            for axis in 0..3 {
                if local_point[axis].abs() >= half_extents[axis] - FACE_TOLERANCE {
                    let mut n = Vec3::zeros();
                    n[axis] = local_point[axis].signum();
                    candidates.push(n);
                }
            }
        }
        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => {
            if local_point.y.abs() >= half_height - FACE_TOLERANCE {
                candidates.push(Vec3::y() * local_point.y.signum());
            }
            let radial = Vec3::new(local_point.x, 0.0, local_point.z);
            if radial.norm() >= radius - FACE_TOLERANCE {
                candidates.push(radial.normalize());
            }
        }
        _ => return None,
    }

    candidates
        .into_iter()
        .map(|n| (n.dot(&local_dir), n))
        .filter(|(d, _)| *d < 0.0)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, n)| n)
}

#[inline]
fn iso_at(location: Vec3, rotation: Quat) -> Iso {
    Iso::from_parts(na::Translation3::from(location), rotation)
}

/// Earlier time wins; among start-penetrating hits the deeper one wins.
#[inline]
fn is_better_hit(candidate: &SweepHit, best: &SweepHit) -> bool {
    candidate.time < best.time
        || (candidate.time == best.time && candidate.penetration_depth > best.penetration_depth)
}

impl CollisionWorld for KinematicWorld {
    fn sweep(
        &self,
        shape: &QueryShape,
        rotation: Quat,
        start: Vec3,
        end: Vec3,
        filter: &QueryFilter,
    ) -> SweepHit {
        let delta = end - start;
        let query_shape = shape.to_shared();
        let start_iso = iso_at(start, rotation);
        let end_iso = iso_at(end, rotation);
        let bounds = query_shape
            .compute_aabb(&start_iso)
            .merged(&query_shape.compute_aabb(&end_iso))
            .loosened(SWEEP_PULLBACK_DISTANCE);

        let mut best: Option<SweepHit> = None;
        for body in self.candidates(filter, &bounds) {
            let Some(hit) = Self::cast_against(body, query_shape.as_ref(), &start_iso, delta)
            else {
                continue;
            };
            if best.as_ref().is_none_or(|b| is_better_hit(&hit, b)) {
                best = Some(hit);
            }
        }
        best.unwrap_or_else(|| SweepHit::no_hit(start, end))
    }

    fn line_trace(&self, start: Vec3, end: Vec3, filter: &QueryFilter) -> SweepHit {
        let delta = end - start;
        if delta.norm_squared() <= SMALL_NUMBER {
            return SweepHit::no_hit(start, end);
        }
        let ray = Ray::new(na::Point3::from(start), delta);
        let bounds = Aabb::new(
            na::Point3::from(start.inf(&end)),
            na::Point3::from(start.sup(&end)),
        );

        let mut best: Option<SweepHit> = None;
        for body in self.candidates(filter, &bounds) {
            let Some(hit) = body
                .shape
                .cast_ray_and_get_normal(&body.shape_pose(), &ray, 1.0, true)
            else {
                continue;
            };
            if best.as_ref().is_some_and(|b| b.time <= hit.time_of_impact) {
                continue;
            }
            let location = start + delta * hit.time_of_impact;
            best = Some(SweepHit {
                blocking: true,
                start_penetrating: hit.time_of_impact <= 0.0,
                time: hit.time_of_impact,
                distance: delta.norm() * hit.time_of_impact,
                trace_start: start,
                trace_end: end,
                location,
                impact_point: location,
                normal: hit.normal,
                impact_normal: hit.normal,
                penetration_depth: 0.0,
                body: Some(body.id),
            });
        }
        best.unwrap_or_else(|| SweepHit::no_hit(start, end))
    }

    fn penetration(
        &self,
        shape: &QueryShape,
        rotation: Quat,
        location: Vec3,
        filter: &QueryFilter,
    ) -> Option<Penetration> {
        let query_shape = shape.to_shared();
        let iso = iso_at(location, rotation);
        let bounds = query_shape.compute_aabb(&iso);

        let mut deepest: Option<Penetration> = None;
        for body in self.candidates(filter, &bounds) {
            let Some(contact) = body.contact(query_shape.as_ref(), &iso) else {
                continue;
            };
            if contact.dist >= 0.0 {
                continue;
            }
            let depth = -contact.dist;
            if deepest.as_ref().is_none_or(|d| depth > d.depth) {
                deepest = Some(Penetration {
                    body: body.id,
                    normal: contact.normal,
                    depth,
                });
            }
        }
        deepest
    }

    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        self.body(body).map(WorldBody::state)
    }
}
