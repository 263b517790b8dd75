use std::ops::{Deref, DerefMut};

use crate::math::{Quat, Vec3};

use super::solver::MovementSolver;

/// Scoped movement: reverts the solver's location and rotation on drop unless committed.
///
/// Step-up runs its up, forward and down moves inside one transaction so any rejected step
/// leaves the character exactly where it started.
pub struct MovementTransaction<'s> {
    solver: &'s mut MovementSolver,
    start_location: Vec3,
    start_rotation: Quat,
    committed: bool,
}

impl<'s> MovementTransaction<'s> {
    pub fn begin(solver: &'s mut MovementSolver) -> Self {
        let start_location = solver.location;
        let start_rotation = solver.rotation;
        Self {
            solver,
            start_location,
            start_rotation,
            committed: false,
        }
    }

    /// Keep every move made through the transaction.
    #[inline]
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Location when the transaction began.
    #[inline]
    pub fn start_location(&self) -> Vec3 {
        self.start_location
    }
}

impl Deref for MovementTransaction<'_> {
    type Target = MovementSolver;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.solver
    }
}

impl DerefMut for MovementTransaction<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.solver
    }
}

impl Drop for MovementTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.solver.location = self.start_location;
            self.solver.rotation = self.start_rotation;
        }
    }
}
