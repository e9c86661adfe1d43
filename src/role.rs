// SPDX-License-Identifier: GPL-3.0-only

//! Camera roles and role-indexed storage

use crate::backends::camera::LensFacing;

/// Logical camera slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Front,
    Back,
}

impl Role {
    /// Both roles, front first (the order of the composite bands)
    pub const ALL: [Role; 2] = [Role::Front, Role::Back];

    /// Role served by a lens facing; external cameras have none
    pub fn from_facing(facing: LensFacing) -> Option<Self> {
        match facing {
            LensFacing::Front => Some(Role::Front),
            LensFacing::Back => Some(Role::Back),
            LensFacing::External => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Front => "front",
            Role::Back => "back",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable<T> {
    pub front: T,
    pub back: T,
}

impl<T> RoleTable<T> {
    pub fn new(front: T, back: T) -> Self {
        Self { front, back }
    }

    pub fn from_fn(mut f: impl FnMut(Role) -> T) -> Self {
        Self {
            front: f(Role::Front),
            back: f(Role::Back),
        }
    }

    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Front => &self.front,
            Role::Back => &self.back,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Front => &mut self.front,
            Role::Back => &mut self.back,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        [(Role::Front, &self.front), (Role::Back, &self.back)].into_iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Role, &T) -> U) -> RoleTable<U> {
        RoleTable {
            front: f(Role::Front, &self.front),
            back: f(Role::Back, &self.back),
        }
    }
}
