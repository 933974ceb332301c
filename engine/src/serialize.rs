/*!
Text persistence for physics components.

Format
- One token per line. Numbers use Rust's shortest round-trip formatting,
  booleans are `1` / `0`.
- An absent reference (material path, mesh, GameObject) is the literal `nullptr`.
- Every component record ends with the literal `end`.
- Field order is fixed per component; there are no field names.
*/

use std::sync::Arc;

use physics::{
    ColliderDesc, ColliderShape, ConstraintDesc, ConstraintKind, MeshData, MeshId, RigidbodyDesc,
    RotationLock, RotationLocks, Vec3,
};
use thiserror::Error;

use crate::components::Vehicle;
use crate::deferred::DeferredRef;
use crate::scene::Scene;

pub const NULL_TOKEN: &str = "nullptr";
pub const END_TOKEN: &str = "end";

#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("expected a number, found '{0}'")]
    BadNumber(String),

    #[error("expected {expected}, found '{found}'")]
    BadToken {
        expected: &'static str,
        found: String,
    },

    #[error("record not terminated, found '{0}' instead of '{END_TOKEN}'")]
    MissingEnd(String),
}

#[derive(Default)]
pub struct TokenWriter {
    out: String,
}

impl TokenWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&mut self, token: &str) -> &mut Self {
        self.out.push_str(token);
        self.out.push('\n');
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.token(&v.to_string())
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.token(&v.to_string())
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.token(if v { "1" } else { "0" })
    }

    pub fn vec3(&mut self, v: &Vec3) -> &mut Self {
        self.f32(v.x).f32(v.y).f32(v.z)
    }

    /// A reference slot: the value's token, or `nullptr`.
    pub fn opt<T: ToString>(&mut self, v: Option<T>) -> &mut Self {
        match v {
            Some(v) => self.token(&v.to_string()),
            None => self.token(NULL_TOKEN),
        }
    }

    pub fn end(&mut self) -> &mut Self {
        self.token(END_TOKEN)
    }

    pub fn finish(self) -> String {
        self.out
    }
}

pub struct TokenReader<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> TokenReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
        }
    }

    pub fn token(&mut self) -> Result<&'a str, ReadError> {
        self.lines
            .next()
            .map(str::trim)
            .ok_or(ReadError::UnexpectedEnd)
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, ReadError> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|_| ReadError::BadNumber(token.to_owned()))
    }

    pub fn f32(&mut self) -> Result<f32, ReadError> {
        self.number()
    }

    pub fn u32(&mut self) -> Result<u32, ReadError> {
        self.number()
    }

    pub fn bool(&mut self) -> Result<bool, ReadError> {
        match self.token()? {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(ReadError::BadToken {
                expected: "1 or 0",
                found: other.to_owned(),
            }),
        }
    }

    pub fn vec3(&mut self) -> Result<Vec3, ReadError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// A reference slot; `nullptr` reads as `None`.
    pub fn opt_token(&mut self) -> Result<Option<&'a str>, ReadError> {
        let token = self.token()?;
        Ok((token != NULL_TOKEN).then_some(token))
    }

    pub fn opt_u32(&mut self) -> Result<Option<u32>, ReadError> {
        match self.opt_token()? {
            Some(token) => token
                .parse()
                .map(Some)
                .map_err(|_| ReadError::BadNumber(token.to_owned())),
            None => Ok(None),
        }
    }

    pub fn end(&mut self) -> Result<(), ReadError> {
        match self.token()? {
            END_TOKEN => Ok(()),
            other => Err(ReadError::MissingEnd(other.to_owned())),
        }
    }
}

// --- Rigidbody ---
// mass, use_gravity, is_kinematic, lock x, lock y, lock z

pub fn write_rigidbody(w: &mut TokenWriter, desc: &RigidbodyDesc) {
    let locks = &desc.rotation_locks;
    w.f32(desc.mass)
        .bool(desc.use_gravity)
        .bool(desc.is_kinematic)
        .bool(locks.has(RotationLock::X))
        .bool(locks.has(RotationLock::Y))
        .bool(locks.has(RotationLock::Z))
        .end();
}

pub fn read_rigidbody(r: &mut TokenReader) -> Result<RigidbodyDesc, ReadError> {
    let mass = r.f32()?;
    let use_gravity = r.bool()?;
    let is_kinematic = r.bool()?;
    let rotation_locks = RotationLocks::from_axes(r.bool()?, r.bool()?, r.bool()?);
    r.end()?;
    Ok(RigidbodyDesc {
        mass,
        use_gravity,
        is_kinematic,
        rotation_locks,
    })
}

// --- Collider ---
// kind, is_trigger, material, center, then the kind's own fields

pub fn write_collider(w: &mut TokenWriter, desc: &ColliderDesc) {
    w.token(desc.shape.kind_name())
        .bool(desc.is_trigger)
        .opt(desc.material.as_deref())
        .vec3(&desc.center);
    match &desc.shape {
        ColliderShape::Box { half_extents } => {
            w.vec3(half_extents);
        }
        ColliderShape::Sphere { radius } => {
            w.f32(*radius);
        }
        ColliderShape::Capsule {
            radius,
            half_height,
        } => {
            w.f32(*radius).f32(*half_height);
        }
        ColliderShape::Mesh { mesh, convex } => {
            w.opt(mesh.as_ref().map(|m| m.id.0)).bool(*convex);
        }
    }
    w.end();
}

/// Read a collider record. Mesh references are looked up through `meshes`;
/// an id it does not know leaves the mesh unset.
pub fn read_collider(
    r: &mut TokenReader,
    meshes: impl Fn(MeshId) -> Option<Arc<MeshData>>,
) -> Result<ColliderDesc, ReadError> {
    let kind = r.token()?;
    let is_trigger = r.bool()?;
    let material = r.opt_token()?.map(str::to_owned);
    let center = r.vec3()?;
    let shape = match kind {
        "box" => ColliderShape::Box {
            half_extents: r.vec3()?,
        },
        "sphere" => ColliderShape::Sphere { radius: r.f32()? },
        "capsule" => ColliderShape::Capsule {
            radius: r.f32()?,
            half_height: r.f32()?,
        },
        "mesh" => {
            let mesh = match r.opt_token()? {
                Some(token) => {
                    let id = token
                        .parse()
                        .map_err(|_| ReadError::BadNumber(token.to_owned()))?;
                    let mesh = meshes(MeshId(id));
                    if mesh.is_none() {
                        log::warn!("collider references unknown mesh {id}");
                    }
                    mesh
                }
                None => None,
            };
            ColliderShape::Mesh {
                mesh,
                convex: r.bool()?,
            }
        }
        other => {
            return Err(ReadError::BadToken {
                expected: "collider kind",
                found: other.to_owned(),
            });
        }
    };
    r.end()?;
    Ok(ColliderDesc {
        shape,
        is_trigger,
        material,
        center,
    })
}

// --- Constraint ---
// kind, remote, distance min/max, stiffness, damping, limit_to_distance,
// enable_limit, angle min/max, drive velocity

pub fn write_constraint(
    w: &mut TokenWriter,
    scene: &Scene,
    desc: &ConstraintDesc,
    remote: Option<&DeferredRef>,
) {
    w.u32(desc.kind as u32)
        .opt(remote.and_then(|r| r.scene_index(scene)))
        .f32(desc.distance[0])
        .f32(desc.distance[1])
        .f32(desc.stiffness)
        .f32(desc.damping)
        .bool(desc.limit_to_distance)
        .bool(desc.enable_limit)
        .f32(desc.angle[0])
        .f32(desc.angle[1])
        .f32(desc.drive_velocity)
        .end();
}

/// Read a constraint record. The remote comes back unresolved.
pub fn read_constraint(
    r: &mut TokenReader,
) -> Result<(ConstraintDesc, Option<DeferredRef>), ReadError> {
    let raw = r.u32()?;
    let kind = u8::try_from(raw)
        .ok()
        .and_then(ConstraintKind::from_u8)
        .ok_or_else(|| ReadError::BadToken {
            expected: "constraint kind 0..=5",
            found: raw.to_string(),
        })?;
    let remote = r.opt_u32()?.map(DeferredRef::Unresolved);
    let desc = ConstraintDesc {
        kind,
        distance: [r.f32()?, r.f32()?],
        stiffness: r.f32()?,
        damping: r.f32()?,
        limit_to_distance: r.bool()?,
        enable_limit: r.bool()?,
        angle: [r.f32()?, r.f32()?],
        drive_velocity: r.f32()?,
    };
    r.end()?;
    Ok((desc, remote))
}

// --- Vehicle ---
// drive torque, wheel count, one reference per wheel

pub fn write_vehicle(w: &mut TokenWriter, scene: &Scene, vehicle: &Vehicle) {
    w.f32(vehicle.drive_torque).u32(vehicle.wheels.len() as u32);
    for wheel in &vehicle.wheels {
        w.opt(wheel.and_then(|r| r.scene_index(scene)));
    }
    w.end();
}

pub fn read_vehicle(r: &mut TokenReader) -> Result<Vehicle, ReadError> {
    let drive_torque = r.f32()?;
    let count = r.u32()?;
    let wheels = (0..count)
        .map(|_| Ok(r.opt_u32()?.map(DeferredRef::Unresolved)))
        .collect::<Result<Vec<_>, ReadError>>()?;
    r.end()?;
    Ok(Vehicle::new(wheels, drive_torque))
}
