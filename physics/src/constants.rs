/*!
Fixed tuning values for the simulation adapter.

Notes
- Distances are in meters, time in seconds, angles in radians unless a name says otherwise.
- These are defaults. Anything a game might want to override lives on
  [`PhysicsSettings`](crate::settings::PhysicsSettings) instead.
*/

/// Gravity magnitude in meters per second squared (positive value).
/// Applied along -Y.
pub const GRAVITY_MPS2: f32 = 9.81;

/// Upper bound for a single simulation step (seconds).
///
/// A long frame is never integrated in one go: the step is `min(MAX_STEP_SECONDS, delta)`.
/// The remainder of a hitch is simply dropped.
pub const MAX_STEP_SECONDS: f32 = 0.016;

/// Default static friction coefficient used when a collider names no material.
pub const DEFAULT_STATIC_FRICTION: f32 = 0.5;

/// Default dynamic friction coefficient used when a collider names no material.
pub const DEFAULT_DYNAMIC_FRICTION: f32 = 0.5;

/// Default restitution used when a collider names no material.
pub const DEFAULT_RESTITUTION: f32 = 0.6;

/// Smallest cone half-angle accepted for spherical joint limits (radians).
/// A zero cone would lock the joint outright.
pub const SPHERICAL_CONE_TOLERANCE: f32 = 0.05;

/// Motor factor used by revolute and prismatic velocity drives.
pub const DRIVE_FACTOR: f32 = 1.0;

/// Scale components closer than this to 1.0 reuse cooked mesh geometry as-is.
pub const UNIT_SCALE_EPS: f32 = 1.0e-6;

/// Smallest magnitude a scale component may take when building geometry.
/// Zero-sized shapes are rejected by the solver.
pub const MIN_SCALE: f32 = 1.0e-4;

/// Default body mass (kg) for a freshly added rigidbody.
pub const DEFAULT_MASS: f32 = 1.0;

/// Principal angular inertia (kg·m²) given to every dynamic body, per axis.
/// Shapes carry no density, so inertia does not follow the attached geometry.
pub const DEFAULT_INERTIA: f32 = 1.0;

/// Pose difference (meters / radians) below which a scene write does not wake a body.
pub const POSE_EPS: f32 = 1.0e-6;
