//! Adaptive stiff ODE integration for chemistry systems.
//!
//! The [`OdeSystem`] trait is the reduced-space boundary between the
//! orchestrator and the integrator: the orchestrator supplies a system
//! over the active species and receives the advanced composition plus a
//! [`StepProfile`] describing the sub-stepping actually performed. The
//! [`StiffIntegrator`] trait makes the scheme swappable; the production
//! implementation is [`SemiImplicitSolver`], a linearized Euler scheme
//! with step-doubling error control.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod integrator;
pub mod semi_implicit;
pub mod system;

pub use integrator::{StepProfile, StiffIntegrator};
pub use semi_implicit::{SemiImplicitSolver, SemiImplicitSolverBuilder};
pub use system::OdeSystem;
