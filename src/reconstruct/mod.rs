//! State Reconstructor - sparse balance log to dense daily holding state
//!
//! The observation log only records days on which a balance changed. This
//! module rebuilds, per holder and per day, the balance actually held:
//!
//! ```text
//! Observations → TransitionLog (prior balance, order check)
//!     ↓ per entity
//! segment_episodes (entry/exit state machine)
//!     ↓
//! expand_episode (episode-bounded calendar + forward-fill)
//!     ↓ barrier
//! dedup_overlapping → apply_normalization (supply view only)
//! ```
//!
//! Expansion never crosses an episode boundary and never materializes the
//! full entity × window product: each episode renders only its own days.

pub mod calendar;
pub mod daily;
pub mod episode;
pub mod error;
pub mod normalize;
pub mod reconstructor;
pub mod transition;

pub use calendar::AnalysisWindow;
pub use daily::DailyState;
pub use episode::{BoundaryConvention, Episode, EpisodeEnd, HoldingState};
pub use error::{EntityDiagnostic, ReconstructError};
pub use reconstructor::{
    Reconstruction, ReconstructionStats, ReconstructorSettings, StateReconstructor,
};
pub use transition::{EntityHistory, Transition, TransitionLog};
