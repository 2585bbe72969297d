pub mod arena;
pub mod check_state;
pub mod document;
pub mod linked;
pub mod performance;
pub mod projection;
pub mod propagation;
pub mod search;
pub mod traverse;
