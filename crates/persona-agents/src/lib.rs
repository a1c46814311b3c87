pub mod agent;
pub mod personas;
pub mod portfolio_manager;

pub use agent::Agent;
pub use personas::{Persona, PersonaId};
pub use portfolio_manager::PortfolioManagerAgent;
