use persona_agents::PersonaId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which agents take part in an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Every analyst, the risk pass and synthesis
    #[default]
    Full,
    /// Three agents covering value, contrarian and momentum views
    Fast,
    /// Memecoin specialists plus the risk pass
    Degen,
}

impl AnalysisMode {
    pub fn agents(&self) -> Vec<PersonaId> {
        match self {
            AnalysisMode::Full => PersonaId::ANALYSTS.to_vec(),
            AnalysisMode::Fast => vec![
                PersonaId::WarrenBuffett,
                PersonaId::MichaelBurry,
                PersonaId::DegenTrader,
            ],
            AnalysisMode::Degen => vec![
                PersonaId::DegenTrader,
                PersonaId::PumpTrader,
                PersonaId::SolanaSpecialist,
                PersonaId::WhaleWatcher,
            ],
        }
    }

    pub fn runs_risk_manager(&self) -> bool {
        !matches!(self, AnalysisMode::Fast)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Full => "full",
            AnalysisMode::Fast => "fast",
            AnalysisMode::Degen => "degen",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(AnalysisMode::Full),
            "fast" => Ok(AnalysisMode::Fast),
            "degen" => Ok(AnalysisMode::Degen),
            other => Err(format!("unknown analysis mode '{}'", other)),
        }
    }
}
