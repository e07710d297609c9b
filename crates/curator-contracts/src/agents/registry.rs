use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Critic;
use crate::error::CritiqueError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Critic,
    pub name: Critic,
    pub description: String,
    pub avatar: String,
    pub pro: bool,
    pub active: bool,
}

impl Agent {
    fn seeded(critic: Critic) -> Self {
        Self {
            id: critic,
            name: critic,
            description: critic.description().to_string(),
            avatar: critic.avatar().to_string(),
            pro: critic.is_pro(),
            active: !critic.is_pro(),
        }
    }
}

/// Session registry of critic personas and their active flags.
///
/// Pro personas start inactive. While pro access is not enabled they stay
/// out of the active set and cannot be toggled.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: IndexMap<Critic, Agent>,
    pro_enabled: bool,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}

impl AgentRegistry {
    pub fn new(pro_enabled: bool) -> Self {
        let agents = Critic::ALL
            .into_iter()
            .map(|critic| (critic, Agent::seeded(critic)))
            .collect();
        Self {
            agents,
            pro_enabled,
        }
    }

    pub fn pro_enabled(&self) -> bool {
        self.pro_enabled
    }

    pub fn set_pro_enabled(&mut self, enabled: bool) {
        self.pro_enabled = enabled;
    }

    pub fn get(&self, critic: Critic) -> Option<&Agent> {
        self.agents.get(&critic)
    }

    pub fn list(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Flips the active flag and returns the new value.
    pub fn toggle(&mut self, critic: Critic) -> Result<bool, CritiqueError> {
        let pro_enabled = self.pro_enabled;
        let agent = self.agents.get_mut(&critic).ok_or_else(|| {
            CritiqueError::validation("critic", format!("Unknown critic '{critic}'."))
        })?;
        if agent.pro && !pro_enabled {
            return Err(CritiqueError::validation(
                "critic",
                format!("'{critic}' is a pro critic and requires pro access."),
            ));
        }
        agent.active = !agent.active;
        Ok(agent.active)
    }

    pub fn is_active(&self, critic: Critic) -> bool {
        self.agents
            .get(&critic)
            .map(|agent| agent.active && (!agent.pro || self.pro_enabled))
            .unwrap_or(false)
    }

    /// Personas a critique request may currently be voiced by, in registry order.
    pub fn active(&self) -> Vec<Critic> {
        self.agents
            .keys()
            .copied()
            .filter(|critic| self.is_active(*critic))
            .collect()
    }

    /// First active persona, if any. Never falls back to an inactive one.
    pub fn default_selection(&self) -> Option<Critic> {
        self.active().into_iter().next()
    }

    /// Applies persisted active flags; unknown personas are ignored and
    /// gated pro personas keep their seeded flag.
    pub fn restore_active(&mut self, active: &[Critic]) {
        let pro_enabled = self.pro_enabled;
        for agent in self.agents.values_mut() {
            if agent.pro && !pro_enabled {
                continue;
            }
            agent.active = active.contains(&agent.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AgentRegistry;
    use crate::agents::Critic;

    #[test]
    fn seeds_non_pro_active_and_pro_inactive() {
        let registry = AgentRegistry::default();
        assert_eq!(
            registry.active(),
            vec![
                Critic::DefaultAi,
                Critic::PretentiousArtCritic,
                Critic::SupportivePhotographer
            ]
        );
        let ansel = registry.get(Critic::AnselAdams).map(|agent| agent.active);
        assert_eq!(ansel, Some(false));
    }

    #[test]
    fn toggle_flips_single_persona() -> anyhow::Result<()> {
        let mut registry = AgentRegistry::default();
        assert!(!registry.toggle(Critic::DefaultAi)?);
        assert!(!registry.is_active(Critic::DefaultAi));
        assert_eq!(
            registry.default_selection(),
            Some(Critic::PretentiousArtCritic)
        );
        assert!(registry.toggle(Critic::DefaultAi)?);
        Ok(())
    }

    #[test]
    fn gated_pro_persona_cannot_toggle() {
        let mut registry = AgentRegistry::default();
        assert!(registry.toggle(Critic::AnselAdams).is_err());
        assert!(!registry.is_active(Critic::AnselAdams));
    }

    #[test]
    fn pro_persona_toggles_once_enabled() -> anyhow::Result<()> {
        let mut registry = AgentRegistry::new(true);
        assert!(registry.toggle(Critic::AnselAdams)?);
        assert!(registry.active().contains(&Critic::AnselAdams));
        Ok(())
    }

    #[test]
    fn empty_active_set_selects_nothing() -> anyhow::Result<()> {
        let mut registry = AgentRegistry::default();
        for critic in registry.active() {
            registry.toggle(critic)?;
        }
        assert!(registry.active().is_empty());
        assert_eq!(registry.default_selection(), None);
        Ok(())
    }

    #[test]
    fn restore_active_skips_gated_pro() {
        let mut registry = AgentRegistry::default();
        registry.restore_active(&[Critic::SupportivePhotographer, Critic::AnselAdams]);
        assert_eq!(registry.active(), vec![Critic::SupportivePhotographer]);
    }
}
