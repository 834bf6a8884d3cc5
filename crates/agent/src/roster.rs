//! Starting every agent in the `[[agents]]` roster on one team.
//!
//! The host supplies the world-facing collaborators for each entry; the
//! roster swaps in a shared [`TeamHub`] sized from the `[team]` section,
//! builds each agent from its entry, and starts its runtime.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use wardens_config::{AgentEntry, AppConfig};
use wardens_core::{AgentEvent, Collaborators};
use wardens_team::TeamHub;

use crate::agent::Agent;
use crate::scheduler::AgentRuntime;

/// Buffered world events per agent before senders wait.
const EVENT_BUFFER: usize = 64;

struct Member {
    events: mpsc::Sender<AgentEvent>,
    runtime: AgentRuntime,
}

pub struct Roster {
    hub: Arc<TeamHub>,
    members: Vec<Member>,
}

impl Roster {
    /// Start one runtime per roster entry. `connect` returns the entry's
    /// collaborators; its `team` field is replaced by the roster's hub.
    pub fn start<F>(config: Arc<AppConfig>, mut connect: F) -> Self
    where
        F: FnMut(&AgentEntry) -> Collaborators,
    {
        let hub = Arc::new(TeamHub::from_config(&config.team));
        let mut members = Vec::with_capacity(config.agents.len());

        for entry in &config.agents {
            let mut collab = connect(entry);
            collab.team = hub.clone();
            let agent = Arc::new(Agent::from_entry(entry, collab, Arc::clone(&config)).build());
            let (events, receiver) = mpsc::channel(EVENT_BUFFER);
            let runtime = AgentRuntime::start(agent, receiver, Some(hub.subscribe()));
            members.push(Member { events, runtime });
        }

        info!(agents = members.len(), "Roster started");
        Self { hub, members }
    }

    pub fn hub(&self) -> &Arc<TeamHub> {
        &self.hub
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.members.iter().map(|member| member.runtime.agent())
    }

    pub fn agent(&self, name: &str) -> Option<&Arc<Agent>> {
        self.agents().find(|agent| agent.name() == name)
    }

    /// Sender for delivering world events to `name`.
    pub fn events(&self, name: &str) -> Option<mpsc::Sender<AgentEvent>> {
        self.members
            .iter()
            .find(|member| member.runtime.agent().name() == name)
            .map(|member| member.events.clone())
    }

    /// Stop every runtime and wait for them.
    pub async fn shutdown(self) {
        for member in self.members {
            member.runtime.shutdown().await;
        }
        info!("Roster stopped");
    }
}
