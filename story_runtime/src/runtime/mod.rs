//! Story Runtime - the play-mode state machine.
//!
//! States:
//! 1. **EditIdle**: `mode == Edit`, nothing current, no timers
//! 2. **Playing**: `mode == Play`, a scene is current and owns the timers
//! 3. **GameOver**: `mode == Play`, `is_game_over`, no timers
//!
//! Scene entry is the only place timers are created, and it always opens a
//! new scheduler generation first. Time is virtual and only moves through
//! [`StoryRuntime::advance`], which makes every transition reproducible.

mod scheduler;

pub use scheduler::*;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use story_graph::{
    evaluate, ChoiceNode, Effects, GraphStore, NodeId, SceneNode, StoryGraph, StoryNode,
    StoryProject, Variable, VariableStore,
};

use crate::config::{MissingNodePolicy, RuntimeConfig};
use crate::error::RuntimeError;
use crate::events::{GameOverReason, RuntimeEvent};

/// Editing or playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Edit,
    Play,
}

/// The ephemeral play-session state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub mode: Mode,
    pub current_node_id: Option<NodeId>,
    pub is_game_over: bool,
}

impl GameState {
    /// Check if a scene is current and play can continue.
    pub fn is_playing(&self) -> bool {
        self.mode == Mode::Play && !self.is_game_over
    }
}

/// Why `resolve_choice` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Not in play mode, or the game is over.
    NotPlaying,
    /// No choice node with that ID.
    UnknownChoice,
    /// The choice is not offered by the current scene.
    NotOffered,
    /// The choice does not lead to an existing scene.
    MissingTarget,
}

/// Result of resolving a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// Effects applied and the target scene is now current.
    Advanced { from: NodeId, to: NodeId },

    /// Effects applied, but the target scene's condition failed.
    Blocked {
        target: NodeId,
        effects_applied: Effects,
    },

    /// Nothing changed.
    Ignored(IgnoreReason),
}

/// A choice of the current scene as the UI should present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub choice: ChoiceNode,
    /// Scene the choice leads to, if it exists.
    pub target: Option<NodeId>,
    /// Passes the availability gate right now.
    pub available: bool,
    /// The target's condition would hold after this choice's effects.
    pub unlocks_target: bool,
}

/// Observable runtime state at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub state: GameState,
    pub remaining_ms: Option<u64>,
    pub generation: Generation,
    pub variables: VariableStore,
}

/// Plays a story graph.
pub struct StoryRuntime<G> {
    graph: G,
    variables: VariableStore,
    config: RuntimeConfig,
    state: GameState,
    scheduler: Scheduler,
    /// Choices offered by the current scene when it was entered.
    entry_choices: Vec<NodeId>,
    events: VecDeque<RuntimeEvent>,
}

impl<G: GraphStore> StoryRuntime<G> {
    /// Create a runtime in edit mode.
    pub fn new(graph: G, variables: VariableStore, config: RuntimeConfig) -> Self {
        let scheduler = Scheduler::new(config.tick_interval());
        Self {
            graph,
            variables,
            config,
            state: GameState::default(),
            scheduler,
            entry_choices: Vec::new(),
            events: VecDeque::new(),
        }
    }

    /// Create a runtime with default configuration.
    pub fn with_defaults(graph: G, variables: VariableStore) -> Self {
        Self::new(graph, variables, RuntimeConfig::default())
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Editor access to an owned graph.
    ///
    /// The runtime tolerates any edit; see [`MissingNodePolicy`].
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over
    }

    pub fn current_node_id(&self) -> Option<&NodeId> {
        self.state.current_node_id.as_ref()
    }

    /// The current node, looked up in the graph.
    pub fn current_node(&self) -> Option<StoryNode> {
        self.state
            .current_node_id
            .as_ref()
            .and_then(|id| self.graph.node(id))
    }

    /// Time left on the current scene's countdown, if one is running.
    pub fn remaining_ms(&self) -> Option<u64> {
        self.scheduler
            .remaining()
            .map(|remaining| remaining.as_millis() as u64)
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn generation(&self) -> Generation {
        self.scheduler.generation()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Check if timer work is queued.
    pub fn has_pending_tasks(&self) -> bool {
        self.scheduler.pending() > 0
    }

    /// Capture the observable state.
    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            state: self.state.clone(),
            remaining_ms: self.remaining_ms(),
            generation: self.generation(),
            variables: self.variables.clone(),
        }
    }

    /// Define (or redefine) a variable. This is the editor's "add variable".
    ///
    /// During play an existing variable keeps its live value, clamped to the
    /// new bounds; the new initial value applies from the next `start`.
    pub fn define_variable(&mut self, variable: Variable) -> Option<Variable> {
        let variable = match self.variables.get(&variable.name) {
            Some(live) if self.state.mode == Mode::Play => {
                let value = variable.clamp(live.value);
                variable.with_value(value)
            }
            _ => variable,
        };
        self.variables.define(variable)
    }

    /// Take all buffered events.
    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        self.events.drain(..).collect()
    }

    /// Begin a playthrough at `start_node_id`, from initial variable values.
    pub fn start(&mut self, start_node_id: impl Into<NodeId>) {
        let start = start_node_id.into();

        self.scheduler.invalidate();
        self.variables = self.variables.reset_to_initial();
        self.state = GameState {
            mode: Mode::Play,
            current_node_id: Some(start.clone()),
            is_game_over: false,
        };

        tracing::info!(node = %start, "playthrough started");
        self.push_event(RuntimeEvent::Started {
            start_node: start.clone(),
        });

        match self.graph.node(&start) {
            Some(StoryNode::Scene(scene)) => self.enter_scene(scene),
            Some(StoryNode::Choice(_)) | None => {
                tracing::warn!(node = %start, "start node is not a scene");
                self.state.current_node_id = None;
                self.end_game(GameOverReason::InvalidStart);
            }
        }
    }

    /// Leave play mode, cancelling every timer.
    pub fn stop(&mut self) {
        self.scheduler.invalidate();
        self.entry_choices.clear();
        self.state = GameState::default();

        tracing::info!("playthrough stopped");
        self.push_event(RuntimeEvent::Stopped);
    }

    /// Replay from scratch.
    pub fn reset(&mut self, start_node_id: impl Into<NodeId>) {
        self.stop();
        self.start(start_node_id);
    }

    /// Check the UI availability gate for a choice.
    ///
    /// Advisory only: [`StoryRuntime::resolve_choice`] re-checks it.
    pub fn is_choice_available(&self, choice_id: &NodeId) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        let offered_by = self.graph.edge_source(choice_id);
        offered_by.is_some() && offered_by.as_ref() == self.state.current_node_id.as_ref()
    }

    /// The current scene's choices, annotated for display.
    pub fn available_choices(&self) -> Vec<ChoiceView> {
        let Some(current) = self.state.current_node_id.as_ref() else {
            return Vec::new();
        };
        if !self.state.is_playing() {
            return Vec::new();
        }

        self.graph
            .outgoing_choices(current)
            .into_iter()
            .map(|choice| {
                let target = self
                    .graph
                    .edge_target(&choice.id)
                    .and_then(|id| self.graph.node(&id))
                    .and_then(StoryNode::into_scene);
                let unlocks_target = target.as_ref().is_some_and(|scene| {
                    let after = self.variables.with_effects(&choice.effects);
                    evaluate(after.as_slice(), scene.condition.as_ref())
                });

                ChoiceView {
                    available: self.is_choice_available(&choice.id),
                    target: target.map(|scene| scene.id),
                    unlocks_target,
                    choice,
                }
            })
            .collect()
    }

    /// Resolve a player (or default) choice.
    ///
    /// Effects are applied before the target's condition is checked, so a
    /// locked target still costs the choice's effects.
    pub fn resolve_choice(&mut self, choice_id: impl Into<NodeId>) -> ChoiceOutcome {
        let choice_id = choice_id.into();

        if !self.state.is_playing() {
            return ChoiceOutcome::Ignored(IgnoreReason::NotPlaying);
        }
        let Some(current) = self.state.current_node_id.clone() else {
            return ChoiceOutcome::Ignored(IgnoreReason::NotPlaying);
        };

        let Some(choice) = self.graph.node(&choice_id).and_then(StoryNode::into_choice) else {
            tracing::warn!(choice = %choice_id, "resolve_choice: no such choice");
            return ChoiceOutcome::Ignored(IgnoreReason::UnknownChoice);
        };

        if self.graph.edge_source(&choice_id).as_ref() != Some(&current) {
            tracing::debug!(choice = %choice_id, current = %current, "choice not offered by current scene");
            return ChoiceOutcome::Ignored(IgnoreReason::NotOffered);
        }

        let Some(target) = self
            .graph
            .edge_target(&choice_id)
            .and_then(|id| self.graph.node(&id))
            .and_then(StoryNode::into_scene)
        else {
            tracing::warn!(choice = %choice_id, "resolve_choice: choice leads to no scene");
            return ChoiceOutcome::Ignored(IgnoreReason::MissingTarget);
        };

        self.variables = self.variables.with_effects(&choice.effects);

        if !evaluate(self.variables.as_slice(), target.condition.as_ref()) {
            tracing::info!(choice = %choice_id, target = %target.id, "target scene locked");
            self.push_event(RuntimeEvent::ChoiceBlocked {
                choice: choice_id,
                target: target.id.clone(),
            });
            return ChoiceOutcome::Blocked {
                target: target.id,
                effects_applied: choice.effects,
            };
        }

        let to = target.id.clone();
        tracing::info!(choice = %choice_id, from = %current, to = %to, "choice resolved");
        self.state.current_node_id = Some(to.clone());
        self.push_event(RuntimeEvent::ChoiceResolved {
            choice: choice_id,
            from: current.clone(),
            to: to.clone(),
        });
        self.enter_scene(target);

        ChoiceOutcome::Advanced { from: current, to }
    }

    /// Move the virtual clock forward, dispatching due tasks in time order.
    ///
    /// Returns the number of tasks dispatched.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        let until = self.scheduler.now().saturating_add(elapsed);
        let mut dispatched = 0;
        let mut chained = 0;

        while let Some(task) = self.scheduler.pop_due(until) {
            if task.kind == TaskKind::Immediate {
                if chained >= self.config.max_chained_transitions {
                    tracing::warn!(
                        limit = self.config.max_chained_transitions,
                        "immediate scene chain limit reached, deferring"
                    );
                    self.scheduler.requeue(task);
                    break;
                }
                chained += 1;
            }
            self.dispatch(task);
            dispatched += 1;
        }

        self.scheduler.advance_to(until);
        dispatched
    }

    /// Run tasks that are already due, such as immediate scene timeouts.
    pub fn run_pending(&mut self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Node-entry procedure for a scene.
    fn enter_scene(&mut self, scene: SceneNode) {
        let generation = self.scheduler.invalidate();
        let duration_ms = scene.duration_ms();
        self.entry_choices = self
            .graph
            .outgoing_choices(&scene.id)
            .into_iter()
            .map(|choice| choice.id)
            .collect();

        if duration_ms > 0 {
            self.scheduler
                .schedule_countdown(Duration::from_millis(duration_ms));
        } else {
            self.scheduler.schedule_immediate();
        }

        tracing::debug!(scene = %scene.id, %generation, duration_ms, "entered scene");
        self.push_event(RuntimeEvent::SceneEntered {
            scene: scene.id,
            generation,
            duration_ms,
        });
    }

    fn dispatch(&mut self, task: ScheduledTask) {
        if !self.scheduler.is_current(&task) {
            tracing::debug!(generation = %task.generation, "dropping stale task");
            return;
        }
        if !self.state.is_playing() {
            return;
        }
        let Some(current) = self.state.current_node_id.clone() else {
            return;
        };

        let scene = match self.graph.node(&current) {
            Some(StoryNode::Scene(scene)) => scene,
            _ => {
                match self.config.missing_node_policy {
                    MissingNodePolicy::EndGame => {
                        tracing::warn!(scene = %current, "current scene removed, ending playthrough");
                        self.end_game(GameOverReason::MissingNode);
                    }
                    MissingNodePolicy::Ignore => {
                        tracing::warn!(scene = %current, kind = ?task.kind, "current scene removed, ignoring timer");
                    }
                }
                return;
            }
        };

        match task.kind {
            TaskKind::Tick => {
                let remaining_ms = self.remaining_ms().unwrap_or(0);
                self.push_event(RuntimeEvent::Tick {
                    scene: scene.id,
                    remaining_ms,
                });
                self.scheduler.schedule_tick_after(task.due_at);
            }
            TaskKind::Expiry => {
                self.scheduler.clear_countdown();
                self.push_event(RuntimeEvent::TimerExpired {
                    scene: scene.id.clone(),
                });
                self.handle_timeout(&scene);
            }
            TaskKind::Immediate => self.handle_timeout(&scene),
        }
    }

    /// Take the default choice, end the game, or wait for the player.
    ///
    /// Works from the choices captured at scene entry.
    fn handle_timeout(&mut self, scene: &SceneNode) {
        let choices = &self.entry_choices;

        if let Some(default) = &scene.default_choice_id {
            if choices.contains(default) {
                self.resolve_choice(default.clone());
                return;
            }
        }

        if choices.is_empty() {
            self.end_game(GameOverReason::NoChoices);
        } else {
            tracing::debug!(scene = %scene.id, choices = choices.len(), "waiting for player choice");
        }
    }

    fn end_game(&mut self, reason: GameOverReason) {
        self.scheduler.invalidate();
        self.entry_choices.clear();
        self.state.is_game_over = true;

        tracing::info!(?reason, scene = ?self.state.current_node_id, "game over");
        self.push_event(RuntimeEvent::GameOver {
            scene: self.state.current_node_id.clone(),
            reason,
        });
    }

    fn push_event(&mut self, event: RuntimeEvent) {
        if self.events.len() >= self.config.event_buffer_capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl StoryRuntime<StoryGraph> {
    /// Build a runtime from stored project definitions.
    pub fn from_project(project: StoryProject, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let (graph, variables) = project.into_parts()?;
        Ok(Self::new(graph, variables, config))
    }
}

impl<G> std::fmt::Debug for StoryRuntime<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryRuntime")
            .field("state", &self.state)
            .field("variables", &self.variables)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
