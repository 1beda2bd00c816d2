//! Navigation session: the state machine that turns graph walks into an
//! ordered transcript of presentation blocks.
//!
//! ```text
//!            start / start_by_ref
//!   Idle ───────────────────────────▶ Active ◀──┐
//!                                       │       │ choose / choose_index
//!                                       └───────┘ load_more_history
//! ```
//!
//! Every transition computes its blocks first and commits them only on
//! success, so an error leaves the transcript, the history cursor and the
//! pending choice exactly as they were.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ErrorCode;
use crate::graph::{GraphError, Step, next_step};
use crate::model::NodeId;
use crate::text::{ChoiceEntry, NarrativeBlock, TextResolver};

/// Maximum parent hops walked by one history fetch.
pub const HISTORY_PAGE_HOPS: usize = 10;

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Session-unique handle for a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BlockId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Narrative(NarrativeBlock),
    Choices { entries: Vec<ChoiceEntry> },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub id: BlockId,
    #[serde(flatten)]
    pub block: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active { current: NodeId },
}

/// How a forward transition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A choice block with this many entries is pending.
    AwaitingChoice(usize),
    /// The conversation reached its end marker.
    Ended,
    /// The start node is obsolete; nothing was rendered.
    Stalled,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("node {0} is not one of the offered choices")]
    ChoiceNotOffered(NodeId),

    #[error("no choice numbered {index}; {available} available")]
    NoSuchChoice { index: usize, available: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl SessionError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NodeNotFound,
            Self::ChoiceNotOffered(_) | Self::NoSuchChoice { .. } => ErrorCode::ChoiceNotOffered,
            Self::Graph(err) => err.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// History paging
// ---------------------------------------------------------------------------

/// One backward page of ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    /// Presentable ancestors, furthest first.
    pub blocks: Vec<NarrativeBlock>,
    /// Last node reached; the root when the walk ran out of parents.
    pub reached: NodeId,
}

/// Walk up to [`HISTORY_PAGE_HOPS`] parent pointers from `from`.
///
/// Text-less ancestors still use up a hop. A page starting at a root is
/// empty and reaches `from` itself.
///
/// # Errors
///
/// [`GraphError`] if a parent pointer or a string id does not resolve.
pub fn history_page(resolver: &TextResolver<'_>, from: NodeId) -> Result<HistoryPage, GraphError> {
    let graph = resolver.graph();
    let mut current = from;
    let mut blocks = Vec::new();

    for _ in 0..HISTORY_PAGE_HOPS {
        let Some(parent) = graph.node(current)?.parent else {
            break;
        };
        current = parent;
        if let Some(block) = resolver.narrative_block(current)? {
            blocks.push(block);
        }
    }

    // Each ancestor is prepended as it is met, so the nearest ends up last.
    blocks.reverse();
    Ok(HistoryPage {
        blocks,
        reached: current,
    })
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct NavigationSession<'a> {
    resolver: TextResolver<'a>,
    state: SessionState,
    transcript: Vec<TranscriptEntry>,
    /// Earliest node whose ancestors have not been fetched yet.
    oldest: Option<NodeId>,
    pending_choice: Option<BlockId>,
    next_block: u64,
}

/// Result of a forward descent, not yet committed.
struct Descent {
    blocks: Vec<Block>,
    outcome: Outcome,
    stopped_at: NodeId,
}

impl<'a> NavigationSession<'a> {
    #[must_use]
    pub const fn new(resolver: TextResolver<'a>) -> Self {
        Self {
            resolver,
            state: SessionState::Idle,
            transcript: Vec::new(),
            oldest: None,
            pending_choice: None,
            next_block: 0,
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &TextResolver<'a> {
        &self.resolver
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn current(&self) -> Option<NodeId> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Active { current } => Some(current),
        }
    }

    #[must_use]
    pub const fn oldest(&self) -> Option<NodeId> {
        self.oldest
    }

    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Entries of the pending choice block, if one is shown.
    #[must_use]
    pub fn pending_choices(&self) -> Option<&[ChoiceEntry]> {
        let id = self.pending_choice?;
        self.transcript
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| match &entry.block {
                Block::Choices { entries } => Some(entries.as_slice()),
                _ => None,
            })
    }

    /// Clear the transcript and start at `node`: one page of history above
    /// it, then forward descent.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] if `node` is not in the graph.
    /// - [`SessionError::Graph`] for unresolved references or cycles.
    ///
    /// The session is unchanged on error.
    pub fn start(&mut self, node: NodeId) -> Result<Outcome, SessionError> {
        if self.resolver.graph().get(node).is_none() {
            return Err(SessionError::NotFound(node.to_string()));
        }
        let (history, reached) = self.history_above(node)?;
        let descent = self.descend(node)?;

        tracing::debug!(
            node = %node.short(),
            history = history.len(),
            blocks = descent.blocks.len(),
            outcome = ?descent.outcome,
            "starting session"
        );

        self.transcript.clear();
        self.pending_choice = None;
        self.oldest = Some(reached);
        for block in history {
            self.push(block);
        }
        Ok(self.commit(descent))
    }

    /// Start from a user-typed reference (full id or short id).
    ///
    /// # Errors
    ///
    /// Same as [`Self::start`]; an unknown reference is
    /// [`SessionError::NotFound`].
    pub fn start_by_ref(&mut self, reference: &str) -> Result<Outcome, SessionError> {
        let id = self
            .resolver
            .graph()
            .find(reference)
            .map(|node| node.id)
            .ok_or_else(|| SessionError::NotFound(reference.trim().to_string()))?;
        self.start(id)
    }

    /// Select one of the pending choices and continue from it.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ChoiceNotOffered`] if `node` is not in the pending
    ///   choice block (or nothing is pending).
    /// - [`SessionError::Graph`] for unresolved references or cycles.
    pub fn choose(&mut self, node: NodeId) -> Result<Outcome, SessionError> {
        let offered = self
            .pending_choices()
            .is_some_and(|entries| entries.iter().any(|e| e.target == node));
        if !offered {
            return Err(SessionError::ChoiceNotOffered(node));
        }

        let descent = self.descend(node)?;
        if let Some(pending) = self.pending_choice.take() {
            self.transcript.retain(|entry| entry.id != pending);
        }
        tracing::debug!(node = %node.short(), outcome = ?descent.outcome, "choice taken");
        Ok(self.commit(descent))
    }

    /// Select a pending choice by its 1-based display index.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoSuchChoice`] for an index that is not shown, plus
    /// everything [`Self::choose`] returns.
    pub fn choose_index(&mut self, index: usize) -> Result<Outcome, SessionError> {
        let entries = self.pending_choices().unwrap_or_default();
        let target = entries
            .iter()
            .find(|entry| entry.display_index == index)
            .map(|entry| entry.target)
            .ok_or(SessionError::NoSuchChoice {
                index,
                available: entries.len(),
            })?;
        self.choose(target)
    }

    /// Prepend up to [`HISTORY_PAGE_HOPS`] ancestors of the oldest shown
    /// node. Returns the number of blocks added.
    ///
    /// # Errors
    ///
    /// [`SessionError::Graph`] for unresolved references; the session is
    /// unchanged on error.
    pub fn load_more_history(&mut self) -> Result<usize, SessionError> {
        let Some(oldest) = self.oldest else {
            return Ok(0);
        };
        let (history, reached) = self.history_above(oldest)?;
        let added = history.len();

        let entries: Vec<TranscriptEntry> = history
            .into_iter()
            .map(|block| TranscriptEntry {
                id: self.allocate(),
                block,
            })
            .collect();
        self.transcript.splice(0..0, entries);
        self.oldest = Some(reached);

        tracing::debug!(added, oldest = %reached.short(), "loaded history");
        Ok(added)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn history_above(&self, from: NodeId) -> Result<(Vec<Block>, NodeId), GraphError> {
        let page = history_page(&self.resolver, from)?;
        let blocks = page.blocks.into_iter().map(Block::Narrative).collect();
        Ok((blocks, page.reached))
    }

    /// Forward descent: render, then follow single valid children until a
    /// choice point or an end.
    fn descend(&self, start: NodeId) -> Result<Descent, GraphError> {
        let graph = self.resolver.graph();
        if graph.node(start)?.is_obsolete() {
            return Ok(Descent {
                blocks: Vec::new(),
                outcome: Outcome::Stalled,
                stopped_at: start,
            });
        }

        let mut blocks = Vec::new();
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = start;

        loop {
            if !visited.insert(current) {
                let from = path.iter().position(|id| *id == current).unwrap_or_default();
                let mut cycle: Vec<NodeId> = path[from..].to_vec();
                cycle.push(current);
                return Err(GraphError::Cycle { path: cycle });
            }
            path.push(current);

            if let Some(block) = self.resolver.narrative_block(current)? {
                blocks.push(Block::Narrative(block));
            }

            match next_step(graph, current)? {
                Step::Advance(next) => current = next,
                Step::End => {
                    blocks.push(Block::End);
                    return Ok(Descent {
                        blocks,
                        outcome: Outcome::Ended,
                        stopped_at: current,
                    });
                }
                Step::Choose(choices) => {
                    let entries = choices
                        .iter()
                        .enumerate()
                        .map(|(i, id)| self.resolver.choice_entry(i + 1, *id))
                        .collect::<Result<Vec<_>, _>>()?;
                    let count = entries.len();
                    blocks.push(Block::Choices { entries });
                    return Ok(Descent {
                        blocks,
                        outcome: Outcome::AwaitingChoice(count),
                        stopped_at: current,
                    });
                }
            }
        }
    }

    fn commit(&mut self, descent: Descent) -> Outcome {
        for block in descent.blocks {
            let is_choice = matches!(block, Block::Choices { .. });
            let id = self.push(block);
            if is_choice {
                self.pending_choice = Some(id);
            }
        }
        self.state = SessionState::Active {
            current: descent.stopped_at,
        };
        descent.outcome
    }

    fn push(&mut self, block: Block) -> BlockId {
        let id = self.allocate();
        self.transcript.push(TranscriptEntry { id, block });
        id
    }

    fn allocate(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        id
    }
}
