//! Affinity scopes — the enumerable matching policies, narrowest to broadest.
//!
//! A scope combines three properties: the direction of mail it examines, how
//! strictly a target's declared field is checked, and whether all targets or
//! any one target must appear on a message. The expanding-scope query walks
//! [`EXPANSION_ORDER`]; its correctness depends on that table, so the order is
//! an explicit, tested constant rather than declaration order.

use serde::{Deserialize, Serialize};

use crate::event::EventDirection;

// ─── Scope ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityScope {
  /// All targets on one sent message, each in its declared field.
  OutgoingExactMatch,
  /// All targets on one sent message, declared fields ignored.
  OutgoingExactMatchAnyField,
  /// Any one target on a sent message, in its declared field.
  OutgoingBroadMatch,
  /// Any one target on a sent message, declared fields ignored.
  OutgoingBroadMatchAnyField,
  /// Received mail whose sender is one target, with every other target
  /// co-occurring as a recipient.
  IncomingFromTarget,
  /// Received mail carrying any one target as a recipient; no sender
  /// constraint. The broadest scope.
  IncomingFromAnySender,
}

/// How targets combine when a scope tests a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCombine {
  /// Every target must match some event on the message.
  All,
  /// At least one target must match.
  Any,
}

/// Scopes in expansion order, narrowest first. The orchestrator iterates
/// this table verbatim.
pub const EXPANSION_ORDER: [AffinityScope; 6] = [
  AffinityScope::OutgoingExactMatch,
  AffinityScope::OutgoingExactMatchAnyField,
  AffinityScope::OutgoingBroadMatch,
  AffinityScope::OutgoingBroadMatchAnyField,
  AffinityScope::IncomingFromTarget,
  AffinityScope::IncomingFromAnySender,
];

impl AffinityScope {
  /// Position in [`EXPANSION_ORDER`]; lower is narrower.
  pub fn ordinal(self) -> usize {
    match self {
      Self::OutgoingExactMatch => 0,
      Self::OutgoingExactMatchAnyField => 1,
      Self::OutgoingBroadMatch => 2,
      Self::OutgoingBroadMatchAnyField => 3,
      Self::IncomingFromTarget => 4,
      Self::IncomingFromAnySender => 5,
    }
  }

  /// Which direction of mail this scope examines.
  pub fn direction(self) -> EventDirection {
    match self {
      Self::OutgoingExactMatch
      | Self::OutgoingExactMatchAnyField
      | Self::OutgoingBroadMatch
      | Self::OutgoingBroadMatchAnyField => EventDirection::Outgoing,
      Self::IncomingFromTarget | Self::IncomingFromAnySender => {
        EventDirection::Incoming
      }
    }
  }

  /// Whether a target's declared field is checked when matching its address.
  /// Only meaningful for outgoing scopes; incoming scopes match the sender,
  /// which occupies no field.
  pub fn field_strict(self) -> bool {
    matches!(self, Self::OutgoingExactMatch | Self::OutgoingBroadMatch)
  }

  /// Whether all targets or any one target must appear on a message.
  pub fn combine(self) -> TargetCombine {
    match self {
      Self::OutgoingExactMatch
      | Self::OutgoingExactMatchAnyField
      | Self::IncomingFromTarget => TargetCombine::All,
      Self::OutgoingBroadMatch
      | Self::OutgoingBroadMatchAnyField
      | Self::IncomingFromAnySender => TargetCombine::Any,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
